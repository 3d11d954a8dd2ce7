pub mod builder;
pub mod library;
pub mod model;
pub mod profile;
pub mod rules;
pub mod version_file;
pub mod wildcard;

pub use builder::{build, BuildOptions, BuildOutput};
pub use library::{DependType, InsertType, Library, LibraryType, RawLibrary, ResolvedLibrary};
pub use model::{LaunchProfile, VersionModel};
pub use profile::{MinecraftProfile, MoveDirection};
pub use rules::{
    evaluate, OperatingSystem, Platform, Rule, RuleAction, RulePredicate, VersionPattern,
};
pub use version_file::{JarMod, VersionFile, SUPPORTED_LAUNCHER_VERSION};
pub use wildcard::Wildcard;
