mod artifact;

pub use artifact::{compare_versions, MavenArtifact};

/// Default repository for libraries that don't declare their own `url`.
pub const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net/";
