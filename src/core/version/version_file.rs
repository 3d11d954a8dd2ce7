// ─── Version File ───
// One layer of version data (base version.json, a patch, custom.json or a
// meta document) and the rules for applying it onto a `VersionModel`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult, VersionBuildError};
use crate::core::maven::{compare_versions, MavenArtifact};

use super::library::{self, DependType, InsertType, Library, RawLibrary};
use super::model::VersionModel;
use super::wildcard::Wildcard;

/// Highest `minimumLauncherVersion` this engine can apply.
pub const SUPPORTED_LAUNCHER_VERSION: i64 = 18;

/// A jar mod overlay declared by a patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JarMod {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VersionFile {
    pub order: Option<i64>,
    pub name: String,
    pub file_id: String,
    pub version: String,
    /// Minecraft version glob this file is written for.
    pub mc_version: Option<String>,
    /// Name used in log lines and error messages.
    pub filename: String,
    /// Backing file on disk, if any.
    pub source_path: Option<PathBuf>,

    pub id: Option<String>,
    pub main_class: Option<String>,
    pub applet_class: Option<String>,
    pub process_arguments: Option<String>,
    pub overwrite_minecraft_arguments: Option<String>,
    pub add_minecraft_arguments: Option<String>,
    pub remove_minecraft_arguments: Option<String>,
    pub release_type: Option<String>,
    pub release_time: Option<String>,
    pub time: Option<String>,
    pub assets: Option<String>,
    pub minimum_launcher_version: Option<i64>,

    pub overwrite_tweakers: Option<Vec<String>>,
    pub add_tweakers: Vec<String>,
    pub remove_tweakers: Vec<String>,

    pub overwrite_libs: Option<Vec<RawLibrary>>,
    pub add_libs: Vec<RawLibrary>,
    pub remove_libs: Vec<String>,

    pub traits: BTreeSet<String>,
    pub jar_mods: Vec<JarMod>,
}

// ─── JSON shape ───

#[derive(Debug, Default, Deserialize)]
struct VersionFileJson {
    #[serde(default)]
    order: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, rename = "fileId", alias = "uid", deserialize_with = "lenient_string")]
    file_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    version: Option<String>,
    #[serde(default, rename = "mcVersion", deserialize_with = "lenient_string")]
    mc_version: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(default, rename = "mainClass", deserialize_with = "lenient_string")]
    main_class: Option<String>,
    #[serde(default, rename = "appletClass", deserialize_with = "lenient_string")]
    applet_class: Option<String>,
    #[serde(default, rename = "processArguments", deserialize_with = "lenient_string")]
    process_arguments: Option<String>,
    #[serde(default, rename = "minecraftArguments", deserialize_with = "lenient_string")]
    minecraft_arguments: Option<String>,
    #[serde(default, rename = "+minecraftArguments", deserialize_with = "lenient_string")]
    add_minecraft_arguments: Option<String>,
    #[serde(default, rename = "-minecraftArguments", deserialize_with = "lenient_string")]
    remove_minecraft_arguments: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    release_type: Option<String>,
    #[serde(default, rename = "releaseTime", deserialize_with = "lenient_string")]
    release_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    assets: Option<String>,
    #[serde(default, rename = "minimumLauncherVersion")]
    minimum_launcher_version: Option<serde_json::Value>,

    #[serde(default)]
    tweakers: Option<Vec<String>>,
    #[serde(default, rename = "+tweakers")]
    add_tweakers: Vec<String>,
    #[serde(default, rename = "-tweakers")]
    remove_tweakers: Vec<String>,

    #[serde(default)]
    libraries: Option<Vec<serde_json::Value>>,
    #[serde(default, rename = "+libraries")]
    add_libraries: Vec<serde_json::Value>,
    #[serde(default, rename = "-libraries")]
    remove_libraries: Vec<RemovedLibrary>,

    #[serde(default, rename = "+traits")]
    traits: Vec<String>,
    #[serde(default, rename = "+jarMods")]
    jar_mods: Vec<JarMod>,
}

#[derive(Debug, Deserialize)]
struct RemovedLibrary {
    name: String,
}

/// Optional string fields of the wrong type are skipped, not fatal.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Null) | None => None,
        Some(other) => {
            warn!("Expected a string but found {} (skipping)", other);
            None
        }
    })
}

impl VersionFile {
    /// Parse a version file. Patches from `patches/` pass `require_order`.
    pub fn from_json(
        doc: &serde_json::Value,
        filename: &str,
        require_order: bool,
    ) -> LauncherResult<Self> {
        Self::parse(doc, filename, require_order, false)
    }

    /// Parse an FTB `pack.json`: its libraries are prepended as local
    /// libraries instead of replacing the list, and its `id` is ignored.
    pub fn from_ftb_pack(doc: &serde_json::Value, filename: &str) -> LauncherResult<Self> {
        Self::parse(doc, filename, false, true)
    }

    /// Read and parse a file from disk.
    pub fn from_file(path: &Path, require_order: bool) -> LauncherResult<Self> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let bytes = std::fs::read(path).map_err(|e| LauncherError::io(path, e))?;
        let doc: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
            LauncherError::parse(&filename, format!("invalid JSON: {}", e))
        })?;

        let is_ftb = filename == "pack.json";
        let mut file = Self::parse(&doc, &filename, require_order, is_ftb)?;
        file.source_path = Some(path.to_path_buf());
        Ok(file)
    }

    fn parse(
        doc: &serde_json::Value,
        filename: &str,
        require_order: bool,
        is_ftb: bool,
    ) -> LauncherResult<Self> {
        if !doc.is_object() {
            return Err(LauncherError::parse(filename, "the root is not an object"));
        }
        let raw: VersionFileJson = serde_json::from_value(doc.clone())
            .map_err(|e| LauncherError::parse(filename, e.to_string()))?;

        let order = match raw.order {
            Some(value) => match value.as_i64() {
                Some(order) => Some(order),
                None => {
                    return Err(LauncherError::parse(
                        filename,
                        "'order' field contains an invalid value",
                    ))
                }
            },
            None => {
                if require_order {
                    warn!("{} doesn't contain an order field", filename);
                }
                None
            }
        };

        let minimum_launcher_version = match raw.minimum_launcher_version {
            Some(value) => {
                let parsed = value.as_i64();
                if parsed.is_none() {
                    warn!("minimumLauncherVersion is not an int in {} (skipping)", filename);
                }
                parsed
            }
            None => None,
        };

        let mut overwrite_libs = None;
        let mut add_libs = Vec::new();
        if let Some(libraries) = raw.libraries {
            let mut parsed = Vec::with_capacity(libraries.len());
            for value in &libraries {
                parsed.push(RawLibrary::from_json(value, filename)?);
            }
            if is_ftb {
                for mut lib in parsed {
                    lib.hint = Some("local".to_string());
                    lib.insert_type = InsertType::Prepend;
                    add_libs.insert(0, lib);
                }
            } else {
                overwrite_libs = Some(parsed);
            }
        }

        for value in &raw.add_libraries {
            if !library::declares_insert(value) {
                return Err(LauncherError::parse(
                    filename,
                    "missing 'insert' field in '+libraries' entry",
                ));
            }
            add_libs.push(RawLibrary::from_json(value, filename)?);
        }

        Ok(Self {
            order,
            name: raw.name.unwrap_or_default(),
            file_id: raw.file_id.unwrap_or_default(),
            version: raw.version.unwrap_or_default(),
            mc_version: raw.mc_version,
            filename: filename.to_string(),
            source_path: None,
            id: if is_ftb { None } else { raw.id },
            main_class: raw.main_class,
            applet_class: raw.applet_class,
            process_arguments: raw.process_arguments,
            overwrite_minecraft_arguments: raw.minecraft_arguments,
            add_minecraft_arguments: raw.add_minecraft_arguments,
            remove_minecraft_arguments: raw.remove_minecraft_arguments,
            release_type: raw.release_type,
            release_time: raw.release_time,
            time: raw.time,
            assets: raw.assets,
            minimum_launcher_version,
            overwrite_tweakers: raw.tweakers,
            add_tweakers: raw.add_tweakers,
            remove_tweakers: raw.remove_tweakers,
            overwrite_libs,
            add_libs,
            remove_libs: raw.remove_libraries.into_iter().map(|l| l.name).collect(),
            traits: raw.traits.into_iter().collect(),
            jar_mods: raw.jar_mods,
        })
    }

    fn fail(&self, source: VersionBuildError) -> LauncherError {
        LauncherError::VersionBuild {
            file: self.filename.clone(),
            source,
        }
    }

    /// Apply this layer onto `model`.
    ///
    /// Scalars first, then arguments, tweakers and libraries. On error the
    /// model may be partially modified; builders apply onto a scratch model.
    pub fn apply_to(&self, model: &mut VersionModel) -> LauncherResult<()> {
        if let Some(required) = self.minimum_launcher_version {
            if required > SUPPORTED_LAUNCHER_VERSION {
                return Err(self.fail(VersionBuildError::LauncherVersionTooNew {
                    required,
                    supported: SUPPORTED_LAUNCHER_VERSION,
                }));
            }
        }

        if let Some(glob) = &self.mc_version {
            if !model.id.is_empty() && !Wildcard::case_insensitive(glob).is_match(&model.id) {
                return Err(self.fail(VersionBuildError::McVersionMismatch {
                    expected: glob.clone(),
                    actual: model.id.clone(),
                }));
            }
        }

        let overwrite = |target: &mut String, value: &Option<String>| {
            if let Some(v) = value {
                *target = v.clone();
            }
        };
        overwrite(&mut model.id, &self.id);
        overwrite(&mut model.main_class, &self.main_class);
        overwrite(&mut model.applet_class, &self.applet_class);
        overwrite(&mut model.process_arguments, &self.process_arguments);
        overwrite(&mut model.release_type, &self.release_type);
        overwrite(&mut model.release_time, &self.release_time);
        overwrite(&mut model.time, &self.time);
        overwrite(&mut model.assets, &self.assets);
        if self.minimum_launcher_version.is_some() {
            model.minimum_launcher_version = self.minimum_launcher_version;
        }

        overwrite(&mut model.minecraft_arguments, &self.overwrite_minecraft_arguments);
        if let Some(suffix) = &self.add_minecraft_arguments {
            model.minecraft_arguments.push_str(suffix);
        }
        if let Some(removed) = &self.remove_minecraft_arguments {
            if !removed.is_empty() {
                model.minecraft_arguments = model.minecraft_arguments.replace(removed, "");
            }
        }

        if let Some(tweakers) = &self.overwrite_tweakers {
            model.tweakers = tweakers.clone();
        }
        model.tweakers.extend(self.add_tweakers.iter().cloned());
        model
            .tweakers
            .retain(|tweaker| !self.remove_tweakers.contains(tweaker));

        if let Some(libs) = &self.overwrite_libs {
            let platform = model.platform().clone();
            model.libraries = libs
                .iter()
                .cloned()
                .map(|raw| Library::new(raw, &platform))
                .collect();
        }

        for lib in &self.add_libs {
            match lib.insert_type {
                InsertType::Apply => self.apply_library(model, lib)?,
                InsertType::Append | InsertType::Prepend => self.insert_library(model, lib)?,
                InsertType::Replace => self.replace_library(model, lib),
            }
        }

        for name in &self.remove_libs {
            let pattern = removal_pattern(name);
            match model.find_library(&pattern) {
                Some(index) => {
                    debug!("{} removes library {}", self.filename, name);
                    model.libraries.remove(index);
                }
                None => warn!("Couldn't find {} (skipping)", name),
            }
        }

        model.traits.extend(self.traits.iter().cloned());
        model.jar_mods.extend(self.jar_mods.iter().cloned());

        Ok(())
    }

    fn apply_library(&self, model: &mut VersionModel, lib: &RawLibrary) -> LauncherResult<()> {
        let pattern = lib.artifact.any_version_pattern();
        let matches = model.find_libraries(&pattern);
        match matches.as_slice() {
            [] => {
                warn!("Couldn't find {} (skipping)", pattern);
                Ok(())
            }
            [index] => {
                let platform = model.platform().clone();
                model.libraries[*index].apply_overrides(lib, &platform);
                Ok(())
            }
            many => Err(self.fail(VersionBuildError::AmbiguousLibraryMatch {
                pattern,
                count: many.len(),
            })),
        }
    }

    fn insert_library(&self, model: &mut VersionModel, lib: &RawLibrary) -> LauncherResult<()> {
        let platform = model.platform().clone();
        let pattern = lib.artifact.any_version_pattern();

        let Some(index) = model.find_library(&pattern) else {
            let new_lib = Library::new(lib.clone(), &platform);
            if lib.insert_type == InsertType::Prepend {
                model.libraries.insert(0, new_lib);
            } else {
                model.libraries.push(new_lib);
            }
            return Ok(());
        };

        let existing = &model.libraries[index];
        let existing_name = existing.raw_name();
        let existing_depend = existing.depend_type();
        let existing_min = existing.min_version.clone();
        let ordering = compare_versions(lib.version(), existing.version());
        let conflict = || {
            self.fail(VersionBuildError::DependencyConflict {
                existing: existing_name.clone(),
                incoming: lib.raw_name(),
            })
        };

        match existing_depend {
            // A hard dependency can be used or rejected, never changed.
            DependType::Hard => {
                if ordering.is_gt()
                    || (lib.depend_type == DependType::Hard && ordering.is_ne())
                {
                    return Err(conflict());
                }
            }
            DependType::Soft => {
                if ordering.is_gt() {
                    let raised = match existing_min {
                        Some(min) if compare_versions(&min, lib.version()).is_ge() => min,
                        _ => lib.version().to_string(),
                    };
                    debug!("{} raises {} to {}", self.filename, existing_name, lib.version());
                    let mut replacement = Library::new(lib.clone(), &platform);
                    replacement.min_version = Some(raised);
                    model.libraries[index] = replacement;
                } else if ordering.is_lt() && lib.depend_type == DependType::Hard {
                    return Err(conflict());
                }
            }
        }
        Ok(())
    }

    fn replace_library(&self, model: &mut VersionModel, lib: &RawLibrary) {
        let pattern = lib
            .insert_target
            .clone()
            .unwrap_or_else(|| lib.artifact.any_version_pattern());
        match model.find_library(&pattern) {
            Some(index) => {
                let platform = model.platform().clone();
                model.libraries[index] = Library::new(lib.clone(), &platform);
            }
            None => warn!("Couldn't find {} (skipping)", pattern),
        }
    }
}

/// `-libraries` names match the library in any version.
fn removal_pattern(name: &str) -> String {
    match MavenArtifact::parse(name) {
        Ok(artifact) => artifact.any_version_pattern(),
        Err(_) => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::rules::{OperatingSystem, Platform};
    use serde_json::json;

    fn model() -> VersionModel {
        VersionModel::new(Platform::new(OperatingSystem::Linux, "6.1"))
    }

    fn patch(doc: serde_json::Value) -> VersionFile {
        VersionFile::from_json(&doc, "patch.json", false).unwrap()
    }

    fn names(model: &VersionModel) -> Vec<String> {
        model.libraries.iter().map(|l| l.raw_name()).collect()
    }

    fn base() -> VersionFile {
        patch(json!({
            "id": "1.7.10",
            "mainClass": "net.minecraft.client.main.Main",
            "minecraftArguments": "--username ${auth_player_name}",
            "libraries": [
                {"name": "net.sf.jopt-simple:jopt-simple:4.5"},
                {"name": "com.google.guava:guava:15.0"}
            ]
        }))
    }

    #[test]
    fn too_new_launcher_version_is_fatal() {
        let file = patch(json!({"minimumLauncherVersion": SUPPORTED_LAUNCHER_VERSION + 1}));
        let err = file.apply_to(&mut model()).unwrap_err();
        assert!(matches!(
            err,
            LauncherError::VersionBuild {
                source: VersionBuildError::LauncherVersionTooNew { .. },
                ..
            }
        ));
    }

    #[test]
    fn mc_version_glob_must_match() {
        let mut m = model();
        base().apply_to(&mut m).unwrap();

        let ok = patch(json!({"mcVersion": "1.7.*"}));
        ok.apply_to(&mut m).unwrap();

        let wrong = patch(json!({"mcVersion": "1.8"}));
        let err = wrong.apply_to(&mut m).unwrap_err();
        assert!(matches!(
            err,
            LauncherError::VersionBuild {
                source: VersionBuildError::McVersionMismatch { .. },
                ..
            }
        ));
    }

    #[test]
    fn argument_edits_apply_in_order() {
        let mut m = model();
        base().apply_to(&mut m).unwrap();
        patch(json!({
            "+minecraftArguments": " --tweakClass cpw.mods.fml.common.launcher.FMLTweaker",
            "-minecraftArguments": "--username ${auth_player_name} "
        }))
        .apply_to(&mut m)
        .unwrap();
        assert_eq!(
            m.minecraft_arguments,
            "--tweakClass cpw.mods.fml.common.launcher.FMLTweaker"
        );
    }

    #[test]
    fn tweakers_add_and_remove_without_overwrite() {
        let mut m = model();
        patch(json!({"tweakers": ["a", "b"]})).apply_to(&mut m).unwrap();
        patch(json!({"+tweakers": ["c"], "-tweakers": ["a"]}))
            .apply_to(&mut m)
            .unwrap();
        assert_eq!(m.tweakers, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn prepend_without_match_goes_first() {
        let mut m = model();
        base().apply_to(&mut m).unwrap();
        patch(json!({
            "+libraries": [{"name": "net.minecraft:launchwrapper:1.12", "insert": "prepend"}]
        }))
        .apply_to(&mut m)
        .unwrap();
        assert_eq!(names(&m)[0], "net.minecraft:launchwrapper:1.12");
        assert_eq!(m.libraries.len(), 3);
    }

    #[test]
    fn append_without_match_goes_last() {
        let mut m = model();
        base().apply_to(&mut m).unwrap();
        patch(json!({
            "+libraries": [{"name": "org.ow2.asm:asm-all:5.0.3", "insert": "append"}]
        }))
        .apply_to(&mut m)
        .unwrap();
        assert_eq!(names(&m).last().unwrap(), "org.ow2.asm:asm-all:5.0.3");
    }

    #[test]
    fn soft_dependency_takes_higher_version() {
        let mut m = model();
        base().apply_to(&mut m).unwrap();
        patch(json!({
            "+libraries": [{"name": "com.google.guava:guava:17.0", "insert": "append"}]
        }))
        .apply_to(&mut m)
        .unwrap();
        assert_eq!(names(&m)[1], "com.google.guava:guava:17.0");
        assert_eq!(m.libraries[1].min_version.as_deref(), Some("17.0"));

        // Lower soft requests keep the existing version.
        patch(json!({
            "+libraries": [{"name": "com.google.guava:guava:16.0", "insert": "append"}]
        }))
        .apply_to(&mut m)
        .unwrap();
        assert_eq!(names(&m)[1], "com.google.guava:guava:17.0");
    }

    #[test]
    fn lower_hard_request_against_soft_fails() {
        let mut m = model();
        base().apply_to(&mut m).unwrap();
        let err = patch(json!({
            "+libraries": [{
                "name": "com.google.guava:guava:14.0",
                "insert": "append",
                "MMC-depend": "hard"
            }]
        }))
        .apply_to(&mut m)
        .unwrap_err();
        assert!(matches!(
            err,
            LauncherError::VersionBuild {
                source: VersionBuildError::DependencyConflict { .. },
                ..
            }
        ));
    }

    #[test]
    fn hard_existing_rejects_higher_version() {
        let mut m = model();
        patch(json!({
            "+libraries": [{"name": "org.scala-lang:scala-library:2.10.2", "insert": "append", "MMC-depend": "hard"}]
        }))
        .apply_to(&mut m)
        .unwrap();

        // Same or lower soft request is satisfied by the hard one.
        patch(json!({
            "+libraries": [{"name": "org.scala-lang:scala-library:2.10.0", "insert": "append"}]
        }))
        .apply_to(&mut m)
        .unwrap();
        assert_eq!(names(&m), vec!["org.scala-lang:scala-library:2.10.2"]);

        let higher = patch(json!({
            "+libraries": [{"name": "org.scala-lang:scala-library:2.11.1", "insert": "append"}]
        }));
        assert!(higher.apply_to(&mut m).is_err());
    }

    #[test]
    fn apply_with_many_matches_is_an_error() {
        let mut m = model();
        patch(json!({
            "libraries": [
                {"name": "org.lwjgl.lwjgl:lwjgl:2.9.1"},
                {"name": "org.lwjgl.lwjgl:lwjgl:2.9.4"}
            ]
        }))
        .apply_to(&mut m)
        .unwrap();
        let err = patch(json!({
            "+libraries": [{"name": "org.lwjgl.lwjgl:lwjgl:2.9.1", "insert": "apply", "url": "https://x/"}]
        }))
        .apply_to(&mut m)
        .unwrap_err();
        assert!(matches!(
            err,
            LauncherError::VersionBuild {
                source: VersionBuildError::AmbiguousLibraryMatch { count: 2, .. },
                ..
            }
        ));
    }

    #[test]
    fn apply_without_match_is_a_no_op() {
        let mut m = model();
        base().apply_to(&mut m).unwrap();
        let before = m.clone();
        patch(json!({
            "+libraries": [{"name": "org.lwjgl.lwjgl:lwjgl:2.9.1", "insert": "apply", "url": "https://x/"}]
        }))
        .apply_to(&mut m)
        .unwrap();
        assert_eq!(m, before);
    }

    #[test]
    fn replace_uses_insert_target() {
        let mut m = model();
        base().apply_to(&mut m).unwrap();
        patch(json!({
            "+libraries": [{
                "name": "com.google.guava:guava-jdk5:17.0",
                "insert": {"replace": "com.google.guava:guava:*"}
            }]
        }))
        .apply_to(&mut m)
        .unwrap();
        assert_eq!(names(&m)[1], "com.google.guava:guava-jdk5:17.0");
    }

    #[test]
    fn removing_missing_library_only_warns() {
        let mut m = model();
        base().apply_to(&mut m).unwrap();
        patch(json!({"-libraries": [{"name": "org.nope:nope:1"}, {"name": "com.google.guava:guava:15.0"}]}))
            .apply_to(&mut m)
            .unwrap();
        assert_eq!(names(&m), vec!["net.sf.jopt-simple:jopt-simple:4.5"]);
    }

    #[test]
    fn ftb_pack_prepends_local_libraries_and_ignores_id() {
        let file = VersionFile::from_ftb_pack(
            &json!({
                "id": "bogus",
                "libraries": [{"name": "a:first:1"}, {"name": "a:second:1"}]
            }),
            "pack.json",
        )
        .unwrap();
        assert!(file.id.is_none());
        assert!(file.overwrite_libs.is_none());

        let mut m = model();
        base().apply_to(&mut m).unwrap();
        file.apply_to(&mut m).unwrap();
        assert_eq!(m.id, "1.7.10");
        assert_eq!(&names(&m)[..2], &["a:first:1".to_string(), "a:second:1".to_string()]);
        assert_eq!(m.libraries[0].raw().hint.as_deref(), Some("local"));
    }

    #[test]
    fn add_library_without_insert_is_rejected() {
        let err = VersionFile::from_json(
            &json!({"+libraries": [{"name": "a:b:1"}]}),
            "patch.json",
            false,
        )
        .unwrap_err();
        assert!(matches!(err, LauncherError::Parse { .. }));
    }

    #[test]
    fn invalid_order_is_a_parse_error() {
        let err =
            VersionFile::from_json(&json!({"order": "first"}), "patch.json", true).unwrap_err();
        assert!(matches!(err, LauncherError::Parse { .. }));
    }

    #[test]
    fn wrongly_typed_scalar_is_skipped() {
        let file = patch(json!({"mainClass": 5, "assets": "1.7.10"}));
        assert!(file.main_class.is_none());
        assert_eq!(file.assets.as_deref(), Some("1.7.10"));
    }

    #[test]
    fn traits_and_jar_mods_accumulate() {
        let mut m = model();
        patch(json!({"+traits": ["legacyLaunch"]})).apply_to(&mut m).unwrap();
        patch(json!({
            "+traits": ["noapplet"],
            "+jarMods": [{"name": "optifine.jar", "originalName": "OptiFine_1.7.10.jar"}]
        }))
        .apply_to(&mut m)
        .unwrap();
        assert!(m.traits.contains("legacyLaunch"));
        assert!(m.traits.contains("noapplet"));
        assert_eq!(m.jar_mods[0].original_name.as_deref(), Some("OptiFine_1.7.10.jar"));
    }
}
