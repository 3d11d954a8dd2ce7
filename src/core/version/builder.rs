// ─── Version Builder ───
// Collects the version files of an instance, orders them and applies them
// onto a fresh model.
//
// Sources, first match wins:
//   external files   given by the caller, applied in the order given
//   custom.json      full manual override of everything else
//   version.json     base, then patches/*.json
//   meta base        Minecraft from the meta server, then patches/*.json

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::core::error::{LauncherError, LauncherResult, VersionBuildError};

use super::model::VersionModel;
use super::rules::Platform;
use super::version_file::VersionFile;

pub const VERSION_JSON: &str = "version.json";
pub const CUSTOM_JSON: &str = "custom.json";
pub const ORDER_JSON: &str = "order.json";
pub const PATCHES_DIR: &str = "patches";

/// File ids with this prefix belong to built-in layers.
pub const PROTECTED_PREFIX: &str = "org.multimc.";

pub const MINECRAFT_UID: &str = "net.minecraft";
pub const LWJGL_UID: &str = "org.lwjgl";

#[derive(Debug, Clone, Default)]
pub struct BuildOptions<'a> {
    /// Minecraft version the instance is meant to run.
    pub intended_version: &'a str,
    /// Explicit files replacing the instance's own layers.
    pub external: &'a [PathBuf],
    /// Minecraft layer to use when the instance has no version.json.
    pub minecraft_base: Option<&'a VersionFile>,
}

/// The ordered layers of a build and the model they produced.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub patches: Vec<VersionFile>,
    pub model: VersionModel,
}

/// Build the version of the instance at `instance_root`.
///
/// Everything is applied onto a scratch model, so a failed build leaves
/// the caller's current model alone.
pub fn build(
    instance_root: &Path,
    platform: &Platform,
    options: &BuildOptions<'_>,
) -> LauncherResult<BuildOutput> {
    let patches = if !options.external.is_empty() {
        external_patches(options.external)?
    } else if instance_root.join(CUSTOM_JSON).is_file() {
        vec![custom_json_patch(instance_root)?]
    } else if instance_root.join(VERSION_JSON).is_file() {
        let mut patches = vec![version_json_patch(instance_root, options.intended_version)?];
        patches.extend(instance_patches(instance_root)?);
        patches
    } else {
        info!("Building version from multilayered sources");
        let mut base = options
            .minecraft_base
            .cloned()
            .ok_or_else(|| LauncherError::VersionIncomplete(MINECRAFT_UID.to_string()))?;
        base.file_id = MINECRAFT_UID.to_string();
        base.order = Some(-2);
        if base.name.is_empty() {
            base.name = "Minecraft".to_string();
        }
        let mut patches = vec![base];
        patches.extend(instance_patches(instance_root)?);
        patches
    };

    let model = apply_all(&patches, platform)?;
    Ok(BuildOutput { patches, model })
}

/// Apply `patches` in order onto a new model and finalize it.
pub fn apply_all(patches: &[VersionFile], platform: &Platform) -> LauncherResult<VersionModel> {
    let mut model = VersionModel::new(platform.clone());
    for patch in patches {
        debug!("Applying {}", patch.filename);
        if let Err(e) = patch.apply_to(&mut model) {
            error!("Version build failed: {}", e);
            return Err(e);
        }
    }
    model.finalize();
    Ok(model)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn external_patches(files: &[PathBuf]) -> LauncherResult<Vec<VersionFile>> {
    info!("Building version from external files");
    let mut patches = Vec::with_capacity(files.len());
    for (order, path) in (0_i64..).zip(files) {
        info!("Reading {:?}", path);
        let mut file = VersionFile::from_file(path, false)?;
        let name = file_name(path);
        file.file_id = format!("{}external.{}", PROTECTED_PREFIX, name);
        file.name = name;
        file.order = Some(order);
        file.version = String::new();
        file.mc_version = None;
        patches.push(file);
    }
    Ok(patches)
}

fn custom_json_patch(instance_root: &Path) -> LauncherResult<VersionFile> {
    info!("Building version from custom.json within the instance");
    let mut file = VersionFile::from_file(&instance_root.join(CUSTOM_JSON), false)?;
    file.name = CUSTOM_JSON.to_string();
    file.file_id = format!("{}custom.json", PROTECTED_PREFIX);
    file.order = Some(-1);
    file.version = String::new();
    Ok(file)
}

fn version_json_patch(instance_root: &Path, intended_version: &str) -> LauncherResult<VersionFile> {
    info!("Reading version.json");
    let mut file = VersionFile::from_file(&instance_root.join(VERSION_JSON), false)?;
    file.name = "Minecraft".to_string();
    file.file_id = format!("{}version.json", PROTECTED_PREFIX);
    file.order = Some(-1);
    file.version = intended_version.to_string();
    file.mc_version = Some(intended_version.to_string());
    Ok(file)
}

/// Read `patches/*.json` sorted by effective order.
fn instance_patches(instance_root: &Path) -> LauncherResult<Vec<VersionFile>> {
    let dir = instance_root.join(PATCHES_DIR);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)
        .map_err(|e| LauncherError::io(&dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let overrides = read_order_overrides(instance_root);
    let mut ordered: BTreeMap<i64, VersionFile> = BTreeMap::new();
    for path in paths {
        info!("Reading {}", file_name(&path));
        let mut file = VersionFile::from_file(&path, true)?;
        if file.file_id.is_empty() {
            file.file_id = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        if file.file_id == MINECRAFT_UID || file.file_id == LWJGL_UID {
            debug!("Skipping built-in patch {}", file.file_id);
            continue;
        }

        let order = overrides
            .get(&file.file_id)
            .copied()
            .or(file.order)
            .unwrap_or(0);
        if let Some(other) = ordered.get(&order) {
            return Err(LauncherError::VersionBuild {
                file: file.filename.clone(),
                source: VersionBuildError::OrderCollision {
                    first: file.file_id.clone(),
                    second: other.file_id.clone(),
                    order,
                },
            });
        }
        file.order = Some(order);
        ordered.insert(order, file);
    }
    Ok(ordered.into_values().collect())
}

/// Read `order.json`. Problems are logged and yield no overrides.
pub fn read_order_overrides(instance_root: &Path) -> BTreeMap<String, i64> {
    let path = instance_root.join(ORDER_JSON);
    let raw = match std::fs::read(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!("Couldn't open {:?}: {}. Ignoring overridden order", path, e);
            return BTreeMap::new();
        }
    };
    let doc: serde_json::Value = match serde_json::from_slice(&raw) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Couldn't parse {:?}: {}. Ignoring overridden order", path, e);
            return BTreeMap::new();
        }
    };
    let Some(object) = doc.as_object() else {
        warn!("{:?} is not an object. Ignoring overridden order", path);
        return BTreeMap::new();
    };

    let mut out = BTreeMap::new();
    for (id, value) in object {
        if id.starts_with(PROTECTED_PREFIX) {
            continue;
        }
        match value.as_i64() {
            Some(order) => {
                out.insert(id.clone(), order);
            }
            None => {
                warn!("{:?} has a bad order for {}. Ignoring overridden order", path, id);
                return BTreeMap::new();
            }
        }
    }
    out
}

/// Write `order.json`, leaving out built-in layers.
pub fn write_order_overrides(
    instance_root: &Path,
    orders: &BTreeMap<String, i64>,
) -> LauncherResult<()> {
    let filtered: BTreeMap<&str, i64> = orders
        .iter()
        .filter(|(id, _)| !id.starts_with(PROTECTED_PREFIX))
        .map(|(id, order)| (id.as_str(), *order))
        .collect();
    let path = instance_root.join(ORDER_JSON);
    let json = serde_json::to_vec_pretty(&filtered)?;
    std::fs::write(&path, json).map_err(|e| LauncherError::io(&path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::rules::OperatingSystem;
    use serde_json::json;
    use tempfile::TempDir;

    fn platform() -> Platform {
        Platform::new(OperatingSystem::Linux, "6.1")
    }

    fn write_json(path: &Path, doc: serde_json::Value) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();
    }

    fn instance_with_patches() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_json(
            &dir.path().join(VERSION_JSON),
            json!({
                "id": "1.7.10",
                "mainClass": "net.minecraft.client.main.Main",
                "minecraftArguments": "base",
                "libraries": [{ "name": "com.google.guava:guava:15.0" }]
            }),
        );
        for (id, order) in [("A", 1), ("B", 2), ("C", 3)] {
            write_json(
                &dir.path().join(PATCHES_DIR).join(format!("{}.json", id)),
                json!({
                    "fileId": id,
                    "name": id,
                    "order": order,
                    "+minecraftArguments": format!(" {}", id)
                }),
            );
        }
        dir
    }

    fn options(version: &str) -> BuildOptions<'_> {
        BuildOptions {
            intended_version: version,
            ..Default::default()
        }
    }

    fn ids(output: &BuildOutput) -> Vec<&str> {
        output.patches.iter().map(|p| p.file_id.as_str()).collect()
    }

    #[test]
    fn order_file_overrides_declared_order() {
        let dir = instance_with_patches();
        let first = build(dir.path(), &platform(), &options("1.7.10")).unwrap();
        assert_eq!(first.model.minecraft_arguments, "base A B C");
        assert_eq!(ids(&first), vec!["org.multimc.version.json", "A", "B", "C"]);

        let overrides = BTreeMap::from([
            ("A".to_string(), 3),
            ("B".to_string(), 1),
            ("C".to_string(), 2),
        ]);
        write_order_overrides(dir.path(), &overrides).unwrap();

        let second = build(dir.path(), &platform(), &options("1.7.10")).unwrap();
        assert_eq!(second.model.minecraft_arguments, "base B C A");
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let dir = instance_with_patches();
        let a = build(dir.path(), &platform(), &options("1.7.10")).unwrap();
        let b = build(dir.path(), &platform(), &options("1.7.10")).unwrap();
        assert_eq!(a.model, b.model);
        assert_eq!(a.model.assets, "legacy");
    }

    #[test]
    fn order_collision_is_fatal() {
        let dir = instance_with_patches();
        write_json(
            &dir.path().join(PATCHES_DIR).join("D.json"),
            json!({ "fileId": "D", "order": 2 }),
        );
        let err = build(dir.path(), &platform(), &options("1.7.10")).unwrap_err();
        assert!(matches!(
            err,
            LauncherError::VersionBuild {
                source: VersionBuildError::OrderCollision { order: 2, .. },
                ..
            }
        ));
    }

    #[test]
    fn custom_json_bypasses_the_stack() {
        let dir = instance_with_patches();
        write_json(
            &dir.path().join(CUSTOM_JSON),
            json!({ "id": "custom", "minecraftArguments": "custom" }),
        );
        let output = build(dir.path(), &platform(), &options("1.7.10")).unwrap();
        assert_eq!(ids(&output), vec!["org.multimc.custom.json"]);
        assert_eq!(output.model.minecraft_arguments, "custom");
    }

    #[test]
    fn external_files_win() {
        let dir = instance_with_patches();
        let external = dir.path().join("elsewhere").join("pack.json");
        write_json(
            &external,
            json!({
                "id": "ignored",
                "libraries": [{ "name": "net.ftb:pack:1.0" }]
            }),
        );
        let files = vec![external];
        let output = build(
            dir.path(),
            &platform(),
            &BuildOptions {
                intended_version: "1.7.10",
                external: &files,
                minecraft_base: None,
            },
        )
        .unwrap();
        assert_eq!(ids(&output), vec!["org.multimc.external.pack.json"]);
        assert_eq!(output.model.id, "");
        assert_eq!(output.model.libraries[0].raw().hint.as_deref(), Some("local"));
    }

    #[test]
    fn missing_base_is_incomplete() {
        let dir = TempDir::new().unwrap();
        let err = build(dir.path(), &platform(), &options("1.7.10")).unwrap_err();
        assert!(matches!(err, LauncherError::VersionIncomplete(uid) if uid == MINECRAFT_UID));
    }

    #[test]
    fn meta_base_is_used_without_version_json() {
        let dir = TempDir::new().unwrap();
        write_json(
            &dir.path().join(PATCHES_DIR).join("net.minecraft.json"),
            json!({ "fileId": "net.minecraft", "order": 0, "id": "shadowed" }),
        );
        write_json(
            &dir.path().join(PATCHES_DIR).join("forge.json"),
            json!({ "order": 5, "+tweakers": ["cpw.mods.fml.common.launcher.FMLTweaker"] }),
        );
        let base = VersionFile::from_json(
            &json!({ "id": "1.7.10", "mainClass": "net.minecraft.client.main.Main" }),
            "net.minecraft/1.7.10.json",
            false,
        )
        .unwrap();

        let output = build(
            dir.path(),
            &platform(),
            &BuildOptions {
                intended_version: "1.7.10",
                external: &[],
                minecraft_base: Some(&base),
            },
        )
        .unwrap();
        assert_eq!(ids(&output), vec!["net.minecraft", "forge"]);
        assert_eq!(output.model.id, "1.7.10");
        assert_eq!(output.model.tweakers.len(), 1);
    }

    #[test]
    fn protected_ids_never_reach_the_order_file() {
        let dir = TempDir::new().unwrap();
        let orders = BTreeMap::from([
            ("org.multimc.version.json".to_string(), -1),
            ("A".to_string(), 4),
        ]);
        write_order_overrides(dir.path(), &orders).unwrap();
        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join(ORDER_JSON)).unwrap()).unwrap();
        assert_eq!(raw, json!({ "A": 4 }));

        std::fs::write(
            dir.path().join(ORDER_JSON),
            br#"{ "org.multimc.custom.json": 1, "B": 2 }"#,
        )
        .unwrap();
        assert_eq!(
            read_order_overrides(dir.path()),
            BTreeMap::from([("B".to_string(), 2)])
        );
    }

    #[test]
    fn broken_order_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(ORDER_JSON), b"[1, 2").unwrap();
        assert!(read_order_overrides(dir.path()).is_empty());
    }
}
