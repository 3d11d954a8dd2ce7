// ─── Minecraft Profile ───
// The patch stack of one instance as a list: reorder, remove and revert
// layers, rebuilding the version after every change.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{ChangeEvent, ChangeListener, ChangeNotifier};

use super::builder::{self, BuildOptions, CUSTOM_JSON, MINECRAFT_UID, ORDER_JSON, PROTECTED_PREFIX};
use super::model::VersionModel;
use super::rules::Platform;
use super::version_file::VersionFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

pub struct MinecraftProfile {
    instance_root: PathBuf,
    intended_version: String,
    external: Vec<PathBuf>,
    minecraft_base: Option<VersionFile>,
    patches: Vec<VersionFile>,
    model: VersionModel,
    notifier: ChangeNotifier,
}

impl MinecraftProfile {
    pub fn new(instance_root: PathBuf, intended_version: &str, platform: Platform) -> Self {
        Self {
            instance_root,
            intended_version: intended_version.to_string(),
            external: Vec::new(),
            minecraft_base: None,
            patches: Vec::new(),
            model: VersionModel::new(platform),
            notifier: ChangeNotifier::default(),
        }
    }

    pub fn subscribe(&mut self, listener: Arc<dyn ChangeListener>) {
        self.notifier.subscribe(listener);
    }

    pub fn instance_root(&self) -> &Path {
        &self.instance_root
    }

    /// Minecraft layer used when the instance has no `version.json`.
    pub fn set_minecraft_base(&mut self, base: Option<VersionFile>) {
        self.minecraft_base = base;
    }

    /// Files that replace the instance's own layers on the next reload.
    pub fn set_external(&mut self, files: Vec<PathBuf>) {
        self.external = files;
    }

    pub fn model(&self) -> &VersionModel {
        &self.model
    }

    pub fn patches(&self) -> &[VersionFile] {
        &self.patches
    }

    pub fn patch(&self, index: usize) -> Option<&VersionFile> {
        self.patches.get(index)
    }

    pub fn patch_by_id(&self, id: &str) -> Option<&VersionFile> {
        self.patches.iter().find(|p| p.file_id == id)
    }

    /// Rebuild from disk. On failure the previous patches and model stay.
    pub fn reload(&mut self) -> LauncherResult<()> {
        let options = BuildOptions {
            intended_version: &self.intended_version,
            external: &self.external,
            minecraft_base: self.minecraft_base.as_ref(),
        };
        let output = builder::build(&self.instance_root, self.model.platform(), &options)?;
        self.patches = output.patches;
        self.model = output.model;
        self.notifier.emit(ChangeEvent::Reset);
        Ok(())
    }

    /// Built-in layers can be neither moved nor removed.
    pub fn is_protected(&self, index: usize) -> bool {
        self.patches.get(index).map_or(true, |patch| {
            patch.file_id.starts_with(PROTECTED_PREFIX)
                || patch.file_id == MINECRAFT_UID
                || patch.source_path.is_none()
        })
    }

    pub fn can_remove(&self, index: usize) -> bool {
        !self.is_protected(index)
    }

    pub fn can_move(&self, index: usize, direction: MoveDirection) -> bool {
        match neighbour(index, direction) {
            Some(other) => !self.is_protected(index) && !self.is_protected(other),
            None => false,
        }
    }

    /// Swap a patch with its neighbour and persist the new order.
    pub fn move_patch(&mut self, index: usize, direction: MoveDirection) -> LauncherResult<()> {
        if !self.can_move(index, direction) {
            warn!("Patch {} can't move {:?}", index, direction);
            return Ok(());
        }
        let Some(other) = neighbour(index, direction) else {
            return Ok(());
        };

        let mut orders = self.existing_order();
        let a = self.patches[index].file_id.clone();
        let b = self.patches[other].file_id.clone();
        let order_a = orders.get(&a).copied().unwrap_or(index as i64);
        let order_b = orders.get(&b).copied().unwrap_or(other as i64);
        orders.insert(a, order_b);
        orders.insert(b, order_a);

        builder::write_order_overrides(&self.instance_root, &orders)?;
        self.reload()
    }

    /// Effective order of every loaded patch, overrides included.
    fn existing_order(&self) -> BTreeMap<String, i64> {
        let overrides = builder::read_order_overrides(&self.instance_root);
        self.patches
            .iter()
            .filter_map(|patch| {
                let order = overrides.get(&patch.file_id).copied().or(patch.order)?;
                Some((patch.file_id.clone(), order))
            })
            .collect()
    }

    /// Delete a patch file and its jar mods, then rebuild.
    pub fn remove(&mut self, index: usize) -> LauncherResult<()> {
        let patch = self
            .patches
            .get(index)
            .ok_or_else(|| LauncherError::PatchNotFound(index.to_string()))?;
        if self.is_protected(index) {
            return Err(LauncherError::PatchProtected(patch.file_id.clone()));
        }
        self.delete_patch_files(patch)?;
        self.reload()
    }

    pub fn remove_by_id(&mut self, id: &str) -> LauncherResult<()> {
        let index = self
            .patches
            .iter()
            .position(|p| p.file_id == id)
            .ok_or_else(|| LauncherError::PatchNotFound(id.to_string()))?;
        self.remove(index)
    }

    fn delete_patch_files(&self, patch: &VersionFile) -> LauncherResult<()> {
        let jarmods_dir = self.instance_root.join("jarmods");
        for jar_mod in &patch.jar_mods {
            let path = jarmods_dir.join(&jar_mod.name);
            if path.is_file() {
                std::fs::remove_file(&path).map_err(|e| LauncherError::io(&path, e))?;
            }
        }
        if let Some(path) = &patch.source_path {
            info!("Removing patch {}", patch.file_id);
            std::fs::remove_file(path).map_err(|e| LauncherError::io(path, e))?;
        }
        Ok(())
    }

    /// Forget user reordering.
    pub fn reset_order(&mut self) -> LauncherResult<()> {
        let path = self.instance_root.join(ORDER_JSON);
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(LauncherError::io(&path, e)),
        }
        self.reload()
    }

    /// Remove every removable patch.
    pub fn revert_to_vanilla(&mut self) -> LauncherResult<()> {
        for index in 0..self.patches.len() {
            if self.can_remove(index) {
                self.delete_patch_files(&self.patches[index])?;
            }
        }
        self.reload()
    }

    pub fn is_vanilla(&self) -> bool {
        self.patches.len() <= 1 && !self.uses_custom_json()
    }

    pub fn uses_custom_json(&self) -> bool {
        self.instance_root.join(CUSTOM_JSON).is_file()
    }
}

fn neighbour(index: usize, direction: MoveDirection) -> Option<usize> {
    match direction {
        MoveDirection::Up => index.checked_sub(1),
        MoveDirection::Down => index.checked_add(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::testing::RecordingListener;
    use crate::core::version::rules::OperatingSystem;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_json(path: &Path, doc: serde_json::Value) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();
    }

    fn instance() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_json(
            &dir.path().join("version.json"),
            json!({ "id": "1.7.10", "minecraftArguments": "base" }),
        );
        for (id, order) in [("A", 1), ("B", 2), ("C", 3)] {
            write_json(
                &dir.path().join("patches").join(format!("{}.json", id)),
                json!({
                    "fileId": id,
                    "order": order,
                    "+minecraftArguments": format!(" {}", id)
                }),
            );
        }
        dir
    }

    fn profile(dir: &TempDir) -> MinecraftProfile {
        let mut profile = MinecraftProfile::new(
            dir.path().to_path_buf(),
            "1.7.10",
            Platform::new(OperatingSystem::Linux, "6.1"),
        );
        profile.reload().unwrap();
        profile
    }

    #[test]
    fn moving_down_swaps_and_persists() {
        let dir = instance();
        let mut profile = profile(&dir);
        let recorder = Arc::new(RecordingListener::default());
        profile.subscribe(recorder.clone());

        profile.move_patch(1, MoveDirection::Down).unwrap();

        assert_eq!(profile.model().minecraft_arguments, "base B A C");
        assert_eq!(recorder.events(), vec![ChangeEvent::Reset]);
        let orders = builder::read_order_overrides(dir.path());
        assert_eq!(orders.get("A"), Some(&2));
        assert_eq!(orders.get("B"), Some(&1));
    }

    #[test]
    fn built_in_layer_cannot_move_or_be_removed() {
        let dir = instance();
        let mut profile = profile(&dir);
        assert!(!profile.can_move(1, MoveDirection::Up));
        assert!(!profile.can_move(3, MoveDirection::Down));
        assert!(profile.can_move(2, MoveDirection::Up));
        assert!(matches!(
            profile.remove(0),
            Err(LauncherError::PatchProtected(id)) if id == "org.multimc.version.json"
        ));
    }

    #[test]
    fn removing_deletes_file_and_jar_mods() {
        let dir = instance();
        write_json(
            &dir.path().join("patches").join("jarmod.json"),
            json!({
                "fileId": "org.example.jarmod",
                "order": 10,
                "+jarMods": [{ "name": "abc.jar" }]
            }),
        );
        std::fs::create_dir_all(dir.path().join("jarmods")).unwrap();
        std::fs::write(dir.path().join("jarmods").join("abc.jar"), b"jar").unwrap();

        let mut profile = profile(&dir);
        profile.remove_by_id("org.example.jarmod").unwrap();

        assert!(!dir.path().join("patches/jarmod.json").exists());
        assert!(!dir.path().join("jarmods/abc.jar").exists());
        assert!(profile.patch_by_id("org.example.jarmod").is_none());
    }

    #[test]
    fn reset_order_restores_declared_order() {
        let dir = instance();
        let mut profile = profile(&dir);
        profile.move_patch(3, MoveDirection::Up).unwrap();
        assert_eq!(profile.model().minecraft_arguments, "base A C B");

        profile.reset_order().unwrap();
        assert_eq!(profile.model().minecraft_arguments, "base A B C");
        assert!(!dir.path().join(ORDER_JSON).exists());
    }

    #[test]
    fn revert_to_vanilla_keeps_only_the_base() {
        let dir = instance();
        let mut profile = profile(&dir);
        assert!(!profile.is_vanilla());

        profile.revert_to_vanilla().unwrap();
        assert!(profile.is_vanilla());
        assert_eq!(profile.model().minecraft_arguments, "base");
    }

    #[test]
    fn failed_reload_keeps_last_good_model() {
        let dir = instance();
        let mut profile = profile(&dir);
        std::fs::write(dir.path().join("patches").join("broken.json"), b"{").unwrap();

        assert!(profile.reload().is_err());
        assert_eq!(profile.model().minecraft_arguments, "base A B C");
        assert_eq!(profile.patches().len(), 4);
    }

    #[test]
    fn custom_json_is_detected() {
        let dir = instance();
        write_json(&dir.path().join(CUSTOM_JSON), json!({ "id": "custom" }));
        let profile = profile(&dir);
        assert!(profile.uses_custom_json());
        assert!(!profile.is_vanilla());
    }
}
