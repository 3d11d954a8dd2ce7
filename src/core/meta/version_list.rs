// ─── Meta Version List ───
// All known versions of one package, newest first.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::error::LauncherResult;
use crate::core::events::{ChangeEvent, ChangeListener, ChangeNotifier, ChangeRole};
use crate::core::state::AppContext;

use super::entity::{self, LoadMode, LoadState, Mergeable, MetaEntity};
use super::format;
use super::version::Version;

#[derive(Debug, Clone)]
pub struct VersionList {
    uid: String,
    name: String,
    pub(super) sha256: Option<String>,
    versions: Vec<Version>,
    lookup: HashMap<String, usize>,
    /// Version string of the newest entry.
    latest: Option<String>,
    /// Version string of the newest release.
    recommended: Option<String>,
    state: LoadState,
    notifier: ChangeNotifier,
}

impl VersionList {
    pub fn new(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            name: String::new(),
            sha256: None,
            versions: Vec::new(),
            lookup: HashMap::new(),
            latest: None,
            recommended: None,
            state: LoadState::default(),
            notifier: ChangeNotifier::default(),
        }
    }

    pub fn subscribe(&mut self, listener: Arc<dyn ChangeListener>) {
        self.notifier.subscribe(listener);
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn human_readable(&self) -> &str {
        if self.name.is_empty() {
            &self.uid
        } else {
            &self.name
        }
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.notifier.emit(ChangeEvent::NameChanged(self.name.clone()));
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn at(&self, row: usize) -> Option<&Version> {
        self.versions.get(row)
    }

    pub fn version(&self, version: &str) -> Option<&Version> {
        self.lookup.get(version).map(|&row| &self.versions[row])
    }

    pub fn has_version(&self, version: &str) -> bool {
        self.lookup.contains_key(version)
    }

    pub fn latest(&self) -> Option<&Version> {
        self.latest.as_deref().and_then(|v| self.version(v))
    }

    pub fn recommended(&self) -> Option<&Version> {
        self.recommended.as_deref().and_then(|v| self.version(v))
    }

    /// Replace every version, sorted newest first.
    pub fn set_versions(&mut self, mut versions: Vec<Version>) {
        versions.sort_by(|a, b| b.raw_time().cmp(&a.raw_time()));
        self.versions = versions;
        self.rebuild_lookup();
        self.recompute_pointers();
        self.notifier.emit(ChangeEvent::Reset);
    }

    fn rebuild_lookup(&mut self) {
        self.lookup = self
            .versions
            .iter()
            .enumerate()
            .map(|(row, v)| (v.version().to_string(), row))
            .collect();
    }

    fn recompute_pointers(&mut self) {
        // Sorted newest first, so the first match is the time maximum.
        self.latest = self.versions.first().map(|v| v.version().to_string());
        self.recommended = self
            .versions
            .iter()
            .find(|v| v.is_release())
            .map(|v| v.version().to_string());
    }

    /// Recompute both pointers after a row changed in place and report every
    /// row whose pointer status moved.
    fn refresh_pointers(&mut self) {
        let old_latest = self.latest.take();
        let old_recommended = self.recommended.take();
        self.recompute_pointers();

        let latest = self.latest.clone();
        let recommended = self.recommended.clone();
        self.emit_pointer_move(old_latest, latest, ChangeRole::Latest);
        self.emit_pointer_move(old_recommended, recommended, ChangeRole::Recommended);
    }

    fn emit_pointer_move(&self, old: Option<String>, new: Option<String>, role: ChangeRole) {
        if old == new {
            return;
        }
        for version in old.iter().chain(new.iter()) {
            if let Some(&row) = self.lookup.get(version) {
                self.notifier.emit(ChangeEvent::DataChanged {
                    row,
                    roles: vec![role],
                });
            }
        }
    }

    /// Insert a version not yet in the list at its sorted position.
    fn insert_version(&mut self, version: Version) {
        let row = self
            .versions
            .partition_point(|v| v.raw_time() >= version.raw_time());
        let newer_than_latest = self
            .latest()
            .map_or(true, |latest| version.raw_time() > latest.raw_time());
        let newer_release = version.is_release()
            && self
                .recommended()
                .map_or(true, |rec| version.raw_time() > rec.raw_time());

        debug!("{}: new version {} at row {}", self.uid, version.version(), row);
        let name = version.version().to_string();
        self.versions.insert(row, version);
        self.rebuild_lookup();
        self.notifier.emit(ChangeEvent::Inserted {
            first: row,
            last: row,
        });

        if newer_than_latest {
            self.latest = Some(name.clone());
            self.notifier.emit(ChangeEvent::DataChanged {
                row,
                roles: vec![ChangeRole::Latest],
            });
        }
        if newer_release {
            self.recommended = Some(name);
            self.notifier.emit(ChangeEvent::DataChanged {
                row,
                roles: vec![ChangeRole::Recommended],
            });
        }
    }

    /// Fetch one version's full document and fold it into its row.
    pub async fn load_version(
        &mut self,
        ctx: &AppContext,
        version: &str,
        mode: LoadMode,
    ) -> LauncherResult<()> {
        let row = self.lookup.get(version).copied();
        let mut entry = match row {
            Some(row) => self.versions[row].clone(),
            None => Version::new(&self.uid, version),
        };
        let before = entry.clone();

        entity::load(&mut entry, ctx, mode).await?;

        match row {
            Some(row) => {
                let roles = before.changed_roles(&entry, true);
                let time_changed = roles.contains(&ChangeRole::Time);
                self.versions[row] = entry;
                if time_changed {
                    self.resort();
                } else if !roles.is_empty() {
                    let type_changed = roles.contains(&ChangeRole::Type);
                    self.notifier.emit(ChangeEvent::DataChanged { row, roles });
                    if type_changed {
                        self.refresh_pointers();
                    }
                }
            }
            None if entry.load_state().is_loaded() => self.insert_version(entry),
            None => {}
        }
        Ok(())
    }

    fn resort(&mut self) {
        self.versions
            .sort_by(|a, b| b.raw_time().cmp(&a.raw_time()));
        self.rebuild_lookup();
        self.recompute_pointers();
        self.notifier.emit(ChangeEvent::Reset);
    }
}

impl Mergeable for VersionList {
    fn merge(&mut self, other: VersionList) {
        if self.name != other.name {
            self.set_name(&other.name);
        }
        if other.sha256.is_some() {
            self.sha256 = other.sha256;
        }

        if other.versions.is_empty() {
            return;
        }
        if self.versions.is_empty() {
            self.set_versions(other.versions);
            return;
        }

        let mut resort_needed = false;
        let mut type_changed = false;
        for incoming in other.versions {
            match self.lookup.get(incoming.version()).copied() {
                Some(row) => {
                    let roles = self.versions[row].merge_from_list(&incoming);
                    if roles.contains(&ChangeRole::Time) {
                        resort_needed = true;
                    } else if !roles.is_empty() {
                        type_changed |= roles.contains(&ChangeRole::Type);
                        self.notifier.emit(ChangeEvent::DataChanged { row, roles });
                    }
                }
                None => self.insert_version(incoming),
            }
        }
        if resort_needed {
            warn!("{}: release times changed, resorting", self.uid);
            self.resort();
        } else if type_changed {
            self.refresh_pointers();
        }
    }
}

impl MetaEntity for VersionList {
    fn local_filename(&self) -> String {
        format!("{}/index.json", self.uid)
    }

    fn load_state(&self) -> &LoadState {
        &self.state
    }

    fn load_state_mut(&mut self) -> &mut LoadState {
        &mut self.state
    }

    fn expected_sha256(&self) -> Option<&str> {
        self.sha256.as_deref()
    }

    fn parse(doc: &serde_json::Value, filename: &str) -> LauncherResult<Self> {
        format::parse_version_list(doc, filename)
    }
}
