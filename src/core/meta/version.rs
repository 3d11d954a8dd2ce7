// ─── Meta Version ───
// One version of one package, with its embedded version file once the full
// document has been loaded.

use serde::Serialize;

use crate::core::error::LauncherResult;
use crate::core::events::ChangeRole;
use crate::core::version::VersionFile;

use super::entity::{LoadState, Mergeable, MetaEntity};
use super::format;

/// A dependency on another package.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Require {
    pub uid: String,
    /// Exact version required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equals: Option<String>,
    /// Version suggested when nothing else decides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggests: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Version {
    uid: String,
    version: String,
    pub(super) release_type: String,
    pub(super) time: i64,
    pub(super) parent_uid: Option<String>,
    pub(super) requires: Vec<Require>,
    pub(super) conflicts: Vec<Require>,
    pub(super) recommended: bool,
    pub(super) volatile: bool,
    pub(super) provides_recommendations: bool,
    pub(super) sha256: Option<String>,
    pub(super) data: Option<VersionFile>,
    state: LoadState,
}

impl Version {
    pub fn new(uid: &str, version: &str) -> Self {
        Self {
            uid: uid.to_string(),
            version: version.to_string(),
            release_type: String::new(),
            time: 0,
            parent_uid: None,
            requires: Vec::new(),
            conflicts: Vec::new(),
            recommended: false,
            volatile: false,
            provides_recommendations: false,
            sha256: None,
            data: None,
            state: LoadState::default(),
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn release_type(&self) -> &str {
        &self.release_type
    }

    /// Release time in Unix epoch seconds.
    pub fn raw_time(&self) -> i64 {
        self.time
    }

    pub fn parent_uid(&self) -> Option<&str> {
        self.parent_uid.as_deref()
    }

    pub fn requires(&self) -> &[Require] {
        &self.requires
    }

    pub fn conflicts(&self) -> &[Require] {
        &self.conflicts
    }

    /// Version of `net.minecraft` this one is pinned to, if any.
    pub fn minecraft_version(&self) -> Option<&str> {
        self.requires
            .iter()
            .find(|r| r.uid == "net.minecraft")
            .and_then(|r| r.equals.as_deref())
    }

    pub fn is_recommended(&self) -> bool {
        self.recommended
    }

    pub fn is_volatile(&self) -> bool {
        self.volatile
    }

    pub fn is_release(&self) -> bool {
        self.release_type == "release"
    }

    pub fn data(&self) -> Option<&VersionFile> {
        self.data.as_ref()
    }

    pub(super) fn set_requires(&mut self, mut requires: Vec<Require>, mut conflicts: Vec<Require>) {
        requires.sort();
        requires.dedup();
        conflicts.sort();
        conflicts.dedup();
        self.requires = requires;
        self.conflicts = conflicts;
    }

    /// Roles whose values differ in `other`, as seen by a version list row.
    pub(super) fn changed_roles(&self, other: &Version, with_data: bool) -> Vec<ChangeRole> {
        let mut roles = Vec::new();
        if other.provides_recommendations && self.recommended != other.recommended {
            roles.push(ChangeRole::Recommended);
        }
        if self.release_type != other.release_type {
            roles.push(ChangeRole::Type);
        }
        if self.time != other.time {
            roles.push(ChangeRole::Time);
        }
        if self.requires != other.requires || self.conflicts != other.conflicts {
            roles.push(ChangeRole::Requires);
        }
        if with_data && self.data != other.data {
            roles.push(ChangeRole::Data);
        }
        roles
    }

    /// Take the list-level fields of `other`. Returns the roles that changed.
    pub(super) fn merge_from_list(&mut self, other: &Version) -> Vec<ChangeRole> {
        let roles = self.changed_roles(other, false);
        if other.provides_recommendations {
            self.recommended = other.recommended;
        }
        self.release_type.clone_from(&other.release_type);
        self.time = other.time;
        self.requires.clone_from(&other.requires);
        self.conflicts.clone_from(&other.conflicts);
        self.volatile = other.volatile;
        if other.parent_uid.is_some() {
            self.parent_uid.clone_from(&other.parent_uid);
        }
        if other.sha256.is_some() {
            self.sha256.clone_from(&other.sha256);
        }
        roles
    }
}

impl Mergeable for Version {
    fn merge(&mut self, other: Version) {
        self.merge_from_list(&other);
        self.data = other.data;
    }
}

impl MetaEntity for Version {
    fn local_filename(&self) -> String {
        format!("{}/{}.json", self.uid, self.version)
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
        format::parse_version(doc, filename)
    }
}
