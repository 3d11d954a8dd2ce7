// ─── Libraries ───
// Raw library declarations from version files and their finalized,
// platform-specific form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{MavenArtifact, MOJANG_LIBRARIES};

use super::rules::{self, OperatingSystem, Platform, Rule};

/// How a `+libraries` entry is merged into the existing library list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertType {
    /// Modify fields of an existing library in place.
    Apply,
    #[default]
    Append,
    Prepend,
    /// Swap an existing library for this one.
    Replace,
}

impl InsertType {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "apply" => Some(InsertType::Apply),
            "append" => Some(InsertType::Append),
            "prepend" => Some(InsertType::Prepend),
            "replace" => Some(InsertType::Replace),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            InsertType::Apply => "apply",
            InsertType::Append => "append",
            InsertType::Prepend => "prepend",
            InsertType::Replace => "replace",
        }
    }
}

/// Strength of a library's version requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependType {
    #[default]
    Soft,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LibraryType {
    Java,
    Native,
}

/// One library declaration exactly as a version file states it.
///
/// `None` in the optional collections means "not declared", which matters
/// for `apply` inserts: only declared fields are copied over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLibrary {
    pub artifact: MavenArtifact,
    pub base_url: Option<String>,
    pub hint: Option<String>,
    pub absolute_url: Option<String>,
    pub extract_excludes: Option<Vec<String>>,
    pub natives: Option<Vec<(OperatingSystem, String)>>,
    pub rules: Option<Vec<Rule>>,
    pub insert_type: InsertType,
    pub insert_target: Option<String>,
    pub depend_type: DependType,
}

impl RawLibrary {
    pub fn new(name: &str) -> LauncherResult<Self> {
        Ok(Self {
            artifact: MavenArtifact::parse(name)?,
            base_url: None,
            hint: None,
            absolute_url: None,
            extract_excludes: None,
            natives: None,
            rules: None,
            insert_type: InsertType::default(),
            insert_target: None,
            depend_type: DependType::default(),
        })
    }

    pub fn raw_name(&self) -> String {
        self.artifact.to_string()
    }

    pub fn version(&self) -> &str {
        &self.artifact.version
    }

    pub fn is_native(&self) -> bool {
        self.natives.is_some()
    }

    /// Parse a library object out of a version file.
    pub fn from_json(value: &serde_json::Value, filename: &str) -> LauncherResult<Self> {
        let json: LibraryJson = serde_json::from_value(value.clone()).map_err(|e| {
            LauncherError::parse(filename, format!("invalid library entry: {}", e))
        })?;
        json.into_raw(filename)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(LibraryJson::from(self)).unwrap_or(serde_json::Value::Null)
    }
}

/// A library after rules and natives have been evaluated for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLibrary {
    pub display_name: String,
    pub display_version: String,
    pub display_type: LibraryType,
    /// `/`-separated path under the libraries directory.
    pub storage_path: String,
    pub download_url: String,
    pub is_active: bool,
    pub is_native: bool,
}

impl ResolvedLibrary {
    pub fn finalize(raw: &RawLibrary, platform: &Platform) -> Self {
        let is_native = raw.is_native();
        let native_suffix = if is_native {
            native_suffix_for(raw, platform.os)
        } else {
            None
        };

        let storage_path = raw.artifact.storage_path(native_suffix.as_deref());

        let download_url = match &raw.absolute_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => {
                let base = raw.base_url.as_deref().unwrap_or(MOJANG_LIBRARIES);
                if base.ends_with('/') {
                    format!("{}{}", base, storage_path)
                } else {
                    format!("{}/{}", base, storage_path)
                }
            }
        };

        let rules_allow = raw
            .rules
            .as_deref()
            .map_or(true, |rules| rules::evaluate(rules, platform));
        let is_active = rules_allow && (!is_native || native_suffix.is_some());

        Self {
            display_name: raw.artifact.artifact_id.clone(),
            display_version: raw.artifact.version.clone(),
            display_type: if is_native {
                LibraryType::Native
            } else {
                LibraryType::Java
            },
            storage_path,
            download_url,
            is_active,
            is_native,
        }
    }
}

fn native_suffix_for(raw: &RawLibrary, os: OperatingSystem) -> Option<String> {
    let natives = raw.natives.as_ref()?;
    let (_, suffix) = natives.iter().find(|(native_os, _)| *native_os == os)?;
    let arch = if cfg!(target_pointer_width = "64") {
        "64"
    } else {
        "32"
    };
    Some(suffix.replace("${arch}", arch))
}

/// A library inside a version model: its declaration plus the finalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    raw: RawLibrary,
    resolved: ResolvedLibrary,
    /// Lowest version a soft dependency was raised to by a later patch.
    pub min_version: Option<String>,
}

impl Library {
    pub fn new(raw: RawLibrary, platform: &Platform) -> Self {
        let resolved = ResolvedLibrary::finalize(&raw, platform);
        Self {
            raw,
            resolved,
            min_version: None,
        }
    }

    pub fn raw(&self) -> &RawLibrary {
        &self.raw
    }

    pub fn resolved(&self) -> &ResolvedLibrary {
        &self.resolved
    }

    pub fn raw_name(&self) -> String {
        self.raw.raw_name()
    }

    pub fn version(&self) -> &str {
        self.raw.version()
    }

    pub fn depend_type(&self) -> DependType {
        self.raw.depend_type
    }

    /// Copy the fields an `apply` insert declared, then re-finalize.
    pub fn apply_overrides(&mut self, from: &RawLibrary, platform: &Platform) {
        if from.base_url.is_some() {
            self.raw.base_url = from.base_url.clone();
        }
        if from.hint.is_some() {
            self.raw.hint = from.hint.clone();
        }
        if from.absolute_url.is_some() {
            self.raw.absolute_url = from.absolute_url.clone();
        }
        if from.extract_excludes.is_some() {
            self.raw.extract_excludes = from.extract_excludes.clone();
        }
        if from.natives.is_some() {
            self.raw.natives = from.natives.clone();
        }
        if from.rules.is_some() {
            self.raw.rules = from.rules.clone();
        }
        self.finalize(platform);
    }

    pub fn finalize(&mut self, platform: &Platform) {
        self.resolved = ResolvedLibrary::finalize(&self.raw, platform);
    }
}

// ─── JSON shape ───

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LibraryJson {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(rename = "MMC-hint", default, skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(
        rename = "MMC-absoluteUrl",
        alias = "MMC-absulute_url",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    absolute_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extract: Option<ExtractJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    natives: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rules: Option<Vec<Rule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    insert: Option<InsertJson>,
    #[serde(rename = "MMC-depend", default, skip_serializing_if = "Option::is_none")]
    depend: Option<DependType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExtractJson {
    exclude: Vec<String>,
}

/// `"insert": "replace"` or `"insert": {"replace": "group:artifact:*"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum InsertJson {
    Kind(String),
    Targeted(BTreeMap<String, String>),
}

impl LibraryJson {
    fn into_raw(self, filename: &str) -> LauncherResult<RawLibrary> {
        let mut raw = RawLibrary::new(&self.name).map_err(|_| {
            LauncherError::parse(
                filename,
                format!("library name {:?} is not group:artifact:version", self.name),
            )
        })?;
        raw.base_url = self.url;
        raw.hint = self.hint;
        raw.absolute_url = self.absolute_url;
        raw.extract_excludes = self.extract.map(|e| e.exclude);
        raw.natives = self.natives.map(|natives| {
            natives
                .into_iter()
                .map(|(os, suffix)| (OperatingSystem::from_mojang_name(&os), suffix))
                .filter(|(os, _)| *os != OperatingSystem::Other)
                .collect()
        });
        raw.rules = self.rules;
        raw.depend_type = self.depend.unwrap_or_default();

        if let Some(insert) = self.insert {
            let (kind, target) = match insert {
                InsertJson::Kind(kind) => (kind, None),
                InsertJson::Targeted(map) => {
                    let (kind, target) = map.into_iter().next().ok_or_else(|| {
                        LauncherError::parse(filename, "a library has an empty insert object")
                    })?;
                    (kind, Some(target))
                }
            };
            raw.insert_type = InsertType::parse(&kind).ok_or_else(|| {
                LauncherError::parse(
                    filename,
                    format!("library {} has invalid insert type {:?}", self.name, kind),
                )
            })?;
            raw.insert_target = target;
        }

        Ok(raw)
    }
}

/// `+libraries` entries must say how they are inserted.
pub(crate) fn declares_insert(value: &serde_json::Value) -> bool {
    value.get("insert").is_some()
}

impl From<&RawLibrary> for LibraryJson {
    fn from(raw: &RawLibrary) -> Self {
        let insert = match (&raw.insert_target, raw.insert_type) {
            (Some(target), kind) => {
                let mut map = BTreeMap::new();
                map.insert(kind.as_str().to_string(), target.clone());
                Some(InsertJson::Targeted(map))
            }
            (None, InsertType::Append) => None,
            (None, kind) => Some(InsertJson::Kind(kind.as_str().to_string())),
        };
        LibraryJson {
            name: raw.raw_name(),
            url: raw.base_url.clone(),
            hint: raw.hint.clone(),
            absolute_url: raw.absolute_url.clone(),
            extract: raw.extract_excludes.clone().map(|exclude| ExtractJson { exclude }),
            natives: raw.natives.as_ref().map(|natives| {
                natives
                    .iter()
                    .map(|(os, suffix)| (os.mojang_name().to_string(), suffix.clone()))
                    .collect()
            }),
            rules: raw.rules.clone(),
            insert,
            depend: match raw.depend_type {
                DependType::Hard => Some(DependType::Hard),
                DependType::Soft => None,
            },
        }
    }
}
