// ─── Version Model ───
// The merged, finalized description of a version that patches apply onto.

use std::collections::BTreeSet;

use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;

use super::library::{Library, ResolvedLibrary};
use super::rules::Platform;
use super::version_file::JarMod;
use super::wildcard::Wildcard;

#[derive(Debug, Clone, PartialEq)]
pub struct VersionModel {
    pub id: String,
    pub main_class: String,
    pub applet_class: String,
    pub process_arguments: String,
    pub minecraft_arguments: String,
    pub release_type: String,
    pub release_time: String,
    pub time: String,
    pub assets: String,
    pub minimum_launcher_version: Option<i64>,
    pub tweakers: Vec<String>,
    pub libraries: Vec<Library>,
    pub traits: BTreeSet<String>,
    pub jar_mods: Vec<JarMod>,
    platform: Platform,
}

/// Launch-ready summary handed to the process layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchProfile {
    pub id: String,
    pub main_class: String,
    pub applet_class: String,
    pub minecraft_arguments: String,
    pub assets: String,
    pub tweakers: Vec<String>,
    pub traits: Vec<String>,
    pub libraries: Vec<ResolvedLibrary>,
    pub natives: Vec<ResolvedLibrary>,
}

impl VersionModel {
    pub fn new(platform: Platform) -> Self {
        Self {
            id: String::new(),
            main_class: String::new(),
            applet_class: String::new(),
            process_arguments: String::new(),
            minecraft_arguments: String::new(),
            release_type: String::new(),
            release_time: String::new(),
            time: String::new(),
            assets: String::new(),
            minimum_launcher_version: None,
            tweakers: Vec::new(),
            libraries: Vec::new(),
            traits: BTreeSet::new(),
            jar_mods: Vec::new(),
            platform,
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn clear(&mut self) {
        *self = Self::new(self.platform.clone());
    }

    /// Fill in defaults once every patch has been applied.
    pub fn finalize(&mut self) {
        self.finalize_on(Local::now().date_naive());
    }

    pub fn finalize_on(&mut self, today: NaiveDate) {
        let april_fools = today.month() == 4 && today.day() == 1;
        if !april_fools {
            if let Some(stripped) = self.assets.strip_suffix("_af") {
                self.assets = stripped.to_string();
            }
        }
        if self.assets.is_empty() {
            self.assets = "legacy".to_string();
        }

        if self.minecraft_arguments.is_empty() {
            if let Some(template) = legacy_arguments(&self.process_arguments) {
                self.minecraft_arguments = template.to_string();
            }
        }
    }

    /// Index of the first library whose name matches `pattern`.
    pub fn find_library(&self, pattern: &str) -> Option<usize> {
        let wildcard = Wildcard::new(pattern);
        self.libraries
            .iter()
            .position(|lib| wildcard.is_match(&lib.raw_name()))
    }

    pub fn find_libraries(&self, pattern: &str) -> Vec<usize> {
        let wildcard = Wildcard::new(pattern);
        self.libraries
            .iter()
            .enumerate()
            .filter(|(_, lib)| wildcard.is_match(&lib.raw_name()))
            .map(|(index, _)| index)
            .collect()
    }

    /// Java libraries that are active on this model's platform.
    pub fn active_libraries(&self) -> impl Iterator<Item = &Library> {
        self.libraries
            .iter()
            .filter(|lib| lib.resolved().is_active && !lib.resolved().is_native)
    }

    pub fn active_native_libraries(&self) -> impl Iterator<Item = &Library> {
        self.libraries
            .iter()
            .filter(|lib| lib.resolved().is_active && lib.resolved().is_native)
    }

    /// Active libraries (java and native) in version-file JSON form.
    pub fn active_libraries_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.libraries
                .iter()
                .filter(|lib| lib.resolved().is_active)
                .map(|lib| lib.raw().to_json())
                .collect(),
        )
    }

    pub fn launch_profile(&self) -> LaunchProfile {
        LaunchProfile {
            id: self.id.clone(),
            main_class: self.main_class.clone(),
            applet_class: self.applet_class.clone(),
            minecraft_arguments: self.minecraft_arguments.clone(),
            assets: self.assets.clone(),
            tweakers: self.tweakers.clone(),
            traits: self.traits.iter().cloned().collect(),
            libraries: self
                .active_libraries()
                .map(|l| l.resolved().clone())
                .collect(),
            natives: self
                .active_native_libraries()
                .map(|l| l.resolved().clone())
                .collect(),
        }
    }
}

/// Argument templates for the old `processArguments` keywords.
fn legacy_arguments(keyword: &str) -> Option<&'static str> {
    match keyword.to_lowercase().as_str() {
        "legacy" => Some(" ${auth_player_name} ${auth_session}"),
        "username_session" => Some("--username ${auth_player_name} --session ${auth_session}"),
        "username_session_version" => Some(
            "--username ${auth_player_name} --session ${auth_session} --version ${profile_name}",
        ),
        _ => None,
    }
}
