// ─── Meta JSON Format ───
// Parsers for the index, package (version list) and version documents.
// Format versions 0 and 1 share one layout.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::VersionFile;

use super::index::Index;
use super::version::{Require, Version};
use super::version_list::VersionList;

/// Format version written by current meta servers.
pub const CURRENT_FORMAT_VERSION: i64 = 1;

/// A missing `formatVersion` means the initial layout.
fn check_format_version(doc: &Value, filename: &str) -> LauncherResult<()> {
    let Some(value) = doc.get("formatVersion") else {
        return Ok(());
    };
    let version = value.as_i64().ok_or_else(|| {
        LauncherError::parse(filename, "'formatVersion' is not an integer")
    })?;
    match version {
        0 | 1 => Ok(()),
        other => Err(LauncherError::UnknownFormatVersion {
            file: filename.to_string(),
            version: other,
        }),
    }
}

fn from_doc<'a, T: Deserialize<'a>>(doc: &'a Value, filename: &str) -> LauncherResult<T> {
    T::deserialize(doc).map_err(|e| LauncherError::parse(filename, e.to_string()))
}

// ─── Index ───

#[derive(Deserialize)]
struct IndexJson {
    packages: Vec<PackageJson>,
}

#[derive(Deserialize)]
struct PackageJson {
    uid: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    sha256: Option<String>,
}

pub fn parse_index(doc: &Value, filename: &str) -> LauncherResult<Index> {
    check_format_version(doc, filename)?;
    let raw: IndexJson = from_doc(doc, filename)?;

    let lists = raw
        .packages
        .into_iter()
        .map(|package| {
            let mut list = VersionList::new(&package.uid);
            list.set_name(package.name.as_deref().unwrap_or_default());
            list.sha256 = package.sha256.filter(|s| !s.is_empty());
            list
        })
        .collect();
    Ok(Index::with_lists(lists))
}

// ─── Versions ───

#[derive(Deserialize)]
#[serde(untagged)]
enum RequiresJson {
    /// `[{ "uid": ..., "equals": ..., "suggests": ... }]`
    List(Vec<RequireJson>),
    /// `{ "uid": "constraint" }`
    Map(BTreeMap<String, String>),
}

#[derive(Deserialize)]
struct RequireJson {
    uid: String,
    #[serde(default)]
    equals: Option<String>,
    #[serde(default)]
    suggests: Option<String>,
}

impl RequiresJson {
    fn into_requires(self) -> Vec<Require> {
        match self {
            RequiresJson::List(items) => items
                .into_iter()
                .map(|r| Require {
                    uid: r.uid,
                    equals: r.equals.filter(|s| !s.is_empty()),
                    suggests: r.suggests.filter(|s| !s.is_empty()),
                })
                .collect(),
            RequiresJson::Map(map) => map
                .into_iter()
                .map(|(uid, constraint)| Require {
                    uid,
                    equals: Some(constraint).filter(|s| !s.is_empty()),
                    suggests: None,
                })
                .collect(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommonVersionJson {
    version: String,
    release_time: String,
    #[serde(default, rename = "type")]
    release_type: Option<String>,
    #[serde(default)]
    parent_uid: Option<String>,
    #[serde(default)]
    recommended: bool,
    #[serde(default)]
    volatile: bool,
    #[serde(default)]
    requires: Option<RequiresJson>,
    #[serde(default)]
    conflicts: Option<RequiresJson>,
    #[serde(default)]
    sha256: Option<String>,
}

/// ISO-8601 timestamp to Unix epoch seconds. Timestamps without an offset
/// are taken as UTC.
pub fn parse_release_time(raw: &str, filename: &str) -> LauncherResult<i64> {
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Ok(time.timestamp());
    }
    if let Ok(time) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Ok(time.timestamp());
    }
    if let Ok(time) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(time.and_utc().timestamp());
    }
    Err(LauncherError::parse(
        filename,
        format!("invalid releaseTime '{}'", raw),
    ))
}

fn parse_common_version(uid: &str, doc: &Value, filename: &str) -> LauncherResult<Version> {
    let raw: CommonVersionJson = from_doc(doc, filename)?;

    let mut version = Version::new(uid, &raw.version);
    version.time = parse_release_time(&raw.release_time, filename)?;
    version.release_type = raw.release_type.unwrap_or_default();
    version.parent_uid = raw.parent_uid.filter(|s| !s.is_empty());
    version.recommended = raw.recommended;
    version.volatile = raw.volatile;
    version.sha256 = raw.sha256.filter(|s| !s.is_empty());
    version.set_requires(
        raw.requires.map(RequiresJson::into_requires).unwrap_or_default(),
        raw.conflicts.map(RequiresJson::into_requires).unwrap_or_default(),
    );
    Ok(version)
}

fn require_str<'a>(doc: &'a Value, key: &str, filename: &str) -> LauncherResult<&'a str> {
    doc.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| LauncherError::parse(filename, format!("missing string field '{}'", key)))
}

/// A full version document. Its body is also a version file.
pub fn parse_version(doc: &Value, filename: &str) -> LauncherResult<Version> {
    check_format_version(doc, filename)?;
    let uid = require_str(doc, "uid", filename)?;
    let mut version = parse_common_version(uid, doc, filename)?;

    let data_name = format!("{}/{}.json", version.uid(), version.version());
    let has_order = doc.get("order").is_some();
    version.data = Some(VersionFile::from_json(doc, &data_name, has_order)?);
    Ok(version)
}

pub fn parse_version_list(doc: &Value, filename: &str) -> LauncherResult<VersionList> {
    check_format_version(doc, filename)?;
    let uid = require_str(doc, "uid", filename)?;
    let entries = doc
        .get("versions")
        .and_then(Value::as_array)
        .ok_or_else(|| LauncherError::parse(filename, "missing array field 'versions'"))?;

    let mut versions = Vec::with_capacity(entries.len());
    for entry in entries {
        if !entry.is_object() {
            return Err(LauncherError::parse(filename, "version entry is not an object"));
        }
        let mut version = parse_common_version(uid, entry, filename)?;
        version.provides_recommendations = true;
        versions.push(version);
    }

    let mut list = VersionList::new(uid);
    if let Some(name) = doc.get("name").and_then(Value::as_str) {
        list.set_name(name);
    }
    list.set_versions(versions);
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn version_list_scenario() {
        let doc = json!({
            "formatVersion": 1,
            "uid": "net.minecraft",
            "versions": [{
                "uid": "net.minecraft",
                "version": "1.20.1",
                "releaseTime": "2023-06-07T00:00:00+00:00",
                "type": "release"
            }]
        });
        let list = parse_version_list(&doc, "net.minecraft/index.json").unwrap();
        assert_eq!(list.len(), 1);
        let version = list.version("1.20.1").unwrap();
        assert_eq!(version.raw_time(), 1686096000);
        assert_eq!(list.recommended().unwrap().version(), "1.20.1");
    }

    #[test]
    fn unknown_format_version_is_named() {
        let doc = json!({ "formatVersion": 7, "packages": [] });
        match parse_index(&doc, "index.json") {
            Err(LauncherError::UnknownFormatVersion { version, .. }) => assert_eq!(version, 7),
            other => panic!("unexpected result {:?}", other.map(|i| i.len())),
        }
    }

    #[test]
    fn format_version_must_be_a_number() {
        let doc = json!({ "formatVersion": "1", "packages": [] });
        assert!(matches!(
            parse_index(&doc, "index.json"),
            Err(LauncherError::Parse { .. })
        ));
    }

    #[test]
    fn index_reads_packages() {
        let doc = json!({
            "formatVersion": 1,
            "packages": [
                { "uid": "net.minecraft", "name": "Minecraft", "sha256": "abc" },
                { "uid": "org.lwjgl" }
            ]
        });
        let index = parse_index(&doc, "index.json").unwrap();
        assert_eq!(index.len(), 2);
        let mc = index.get_list("net.minecraft").unwrap();
        assert_eq!(mc.name(), "Minecraft");
        assert_eq!(mc.sha256.as_deref(), Some("abc"));
        assert_eq!(index.get_list("org.lwjgl").unwrap().human_readable(), "org.lwjgl");
    }

    #[test]
    fn requires_accepts_both_layouts() {
        let as_map = json!({
            "uid": "net.minecraftforge",
            "version": "14.23.5.2860",
            "releaseTime": "2019-11-29T00:00:00Z",
            "requires": { "net.minecraft": "1.12.2" }
        });
        let as_list = json!({
            "uid": "net.minecraftforge",
            "version": "14.23.5.2860",
            "releaseTime": "2019-11-29T00:00:00Z",
            "requires": [{ "uid": "net.minecraft", "equals": "1.12.2" }]
        });
        let a = parse_version(&as_map, "a.json").unwrap();
        let b = parse_version(&as_list, "b.json").unwrap();
        assert_eq!(a.requires(), b.requires());
        assert_eq!(a.minecraft_version(), Some("1.12.2"));
    }

    #[test]
    fn version_document_carries_data() {
        let doc = json!({
            "formatVersion": 1,
            "uid": "org.lwjgl",
            "version": "2.9.1",
            "releaseTime": "2013-10-25T13:03:32+00:00",
            "type": "release",
            "volatile": true,
            "+libraries": [
                { "name": "org.lwjgl.lwjgl:lwjgl:2.9.1", "insert": "append" }
            ]
        });
        let version = parse_version(&doc, "org.lwjgl/2.9.1.json").unwrap();
        assert!(version.is_volatile());
        let data = version.data().unwrap();
        assert_eq!(data.filename, "org.lwjgl/2.9.1.json");
        assert_eq!(data.add_libs.len(), 1);
    }

    #[test]
    fn release_time_variants() {
        assert_eq!(
            parse_release_time("2023-06-07T00:00:00+00:00", "x").unwrap(),
            1686096000
        );
        assert_eq!(
            parse_release_time("2023-06-07T02:00:00+0200", "x").unwrap(),
            1686096000
        );
        assert_eq!(
            parse_release_time("2023-06-07T00:00:00", "x").unwrap(),
            1686096000
        );
        assert!(parse_release_time("yesterday", "x").is_err());
    }

    #[test]
    fn version_entry_requires_release_time() {
        let doc = json!({
            "uid": "net.minecraft",
            "versions": [{ "version": "1.20.1" }]
        });
        assert!(parse_version_list(&doc, "net.minecraft/index.json").is_err());
    }
}
