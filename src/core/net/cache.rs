// ─── Meta Cache ───
// Tracks downloaded files per named bucket so stale ones can be refetched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

const INDEX_VERSION: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub base: String,
    pub base_path: PathBuf,
    pub relative_path: String,
    pub md5sum: String,
    pub etag: Option<String>,
    /// File mtime in milliseconds when the entry was last verified.
    pub local_changed_timestamp: i64,
    pub stale: bool,
}

impl CacheEntry {
    pub fn full_path(&self) -> PathBuf {
        self.base_path.join(&self.relative_path)
    }
}

#[derive(Debug, Default)]
struct Bucket {
    base_path: PathBuf,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    version: String,
    entries: Vec<IndexEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexEntry {
    base: String,
    path: String,
    md5sum: String,
    #[serde(default)]
    etag: Option<String>,
    last_changed_timestamp: i64,
}

/// Bucketed file cache with an on-disk `metacache` index.
#[derive(Debug)]
pub struct MetaCache {
    index_file: Option<PathBuf>,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl MetaCache {
    pub fn new(index_file: Option<PathBuf>) -> Self {
        Self {
            index_file,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Bucket>> {
        self.buckets.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_base(&self, base: &str, root: impl Into<PathBuf>) {
        self.lock().entry(base.to_string()).or_insert_with(|| Bucket {
            base_path: root.into(),
            entries: HashMap::new(),
        });
    }

    pub fn base_path(&self, base: &str) -> Option<PathBuf> {
        self.lock().get(base).map(|b| b.base_path.clone())
    }

    /// Look up `relative_path` in `base`, verifying the file on disk.
    ///
    /// Unknown entries, missing files and files whose content changed come
    /// back as stale entries.
    pub fn resolve_entry(&self, base: &str, relative_path: &str) -> LauncherResult<CacheEntry> {
        let mut buckets = self.lock();
        let bucket = buckets
            .get_mut(base)
            .ok_or_else(|| LauncherError::Other(format!("Unknown cache base {}", base)))?;

        let stale = CacheEntry {
            base: base.to_string(),
            base_path: bucket.base_path.clone(),
            relative_path: relative_path.to_string(),
            md5sum: String::new(),
            etag: None,
            local_changed_timestamp: 0,
            stale: true,
        };

        let Some(entry) = bucket.entries.get_mut(relative_path) else {
            return Ok(stale);
        };

        let real_path = bucket.base_path.join(relative_path);
        if !real_path.is_file() {
            bucket.entries.remove(relative_path);
            return Ok(stale);
        }

        let changed = modified_millis(&real_path)?;
        if changed != entry.local_changed_timestamp {
            let bytes = std::fs::read(&real_path).map_err(|e| LauncherError::io(&real_path, e))?;
            if md5_hex(&bytes) != entry.md5sum {
                debug!("Cached file {:?} changed on disk", real_path);
                bucket.entries.remove(relative_path);
                return Ok(stale);
            }
            entry.local_changed_timestamp = changed;
        }

        Ok(entry.clone())
    }

    /// Record a fresh, non-stale entry.
    pub fn update_entry(&self, entry: CacheEntry) -> LauncherResult<()> {
        if entry.stale {
            return Err(LauncherError::Other(format!(
                "Cannot add stale cache entry {:?}",
                entry.full_path()
            )));
        }
        {
            let mut buckets = self.lock();
            let bucket = buckets.get_mut(&entry.base).ok_or_else(|| {
                LauncherError::Other(format!("Unknown cache base {}", entry.base))
            })?;
            bucket.entries.insert(entry.relative_path.clone(), entry);
        }
        self.save()
    }

    /// Fill in checksum and timestamp for a file that was just written.
    pub fn record_download(
        &self,
        mut entry: CacheEntry,
        bytes: &[u8],
        etag: Option<String>,
    ) -> LauncherResult<CacheEntry> {
        entry.md5sum = md5_hex(bytes);
        entry.etag = etag;
        entry.local_changed_timestamp = modified_millis(&entry.full_path())?;
        entry.stale = false;
        self.update_entry(entry.clone())?;
        Ok(entry)
    }

    pub fn evict_entry(&self, entry: &mut CacheEntry) -> LauncherResult<()> {
        entry.stale = true;
        {
            let mut buckets = self.lock();
            if let Some(bucket) = buckets.get_mut(&entry.base) {
                bucket.entries.remove(&entry.relative_path);
            }
        }
        self.save()
    }

    /// Read the index. Entries for unregistered bases are dropped.
    pub fn load(&self) {
        let Some(index_file) = &self.index_file else {
            return;
        };
        let Ok(raw) = std::fs::read(index_file) else {
            return;
        };
        let index: IndexFile = match serde_json::from_slice(&raw) {
            Ok(index) => index,
            Err(e) => {
                warn!("Ignoring unreadable cache index {:?}: {}", index_file, e);
                return;
            }
        };
        if index.version != INDEX_VERSION {
            return;
        }

        let mut buckets = self.lock();
        for item in index.entries {
            let Some(bucket) = buckets.get_mut(&item.base) else {
                continue;
            };
            let entry = CacheEntry {
                base: item.base,
                base_path: bucket.base_path.clone(),
                relative_path: item.path.clone(),
                md5sum: item.md5sum,
                etag: item.etag,
                local_changed_timestamp: item.last_changed_timestamp,
                stale: false,
            };
            bucket.entries.insert(item.path, entry);
        }
    }

    pub fn save(&self) -> LauncherResult<()> {
        let Some(index_file) = &self.index_file else {
            return Ok(());
        };
        let entries = {
            let buckets = self.lock();
            let mut entries: Vec<IndexEntry> = buckets
                .values()
                .flat_map(|b| b.entries.values())
                .filter(|e| !e.stale)
                .map(|e| IndexEntry {
                    base: e.base.clone(),
                    path: e.relative_path.clone(),
                    md5sum: e.md5sum.clone(),
                    etag: e.etag.clone(),
                    last_changed_timestamp: e.local_changed_timestamp,
                })
                .collect();
            entries.sort_by(|a, b| (&a.base, &a.path).cmp(&(&b.base, &b.path)));
            entries
        };

        let index = IndexFile {
            version: INDEX_VERSION.to_string(),
            entries,
        };
        if let Some(parent) = index_file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let json = serde_json::to_vec_pretty(&index)?;
        std::fs::write(index_file, json).map_err(|e| LauncherError::io(index_file, e))
    }
}

pub(crate) fn md5_hex(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn modified_millis(path: &Path) -> LauncherResult<i64> {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| LauncherError::io(path, e))?;
    Ok(DateTime::<Utc>::from(modified).timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache(dir: &TempDir) -> MetaCache {
        let cache = MetaCache::new(Some(dir.path().join("metacache")));
        cache.add_base("meta", dir.path().join("meta"));
        cache
    }

    fn write(dir: &TempDir, relative: &str, body: &[u8]) {
        let path = dir.path().join("meta").join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn unknown_entry_is_stale() {
        let dir = TempDir::new().unwrap();
        let entry = cache(&dir).resolve_entry("meta", "index.json").unwrap();
        assert!(entry.stale);
        assert_eq!(entry.full_path(), dir.path().join("meta").join("index.json"));
    }

    #[test]
    fn unknown_base_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(cache(&dir).resolve_entry("assets", "x").is_err());
    }

    #[test]
    fn recorded_entry_resolves_fresh_until_content_changes() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        write(&dir, "net.minecraft/index.json", b"{}");

        let entry = cache
            .resolve_entry("meta", "net.minecraft/index.json")
            .unwrap();
        cache
            .record_download(entry, b"{}", Some("abc".into()))
            .unwrap();

        let fresh = cache
            .resolve_entry("meta", "net.minecraft/index.json")
            .unwrap();
        assert!(!fresh.stale);
        assert_eq!(fresh.etag.as_deref(), Some("abc"));

        // Force the mtime check to rehash the file.
        write(&dir, "net.minecraft/index.json", b"{\"changed\":true}");
        cache.lock().get_mut("meta").unwrap().entries
            .get_mut("net.minecraft/index.json")
            .unwrap()
            .local_changed_timestamp = -1;
        let stale = cache
            .resolve_entry("meta", "net.minecraft/index.json")
            .unwrap();
        assert!(stale.stale);
    }

    #[test]
    fn missing_file_makes_entry_stale() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        write(&dir, "index.json", b"{}");
        let entry = cache.resolve_entry("meta", "index.json").unwrap();
        cache.record_download(entry, b"{}", None).unwrap();

        std::fs::remove_file(dir.path().join("meta").join("index.json")).unwrap();
        assert!(cache.resolve_entry("meta", "index.json").unwrap().stale);
    }

    #[test]
    fn index_persists_only_live_entries() {
        let dir = TempDir::new().unwrap();
        {
            let cache = cache(&dir);
            write(&dir, "a.json", b"a");
            write(&dir, "b.json", b"b");
            let a = cache.resolve_entry("meta", "a.json").unwrap();
            cache.record_download(a, b"a", None).unwrap();
            let b = cache.resolve_entry("meta", "b.json").unwrap();
            let mut b = cache.record_download(b, b"b", None).unwrap();
            cache.evict_entry(&mut b).unwrap();
        }

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("metacache")).unwrap())
                .unwrap();
        assert_eq!(raw["version"], "1");
        assert_eq!(raw["entries"].as_array().unwrap().len(), 1);

        let reloaded = cache(&dir);
        reloaded.load();
        assert!(!reloaded.resolve_entry("meta", "a.json").unwrap().stale);
        assert!(reloaded.resolve_entry("meta", "b.json").unwrap().stale);
    }
}
