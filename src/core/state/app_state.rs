use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::net::{HttpFetcher, MetaCache, MetaFetcher};

const APP_DIR_NAME: &str = "InterfaceOficial";
const BOOTSTRAP_FILE: &str = "launcher_bootstrap.json";
const SETTINGS_FILE: &str = "launcher_settings.json";
const CACHE_INDEX_FILE: &str = "metacache";

pub const DEFAULT_META_URL: &str = "https://meta.multimc.org/v1/";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherSettings {
    /// Replaces `DEFAULT_META_URL` when set and non-empty.
    #[serde(default)]
    pub meta_url_override: Option<String>,
    /// Never touch the network for metadata.
    #[serde(default)]
    pub offline: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BootstrapConfig {
    data_dir: PathBuf,
}

/// Everything the core needs from its surroundings: where data lives, the
/// user's settings, the meta cache and the network.
pub struct AppContext {
    pub data_dir: PathBuf,
    pub settings: LauncherSettings,
    cache: MetaCache,
    fetcher: Arc<dyn MetaFetcher>,
}

impl AppContext {
    pub fn new(data_dir: PathBuf, settings: LauncherSettings, fetcher: Arc<dyn MetaFetcher>) -> Self {
        let cache = MetaCache::new(Some(data_dir.join(CACHE_INDEX_FILE)));
        cache.add_base("meta", data_dir.join("meta"));
        cache.load();
        Self {
            data_dir,
            settings,
            cache,
            fetcher,
        }
    }

    /// Context rooted in the user's data directory, with settings from disk
    /// and a real HTTP fetcher.
    pub fn bootstrap() -> LauncherResult<Self> {
        let data_dir = default_data_dir()?;
        let settings = load_settings_from_disk(&data_dir).unwrap_or_default();
        info!("Using data directory {:?}", data_dir);
        Ok(Self::new(data_dir, settings, Arc::new(HttpFetcher::new()?)))
    }

    pub fn cache(&self) -> &MetaCache {
        &self.cache
    }

    pub fn fetcher(&self) -> &dyn MetaFetcher {
        self.fetcher.as_ref()
    }

    pub fn meta_dir(&self) -> PathBuf {
        self.data_dir.join("meta")
    }

    /// Remote URL of a meta document, resolved against the configured root.
    pub fn meta_url(&self, local_filename: &str) -> LauncherResult<String> {
        let root = match self.settings.meta_url_override.as_deref() {
            Some(url) if !url.trim().is_empty() => url.trim(),
            _ => DEFAULT_META_URL,
        };
        let root = if root.ends_with('/') {
            root.to_string()
        } else {
            format!("{}/", root)
        };
        let base = Url::parse(&root)
            .map_err(|e| LauncherError::Other(format!("Invalid meta URL {}: {}", root, e)))?;
        let url = base.join(local_filename).map_err(|e| {
            LauncherError::Other(format!("Invalid meta path {}: {}", local_filename, e))
        })?;
        Ok(url.to_string())
    }

    pub fn save_settings(&self) -> LauncherResult<()> {
        let path = self.data_dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(&self.settings)?;
        std::fs::write(&path, json).map_err(|e| LauncherError::io(path, e))
    }
}

fn load_settings_from_disk(data_dir: &Path) -> Option<LauncherSettings> {
    let path = data_dir.join(SETTINGS_FILE);
    let raw = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!("Ignoring invalid settings file {:?}: {}", path, e);
            None
        }
    }
}

fn default_base_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_data_dir() -> LauncherResult<PathBuf> {
    let base = default_base_dir();
    let bootstrap_path = base.join(BOOTSTRAP_FILE);

    let dir = std::fs::read_to_string(&bootstrap_path)
        .ok()
        .and_then(|raw| serde_json::from_str::<BootstrapConfig>(&raw).ok())
        .map(|cfg| cfg.data_dir)
        .unwrap_or_else(|| base.join(APP_DIR_NAME));

    std::fs::create_dir_all(&dir).map_err(|e| LauncherError::io(&dir, e))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::net::testing::StaticFetcher;
    use tempfile::TempDir;

    fn context(dir: &TempDir, settings: LauncherSettings) -> AppContext {
        AppContext::new(
            dir.path().to_path_buf(),
            settings,
            Arc::new(StaticFetcher::default()),
        )
    }

    #[test]
    fn meta_url_uses_default_root() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, LauncherSettings::default());
        assert_eq!(
            ctx.meta_url("net.minecraft/index.json").unwrap(),
            "https://meta.multimc.org/v1/net.minecraft/index.json"
        );
    }

    #[test]
    fn meta_url_override_without_trailing_slash() {
        let dir = TempDir::new().unwrap();
        let ctx = context(
            &dir,
            LauncherSettings {
                meta_url_override: Some("https://mirror.example.com/meta".into()),
                offline: false,
            },
        );
        assert_eq!(
            ctx.meta_url("index.json").unwrap(),
            "https://mirror.example.com/meta/index.json"
        );
    }

    #[test]
    fn blank_override_is_ignored() {
        let dir = TempDir::new().unwrap();
        let ctx = context(
            &dir,
            LauncherSettings {
                meta_url_override: Some("  ".into()),
                offline: false,
            },
        );
        assert!(ctx.meta_url("index.json").unwrap().starts_with(DEFAULT_META_URL));
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = TempDir::new().unwrap();
        let settings = LauncherSettings {
            meta_url_override: None,
            offline: true,
        };
        context(&dir, settings.clone()).save_settings().unwrap();
        assert_eq!(load_settings_from_disk(dir.path()), Some(settings));
    }
}
