// ─── Meta Entity Loading ───
// Shared local-cache / remote-fetch protocol for the index, version lists
// and versions.
//
// A load is split in three steps so callers that keep entities behind a
// lock can release it while the download runs:
//   load_local             read `meta/<file>` once per session
//   start_remote_update    decide whether to fetch, claim the update slot
//   complete_remote_update check and parse the body, cache it, then merge
// `load` drives all three for callers that own the entity.

use std::io::ErrorKind;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::net::{CacheEntry, FetchedBytes};
use crate::core::state::AppContext;

const CACHE_BASE: &str = "meta";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Local cache only.
    Offline,
    Online,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateStatus {
    #[default]
    NotStarted,
    InProgress,
    Succeeded,
    Failed,
}

/// Load bookkeeping carried by every entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadState {
    pub local_loaded: bool,
    pub remote_loaded: bool,
    pub update_status: UpdateStatus,
    local_load_attempted: bool,
    /// SHA-256 of the cached file backing the current contents.
    file_sha256: Option<String>,
}

impl LoadState {
    /// Loaded from anywhere.
    pub fn is_loaded(&self) -> bool {
        self.local_loaded || self.remote_loaded
    }

    pub fn is_fully_synced(&self) -> bool {
        self.local_loaded && self.remote_loaded
    }

    /// At most one remote update per entity may be in flight.
    pub fn should_start_remote_update(&self) -> bool {
        self.update_status != UpdateStatus::InProgress
    }

    pub fn file_sha256(&self) -> Option<&str> {
        self.file_sha256.as_deref()
    }
}

/// Fold a freshly parsed entity into a live one.
pub trait Mergeable {
    fn merge(&mut self, other: Self);
}

pub trait MetaEntity: Mergeable + Sized + Send {
    /// Path below the meta root, identical locally and remotely.
    fn local_filename(&self) -> String;

    fn load_state(&self) -> &LoadState;

    fn load_state_mut(&mut self) -> &mut LoadState;

    /// Checksum the document is expected to have, when its parent knows it.
    fn expected_sha256(&self) -> Option<&str> {
        None
    }

    fn parse(doc: &serde_json::Value, filename: &str) -> LauncherResult<Self>;
}

/// A claimed remote update. Hand it back to `complete_remote_update`.
#[derive(Debug)]
pub struct RemoteUpdate {
    pub url: String,
    entry: CacheEntry,
    filename: String,
    expected_sha256: Option<String>,
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn parse_bytes<E: MetaEntity>(bytes: &[u8], filename: &str) -> LauncherResult<E> {
    let doc: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| LauncherError::parse(filename, format!("invalid JSON: {}", e)))?;
    if !doc.is_object() {
        return Err(LauncherError::parse(filename, "the root is not an object"));
    }
    E::parse(&doc, filename)
}

/// Read the cached copy, once per session. Corrupt files are deleted.
pub fn load_local<E: MetaEntity>(entity: &mut E, ctx: &AppContext, mode: LoadMode) {
    let state = entity.load_state();
    if state.is_loaded() || state.local_load_attempted {
        return;
    }
    entity.load_state_mut().local_load_attempted = true;

    let filename = entity.local_filename();
    let path = ctx.meta_dir().join(&filename);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return,
        Err(e) => {
            warn!("Unable to read {:?}: {}", path, e);
            return;
        }
    };

    let sha = sha256_hex(&bytes);
    let checksum_ok = match entity.expected_sha256() {
        Some(expected) => mode == LoadMode::Offline || expected == sha,
        None => true,
    };

    let parsed = if checksum_ok {
        parse_bytes::<E>(&bytes, &filename)
    } else {
        Err(LauncherError::ChecksumMismatch {
            path: path.clone(),
            expected: entity.expected_sha256().unwrap_or_default().to_string(),
            actual: sha.clone(),
        })
    };

    match parsed {
        Ok(parsed) => {
            entity.merge(parsed);
            let state = entity.load_state_mut();
            state.local_loaded = true;
            state.file_sha256 = Some(sha);
            debug!("Loaded {} from the local cache", filename);
        }
        Err(e) => {
            warn!("Unable to load file {:?}: {}", path, e);
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Couldn't delete {:?}: {}", path, e);
            }
        }
    }
}

fn is_up_to_date<E: MetaEntity>(entity: &E) -> bool {
    let state = entity.load_state();
    match entity.expected_sha256() {
        Some(expected) => state.is_loaded() && state.file_sha256() == Some(expected),
        None => state.remote_loaded,
    }
}

/// Claim the update slot and prepare the download, or `None` when no fetch
/// should happen.
pub fn start_remote_update<E: MetaEntity>(
    entity: &mut E,
    ctx: &AppContext,
    mode: LoadMode,
) -> LauncherResult<Option<RemoteUpdate>> {
    if mode == LoadMode::Offline || ctx.settings.offline {
        return Ok(None);
    }
    if is_up_to_date(entity) {
        return Ok(None);
    }
    if !entity.load_state().should_start_remote_update() {
        debug!("Update of {} already running", entity.local_filename());
        return Ok(None);
    }

    let filename = entity.local_filename();
    let url = ctx.meta_url(&filename)?;
    let mut entry = ctx.cache().resolve_entry(CACHE_BASE, &filename)?;
    entry.stale = true;

    entity.load_state_mut().update_status = UpdateStatus::InProgress;
    Ok(Some(RemoteUpdate {
        url,
        entry,
        filename,
        expected_sha256: entity.expected_sha256().map(str::to_string),
    }))
}

/// Finish a claimed update with the result of its download.
///
/// The body is checksummed, parsed and written to the cache before it is
/// merged, so a document that doesn't parse is never persisted and a failed
/// write leaves the entity untouched.
pub async fn complete_remote_update<E: MetaEntity>(
    entity: &mut E,
    ctx: &AppContext,
    update: RemoteUpdate,
    fetched: LauncherResult<FetchedBytes>,
) -> LauncherResult<()> {
    let result = accept_download::<E>(ctx, &update, fetched).await;
    match result {
        Ok((parsed, sha)) => {
            entity.merge(parsed);
            let state = entity.load_state_mut();
            state.remote_loaded = true;
            state.file_sha256 = Some(sha);
            state.update_status = UpdateStatus::Succeeded;
            Ok(())
        }
        Err(e) => {
            warn!("Update of {} failed: {}", update.filename, e);
            entity.load_state_mut().update_status = UpdateStatus::Failed;
            Err(e)
        }
    }
}

async fn accept_download<E: MetaEntity>(
    ctx: &AppContext,
    update: &RemoteUpdate,
    fetched: LauncherResult<FetchedBytes>,
) -> LauncherResult<(E, String)> {
    let fetched = fetched?;
    let path = update.entry.full_path();

    let sha = sha256_hex(&fetched.bytes);
    if let Some(expected) = &update.expected_sha256 {
        if *expected != sha {
            return Err(LauncherError::ChecksumMismatch {
                path,
                expected: expected.clone(),
                actual: sha,
            });
        }
    }

    let parsed = parse_bytes::<E>(&fetched.bytes, &update.filename)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LauncherError::io(parent, e))?;
    }
    tokio::fs::write(&path, &fetched.bytes)
        .await
        .map_err(|e| LauncherError::io(&path, e))?;
    ctx.cache()
        .record_download(update.entry.clone(), &fetched.bytes, fetched.etag)?;

    Ok((parsed, sha))
}

/// Holds an entity whose update slot is claimed. Dropping it while the
/// update is still in progress (a cancelled `load`) frees the slot.
struct ClaimedSlot<'a, E: MetaEntity> {
    entity: &'a mut E,
}

impl<E: MetaEntity> Drop for ClaimedSlot<'_, E> {
    fn drop(&mut self) {
        if self.entity.load_state().update_status == UpdateStatus::InProgress {
            debug!("Update of {} was cancelled", self.entity.local_filename());
            self.entity.load_state_mut().update_status = UpdateStatus::Failed;
        }
    }
}

/// Load an entity: local cache first, then the network unless offline.
///
/// Dropping the returned future cancels the download; the next call starts
/// a fresh one.
pub async fn load<E: MetaEntity>(
    entity: &mut E,
    ctx: &AppContext,
    mode: LoadMode,
) -> LauncherResult<()> {
    load_local(entity, ctx, mode);

    let Some(update) = start_remote_update(entity, ctx, mode)? else {
        return Ok(());
    };
    let mut slot = ClaimedSlot { entity };
    info!("Downloading meta file {}", update.url);
    let fetched = ctx.fetcher().fetch(&update.url).await;
    complete_remote_update(&mut *slot.entity, ctx, update, fetched).await
}
