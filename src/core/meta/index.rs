// ─── Meta Index ───
// The root meta document: one version list per package uid.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{ChangeEvent, ChangeListener, ChangeNotifier};
use crate::core::state::AppContext;

use super::entity::{self, LoadMode, LoadState, Mergeable, MetaEntity};
use super::format;
use super::version_list::VersionList;

#[derive(Debug, Clone, Default)]
pub struct Index {
    lists: Vec<VersionList>,
    lookup: HashMap<String, usize>,
    state: LoadState,
    notifier: ChangeNotifier,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lists(lists: Vec<VersionList>) -> Self {
        let mut index = Self::default();
        index.lists = lists;
        index.rebuild_lookup();
        index
    }

    fn rebuild_lookup(&mut self) {
        self.lookup = self
            .lists
            .iter()
            .enumerate()
            .map(|(row, list)| (list.uid().to_string(), row))
            .collect();
    }

    pub fn subscribe(&mut self, listener: Arc<dyn ChangeListener>) {
        self.notifier.subscribe(listener);
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn lists(&self) -> &[VersionList] {
        &self.lists
    }

    pub fn has_uid(&self, uid: &str) -> bool {
        self.lookup.contains_key(uid)
    }

    pub fn get_list(&self, uid: &str) -> Option<&VersionList> {
        self.lookup.get(uid).map(|&row| &self.lists[row])
    }

    pub fn get_list_mut(&mut self, uid: &str) -> Option<&mut VersionList> {
        match self.lookup.get(uid) {
            Some(&row) => Some(&mut self.lists[row]),
            None => None,
        }
    }

    /// Load one package's version list.
    pub async fn load_list(
        &mut self,
        ctx: &AppContext,
        uid: &str,
        mode: LoadMode,
    ) -> LauncherResult<()> {
        let list = self
            .get_list_mut(uid)
            .ok_or_else(|| LauncherError::Other(format!("Unknown package {}", uid)))?;
        entity::load(list, ctx, mode).await
    }

    /// Load every package's version list concurrently. Returns the uids that
    /// failed with their errors; the rest stay loaded.
    pub async fn load_all_lists(
        &mut self,
        ctx: &AppContext,
        mode: LoadMode,
    ) -> Vec<(String, LauncherError)> {
        info!("Loading {} version lists", self.lists.len());
        let jobs = self.lists.iter_mut().map(|list| async move {
            let uid = list.uid().to_string();
            entity::load(list, ctx, mode).await.map_err(|e| (uid, e))
        });
        join_all(jobs)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect()
    }
}

impl Mergeable for Index {
    fn merge(&mut self, other: Index) {
        if self.lists.is_empty() {
            self.lists = other.lists;
            self.rebuild_lookup();
            self.notifier.emit(ChangeEvent::Reset);
            return;
        }

        for incoming in other.lists {
            match self.lookup.get(incoming.uid()).copied() {
                Some(row) => self.lists[row].merge(incoming),
                None => {
                    let row = self.lists.len();
                    debug!("New package {} in the index", incoming.uid());
                    self.lookup.insert(incoming.uid().to_string(), row);
                    self.lists.push(incoming);
                    self.notifier.emit(ChangeEvent::Inserted {
                        first: row,
                        last: row,
                    });
                }
            }
        }
    }
}

impl MetaEntity for Index {
    fn local_filename(&self) -> String {
        "index.json".to_string()
    }

    fn load_state(&self) -> &LoadState {
        &self.state
    }

    fn load_state_mut(&mut self) -> &mut LoadState {
        &mut self.state
    }

    fn parse(doc: &serde_json::Value, filename: &str) -> LauncherResult<Self> {
        format::parse_index(doc, filename)
    }
}
