// ─── Meta ───
// Network/cache-backed version metadata: the package index, one version list
// per package and the versions in it. Entities load from `meta/` first and
// then from the meta server, merging new data into the live objects.

mod entity;
mod format;
mod index;
mod version;
mod version_list;

pub use entity::{
    complete_remote_update, load, load_local, start_remote_update, LoadMode, LoadState,
    Mergeable, MetaEntity, RemoteUpdate, UpdateStatus,
};
pub use format::{
    parse_index, parse_release_time, parse_version, parse_version_list, CURRENT_FORMAT_VERSION,
};
pub use index::Index;
pub use version::{Require, Version};
pub use version_list::VersionList;
