// ─── InterfaceOficial Core ───
// Version metadata, the version patch engine and the self-updater.
//
// Architecture:
//   core/
//     error     Central error types
//     events    Change notifications for list-shaped models
//     maven     Library coordinates and version comparison
//     meta      Meta index, version lists and versions (cache + network)
//     net       Fetcher trait, HTTP client and the meta file cache
//     state     AppContext and launcher settings
//     updater   Self-update installer with rollback
//     version   Rules, libraries, version files, builder and profile

pub mod error;
pub mod events;
pub mod maven;
pub mod meta;
pub mod net;
pub mod state;
pub mod updater;
pub mod version;
