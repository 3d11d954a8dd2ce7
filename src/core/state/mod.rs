mod app_state;

pub use app_state::{AppContext, LauncherSettings, DEFAULT_META_URL};
