mod installer;
mod operations;

pub use installer::{
    install_and_exit, relaunch_args, OsFs, ProcessRelauncher, Relauncher, UpdateFs,
    UpdateInstaller,
};
pub use operations::{parse_operations, Operation};
