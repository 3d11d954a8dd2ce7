// ─── Update Installer ───
// Applies a downloaded update to the install directory while the old
// binary is still running, then starts the new one.
//
//   1. empty `update/backup`
//   2. run operations, moving every displaced file into the backup
//   3. on any failure, put everything back
//   4. relaunch with the original arguments

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::core::error::{FailedOperation, LauncherError, LauncherResult, UpdateError};

use super::operations::Operation;

/// File system calls made by the installer.
pub trait UpdateFs {
    fn exists(&self, path: &Path) -> bool;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()>;
}

/// The real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl UpdateFs for OsFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        match std::fs::remove_dir_all(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    #[cfg(unix)]
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
    }

    #[cfg(not(unix))]
    fn set_mode(&self, _path: &Path, _mode: u32) -> io::Result<()> {
        Ok(())
    }
}

/// Starts the updated application.
pub trait Relauncher {
    fn relaunch(&self, program: &Path, args: &[String]) -> io::Result<()>;
}

/// Spawns the program as a detached child process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRelauncher;

impl Relauncher for ProcessRelauncher {
    fn relaunch(&self, program: &Path, args: &[String]) -> io::Result<()> {
        let child = std::process::Command::new(program).args(args).spawn()?;
        info!("Started {:?} as pid {}", program, child.id());
        Ok(())
    }
}

/// A file moved aside by the update.
#[derive(Debug, Clone)]
struct Backup {
    original: PathBuf,
    backup: PathBuf,
}

/// A staged file moved into place, and what it displaced.
#[derive(Debug, Clone)]
struct Placed {
    staged: PathBuf,
    destination: PathBuf,
    displaced: Option<Backup>,
}

#[derive(Debug)]
struct Failure {
    operation: FailedOperation,
    file: String,
    reason: String,
}

pub struct UpdateInstaller<F: UpdateFs, R: Relauncher> {
    root: PathBuf,
    operations: Vec<Operation>,
    program: PathBuf,
    args: Vec<String>,
    fs: F,
    relauncher: R,
}

impl UpdateInstaller<OsFs, ProcessRelauncher> {
    /// Installer that relaunches the running executable with its own
    /// arguments.
    pub fn for_current_process(root: PathBuf, operations: Vec<Operation>) -> LauncherResult<Self> {
        let program = std::env::current_exe().map_err(|e| LauncherError::io("current_exe", e))?;
        let args = std::env::args().skip(1).collect();
        Ok(Self::new(root, operations, program, args, OsFs, ProcessRelauncher))
    }
}

impl<F: UpdateFs, R: Relauncher> UpdateInstaller<F, R> {
    pub fn new(
        root: PathBuf,
        operations: Vec<Operation>,
        program: PathBuf,
        args: Vec<String>,
        fs: F,
        relauncher: R,
    ) -> Self {
        Self {
            root,
            operations,
            program,
            args,
            fs,
            relauncher,
        }
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.join("update").join("backup")
    }

    /// Run every operation and relaunch. Any failure is rolled back.
    pub fn install(&self) -> Result<(), UpdateError> {
        info!("Installing {} update operations", self.operations.len());
        let backup_dir = self.backup_dir();

        if let Err(e) = self.fs.remove_dir_all(&backup_dir) {
            warn!("Couldn't remove previous backup folder {:?}: {}", backup_dir, e);
        }
        self.fs
            .create_dir_all(&backup_dir)
            .map_err(|source| UpdateError::BackupFolder {
                path: backup_dir.clone(),
                source,
            })?;

        let mut names = HashSet::new();
        let mut placed = Vec::new();
        let mut trashed = Vec::new();

        let result = self
            .run_operations(&backup_dir, &mut names, &mut placed, &mut trashed)
            .and_then(|()| self.relaunch());

        let Err(failure) = result else {
            info!("Update installed");
            return Ok(());
        };

        error!(
            "Update failed ({} of {}): {}",
            failure.operation, failure.file, failure.reason
        );
        let rollback_failures = self.rollback(&placed, &trashed);
        if rollback_failures.is_empty() {
            Err(UpdateError::RolledBack {
                operation: failure.operation,
                file: failure.file,
                reason: failure.reason,
            })
        } else {
            Err(UpdateError::RollbackFailed {
                operation: failure.operation,
                file: failure.file,
                reason: failure.reason,
                backup_dir,
                rollback_failures,
            })
        }
    }

    fn run_operations(
        &self,
        backup_dir: &Path,
        names: &mut HashSet<String>,
        placed: &mut Vec<Placed>,
        trashed: &mut Vec<Backup>,
    ) -> Result<(), Failure> {
        for operation in &self.operations {
            match operation {
                Operation::Replace { file, dest, mode } => {
                    let fail = |reason: String| Failure {
                        operation: FailedOperation::Replace,
                        file: dest.clone(),
                        reason,
                    };
                    let destination = self.root.join(dest);

                    let displaced = if self.fs.exists(&destination) {
                        let backup = backup_dir.join(backup_name(dest, names));
                        self.fs
                            .rename(&destination, &backup)
                            .map_err(|e| fail(format!("couldn't back up: {}", e)))?;
                        Some(Backup {
                            original: destination.clone(),
                            backup,
                        })
                    } else {
                        None
                    };

                    if let Some(parent) = destination.parent() {
                        if let Err(e) = self.fs.create_dir_all(parent) {
                            trashed.extend(displaced);
                            return Err(fail(format!("couldn't create folder: {}", e)));
                        }
                    }
                    if let Err(e) = self.fs.rename(file, &destination) {
                        trashed.extend(displaced);
                        return Err(fail(format!("couldn't move new file in: {}", e)));
                    }
                    placed.push(Placed {
                        staged: file.clone(),
                        destination: destination.clone(),
                        displaced,
                    });

                    if let Err(e) = self.fs.set_mode(&destination, *mode) {
                        warn!("Couldn't set mode {:o} on {:?}: {}", mode, destination, e);
                    }
                    debug!("Replaced {}", dest);
                }
                Operation::Delete { dest } => {
                    let target = self.root.join(dest);
                    if !self.fs.exists(&target) {
                        continue;
                    }
                    let backup = backup_dir.join(backup_name(dest, names));
                    self.fs.rename(&target, &backup).map_err(|e| Failure {
                        operation: FailedOperation::Delete,
                        file: dest.clone(),
                        reason: format!("couldn't move to backup: {}", e),
                    })?;
                    trashed.push(Backup {
                        original: target,
                        backup,
                    });
                    debug!("Deleted {}", dest);
                }
            }
        }
        Ok(())
    }

    fn relaunch(&self) -> Result<(), Failure> {
        let args = relaunch_args(&self.args);
        info!("Starting {:?} {:?}", self.program, args);
        self.relauncher
            .relaunch(&self.program, &args)
            .map_err(|e| Failure {
                operation: FailedOperation::Start,
                file: self.program.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// Undo placed files and restore every backup. Keeps going past
    /// failures and returns what couldn't be restored.
    fn rollback(&self, placed: &[Placed], trashed: &[Backup]) -> Vec<String> {
        let mut failures = Vec::new();

        for entry in placed.iter().rev() {
            warn!("Reverting {:?}", entry.destination);
            if let Err(e) = self.fs.rename(&entry.destination, &entry.staged) {
                warn!("Moving new {:?} back failed: {}", entry.destination, e);
                failures.push(entry.destination.display().to_string());
                continue;
            }
            if let Some(backup) = &entry.displaced {
                if let Err(e) = self.fs.rename(&backup.backup, &backup.original) {
                    warn!("Restoring {:?} failed: {}", backup.original, e);
                    failures.push(backup.original.display().to_string());
                }
            }
        }

        for backup in trashed.iter().rev() {
            warn!("Restoring {:?} from {:?}", backup.original, backup.backup);
            if let Err(e) = self.fs.rename(&backup.backup, &backup.original) {
                warn!("Restoring {:?} failed: {}", backup.original, e);
                failures.push(backup.original.display().to_string());
            }
        }

        failures
    }
}

/// Install the update and exit so the new process takes over. Only returns
/// on failure.
pub fn install_and_exit(root: PathBuf, operations: Vec<Operation>) -> LauncherResult<()> {
    let installer = UpdateInstaller::for_current_process(root, operations)?;
    installer.install()?;
    std::process::exit(0)
}

/// Flatten a relative path into one backup file name, unique per run.
fn backup_name(dest: &str, taken: &mut HashSet<String>) -> String {
    let base = dest.replace(['/', '\\'], "_");
    let mut name = base.clone();
    let mut suffix = 1;
    while !taken.insert(name.clone()) {
        name = format!("{}.{}", base, suffix);
        suffix += 1;
    }
    name
}

/// Arguments for the relaunched process: marks it as started by an update
/// and drops `-l <instance>` so it doesn't launch an instance again.
pub fn relaunch_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len() + 1);
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "-l" {
            iter.next();
            continue;
        }
        out.push(arg.clone());
    }
    if !out.iter().any(|a| a == "--alive") {
        out.push("--alive".to_string());
    }
    out
}
