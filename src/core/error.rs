use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the launcher core.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("Checksum mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Maven ───────────────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unable to process {file}: {message}")]
    Parse { file: String, message: String },

    #[error("{file} uses unknown format version {version}")]
    UnknownFormatVersion { file: String, version: i64 },

    // ── Version building ────────────────────────────────
    #[error("Error while applying {file}: {source}. Please check the launcher log for more info.")]
    VersionBuild {
        file: String,
        source: VersionBuildError,
    },

    #[error("Version metadata for {0} is not available")]
    VersionIncomplete(String),

    #[error("No patch with id {0}")]
    PatchNotFound(String),

    #[error("Patch {0} is built in and cannot be changed")]
    PatchProtected(String),

    // ── Self-update ─────────────────────────────────────
    #[error(transparent)]
    Update(#[from] UpdateError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Fatal semantic errors raised while applying one patch onto a version model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionBuildError {
    #[error("the file requires launcher version {required}, this launcher supports {supported}")]
    LauncherVersionTooNew { required: i64, supported: i64 },

    #[error("the file is for Minecraft {expected}, not {actual}")]
    McVersionMismatch { expected: String, actual: String },

    #[error("cannot resolve library dependency between {existing} and {incoming}")]
    DependencyConflict { existing: String, incoming: String },

    #[error("{count} libraries match {pattern}")]
    AmbiguousLibraryMatch { pattern: String, count: usize },

    #[error("{first} has the same order ({order}) as {second}")]
    OrderCollision {
        first: String,
        second: String,
        order: i64,
    },
}

/// Which step of an update installation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedOperation {
    Replace,
    Delete,
    Start,
}

impl std::fmt::Display for FailedOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailedOperation::Replace => write!(f, "replace"),
            FailedOperation::Delete => write!(f, "delete"),
            FailedOperation::Start => write!(f, "start"),
        }
    }
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Couldn't prepare backup folder {path:?}: {source}")]
    BackupFolder {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The update failed and every change was reverted.
    #[error("Update failed ({operation} of {file}): {reason}. Changes were reverted.")]
    RolledBack {
        operation: FailedOperation,
        file: String,
        reason: String,
    },

    /// The update failed and reverting it failed too. The install directory
    /// needs manual repair from the backup folder.
    #[error(
        "Update failed ({operation} of {file}): {reason}. Rollback failed for {}; \
         restore them manually from {backup_dir:?}",
        .rollback_failures.join(", ")
    )]
    RollbackFailed {
        operation: FailedOperation,
        file: String,
        reason: String,
        backup_dir: PathBuf,
        rollback_failures: Vec<String>,
    },
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl LauncherError {
    pub(crate) fn parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        LauncherError::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }
}

// ── Serialization for UI bridges ────────────────────────
// Frontends receive errors as plain messages.
impl serde::Serialize for LauncherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_build_error_names_the_file() {
        let err = LauncherError::VersionBuild {
            file: "patches/forge.json".into(),
            source: VersionBuildError::LauncherVersionTooNew {
                required: 99,
                supported: 18,
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("patches/forge.json"));
        assert!(msg.contains("99"));
    }

    #[test]
    fn errors_serialize_as_messages() {
        let err = LauncherError::PatchNotFound("net.fabricmc".into());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"No patch with id net.fabricmc\"");
    }
}
