use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};

fn default_mode() -> u32 {
    0o644
}

/// One step of an update, as listed by the update server.
///
/// `dest` is relative to the install root. `file` is the staged download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operation {
    #[serde(alias = "Replace")]
    Replace {
        file: PathBuf,
        dest: String,
        #[serde(default = "default_mode")]
        mode: u32,
    },
    #[serde(alias = "Delete")]
    Delete { dest: String },
}

impl Operation {
    pub fn dest(&self) -> &str {
        match self {
            Operation::Replace { dest, .. } | Operation::Delete { dest } => dest,
        }
    }
}

pub fn parse_operations(json: &[u8]) -> LauncherResult<Vec<Operation>> {
    serde_json::from_slice(json)
        .map_err(|e| LauncherError::parse("update operations", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_operation_list() {
        let json = br#"[
            { "type": "replace", "file": "/tmp/update/MultiMC", "dest": "bin/MultiMC", "mode": 493 },
            { "type": "Delete", "file": "", "dest": "lib/old.so" },
            { "type": "replace", "file": "/tmp/update/notes.txt", "dest": "notes.txt" }
        ]"#;
        let ops = parse_operations(json).unwrap();
        assert_eq!(
            ops[0],
            Operation::Replace {
                file: PathBuf::from("/tmp/update/MultiMC"),
                dest: "bin/MultiMC".into(),
                mode: 0o755,
            }
        );
        assert_eq!(ops[1], Operation::Delete { dest: "lib/old.so".into() });
        assert_eq!(ops[2].dest(), "notes.txt");
        assert!(matches!(ops[2], Operation::Replace { mode: 0o644, .. }));
    }

    #[test]
    fn unknown_operation_is_rejected() {
        assert!(parse_operations(br#"[{ "type": "chmod", "dest": "x" }]"#).is_err());
    }
}
