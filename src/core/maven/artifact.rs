use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::core::error::{LauncherError, LauncherResult};

/// Represents a fully parsed Maven coordinate.
///
/// Supported formats:
///   `groupId:artifactId:version`
///   `groupId:artifactId:version:classifier`
///   `groupId:artifactId:version@packaging`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MavenArtifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    /// File extension / packaging type. Defaults to `"jar"`.
    pub packaging: String,
}

impl MavenArtifact {
    /// Parse a Maven coordinate string.
    ///
    /// # Examples
    /// ```
    /// use interface_core::core::maven::MavenArtifact;
    /// let a = MavenArtifact::parse("net.sf.jopt-simple:jopt-simple:5.0.4").unwrap();
    /// assert_eq!(a.group_id, "net.sf.jopt-simple");
    /// ```
    pub fn parse(coord: &str) -> LauncherResult<Self> {
        let (coord_part, packaging_override) = match coord.rfind('@') {
            Some(idx) => (&coord[..idx], Some(&coord[idx + 1..])),
            None => (coord, None),
        };

        let parts: Vec<&str> = coord_part.split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(LauncherError::InvalidMavenCoordinate(coord.to_string()));
        }

        let packaging = packaging_override.unwrap_or("jar").to_string();
        match parts.len() {
            3 => Ok(Self {
                group_id: parts[0].to_string(),
                artifact_id: parts[1].to_string(),
                version: parts[2].to_string(),
                classifier: None,
                packaging,
            }),
            4 => Ok(Self {
                group_id: parts[0].to_string(),
                artifact_id: parts[1].to_string(),
                version: parts[2].to_string(),
                classifier: Some(parts[3].to_string()),
                packaging,
            }),
            _ => Err(LauncherError::InvalidMavenCoordinate(coord.to_string())),
        }
    }

    /// Construct the group path portion (`net/sf/jopt-simple`).
    pub fn group_path(&self) -> String {
        self.group_id.replace('.', "/")
    }

    /// `artifactId-version[-classifier][-suffix].packaging`
    ///
    /// `native_suffix` is the per-OS classifier of a native library.
    pub fn filename_with_suffix(&self, native_suffix: Option<&str>) -> String {
        let mut name = format!("{}-{}", self.artifact_id, self.version);
        if let Some(c) = &self.classifier {
            name.push('-');
            name.push_str(c);
        }
        if let Some(s) = native_suffix {
            name.push('-');
            name.push_str(s);
        }
        name.push('.');
        name.push_str(&self.packaging);
        name
    }

    pub fn filename(&self) -> String {
        self.filename_with_suffix(None)
    }

    /// Path relative to a Maven repository root, always `/`-separated so it
    /// can be appended to a URL as well as joined onto a directory.
    ///
    /// `<group_path>/<artifact_id>/<version>/<filename>`
    pub fn storage_path(&self, native_suffix: Option<&str>) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group_path(),
            self.artifact_id,
            self.version,
            self.filename_with_suffix(native_suffix)
        )
    }

    /// `group:artifact` without version, used to identify "the same library".
    pub fn artifact_prefix(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    /// Wildcard pattern matching this library in any version:
    /// `group:artifact:*[:classifier]`.
    pub fn any_version_pattern(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}:*:{}", self.artifact_prefix(), c),
            None => format!("{}:*", self.artifact_prefix()),
        }
    }
}

impl fmt::Display for MavenArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if let Some(c) = &self.classifier {
            write!(f, ":{}", c)?;
        }
        if self.packaging != "jar" {
            write!(f, "@{}", self.packaging)?;
        }
        Ok(())
    }
}

fn parse_numeric_version_parts(raw: &str) -> Vec<u32> {
    raw.split(|c: char| !c.is_ascii_digit())
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| segment.parse::<u32>().ok())
        .collect()
}

/// Compare two library versions by their numeric components.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_parts = parse_numeric_version_parts(a);
    let b_parts = parse_numeric_version_parts(b);

    let max_len = a_parts.len().max(b_parts.len());
    for idx in 0..max_len {
        let a_val = a_parts.get(idx).copied().unwrap_or(0);
        let b_val = b_parts.get(idx).copied().unwrap_or(0);
        match a_val.cmp(&b_val) {
            Ordering::Equal => continue,
            non_eq => return non_eq,
        }
    }

    // Deterministic tiebreaker for versions with identical numeric parts.
    a.cmp(b)
}
