// ─── Platform Rules ───
// Evaluates Mojang-style `rules` arrays that switch libraries on or off per OS.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Operating systems as named by version files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    Windows,
    Osx,
    Linux,
    #[serde(other)]
    Other,
}

impl OperatingSystem {
    /// Parse the OS key used in `natives` and `rules` objects.
    pub fn from_mojang_name(name: &str) -> Self {
        match name {
            "windows" => OperatingSystem::Windows,
            "osx" => OperatingSystem::Osx,
            "linux" => OperatingSystem::Linux,
            _ => OperatingSystem::Other,
        }
    }

    pub fn mojang_name(&self) -> &'static str {
        match self {
            OperatingSystem::Windows => "windows",
            OperatingSystem::Osx => "osx",
            OperatingSystem::Linux => "linux",
            OperatingSystem::Other => "other",
        }
    }

    /// The OS this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            OperatingSystem::Windows
        } else if cfg!(target_os = "macos") {
            OperatingSystem::Osx
        } else if cfg!(target_os = "linux") {
            OperatingSystem::Linux
        } else {
            OperatingSystem::Other
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mojang_name())
    }
}

/// The platform rules are evaluated against.
///
/// Threaded explicitly through rule evaluation and library finalization so
/// other platforms can be simulated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: OperatingSystem,
    pub os_version: String,
}

impl Platform {
    pub fn new(os: OperatingSystem, os_version: impl Into<String>) -> Self {
        Self {
            os,
            os_version: os_version.into(),
        }
    }

    /// The platform the launcher is running on.
    pub fn host() -> Self {
        Self {
            os: OperatingSystem::current(),
            os_version: sysinfo::System::os_version().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

/// OS version constraint, compiled once when the rule is read.
#[derive(Debug, Clone)]
pub struct VersionPattern {
    source: String,
    /// `None` when the pattern doesn't compile; such a rule never matches.
    regex: Option<Regex>,
}

impl VersionPattern {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let regex = match Regex::new(&source) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Invalid OS version pattern {:?} in rule: {}", source, e);
                None
            }
        };
        Self { source, regex }
    }

    fn is_match(&self, os_version: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(os_version))
    }
}

impl PartialEq for VersionPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for VersionPattern {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulePredicate {
    /// No `os` constraint: the rule always applies.
    Implicit,
    OsMatch {
        os: OperatingSystem,
        version: Option<VersionPattern>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRule", into = "RawRule")]
pub struct Rule {
    pub action: RuleAction,
    pub predicate: RulePredicate,
}

/// Verdict of a single rule for a platform. `Defer` means "no opinion".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleVerdict {
    Allow,
    Disallow,
    Defer,
}

impl Rule {
    pub fn allow() -> Self {
        Self {
            action: RuleAction::Allow,
            predicate: RulePredicate::Implicit,
        }
    }

    pub fn for_os(action: RuleAction, os: OperatingSystem) -> Self {
        Self {
            action,
            predicate: RulePredicate::OsMatch { os, version: None },
        }
    }

    pub fn verdict(&self, platform: &Platform) -> RuleVerdict {
        if !self.predicate.matches(platform) {
            return RuleVerdict::Defer;
        }
        match self.action {
            RuleAction::Allow => RuleVerdict::Allow,
            RuleAction::Disallow => RuleVerdict::Disallow,
        }
    }
}

impl RulePredicate {
    fn matches(&self, platform: &Platform) -> bool {
        match self {
            RulePredicate::Implicit => true,
            RulePredicate::OsMatch { os, version } => {
                *os == platform.os
                    && version
                        .as_ref()
                        .map_or(true, |pattern| pattern.is_match(&platform.os_version))
            }
        }
    }
}

/// Decide whether something guarded by `rules` is active on `platform`.
///
/// An empty rule list means active. Otherwise the last rule that matches the
/// platform wins, and no match at all means inactive.
pub fn evaluate(rules: &[Rule], platform: &Platform) -> bool {
    if rules.is_empty() {
        return true;
    }

    let verdict = rules
        .iter()
        .map(|rule| rule.verdict(platform))
        .fold(RuleVerdict::Defer, |acc, verdict| match verdict {
            RuleVerdict::Defer => acc,
            decided => decided,
        });

    verdict == RuleVerdict::Allow
}

// ─── JSON shape ───

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawRule {
    action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    os: Option<OsRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OsRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

impl From<RawRule> for Rule {
    fn from(raw: RawRule) -> Self {
        let predicate = match raw.os {
            Some(OsRule {
                name: Some(name),
                version,
            }) => RulePredicate::OsMatch {
                os: OperatingSystem::from_mojang_name(&name),
                version: version.map(VersionPattern::new),
            },
            _ => RulePredicate::Implicit,
        };
        Rule {
            action: raw.action,
            predicate,
        }
    }
}

impl From<Rule> for RawRule {
    fn from(rule: Rule) -> Self {
        let os = match rule.predicate {
            RulePredicate::Implicit => None,
            RulePredicate::OsMatch { os, version } => Some(OsRule {
                name: Some(os.mojang_name().to_string()),
                version: version.map(|pattern| pattern.source),
            }),
        };
        RawRule {
            action: rule.action,
            os,
        }
    }
}
