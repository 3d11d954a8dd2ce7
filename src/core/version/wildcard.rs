// ─── Wildcard Patterns ───
// Unix-style `*` / `?` patterns used to find libraries and to check the
// Minecraft version a patch is written for.

use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone)]
pub struct Wildcard {
    regex: Option<Regex>,
}

impl Wildcard {
    pub fn new(pattern: &str) -> Self {
        Self::build(pattern, false)
    }

    pub fn case_insensitive(pattern: &str) -> Self {
        Self::build(pattern, true)
    }

    fn build(pattern: &str, case_insensitive: bool) -> Self {
        let mut translated = String::with_capacity(pattern.len() + 8);
        translated.push('^');
        for ch in pattern.chars() {
            match ch {
                '*' => translated.push_str(".*"),
                '?' => translated.push('.'),
                other => translated.push_str(&regex::escape(&other.to_string())),
            }
        }
        translated.push('$');

        // Every metacharacter except the two wildcards is escaped above, so
        // this only fails for absurdly large patterns. Those match nothing.
        let regex = RegexBuilder::new(&translated)
            .case_insensitive(case_insensitive)
            .build()
            .ok();

        Self { regex }
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex
            .as_ref()
            .is_some_and(|regex| regex.is_match(candidate))
    }
}
