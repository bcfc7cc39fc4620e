//! Scanner path blocking.
//!
//! Requests for well-known scanner targets (VCS metadata, dotenv files,
//! WordPress admin, PHP scripts) are answered with a bare 404 before any
//! other work happens.

use regex::Regex;

/// Patterns blocked when the config does not override them.
pub const DEFAULT_BLOCKED_PATTERNS: &[&str] =
    &[r"^/\.git", r"^/\.env", r"/wp-admin", r"/wp-login", r"\.php$"];

/// Compiled set of blocked path patterns.
#[derive(Debug, Clone)]
pub struct PathBlocklist {
    patterns: Vec<Regex>,
}

impl PathBlocklist {
    /// Compile `patterns`. Fails on the first invalid expression.
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Return the first pattern matching `path`, if any.
    pub fn matches(&self, path: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|re| re.is_match(path))
            .map(Regex::as_str)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for PathBlocklist {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCKED_PATTERNS).expect("default blocked patterns are valid")
    }
}
