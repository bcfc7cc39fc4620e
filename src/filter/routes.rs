//! Static route protection table.

use crate::accounts::Feature;
use crate::session::Principal;
use serde::{Deserialize, Serialize};

/// What a principal needs to reach a protected prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// Any resolved session.
    Authenticated,
    /// An account an admin has approved. Admins always pass.
    Approved,
    Admin,
    /// An approved account licensed for the feature. Admins always pass.
    Permission(Feature),
}

impl Requirement {
    pub fn is_satisfied_by(self, principal: &Principal) -> bool {
        if principal.is_admin() {
            return true;
        }
        match self {
            Self::Authenticated => true,
            Self::Approved => principal.approved,
            Self::Admin => false,
            Self::Permission(feature) => principal.approved && principal.has_feature(feature),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    pub prefix: String,
    pub requires: Requirement,
}

impl RouteRule {
    pub fn new(prefix: impl Into<String>, requires: Requirement) -> Self {
        Self {
            prefix: prefix.into(),
            requires,
        }
    }
}

/// Prefix table consulted by the route authorization stage.
///
/// Prefixes match on path-segment boundaries: `/admin` covers `/admin` and
/// `/admin/users` but not `/administrator`. `public` prefixes are checked
/// first and exempt a path from every rule. Otherwise the rule with the
/// longest matching prefix applies, so declaration order does not matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    #[serde(default)]
    pub public: Vec<String>,
    #[serde(default, rename = "protected")]
    pub rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn new(public: Vec<String>, rules: Vec<RouteRule>) -> Self {
        Self { public, rules }
    }

    /// The rule guarding `path`, or `None` when the path is open.
    pub fn classify(&self, path: &str) -> Option<&RouteRule> {
        if self.public.iter().any(|p| covers(p, path)) {
            return None;
        }
        self.rules
            .iter()
            .filter(|r| covers(&r.prefix, path))
            .max_by_key(|r| r.prefix.len())
    }
}

/// Whether `prefix` covers `path` on a segment boundary.
fn covers(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        let mut rules: Vec<RouteRule> = [
            "/k-col/auto-find-section",
            "/k-col/calculator",
            "/k-col/boq-report",
            "/k-col/user-guide",
            "/k-col/developer-guide",
            "/k-col/print",
            "/k-col/calc-data-1",
            "/k-col/calc-data-2",
        ]
        .into_iter()
        .map(|prefix| RouteRule::new(prefix, Requirement::Authenticated))
        .collect();
        rules.push(RouteRule::new("/admin", Requirement::Admin));

        Self {
            public: vec!["/admin/approve".to_string()],
            rules,
        }
    }
}
