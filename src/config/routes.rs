//! Path blocking and route protection configuration.

use serde::Deserialize;

use super::defaults::{default_blocked_patterns, default_protected_rules, default_public_prefixes};
use crate::filter::{RouteRule, RouteTable};
use crate::security::PathBlocklist;

/// ```toml
/// [routes]
/// blocked = ['^/\.git', '\.php$']
/// public = ["/admin/approve"]
///
/// [[routes.protected]]
/// prefix = "/k-col/calculator"
/// requires = { permission = "column" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RoutesConfig {
    /// Regexes for paths answered with an empty 404.
    #[serde(default = "default_blocked_patterns")]
    pub blocked: Vec<String>,
    /// Prefixes exempt from every protection rule.
    #[serde(default = "default_public_prefixes")]
    pub public: Vec<String>,
    #[serde(default = "default_protected_rules")]
    pub protected: Vec<RouteRule>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            blocked: default_blocked_patterns(),
            public: default_public_prefixes(),
            protected: default_protected_rules(),
        }
    }
}

impl RoutesConfig {
    pub fn table(&self) -> RouteTable {
        RouteTable::new(self.public.clone(), self.protected.clone())
    }

    pub fn blocklist(&self) -> Result<PathBlocklist, regex::Error> {
        PathBlocklist::new(&self.blocked)
    }
}
