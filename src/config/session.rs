//! Session cookie configuration.

use serde::Deserialize;
use std::time::Duration;

use super::defaults::{
    default_cookie_name, default_refresh_threshold_secs, default_session_ttl_secs, default_true,
};
use crate::session::SessionSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
    /// Sessions with less than this left are rotated (default: 600).
    #[serde(default = "default_refresh_threshold_secs")]
    pub refresh_threshold_secs: u64,
    /// Mark cookies `Secure`. Disable only for plain-HTTP development.
    #[serde(default = "default_true")]
    pub secure_cookies: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            ttl_secs: default_session_ttl_secs(),
            refresh_threshold_secs: default_refresh_threshold_secs(),
            secure_cookies: true,
        }
    }
}

impl SessionConfig {
    pub fn settings(&self) -> SessionSettings {
        SessionSettings {
            cookie_name: self.cookie_name.clone(),
            ttl: Duration::from_secs(self.ttl_secs),
            refresh_threshold: Duration::from_secs(self.refresh_threshold_secs),
            secure_cookies: self.secure_cookies,
        }
    }
}
