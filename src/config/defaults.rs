//! Default value functions for configuration.

use crate::filter::RouteTable;
use crate::security::path_block::DEFAULT_BLOCKED_PATTERNS;
use crate::security::token::{DEFAULT_CLOCK_SKEW, DEFAULT_MAX_TOKEN_LEN, DEFAULT_TOKEN_VALIDITY};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::net::SocketAddr;

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

pub fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

pub fn default_admin_console_url() -> String {
    "/admin".to_string()
}

pub fn default_login_path() -> String {
    "/login".to_string()
}

// =============================================================================
// Token Defaults
// =============================================================================

/// Ephemeral signing secret for deployments that configure none.
pub fn default_signing_secret() -> String {
    let secret: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect();
    tracing::warn!(
        "No signing_secret configured - using ephemeral random secret. Approval links will NOT survive a restart. Set [security].signing_secret or STEELGATE_SIGNING_SECRET for production use."
    );
    secret
}

pub fn default_token_validity_secs() -> u64 {
    DEFAULT_TOKEN_VALIDITY.as_secs()
}

pub fn default_clock_skew_secs() -> u64 {
    DEFAULT_CLOCK_SKEW.as_secs()
}

pub fn default_max_token_len() -> usize {
    DEFAULT_MAX_TOKEN_LEN
}

// =============================================================================
// Rate Limit Defaults
// =============================================================================

pub fn default_max_requests() -> u32 {
    10
}

pub fn default_window_ms() -> u64 {
    1000
}

pub fn default_sweep_interval_secs() -> u64 {
    5 * 60
}

// =============================================================================
// Session Defaults
// =============================================================================

pub fn default_cookie_name() -> String {
    "sg_session".to_string()
}

pub fn default_session_ttl_secs() -> u64 {
    60 * 60
}

pub fn default_refresh_threshold_secs() -> u64 {
    10 * 60
}

// =============================================================================
// Notification Defaults
// =============================================================================

pub fn default_webhook_timeout_secs() -> u64 {
    10
}

// =============================================================================
// Route Defaults
// =============================================================================

pub fn default_blocked_patterns() -> Vec<String> {
    DEFAULT_BLOCKED_PATTERNS.iter().map(|p| p.to_string()).collect()
}

pub fn default_public_prefixes() -> Vec<String> {
    RouteTable::default().public
}

pub fn default_protected_rules() -> Vec<crate::filter::RouteRule> {
    RouteTable::default().rules
}
