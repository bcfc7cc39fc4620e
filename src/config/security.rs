//! Security configuration for approval tokens and rate limiting.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::defaults::{
    default_clock_skew_secs, default_max_requests, default_max_token_len, default_signing_secret,
    default_sweep_interval_secs, default_token_validity_secs, default_window_ms,
};
use crate::filter::RateLimitPolicy;
use crate::security::{SigningKey, TokenPolicy};

/// Minimum signing secret length, in bytes, accepted without an override.
pub const MIN_SECRET_LEN: usize = 32;

/// HMAC signing secret as configured. Redacted in `Debug`.
#[derive(Clone, Default, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SigningSecret(String);

impl SigningSecret {
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_key(&self) -> SigningKey {
        SigningKey::new(self.0.as_bytes().to_vec())
    }
}

impl From<String> for SigningSecret {
    fn from(secret: String) -> Self {
        Self(secret)
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret(<{} bytes redacted>)", self.0.len())
    }
}

fn default_secret() -> SigningSecret {
    default_signing_secret().into()
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Secret key for approval-link HMACs. Keep private; at least 32 bytes.
    #[serde(default = "default_secret")]
    pub signing_secret: SigningSecret,
    /// Approval link lifetime (default: 48 hours).
    #[serde(default = "default_token_validity_secs")]
    pub token_validity_secs: u64,
    /// Tolerated clock difference when checking expiry (default: 60).
    #[serde(default = "default_clock_skew_secs")]
    pub clock_skew_secs: u64,
    /// Longest token accepted before decoding (default: 500).
    #[serde(default = "default_max_token_len")]
    pub max_token_len: usize,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            signing_secret: default_secret(),
            token_validity_secs: default_token_validity_secs(),
            clock_skew_secs: default_clock_skew_secs(),
            max_token_len: default_max_token_len(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl SecurityConfig {
    pub fn token_policy(&self) -> TokenPolicy {
        TokenPolicy {
            validity: Duration::from_secs(self.token_validity_secs),
            clock_skew: Duration::from_secs(self.clock_skew_secs),
            max_len: self.max_token_len,
        }
    }
}

/// Per-client request rate limiting.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per window (default: 10).
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Window length in milliseconds (default: 1000).
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    /// How often expired counters are dropped (default: 300).
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl RateLimitConfig {
    pub fn policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            max_requests: self.max_requests,
            window: Duration::from_millis(self.window_ms),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_is_redacted_in_debug() {
        let config: SecurityConfig =
            toml::from_str("signing_secret = \"super-secret-value-0123456789abcdef\"").unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("35 bytes redacted"));
    }

    #[test]
    fn missing_secret_gets_random_default() {
        let a = SecurityConfig::default();
        let b = SecurityConfig::default();
        assert!(a.signing_secret.len() >= MIN_SECRET_LEN);
        assert_ne!(a.signing_secret.expose(), b.signing_secret.expose());
    }

    #[test]
    fn policies_follow_config() {
        let config: SecurityConfig = toml::from_str(
            r#"
            token_validity_secs = 600
            clock_skew_secs = 5
            [rate_limit]
            max_requests = 3
            window_ms = 250
            "#,
        )
        .unwrap();
        let token = config.token_policy();
        assert_eq!(token.validity, Duration::from_secs(600));
        assert_eq!(token.clock_skew, Duration::from_secs(5));
        assert_eq!(token.max_len, 500);

        let rate = config.rate_limit.policy();
        assert_eq!(rate.max_requests, 3);
        assert_eq!(rate.window, Duration::from_millis(250));
        assert_eq!(config.rate_limit.sweep_interval(), Duration::from_secs(300));
    }
}
