//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use super::security::MIN_SECRET_LEN;
use crate::accounts::is_plausible_email;
use crate::security::password::is_valid_hash;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("security.signing_secret is empty")]
    EmptySigningSecret,
    #[error("security.signing_secret is {0} bytes; at least {min} required", min = MIN_SECRET_LEN)]
    WeakSigningSecret(usize),
    #[error("security.token_validity_secs must be greater than 0")]
    ZeroTokenValidity,
    #[error("security.rate_limit.max_requests must be greater than 0")]
    ZeroRateLimit,
    #[error("security.rate_limit.window_ms must be greater than 0")]
    ZeroRateWindow,
    #[error("security.rate_limit.sweep_interval_secs must be greater than 0")]
    ZeroSweepInterval,
    #[error("server.public_url is not an absolute http(s) URL: {0}")]
    InvalidPublicUrl(String),
    #[error("server.login_path must start with '/': {0}")]
    InvalidLoginPath(String),
    #[error("session.refresh_threshold_secs must be less than session.ttl_secs")]
    RefreshThresholdTooLarge,
    #[error("routes.blocked pattern '{pattern}' is invalid: {reason}")]
    InvalidBlockedPattern { pattern: String, reason: String },
    #[error("routes.protected prefix must start with '/': {0}")]
    InvalidRoutePrefix(String),
    #[error("login path {0} is itself protected; redirects would loop")]
    LoginPathProtected(String),
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
    #[error("notify.webhook_url is not an absolute http(s) URL: {0}")]
    InvalidWebhookUrl(String),
    #[error("notify.webhook_timeout_secs must be greater than 0")]
    ZeroWebhookTimeout,
    #[error("notify.outbox_path parent directory does not exist: {0}")]
    OutboxPathInvalid(String),
    #[error("admins entry '{email}': {reason}")]
    InvalidAdmin { email: String, reason: &'static str },
}

impl ValidationError {
    /// Problems an operator may explicitly accept for development.
    pub fn is_insecure_secret(&self) -> bool {
        matches!(self, Self::WeakSigningSecret(_))
    }
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let secret = &config.security.signing_secret;
    if secret.is_empty() {
        errors.push(ValidationError::EmptySigningSecret);
    } else if secret.len() < MIN_SECRET_LEN {
        errors.push(ValidationError::WeakSigningSecret(secret.len()));
    }
    if config.security.token_validity_secs == 0 {
        errors.push(ValidationError::ZeroTokenValidity);
    }

    let rate = &config.security.rate_limit;
    if rate.max_requests == 0 {
        errors.push(ValidationError::ZeroRateLimit);
    }
    if rate.window_ms == 0 {
        errors.push(ValidationError::ZeroRateWindow);
    }
    if rate.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroSweepInterval);
    }

    let public_url = &config.server.public_url;
    match url::Url::parse(public_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        _ => errors.push(ValidationError::InvalidPublicUrl(public_url.clone())),
    }

    let login_path = &config.server.login_path;
    if !login_path.starts_with('/') {
        errors.push(ValidationError::InvalidLoginPath(login_path.clone()));
    } else if config.routes.table().classify(login_path).is_some() {
        errors.push(ValidationError::LoginPathProtected(login_path.clone()));
    }

    if config.session.refresh_threshold_secs >= config.session.ttl_secs {
        errors.push(ValidationError::RefreshThresholdTooLarge);
    }

    for pattern in &config.routes.blocked {
        if let Err(e) = regex::Regex::new(pattern) {
            errors.push(ValidationError::InvalidBlockedPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            });
        }
    }
    for rule in &config.routes.protected {
        if !rule.prefix.starts_with('/') {
            errors.push(ValidationError::InvalidRoutePrefix(rule.prefix.clone()));
        }
    }

    if let Some(ref db) = config.database {
        let db_path = Path::new(&db.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::DatabasePathInvalid(db.path.clone()));
        }
    }

    let notify = &config.notify;
    if let Some(ref hook) = notify.webhook_url {
        match url::Url::parse(hook) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            _ => errors.push(ValidationError::InvalidWebhookUrl(hook.clone())),
        }
        if notify.webhook_timeout_secs == 0 {
            errors.push(ValidationError::ZeroWebhookTimeout);
        }
    }
    if let Some(ref outbox) = notify.outbox_path
        && let Some(parent) = outbox.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        errors.push(ValidationError::OutboxPathInvalid(outbox.display().to_string()));
    }

    for admin in &config.admins {
        let reason = if !is_plausible_email(&admin.email) {
            Some("email is not a valid address")
        } else if !is_valid_hash(&admin.password_hash) {
            Some("password_hash is not a PHC string")
        } else {
            None
        };
        if let Some(reason) = reason {
            errors.push(ValidationError::InvalidAdmin {
                email: admin.email.clone(),
                reason,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
