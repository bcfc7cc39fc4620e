//! Approval-link delivery and seeded admin accounts.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::default_webhook_timeout_secs;

/// Where approval links go. The webhook wins over the outbox; with neither,
/// links are only logged.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// Endpoint receiving each approval request as a JSON POST.
    pub webhook_url: Option<String>,
    #[serde(default = "default_webhook_timeout_secs")]
    pub webhook_timeout_secs: u64,
    /// File receiving each approval request as a JSON line.
    pub outbox_path: Option<PathBuf>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            webhook_timeout_secs: default_webhook_timeout_secs(),
            outbox_path: None,
        }
    }
}

impl NotifyConfig {
    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs)
    }
}

/// An admin account created at startup when its email is not yet registered.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminAccount {
    pub email: String,
    /// Argon2 PHC string, as printed by `steelgate hash-password`.
    pub password_hash: String,
}

#[cfg(test)]
mod tests {
    use super::super::Config;

    #[test]
    fn parses_admins_and_notify() {
        let config: Config = toml::from_str(
            r#"
[notify]
webhook_url = "https://relay.example.com/hook"
outbox_path = "/var/spool/steelgate/outbox.jsonl"

[[admins]]
email = "root@steel.co.kr"
password_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"
"#,
        )
        .unwrap();
        assert_eq!(
            config.notify.webhook_url.as_deref(),
            Some("https://relay.example.com/hook")
        );
        assert_eq!(config.notify.webhook_timeout_secs, 10);
        assert_eq!(config.admins.len(), 1);
        assert_eq!(config.admins[0].email, "root@steel.co.kr");
    }
}
