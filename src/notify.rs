//! Approval-request notification.
//!
//! When an account registers, every admin is sent the approval link.
//! Delivery is pluggable through [`Notifier`]:
//!
//! - [`WebhookNotifier`] POSTs the request as JSON to a mail relay or chat hook
//! - [`OutboxNotifier`] appends it as a JSON line to a local file
//! - [`LogNotifier`] only records that a link was issued

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Path of the approval endpoint, appended to the public base URL.
pub const APPROVE_PATH: &str = "/admin/approve";

/// One pending account waiting for an admin.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalRequest {
    pub account_id: Uuid,
    pub account_label: String,
    pub recipients: Vec<String>,
    pub approval_url: String,
    /// Unix milliseconds.
    pub expires_at_ms: i64,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn approval_requested(&self, request: &ApprovalRequest) -> Result<(), NotifyError>;
}

/// Logs approval requests instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn approval_requested(&self, request: &ApprovalRequest) -> Result<(), NotifyError> {
        // The URL is a bearer credential; log where it went, not what it is.
        info!(
            account_id = %request.account_id,
            account = %request.account_label,
            recipients = request.recipients.len(),
            expires_at_ms = request.expires_at_ms,
            "approval link issued"
        );
        Ok(())
    }
}

/// POSTs each request as JSON. Any non-2xx answer counts as a failure.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn approval_requested(&self, request: &ApprovalRequest) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.without_url().to_string()))?;
        response
            .error_for_status()
            .map_err(|e| NotifyError::Delivery(e.without_url().to_string()))?;
        debug!(account_id = %request.account_id, "approval request posted to webhook");
        Ok(())
    }
}

/// Appends each request as one JSON line. An external mailer drains the file.
#[derive(Debug)]
pub struct OutboxNotifier {
    path: PathBuf,
    write: Mutex<()>,
}

impl OutboxNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write: Mutex::new(()),
        }
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn approval_requested(&self, request: &ApprovalRequest) -> Result<(), NotifyError> {
        let mut line =
            serde_json::to_vec(request).map_err(|e| NotifyError::Delivery(e.to_string()))?;
        line.push(b'\n');

        // One writer at a time keeps lines whole.
        let _guard = self.write.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| NotifyError::Delivery(format!("{}: {e}", self.path.display())))?;
        file.write_all(&line)
            .await
            .map_err(|e| NotifyError::Delivery(format!("{}: {e}", self.path.display())))?;
        file.flush()
            .await
            .map_err(|e| NotifyError::Delivery(format!("{}: {e}", self.path.display())))?;
        Ok(())
    }
}

/// Build the approval URL for `token` under `base_url`.
///
/// Tokens are base64url, so they go into the query string unescaped.
pub fn approval_url(base_url: &str, token: &str) -> String {
    format!(
        "{}{}?token={}",
        base_url.trim_end_matches('/'),
        APPROVE_PATH,
        token
    )
}
