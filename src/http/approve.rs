//! `GET /admin/approve?token=...`

use super::AppState;
use super::pages::ApprovalPage;
use crate::accounts::{AccountStore, ApprovalChange, StoreError};
use crate::caps::{ApproveAccount, Cap};
use crate::error::TokenError;
use crate::metrics;
use crate::security::TokenCodec;
use crate::telemetry::spans;
use axum::extract::{RawQuery, State};
use axum::response::Response;
use tracing::{Instrument, error, info, warn};
use url::form_urlencoded;

/// Result of one approval attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
    Approved { label: String },
    AlreadyApproved { label: String },
    MissingToken,
    Rejected(TokenError),
    AccountMissing,
    StoreFailure,
}

impl ApprovalOutcome {
    /// Metric label.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Approved { .. } => "approved",
            Self::AlreadyApproved { .. } => "already_approved",
            Self::MissingToken => "missing_token",
            Self::Rejected(TokenError::Expired) => "expired",
            Self::Rejected(_) => "invalid",
            Self::AccountMissing => "not_found",
            Self::StoreFailure => "store_error",
        }
    }

    /// Page for the person who clicked the link. Token failures other than
    /// expiry all collapse into one page.
    pub fn page(self) -> ApprovalPage {
        match self {
            Self::Approved { label } => ApprovalPage::Approved { label },
            Self::AlreadyApproved { label } => ApprovalPage::AlreadyApproved { label },
            Self::MissingToken => ApprovalPage::MissingToken,
            Self::Rejected(e) if e.is_expired() => ApprovalPage::Expired,
            Self::Rejected(_) => ApprovalPage::Invalid,
            Self::AccountMissing => ApprovalPage::NotFound,
            Self::StoreFailure => ApprovalPage::ServerError,
        }
    }
}

/// Verify `token` and approve the account it names.
pub async fn approve(
    codec: &TokenCodec,
    accounts: &dyn AccountStore,
    token: Option<&str>,
    now_ms: i64,
) -> ApprovalOutcome {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return ApprovalOutcome::MissingToken;
    };

    let verified = match codec.verify_at(token, now_ms) {
        Ok(verified) => verified,
        Err(e) => {
            warn!(reason = e.error_code(), "approval token rejected");
            metrics::record_token_failure(e.error_code());
            return ApprovalOutcome::Rejected(e);
        }
    };

    let subject = verified.subject();
    apply(accounts, verified.into_cap())
        .instrument(spans::approval(&subject.to_string()))
        .await
}

async fn apply(accounts: &dyn AccountStore, cap: Cap<ApproveAccount>) -> ApprovalOutcome {
    let id = *cap.scope();
    let account = match accounts.find(id).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            warn!("approval link names an unknown account");
            return ApprovalOutcome::AccountMissing;
        }
        Err(e) => {
            error!(error = %e, "account lookup failed");
            return ApprovalOutcome::StoreFailure;
        }
    };

    let label = account.label().to_string();
    if account.is_approved {
        info!("account already approved");
        return ApprovalOutcome::AlreadyApproved { label };
    }

    match accounts.approve(cap).await {
        Ok(ApprovalChange::Approved) => {
            info!(account = %label, "account approved");
            ApprovalOutcome::Approved { label }
        }
        // Lost a race with another click on the same link.
        Ok(ApprovalChange::AlreadyApproved) => ApprovalOutcome::AlreadyApproved { label },
        Err(StoreError::NotFound(_)) => ApprovalOutcome::AccountMissing,
        Err(e) => {
            error!(error = %e, "account approval failed");
            ApprovalOutcome::StoreFailure
        }
    }
}

/// First `token` parameter of a raw query string.
fn token_param(query: Option<&str>) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(k, _)| k == "token")
        .map(|(_, v)| v.into_owned())
}

pub async fn approve_handler(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let token = token_param(query.as_deref());
    let now_ms = chrono::Utc::now().timestamp_millis();

    let outcome = approve(&state.codec, state.accounts.as_ref(), token.as_deref(), now_ms).await;
    metrics::record_approval(outcome.as_label());
    outcome.page().respond(&state.site.admin_console_url)
}
