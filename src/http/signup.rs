//! `POST /api/auth/signup`: create a pending account and ask admins to
//! approve it.

use super::{ApiError, AppState};
use crate::accounts::{Account, StoreError, is_plausible_email};
use crate::metrics;
use crate::notify::{ApprovalRequest, approval_url};
use crate::security::password;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub business_number: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub id: Uuid,
    pub status: &'static str,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Strip dashes and require `lens` ASCII digits.
fn digits(value: Option<String>, lens: std::ops::RangeInclusive<usize>) -> Result<Option<String>, ()> {
    let Some(value) = non_empty(value) else {
        return Ok(None);
    };
    let digits: String = value.chars().filter(|c| *c != '-').collect();
    if lens.contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()) {
        Ok(Some(digits))
    } else {
        Err(())
    }
}

pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let email = request.email.trim();
    if !is_plausible_email(email) {
        return Err(ApiError::BadRequest("invalid email address".into()));
    }

    password::check_strength(&request.password)
        .map_err(|weak| ApiError::BadRequest(weak.to_string()))?;
    let secret = request.password;
    let hash = tokio::task::spawn_blocking(move || password::hash_password(&secret))
        .await
        .map_err(|e| {
            error!(error = %e, "password hashing task failed");
            ApiError::Internal
        })?
        .map_err(|e| {
            error!(error = %e, "password hashing failed");
            ApiError::Internal
        })?;

    let mut account = Account::pending(email);
    account.password_hash = Some(hash);
    account.business_name = non_empty(request.business_name);
    account.business_number = digits(request.business_number, 10..=10)
        .map_err(|()| ApiError::BadRequest("business number must be 10 digits".into()))?;
    account.phone = digits(request.phone, 10..=11)
        .map_err(|()| ApiError::BadRequest("phone number must be 10 or 11 digits".into()))?;

    state.accounts.insert(&account).await.map_err(|e| match e {
        StoreError::Duplicate(_) => ApiError::Conflict("account already exists".into()),
        other => {
            error!(error = %other, "failed to store new account");
            ApiError::Internal
        }
    })?;
    metrics::record_signup();
    info!(account_id = %account.id, "pending account created");

    notify_admins(&state, &account).await;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            id: account.id,
            status: "pending",
        }),
    ))
}

/// Issue an approval link and hand it to the notifier. Failures are logged;
/// the account stays pending and can still be approved from the console.
async fn notify_admins(state: &AppState, account: &Account) {
    let admins = match state.accounts.admins().await {
        Ok(admins) => admins,
        Err(e) => {
            error!(error = %e, "failed to resolve admin recipients");
            return;
        }
    };
    if admins.is_empty() {
        warn!(account_id = %account.id, "no admin accounts; approval notification skipped");
        return;
    }

    let now_ms = chrono::Utc::now().timestamp_millis();
    let (token, expires_at_ms) = state.codec.issue(account.id, now_ms);
    let request = ApprovalRequest {
        account_id: account.id,
        account_label: account.label().to_string(),
        recipients: admins.into_iter().map(|a| a.email).collect(),
        approval_url: approval_url(&state.site.public_url, &token),
        expires_at_ms,
    };

    match state.notifier.approval_requested(&request).await {
        Ok(()) => metrics::record_notification("delivered"),
        Err(e) => {
            metrics::record_notification("failed");
            error!(account_id = %account.id, error = %e, "approval notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_optional_fields_become_none() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some(" Hanil ".into())), Some("Hanil".into()));
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn number_fields_drop_dashes() {
        assert_eq!(digits(Some("123-45-67890".into()), 10..=10), Ok(Some("1234567890".into())));
        assert_eq!(digits(Some("010-1234-5678".into()), 10..=11), Ok(Some("01012345678".into())));
        assert_eq!(digits(Some(" ".into()), 10..=10), Ok(None));
        assert_eq!(digits(Some("12345".into()), 10..=10), Err(()));
        assert_eq!(digits(Some("12345abcde".into()), 10..=10), Err(()));
    }
}
