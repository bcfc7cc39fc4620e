//! `POST /api/auth/login` and `POST /api/auth/logout`.
//!
//! Login checks the password against the stored Argon2 hash and starts a
//! session. Pending accounts may sign in; the route table keeps them out of
//! the calculator until they are approved.

use super::{ApiError, AppState};
use crate::accounts::Role;
use crate::metrics;
use crate::security::password;
use crate::session::{Principal, RequestCookies};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub id: Uuid,
    pub role: Role,
    pub approved: bool,
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let account = state
        .accounts
        .find_by_email(request.email.trim())
        .await
        .map_err(|e| {
            error!(error = %e, "account lookup failed");
            ApiError::Internal
        })?;

    // Unknown emails still pay for one verification.
    let stored = account.as_ref().and_then(|a| a.password_hash.clone());
    let has_hash = stored.is_some();
    let secret = request.password;
    let verified = tokio::task::spawn_blocking(move || {
        let phc: &str = stored.as_deref().unwrap_or_else(|| password::decoy_hash());
        password::verify_password(&secret, phc)
    })
    .await
    .map_err(|e| {
        error!(error = %e, "password verification task failed");
        ApiError::Internal
    })?;

    let Some(account) = account.filter(|_| verified && has_hash) else {
        metrics::record_login("rejected");
        return Err(ApiError::Unauthorized("invalid email or password".into()));
    };

    let cookie = state.sessions.create(Principal::from(&account));
    metrics::record_login("success");
    info!(account_id = %account.id, "signed in");

    Ok((
        [(SET_COOKIE, cookie.to_header_value())],
        Json(LoginResponse {
            id: account.id,
            role: account.role,
            approved: account.is_approved,
        }),
    )
        .into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    principal: Option<Extension<Option<Principal>>>,
    headers: HeaderMap,
) -> Response {
    let cleared = state.sessions.end(&RequestCookies::from_headers(&headers));
    if let Some(Extension(Some(principal))) = principal {
        state.sessions.revoke_user(principal.user_id);
        info!(account_id = %principal.user_id, "signed out");
    }
    (
        [(SET_COOKIE, cleared.to_header_value())],
        Json(json!({ "success": true })),
    )
        .into_response()
}
