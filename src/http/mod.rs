//! HTTP surface.
//!
//! The application router sits behind the filter chain middleware. Prometheus
//! metrics are served on a separate listener so the scrape endpoint never
//! passes the filter chain.

pub mod approve;
mod auth;
mod boq;
pub mod pages;
mod signup;

use crate::accounts::AccountStore;
use crate::filter::{FilterChain, filter_requests};
use crate::notify::Notifier;
use crate::security::TokenCodec;
use crate::session::MemorySessionProvider;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::error;

/// Public URLs the handlers need.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    /// Base URL approval links are built from.
    pub public_url: String,
    /// Link shown on every approval page.
    pub admin_console_url: String,
}

#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<TokenCodec>,
    pub accounts: Arc<dyn AccountStore>,
    pub notifier: Arc<dyn Notifier>,
    /// Shared with the filter chain, which resolves the cookies login issues.
    pub sessions: Arc<MemorySessionProvider>,
    pub site: Arc<SiteSettings>,
}

/// Build the application router with the filter chain in front of every
/// route, including the fallback.
pub fn router(state: AppState, filter: Arc<FilterChain>) -> Router {
    Router::new()
        .route("/admin/approve", get(approve::approve_handler))
        .route("/api/auth/signup", post(signup::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/k-col/boq-report/compute", post(boq::compute))
        .route("/healthz", get(healthz))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(filter, filter_requests))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// JSON API errors. Internal detail is logged, never returned.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Conflict(String),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            Self::Conflict(m) => (StatusCode::CONFLICT, m),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Handler for GET /metrics.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

/// Serve `/metrics` on `0.0.0.0:port` until the task is dropped.
pub async fn run_metrics_server(port: u16) {
    let app = Router::new().route("/metrics", get(metrics_handler));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Prometheus HTTP server listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind metrics server on {}: {}", addr, e);
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        error!("Metrics server error: {}", e);
    }
}
