//! Integration test common infrastructure.
//!
//! Builds the full router in-process with memory-backed stores so tests can
//! drive it with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Request, Response};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use steelgate::accounts::{Account, AccountStore, MemoryAccountStore, Role};
use steelgate::filter::{FilterChain, FilterChainParams, RateLimitPolicy, RouteTable};
use steelgate::http::{AppState, SiteSettings};
use steelgate::notify::{ApprovalRequest, Notifier, NotifyError};
use steelgate::security::password::hash_password;
use steelgate::security::{PathBlocklist, RateLimiter, SigningKey, TokenCodec, TokenPolicy};
use steelgate::session::{MemorySessionProvider, Principal, SessionSettings};
use tower::ServiceExt;

pub const PUBLIC_URL: &str = "https://steel.example.com";
pub const ADMIN_CONSOLE: &str = "https://steel.example.com/admin";
pub const LOGIN_PATH: &str = "/login";

/// Notifier that keeps every request for inspection.
#[derive(Default)]
pub struct RecordingNotifier {
    requests: Mutex<Vec<ApprovalRequest>>,
}

impl RecordingNotifier {
    pub fn take(&self) -> Vec<ApprovalRequest> {
        std::mem::take(&mut *self.requests.lock().unwrap())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn approval_requested(&self, request: &ApprovalRequest) -> Result<(), NotifyError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// A router wired to in-memory stores, with handles to each of them.
pub struct TestApp {
    pub router: Router,
    pub accounts: Arc<MemoryAccountStore>,
    pub sessions: Arc<MemorySessionProvider>,
    pub notifier: Arc<RecordingNotifier>,
    pub codec: Arc<TokenCodec>,
}

impl TestApp {
    /// Generous rate limit so only tests that exercise it trip it.
    pub fn new() -> Self {
        Self::with_rate_limit(10_000)
    }

    pub fn with_rate_limit(max_requests: u32) -> Self {
        Self::build(max_requests, None)
    }

    /// Deliver approval links through `notifier` instead of recording them.
    pub fn with_notifier(notifier: Arc<dyn Notifier>) -> Self {
        Self::build(10_000, Some(notifier))
    }

    fn build(max_requests: u32, delivery: Option<Arc<dyn Notifier>>) -> Self {
        let accounts = Arc::new(MemoryAccountStore::new());
        let sessions = Arc::new(MemorySessionProvider::new(SessionSettings::default()));
        let notifier = Arc::new(RecordingNotifier::default());
        let codec = Arc::new(TokenCodec::new(
            SigningKey::new("integration-test-signing-secret-0123456789"),
            TokenPolicy::default(),
        ));

        let filter = Arc::new(FilterChain::new(FilterChainParams {
            blocklist: PathBlocklist::default(),
            limiter: Arc::new(RateLimiter::new()),
            rate_limit: RateLimitPolicy {
                max_requests,
                window: Duration::from_secs(60),
            },
            sessions: sessions.clone(),
            routes: RouteTable::default(),
            login_path: LOGIN_PATH.to_string(),
        }));

        let state = AppState {
            codec: codec.clone(),
            accounts: accounts.clone(),
            notifier: delivery.unwrap_or_else(|| notifier.clone() as Arc<dyn Notifier>),
            sessions: sessions.clone(),
            site: Arc::new(SiteSettings {
                public_url: PUBLIC_URL.to_string(),
                admin_console_url: ADMIN_CONSOLE.to_string(),
            }),
        };

        Self {
            router: steelgate::http::router(state, filter),
            accounts,
            sessions,
            notifier,
            codec,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    /// Store an account and return it.
    pub async fn add_account(&self, email: &str, role: Role, approved: bool) -> Account {
        let mut account = Account::pending(email);
        account.role = role;
        account.is_approved = approved;
        self.accounts.insert(&account).await.unwrap();
        account
    }

    /// Store an account that can sign in with `password`.
    pub async fn add_account_with_password(
        &self,
        email: &str,
        password: &str,
        role: Role,
        approved: bool,
    ) -> Account {
        let mut account = Account::pending(email);
        account.role = role;
        account.is_approved = approved;
        account.access_column = approved;
        account.password_hash = Some(hash_password(password).unwrap());
        self.accounts.insert(&account).await.unwrap();
        account
    }

    /// Start a session for `account` and return the `Cookie` header value.
    pub fn login(&self, account: &Account) -> String {
        let cookie = self.sessions.create(Principal::from(account));
        format!("{}={}", cookie.name, cookie.value)
    }
}

/// POST `body` as JSON to `uri`.
pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
