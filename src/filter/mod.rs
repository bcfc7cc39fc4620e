//! Per-request filter chain.
//!
//! Every request passes these stages in order before any handler runs:
//!
//! ```text
//! PathBlock ─► RateLimit ─► SessionResolution ─► RouteAuthorization ─► Continue
//!    │404         │429            │502                 │307 / 403
//! ```
//!
//! The chain itself is framework-free ([`FilterChain::evaluate`]); the axum
//! adapter lives in [`middleware`].

pub mod middleware;
mod routes;

pub use middleware::filter_requests;
pub use routes::{Requirement, RouteRule, RouteTable};

use crate::error::FilterError;
use crate::metrics;
use crate::security::{PathBlocklist, RateLimiter, client_key};
use crate::session::{CookieMutation, Principal, RequestCookies, SessionProvider};
use http::HeaderMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::form_urlencoded::byte_serialize;

/// Per-client request ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_millis(1000),
        }
    }
}

/// Outcome of running the chain on one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    /// Blocked path; empty 404.
    NotFound,
    /// Client over its request ceiling.
    TooManyRequests,
    /// Protected path, no session: send the client to login.
    Redirect {
        location: String,
        cookies: Vec<CookieMutation>,
    },
    /// Protected path, principal lacks the required authorization.
    Forbidden { cookies: Vec<CookieMutation> },
    /// Hand the request to the router.
    Continue {
        principal: Option<Principal>,
        cookies: Vec<CookieMutation>,
    },
}

pub struct FilterChainParams {
    pub blocklist: PathBlocklist,
    pub limiter: Arc<RateLimiter>,
    pub rate_limit: RateLimitPolicy,
    pub sessions: Arc<dyn SessionProvider>,
    pub routes: RouteTable,
    pub login_path: String,
}

/// The assembled chain. Built once at startup; immutable afterwards except
/// for the rate-limit counters it owns.
pub struct FilterChain {
    blocklist: PathBlocklist,
    limiter: Arc<RateLimiter>,
    rate_limit: RateLimitPolicy,
    sessions: Arc<dyn SessionProvider>,
    routes: RouteTable,
    login_path: String,
}

impl FilterChain {
    pub fn new(params: FilterChainParams) -> Self {
        Self {
            blocklist: params.blocklist,
            limiter: params.limiter,
            rate_limit: params.rate_limit,
            sessions: params.sessions,
            routes: params.routes,
            login_path: params.login_path,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Run every stage for a request to `path` carrying `headers`.
    pub async fn evaluate(
        &self,
        path: &str,
        headers: &HeaderMap,
    ) -> Result<FilterDecision, FilterError> {
        if let Some(pattern) = self.blocklist.matches(path) {
            debug!(path = %path, pattern = %pattern, "blocked scanner path");
            metrics::record_path_blocked();
            return Ok(FilterDecision::NotFound);
        }

        let client = client_key(headers);
        if !self
            .limiter
            .check(&client, self.rate_limit.max_requests, self.rate_limit.window)
        {
            metrics::record_rate_limited();
            return Ok(FilterDecision::TooManyRequests);
        }

        let cookies = RequestCookies::from_headers(headers);
        let outcome = self.sessions.resolve(&cookies).await.map_err(|e| {
            warn!(path = %path, error = %e, "session resolution failed");
            metrics::record_session_failure();
            FilterError::from(e)
        })?;

        if let Some(rule) = self.routes.classify(path) {
            match &outcome.principal {
                None => {
                    info!(path = %path, "unauthenticated request to protected path");
                    metrics::record_login_redirect();
                    return Ok(FilterDecision::Redirect {
                        location: self.login_redirect(path),
                        cookies: outcome.cookies,
                    });
                }
                Some(principal) if !rule.requires.is_satisfied_by(principal) => {
                    info!(
                        path = %path,
                        user_id = %principal.user_id,
                        requires = ?rule.requires,
                        "principal lacks route authorization"
                    );
                    metrics::record_access_denied();
                    return Ok(FilterDecision::Forbidden {
                        cookies: outcome.cookies,
                    });
                }
                Some(_) => {}
            }
        }

        Ok(FilterDecision::Continue {
            principal: outcome.principal,
            cookies: outcome.cookies,
        })
    }

    fn login_redirect(&self, path: &str) -> String {
        let encoded: String = byte_serialize(path.as_bytes()).collect();
        format!("{}?redirect={}", self.login_path, encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::Account;
    use crate::session::{MemorySessionProvider, SessionError, SessionOutcome, SessionSettings};
    use async_trait::async_trait;
    use http::HeaderValue;
    use http::header::COOKIE;

    struct FailingSessions;

    #[async_trait]
    impl SessionProvider for FailingSessions {
        async fn resolve(&self, _: &RequestCookies) -> Result<SessionOutcome, SessionError> {
            Err(SessionError::Unavailable("connection refused".into()))
        }
    }

    fn chain_with(sessions: Arc<dyn SessionProvider>, max_requests: u32) -> FilterChain {
        FilterChain::new(FilterChainParams {
            blocklist: PathBlocklist::default(),
            limiter: Arc::new(RateLimiter::new()),
            rate_limit: RateLimitPolicy {
                max_requests,
                window: Duration::from_secs(1),
            },
            sessions,
            routes: RouteTable::default(),
            login_path: "/login".to_string(),
        })
    }

    fn memory_sessions() -> Arc<MemorySessionProvider> {
        Arc::new(MemorySessionProvider::new(SessionSettings::default()))
    }

    #[tokio::test]
    async fn blocked_path_short_circuits_before_rate_limit() {
        let chain = chain_with(memory_sessions(), 1);
        for _ in 0..3 {
            let decision = chain.evaluate("/.env", &HeaderMap::new()).await.unwrap();
            assert_eq!(decision, FilterDecision::NotFound);
        }
        assert!(chain.limiter().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn eleventh_request_in_window_is_limited() {
        let chain = chain_with(memory_sessions(), 10);
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.20"));

        for _ in 0..10 {
            let decision = chain.evaluate("/", &headers).await.unwrap();
            assert!(matches!(decision, FilterDecision::Continue { .. }));
        }
        assert_eq!(
            chain.evaluate("/", &headers).await.unwrap(),
            FilterDecision::TooManyRequests
        );
    }

    #[tokio::test]
    async fn protected_path_without_session_redirects_with_encoded_path() {
        let chain = chain_with(memory_sessions(), 100);
        let decision = chain
            .evaluate("/k-col/calculator/a b&c", &HeaderMap::new())
            .await
            .unwrap();
        match decision {
            FilterDecision::Redirect { location, .. } => {
                assert_eq!(location, "/login?redirect=%2Fk-col%2Fcalculator%2Fa+b%26c");
            }
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn insufficient_role_is_forbidden() {
        let sessions = memory_sessions();
        let cookie = sessions.create(Principal::from(&Account::pending("u@example.com")));
        let chain = chain_with(sessions, 100);

        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{}={}", cookie.name, cookie.value)).unwrap(),
        );

        assert!(matches!(
            chain.evaluate("/admin/users", &headers).await.unwrap(),
            FilterDecision::Forbidden { .. }
        ));
        match chain.evaluate("/k-col/print", &headers).await.unwrap() {
            FilterDecision::Continue { principal, .. } => {
                assert_eq!(principal.unwrap().email, "u@example.com");
            }
            other => panic!("expected continue, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn approval_link_is_reachable_without_session() {
        let chain = chain_with(memory_sessions(), 100);
        let decision = chain
            .evaluate("/admin/approve", &HeaderMap::new())
            .await
            .unwrap();
        assert!(matches!(decision, FilterDecision::Continue { principal: None, .. }));
    }

    #[tokio::test]
    async fn session_provider_failure_is_an_error() {
        let chain = chain_with(Arc::new(FailingSessions), 100);
        let err = chain.evaluate("/", &HeaderMap::new()).await.unwrap_err();
        assert_eq!(err.error_code(), "upstream_session");
    }

    #[tokio::test]
    async fn stale_cookie_is_cleared_on_redirect() {
        let chain = chain_with(memory_sessions(), 100);
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("sg_session=forged"));

        match chain.evaluate("/k-col/print", &headers).await.unwrap() {
            FilterDecision::Redirect { cookies, .. } => {
                assert_eq!(cookies.len(), 1);
                assert!(cookies[0].is_clear());
            }
            other => panic!("expected redirect, got {other:?}"),
        }
    }
}
