//! In-process session store.

use super::{
    CookieAttributes, CookieMutation, Principal, RequestCookies, SessionError, SessionOutcome,
    SessionProvider,
};
use async_trait::async_trait;
use dashmap::DashMap;
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

const SESSION_TOKEN_LEN: usize = 43;

/// Session cookie settings.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub cookie_name: String,
    pub ttl: Duration,
    /// Sessions this close to expiry are rotated on the next request.
    pub refresh_threshold: Duration,
    pub secure_cookies: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: "sg_session".to_string(),
            ttl: Duration::from_secs(60 * 60),
            refresh_threshold: Duration::from_secs(10 * 60),
            secure_cookies: true,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredSession {
    principal: Principal,
    expires_at: Instant,
}

/// Sessions keyed by an opaque random cookie value.
///
/// Valid sessions resolve to their principal; sessions inside the refresh
/// threshold get a new token and a `Set-Cookie`; expired or unknown tokens
/// get a clearing cookie.
#[derive(Debug)]
pub struct MemorySessionProvider {
    settings: SessionSettings,
    sessions: DashMap<String, StoredSession>,
}

impl MemorySessionProvider {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            sessions: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Start a session for `principal` and return the cookie that carries it.
    pub fn create(&self, principal: Principal) -> CookieMutation {
        let token = new_session_token();
        self.sessions.insert(
            token.clone(),
            StoredSession {
                principal,
                expires_at: Instant::now() + self.settings.ttl,
            },
        );
        self.set_cookie(token)
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drop every session belonging to `user_id`, including ones rotated
    /// while the request that ends them was in flight.
    pub fn revoke_user(&self, user_id: Uuid) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.principal.user_id != user_id);
        before.saturating_sub(self.sessions.len())
    }

    /// End the session named by the request cookies and return the cookie
    /// that clears it on the client.
    pub fn end(&self, cookies: &RequestCookies) -> CookieMutation {
        if let Some(token) = cookies.get(&self.settings.cookie_name) {
            self.revoke(token);
        }
        self.clear_cookie()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn attributes(&self, max_age: Duration) -> CookieAttributes {
        CookieAttributes {
            max_age: Some(max_age),
            secure: self.settings.secure_cookies,
            ..CookieAttributes::default()
        }
    }

    fn set_cookie(&self, token: String) -> CookieMutation {
        CookieMutation::set(
            self.settings.cookie_name.clone(),
            token,
            self.attributes(self.settings.ttl),
        )
    }

    fn clear_cookie(&self) -> CookieMutation {
        CookieMutation::clear(self.settings.cookie_name.clone(), self.attributes(Duration::ZERO))
    }

    fn resolve_token(&self, token: &str) -> SessionOutcome {
        let now = Instant::now();
        let Some(stored) = self.sessions.get(token).map(|s| s.value().clone()) else {
            debug!("unknown session token");
            return SessionOutcome {
                principal: None,
                cookies: vec![self.clear_cookie()],
            };
        };

        if stored.expires_at <= now {
            self.sessions.remove(token);
            debug!(user_id = %stored.principal.user_id, "session expired");
            return SessionOutcome {
                principal: None,
                cookies: vec![self.clear_cookie()],
            };
        }

        if stored.expires_at - now > self.settings.refresh_threshold {
            return SessionOutcome {
                principal: Some(stored.principal),
                cookies: Vec::new(),
            };
        }

        self.sessions.remove(token);
        let fresh = new_session_token();
        self.sessions.insert(
            fresh.clone(),
            StoredSession {
                principal: stored.principal.clone(),
                expires_at: now + self.settings.ttl,
            },
        );
        debug!(user_id = %stored.principal.user_id, "session rotated");
        SessionOutcome {
            principal: Some(stored.principal),
            cookies: vec![self.set_cookie(fresh)],
        }
    }
}

#[async_trait]
impl SessionProvider for MemorySessionProvider {
    async fn resolve(&self, cookies: &RequestCookies) -> Result<SessionOutcome, SessionError> {
        Ok(match cookies.get(&self.settings.cookie_name) {
            Some(token) if !token.is_empty() => self.resolve_token(token),
            _ => SessionOutcome::anonymous(),
        })
    }
}

fn new_session_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::Account;

    fn provider() -> MemorySessionProvider {
        MemorySessionProvider::new(SessionSettings::default())
    }

    fn principal() -> Principal {
        Principal::from(&Account::pending("member@example.com"))
    }

    fn cookies_for(cookie: &CookieMutation) -> RequestCookies {
        [(cookie.name.clone(), cookie.value.clone())].into_iter().collect()
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_session_resolves_without_cookie_changes() {
        let provider = provider();
        let cookie = provider.create(principal());

        let outcome = provider.resolve(&cookies_for(&cookie)).await.unwrap();
        assert_eq!(outcome.principal.unwrap().email, "member@example.com");
        assert!(outcome.cookies.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn session_near_expiry_is_rotated() {
        let provider = provider();
        let cookie = provider.create(principal());
        tokio::time::advance(Duration::from_secs(55 * 60)).await;

        let outcome = provider.resolve(&cookies_for(&cookie)).await.unwrap();
        assert!(outcome.principal.is_some());
        assert_eq!(outcome.cookies.len(), 1);
        let rotated = &outcome.cookies[0];
        assert_ne!(rotated.value, cookie.value);
        assert!(!rotated.is_clear());

        // Old token is gone, new one works.
        let old = provider.resolve(&cookies_for(&cookie)).await.unwrap();
        assert!(old.principal.is_none());
        let new = provider.resolve(&cookies_for(rotated)).await.unwrap();
        assert!(new.principal.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_session_is_cleared() {
        let provider = provider();
        let cookie = provider.create(principal());
        tokio::time::advance(Duration::from_secs(61 * 60)).await;

        let outcome = provider.resolve(&cookies_for(&cookie)).await.unwrap();
        assert!(outcome.principal.is_none());
        assert!(outcome.cookies[0].is_clear());
        assert!(provider.is_empty());
    }

    #[tokio::test]
    async fn end_revokes_and_clears() {
        let provider = provider();
        let cookie = provider.create(principal());

        let cleared = provider.end(&cookies_for(&cookie));
        assert!(cleared.is_clear());
        let outcome = provider.resolve(&cookies_for(&cookie)).await.unwrap();
        assert!(outcome.principal.is_none());
    }

    #[test]
    fn revoke_user_drops_only_that_users_sessions() {
        let provider = provider();
        let member = principal();
        provider.create(member.clone());
        provider.create(member.clone());
        provider.create(Principal::from(&Account::pending("other@example.com")));

        assert_eq!(provider.revoke_user(member.user_id), 2);
        assert_eq!(provider.len(), 1);
    }

    #[tokio::test]
    async fn no_cookie_is_anonymous() {
        let provider = provider();
        let outcome = provider.resolve(&RequestCookies::default()).await.unwrap();
        assert!(outcome.principal.is_none());
        assert!(outcome.cookies.is_empty());
    }

    #[test]
    fn session_tokens_are_random_alphanumeric() {
        let a = new_session_token();
        let b = new_session_token();
        assert_eq!(a.len(), SESSION_TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
