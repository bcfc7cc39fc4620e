//! Session resolution contract.
//!
//! The filter chain asks a [`SessionProvider`] who the caller is. The provider
//! may also want cookies refreshed or cleared; those come back as
//! [`CookieMutation`]s and are attached to whatever response the chain ends
//! up producing.

mod cookies;
mod memory;

pub use cookies::{CookieAttributes, CookieMutation, RequestCookies, SameSite};
pub use memory::{MemorySessionProvider, SessionSettings};

use crate::accounts::{Account, Feature, Role};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub approved: bool,
    pub access_column: bool,
    pub access_beam: bool,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        match feature {
            Feature::Column => self.access_column,
            Feature::Beam => self.access_beam,
        }
    }
}

impl From<&Account> for Principal {
    fn from(account: &Account) -> Self {
        Self {
            user_id: account.id,
            email: account.email.clone(),
            role: account.role,
            approved: account.is_approved,
            access_column: account.access_column,
            access_beam: account.access_beam,
        }
    }
}

/// What session resolution produced for one request.
#[derive(Debug, Clone, Default)]
pub struct SessionOutcome {
    pub principal: Option<Principal>,
    pub cookies: Vec<CookieMutation>,
}

impl SessionOutcome {
    pub fn anonymous() -> Self {
        Self::default()
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// The backing session service could not answer.
    #[error("session service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Resolve the caller from request cookies.
    ///
    /// Missing or invalid sessions are `Ok` with no principal; `Err` is
    /// reserved for the provider itself failing.
    async fn resolve(&self, cookies: &RequestCookies) -> Result<SessionOutcome, SessionError>;
}
