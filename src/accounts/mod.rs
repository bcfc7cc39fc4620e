//! Account storage.
//!
//! An account is created pending by signup and moved to approved exactly once
//! by an admin following a verified approval link. Two backends:
//!
//! - [`MemoryAccountStore`]: DashMap, used when no database is configured
//! - [`SqliteAccountStore`]: sqlx SQLite with embedded migrations

mod memory;
mod sqlite;

pub use memory::MemoryAccountStore;
pub use sqlite::SqliteAccountStore;

use crate::caps::{ApproveAccount, Cap};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

const MAX_EMAIL_LEN: usize = 254;

/// Cheap shape check: one `@`, a dotted domain, no whitespace.
pub fn is_plausible_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Licensed calculator feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Column,
    Beam,
}

/// A business account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub business_name: Option<String>,
    pub business_number: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub is_approved: bool,
    pub access_column: bool,
    pub access_beam: bool,
    /// Argon2 PHC string. `None` means the account cannot sign in.
    pub password_hash: Option<String>,
    /// Unix seconds.
    pub created_at: i64,
}

impl Account {
    /// A new pending user account with a fresh id and no feature access.
    pub fn pending(email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            business_name: None,
            business_number: None,
            phone: None,
            role: Role::User,
            is_approved: false,
            access_column: false,
            access_beam: false,
            password_hash: None,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        match feature {
            Feature::Column => self.access_column,
            Feature::Beam => self.access_beam,
        }
    }

    /// Human-readable label for pages: email, then business name, then "user".
    pub fn label(&self) -> &str {
        if !self.email.is_empty() {
            &self.email
        } else {
            self.business_name
                .as_deref()
                .filter(|n| !n.is_empty())
                .unwrap_or("user")
        }
    }
}

/// Result of an approval attempt on an existing account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalChange {
    /// The account moved from pending to approved.
    Approved,
    /// The account was already approved; nothing changed.
    AlreadyApproved,
}

/// Account store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("account not found: {0}")]
    NotFound(Uuid),
    #[error("account already exists: {0}")]
    Duplicate(String),
    #[error("corrupt account row: {0}")]
    Corrupt(String),
}

/// Persistent account storage.
///
/// `approve` must be monotone and idempotent: once approved an account never
/// returns to pending, and approving twice reports
/// [`ApprovalChange::AlreadyApproved`] instead of failing. Approval links stay
/// valid until they expire, so a link can be followed more than once; this
/// property is what makes that safe.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Look up an account by email, case-insensitively.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Insert a new account. Emails are unique, case-insensitively.
    async fn insert(&self, account: &Account) -> Result<(), StoreError>;

    /// Approve the account named by `cap`.
    async fn approve(&self, cap: Cap<ApproveAccount>) -> Result<ApprovalChange, StoreError>;

    /// Accounts with the admin role, used as approval-request recipients.
    async fn admins(&self) -> Result<Vec<Account>, StoreError>;
}

/// Create an approved admin account for `email` unless one already exists.
///
/// Existing accounts are left untouched, so a seeded password changed later
/// is never overwritten by a restart. Returns whether an account was created.
pub async fn seed_admin(
    store: &dyn AccountStore,
    email: &str,
    password_hash: &str,
) -> Result<bool, StoreError> {
    if let Some(existing) = store.find_by_email(email).await? {
        if existing.role != Role::Admin {
            warn!(email, "configured admin email belongs to a non-admin account");
        }
        return Ok(false);
    }

    let mut account = Account::pending(email);
    account.role = Role::Admin;
    account.is_approved = true;
    account.access_column = true;
    account.access_beam = true;
    account.password_hash = Some(password_hash.to_string());
    match store.insert(&account).await {
        Ok(()) => {
            info!(email, account_id = %account.id, "seeded admin account");
            Ok(true)
        }
        Err(StoreError::Duplicate(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
