//! SQLite account store.

use super::{Account, AccountStore, ApprovalChange, Role, StoreError};
use crate::caps::{ApproveAccount, Cap};
use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

const ACCOUNT_COLUMNS: &str = "id, email, business_name, business_number, phone, role, \
     is_approved, access_column, access_beam, password_hash, created_at";

/// sqlx-backed store with embedded migrations.
#[derive(Clone)]
pub struct SqliteAccountStore {
    pool: SqlitePool,
}

impl SqliteAccountStore {
    /// Connection acquire timeout.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Maximum time a connection can remain idle before being closed.
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Open (or create) the database at `path` and apply migrations.
    ///
    /// `":memory:"` opens a private in-memory database, unique per call.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let pool = if path == ":memory:" {
            // Uniquely named shared-cache database so parallel tests never collide.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let memdb_uri = format!(
                "file:steelgate-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );
            let options = SqliteConnectOptions::new()
                .filename(&memdb_uri)
                .shared_cache(true)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .connect_with(options)
                .await?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                warn!(path = %parent.display(), error = %e, "Failed to create database directory");
            }

            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .connect_with(options)
                .await?
        };

        info!(path = %path, "Account database connected");

        sqlx::migrate!("./migrations").run(&pool).await?;
        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&pool)
            .await?;

        info!("Account migrations checked/applied");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn account_from_row(row: &SqliteRow) -> Result<Account, StoreError> {
    let id: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id).map_err(|_| StoreError::Corrupt(format!("id {id:?}")))?;
    let role: String = row.try_get("role")?;
    let role = Role::parse(&role).ok_or_else(|| StoreError::Corrupt(format!("role {role:?}")))?;

    Ok(Account {
        id,
        email: row.try_get("email")?,
        business_name: row.try_get("business_name")?,
        business_number: row.try_get("business_number")?,
        phone: row.try_get("phone")?,
        role,
        is_approved: row.try_get("is_approved")?,
        access_column: row.try_get("access_column")?,
        access_beam: row.try_get("access_beam")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn find(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        // The column is COLLATE NOCASE, so this comparison ignores case.
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn insert(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, email, business_name, business_number, phone, role,
                                  is_approved, access_column, access_beam, password_hash,
                                  created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.email)
        .bind(&account.business_name)
        .bind(&account.business_number)
        .bind(&account.phone)
        .bind(account.role.as_str())
        .bind(account.is_approved)
        .bind(account.access_column)
        .bind(account.access_beam)
        .bind(&account.password_hash)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Duplicate(account.email.clone());
            }
            StoreError::from(e)
        })?;
        Ok(())
    }

    async fn approve(&self, cap: Cap<ApproveAccount>) -> Result<ApprovalChange, StoreError> {
        let id = cap.into_scope();
        let now = chrono::Utc::now().timestamp();

        // Conditional update keeps the transition atomic under concurrent clicks.
        let result = sqlx::query(
            "UPDATE accounts SET is_approved = 1, approved_at = ? WHERE id = ? AND is_approved = 0",
        )
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(ApprovalChange::Approved);
        }

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            Some(_) => Ok(ApprovalChange::AlreadyApproved),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn admins(&self) -> Result<Vec<Account>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE role = 'admin' ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(account_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteAccountStore {
        SqliteAccountStore::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let store = store().await;
        let mut account = Account::pending("owner@example.com");
        account.business_name = Some("Hanil Structures".into());
        account.access_column = true;
        store.insert(&account).await.unwrap();

        let found = store.find(account.id).await.unwrap().unwrap();
        assert_eq!(found, account);
        assert!(store.find(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_email_ignores_case_and_keeps_hash() {
        let store = store().await;
        let mut account = Account::pending("Owner@Example.com");
        account.password_hash = Some("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into());
        store.insert(&account).await.unwrap();

        let found = store.find_by_email("owner@example.com").await.unwrap().unwrap();
        assert_eq!(found, account);
        assert!(store.find_by_email("other@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn approve_transitions_once() {
        let store = store().await;
        let account = Account::pending("pending@example.com");
        store.insert(&account).await.unwrap();

        assert_eq!(
            store.approve(Cap::new(account.id)).await.unwrap(),
            ApprovalChange::Approved
        );
        assert_eq!(
            store.approve(Cap::new(account.id)).await.unwrap(),
            ApprovalChange::AlreadyApproved
        );
        assert!(store.find(account.id).await.unwrap().unwrap().is_approved);
    }

    #[tokio::test]
    async fn approve_missing_account() {
        let store = store().await;
        let err = store.approve(Cap::new(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_email_maps_to_duplicate() {
        let store = store().await;
        store.insert(&Account::pending("dup@example.com")).await.unwrap();
        let err = store
            .insert(&Account::pending("DUP@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn admins_are_listed() {
        let store = store().await;
        let mut admin = Account::pending("admin@example.com");
        admin.role = Role::Admin;
        store.insert(&admin).await.unwrap();
        store.insert(&Account::pending("user@example.com")).await.unwrap();

        let admins = store.admins().await.unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].id, admin.id);
    }

    #[tokio::test]
    async fn file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("accounts.db");
        let path = path.to_str().unwrap();

        let account = Account::pending("persist@example.com");
        {
            let store = SqliteAccountStore::open(path).await.unwrap();
            store.insert(&account).await.unwrap();
            store.approve(Cap::new(account.id)).await.unwrap();
            store.pool().close().await;
        }

        let reopened = SqliteAccountStore::open(path).await.unwrap();
        assert!(reopened.find(account.id).await.unwrap().unwrap().is_approved);
    }
}
