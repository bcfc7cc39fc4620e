//! In-memory account store.

use super::{Account, AccountStore, ApprovalChange, StoreError};
use crate::caps::{ApproveAccount, Cap};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

/// DashMap-backed store. Contents are lost on restart.
///
/// `emails` maps lowercased email to account id. An insert reserves its email
/// there before touching `accounts`, so two concurrent signups for one
/// address cannot both succeed.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: DashMap<Uuid, Account>,
    emails: DashMap<String, Uuid>,
}

fn email_key(email: &str) -> String {
    email.to_ascii_lowercase()
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(&id).map(|a| a.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let Some(id) = self.emails.get(&email_key(email)).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.accounts.get(&id).map(|a| a.value().clone()))
    }

    async fn insert(&self, account: &Account) -> Result<(), StoreError> {
        let key = match self.emails.entry(email_key(&account.email)) {
            Entry::Occupied(_) => return Err(StoreError::Duplicate(account.email.clone())),
            Entry::Vacant(vacant) => {
                let key = vacant.key().clone();
                vacant.insert(account.id);
                key
            }
        };

        match self.accounts.entry(account.id) {
            Entry::Occupied(_) => {
                self.emails.remove(&key);
                Err(StoreError::Duplicate(account.email.clone()))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(account.clone());
                Ok(())
            }
        }
    }

    async fn approve(&self, cap: Cap<ApproveAccount>) -> Result<ApprovalChange, StoreError> {
        let id = cap.into_scope();
        let mut account = self.accounts.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if account.is_approved {
            return Ok(ApprovalChange::AlreadyApproved);
        }
        account.is_approved = true;
        Ok(ApprovalChange::Approved)
    }

    async fn admins(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self
            .accounts
            .iter()
            .filter(|a| a.role == super::Role::Admin)
            .map(|a| a.value().clone())
            .collect())
    }
}
