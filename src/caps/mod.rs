//! Proof-of-authorization values for account state changes.
//!
//! [`AccountStore::approve`](crate::accounts::AccountStore::approve) takes a
//! `Cap<ApproveAccount>` instead of a bare id. Only
//! [`TokenCodec`](crate::security::TokenCodec) mints one, after an approval
//! link verifies, so no other code path can approve an account.

mod account;

pub use account::ApproveAccount;

use std::fmt;
use std::marker::PhantomData;

/// A kind of privileged change and the resource it is bound to.
pub trait Capability: 'static + Send + Sync {
    type Scope: Clone + Send + Sync;
    /// Shown in `Debug` output.
    const NAME: &'static str;
}

/// Authorization for one `T` change on `scope`.
///
/// Crate-private constructor, no `Clone`: a store consumes the cap it is
/// handed, so one verified link authorizes one call.
pub struct Cap<T: Capability> {
    scope: T::Scope,
    _kind: PhantomData<T>,
}

impl<T: Capability> Cap<T> {
    pub(crate) fn new(scope: T::Scope) -> Self {
        Self {
            scope,
            _kind: PhantomData,
        }
    }

    pub fn scope(&self) -> &T::Scope {
        &self.scope
    }

    pub fn into_scope(self) -> T::Scope {
        self.scope
    }
}

impl<T: Capability> fmt::Debug for Cap<T>
where
    T::Scope: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cap<{}>({:?})", T::NAME, self.scope)
    }
}
