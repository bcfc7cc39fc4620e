//! The account approval capability.

use super::Capability;
use uuid::Uuid;

/// Permission to move one pending account to the approved state.
///
/// Scope: the account id named in a verified approval link.
pub struct ApproveAccount;

impl Capability for ApproveAccount {
    type Scope = Uuid;
    const NAME: &'static str = "account:approve";
}
