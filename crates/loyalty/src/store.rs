//! Account storage port, the in-memory DashMap store, and the per-user lock
//! table that serializes ledger writes.

use dashmap::DashMap;
use farmstand_core::loyalty::LoyaltyAccount;
use farmstand_core::LoyaltyResult;
use parking_lot::Mutex;
use std::sync::Arc;

/// Persistence for loyalty accounts. Writers always hold the user's lock
/// from [`UserLocks`] across load and save.
pub trait AccountStore: Send + Sync {
    fn load(&self, user_id: &str) -> LoyaltyResult<Option<LoyaltyAccount>>;
    fn save(&self, account: &LoyaltyAccount) -> LoyaltyResult<()>;
}

/// In-memory account store backed by `DashMap`.
#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: DashMap<String, LoyaltyAccount>,
}

impl InMemoryAccountStore {
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

impl AccountStore for InMemoryAccountStore {
    fn load(&self, user_id: &str) -> LoyaltyResult<Option<LoyaltyAccount>> {
        Ok(self.accounts.get(user_id).map(|a| a.value().clone()))
    }

    fn save(&self, account: &LoyaltyAccount) -> LoyaltyResult<()> {
        self.accounts.insert(account.user_id.clone(), account.clone());
        Ok(())
    }
}

/// One mutex per user id. Different users never contend on the same lock.
#[derive(Default)]
pub struct UserLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding `user_id`, created on first use.
    pub fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.get(user_id) {
            return lock.clone();
        }
        self.locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
