use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::info;

use crate::account::Account;
use crate::store::{AccountStore, PoolError};

/// Round-robin selection over the currently active accounts.
///
/// The active set is fetched fresh from the store on every `next` call, so a
/// deactivation is picked up immediately. Because the set can shrink between
/// calls, rotation is best-effort fair: under concurrent deactivation an
/// account may be skipped or served twice in quick succession. The counter is
/// monotonic and never reused across concurrent callers.
pub struct AccountPool {
    store: Arc<dyn AccountStore>,
    counter: AtomicU64,
    lock: RwLock<()>,
}

impl AccountPool {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self {
            store,
            counter: AtomicU64::new(0),
            lock: RwLock::new(()),
        }
    }

    pub async fn next(&self) -> Result<Account, PoolError> {
        let _guard = self.lock.read().await;

        let accounts = self.store.list_active().await?;
        if accounts.is_empty() {
            return Err(PoolError::NoneAvailable);
        }

        let ticket = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let idx = (ticket % accounts.len() as u64) as usize;
        Ok(accounts[idx].clone())
    }

    /// Permanently retires an account. Idempotent: retiring an already
    /// inactive account is not an error.
    pub async fn deactivate(&self, id: i64) -> Result<(), PoolError> {
        let _guard = self.lock.write().await;

        self.store.set_inactive(id).await?;
        info!(account = id, "account deactivated");
        Ok(())
    }

    pub async fn count(&self) -> Result<u64, PoolError> {
        self.store.count_active().await
    }
}
