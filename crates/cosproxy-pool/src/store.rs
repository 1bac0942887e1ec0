use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use crate::account::Account;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("no active accounts available")]
    NoneAvailable,
    #[error("account store error: {0}")]
    Store(String),
}

/// Narrow store contract the pool depends on. Deactivations must be visible
/// to the next `list_active` call within the same process.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn list_active(&self) -> Result<Vec<Account>, PoolError>;

    async fn set_inactive(&self, id: i64) -> Result<(), PoolError>;

    async fn count_active(&self) -> Result<u64, PoolError>;
}

/// In-memory store, used by tests and as a reference implementation of the
/// read-your-writes requirement.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<Vec<Account>>,
}

impl MemoryAccountStore {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self {
            accounts: RwLock::new(accounts),
        }
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn list_active(&self) -> Result<Vec<Account>, PoolError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|err| PoolError::Store(err.to_string()))?;
        Ok(accounts
            .iter()
            .filter(|account| account.is_active)
            .cloned()
            .collect())
    }

    async fn set_inactive(&self, id: i64) -> Result<(), PoolError> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|err| PoolError::Store(err.to_string()))?;
        for account in accounts.iter_mut() {
            if account.id == id {
                account.is_active = false;
            }
        }
        Ok(())
    }

    async fn count_active(&self) -> Result<u64, PoolError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|err| PoolError::Store(err.to_string()))?;
        Ok(accounts.iter().filter(|account| account.is_active).count() as u64)
    }
}
