pub mod account;
pub mod pool;
pub mod store;

pub use account::Account;
pub use pool::AccountPool;
pub use store::{AccountStore, MemoryAccountStore, PoolError};
