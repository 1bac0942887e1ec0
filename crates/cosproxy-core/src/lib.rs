mod catalog;
mod chat;
mod core;
mod dispatch;
mod error;
mod relay;

pub use crate::core::{Core, CoreState};
pub use crate::dispatch::{MAX_ATTEMPTS, dispatch_chat};
pub use crate::error::ProxyError;
