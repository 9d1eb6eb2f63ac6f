//! Document relay between chat users and a remote file store.
//!
//! Requests are resolved through a TTL cache, transferred with retries on
//! their own task, and every user notification goes through one rate-limited
//! queue.

pub mod api;
pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod remote;

pub use config::RelayConfig;
pub use error::{AuthError, RelayError, TransferError};
