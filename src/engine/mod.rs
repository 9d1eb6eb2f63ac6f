// Engine core: cache, paced dispatcher, transfer retries, per-request coordination.

pub mod cache;
pub mod coordinator;
pub mod dispatcher;
pub mod notice;
pub mod progress;
pub mod retry;
pub mod stats;
pub mod transfer;
