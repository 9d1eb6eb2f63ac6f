// Error taxonomy for the relay core. Every variant is absorbed at the component
// boundary and turned into a user-facing notice; none reaches the front-end.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Why the credential provider could not produce a remote-store handle.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credentials available at {0}")]
    Absent(PathBuf),
    #[error("credentials expired")]
    Expired,
    #[error("credentials invalid: {0}")]
    Invalid(String),
}

/// Failure of a single transfer attempt. All of these are retried.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("transient file {} is locked", .0.display())]
    Locked(PathBuf),
    #[error("stream request failed: {0}")]
    Stream(#[source] anyhow::Error),
    #[error("stream exceeded {0:?} budget")]
    Timeout(Duration),
    #[error("i/o error on transient file: {0}")]
    Io(#[from] std::io::Error),
    #[error("downloaded file is missing or empty")]
    Empty,
    #[error("downloaded file truncated: {written} of {expected} bytes")]
    Truncated { written: u64, expected: u64 },
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("no remote document named '{0}'")]
    NotFound(String),
    #[error("remote search failed: {0}")]
    Search(#[source] anyhow::Error),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error("transfer failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
    #[error("delivery failed: {0}")]
    Delivery(#[source] anyhow::Error),
}

pub type Result<T, E = RelayError> = std::result::Result<T, E>;
