use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::http_store::HttpRemoteStore;
use super::traits::{CredentialProvider, RemoteHandle};
use crate::error::AuthError;

#[derive(Debug, Deserialize)]
struct StoredToken {
    access_token: String,
    /// Unix seconds. Missing means the token does not expire.
    #[serde(default)]
    expires_at: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialState {
    Valid(String),
    Expired,
    Absent,
}

/// Reads a previously obtained access token from a JSON file on every
/// request. Obtaining and refreshing that token happens elsewhere.
pub struct TokenFileProvider {
    token_path: PathBuf,
    store_url: String,
}

impl TokenFileProvider {
    pub fn new(token_path: impl Into<PathBuf>, store_url: impl Into<String>) -> Self {
        Self {
            token_path: token_path.into(),
            store_url: store_url.into(),
        }
    }

    pub async fn state(&self) -> Result<CredentialState, AuthError> {
        let raw = match tokio::fs::read_to_string(&self.token_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CredentialState::Absent)
            }
            Err(e) => return Err(AuthError::Invalid(e.to_string())),
        };

        let token: StoredToken =
            serde_json::from_str(&raw).map_err(|e| AuthError::Invalid(e.to_string()))?;
        if token.access_token.trim().is_empty() {
            return Ok(CredentialState::Absent);
        }

        if let Some(expires_at) = token.expires_at {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            if now >= expires_at {
                return Ok(CredentialState::Expired);
            }
        }

        Ok(CredentialState::Valid(token.access_token))
    }
}

#[async_trait]
impl CredentialProvider for TokenFileProvider {
    async fn handle(&self) -> Result<RemoteHandle, AuthError> {
        match self.state().await? {
            CredentialState::Valid(token) => {
                debug!("credentials valid, token file={}", self.token_path.display());
                Ok(Arc::new(HttpRemoteStore::new(self.store_url.clone(), token)))
            }
            CredentialState::Expired => {
                warn!("credentials expired, token file={}", self.token_path.display());
                Err(AuthError::Expired)
            }
            CredentialState::Absent => {
                warn!("no credentials, token file={}", self.token_path.display());
                Err(AuthError::Absent(self.token_path.clone()))
            }
        }
    }
}
