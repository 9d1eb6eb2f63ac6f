use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::error::AuthError;

/// A file entry returned by a name search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
}

/// Byte stream for one media request. `total_size` drives progress reporting.
pub struct MediaStream {
    pub total_size: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes>>,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Files whose name equals `file_name`, in the store's own order.
    async fn search(&self, file_name: &str) -> Result<Vec<RemoteFile>>;
    async fn stream_media(&self, id: &str, timeout: Duration) -> Result<MediaStream>;
}

/// Authenticated handle to the remote store.
pub type RemoteHandle = Arc<dyn RemoteStore>;

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn handle(&self) -> Result<RemoteHandle, AuthError>;
}
