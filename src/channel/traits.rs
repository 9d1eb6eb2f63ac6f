use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

/// Outbound side of the chat front-end. `destination` is the chat id.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn deliver_message(&self, destination: i64, text: &str) -> Result<()>;
    async fn deliver_document(&self, destination: i64, path: &Path, caption: &str) -> Result<()>;
}
