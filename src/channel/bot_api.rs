use std::path::Path;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::traits::NotificationChannel;

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Chat bot HTTP API (`/bot<token>/sendMessage`, `/bot<token>/sendDocument`).
pub struct BotApiChannel {
    client: Client,
    api_base: String,
    token: String,
}

impl BotApiChannel {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            token: token.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_base.trim_end_matches('/'),
            self.token,
            method
        )
    }
}

async fn check_reply(resp: Response, method: &str) -> Result<()> {
    let status = resp.status();
    let reply: Option<ApiReply> = resp.json().await.ok();
    match reply {
        Some(ApiReply { ok: true, .. }) if status.is_success() => Ok(()),
        Some(ApiReply { description, .. }) => {
            let reason = description.unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            warn!("bot api {} rejected: {}", method, reason);
            Err(anyhow!("{} rejected: {}", method, reason))
        }
        None => {
            warn!("bot api {} failed status={}", method, status.as_u16());
            Err(anyhow!("{} failed: HTTP {}", method, status.as_u16()))
        }
    }
}

#[async_trait]
impl NotificationChannel for BotApiChannel {
    async fn deliver_message(&self, destination: i64, text: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&json!({ "chat_id": destination, "text": text }))
            .send()
            .await?;
        check_reply(resp, "sendMessage").await?;
        debug!("bot api message delivered chat={}", destination);
        Ok(())
    }

    async fn deliver_document(&self, destination: i64, path: &Path, caption: &str) -> Result<()> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let size = data.len();

        let form = Form::new()
            .text("chat_id", destination.to_string())
            .text("caption", caption.to_string())
            .part("document", Part::bytes(data).file_name(file_name));

        let resp = self
            .client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await?;
        check_reply(resp, "sendDocument").await?;
        debug!("bot api document delivered chat={} bytes={}", destination, size);
        Ok(())
    }
}
