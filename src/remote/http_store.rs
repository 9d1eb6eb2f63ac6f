use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use super::traits::{MediaStream, RemoteFile, RemoteStore};

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    id: String,
    name: String,
}

/// Remote store speaking a Drive-style REST API: `GET /files?q=...` for
/// search and `GET /files/{id}?alt=media` for content.
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        if self.token.is_empty() {
            req
        } else {
            req.bearer_auth(&self.token)
        }
    }

    fn files_url(&self, id: Option<&str>) -> Result<Url> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| anyhow!("invalid store url: {}", e))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("store url cannot be a base: {}", self.base_url))?;
            segments.pop_if_empty().push("files");
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }
}

/// Escape a value for use inside a single-quoted search query literal.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn check_status(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status().as_u16();
    if status == 401 || status == 403 {
        warn!("store {} auth rejected status={}", what, status);
        return Err(anyhow!("auth_rejected: HTTP {}", status));
    }
    if !resp.status().is_success() {
        warn!("store {} failed status={}", what, status);
        return Err(anyhow!("{} failed: HTTP {}", what, status));
    }
    Ok(resp)
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn search(&self, file_name: &str) -> Result<Vec<RemoteFile>> {
        let query = format!("name = '{}'", escape_query_value(file_name));
        let req = self
            .client
            .get(self.files_url(None)?)
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")]);
        let resp = check_status(self.authorized(req).send().await?, "search")?;

        let listing: FileList = resp.json().await?;
        debug!("store search name={} results={}", file_name, listing.files.len());
        Ok(listing
            .files
            .into_iter()
            .map(|f| RemoteFile { id: f.id, name: f.name })
            .collect())
    }

    async fn stream_media(&self, id: &str, timeout: Duration) -> Result<MediaStream> {
        let req = self
            .client
            .get(self.files_url(Some(id))?)
            .query(&[("alt", "media")])
            .timeout(timeout);
        let resp = check_status(self.authorized(req).send().await?, "media")?;

        let total_size = resp.content_length();
        debug!("store media id={} total_size={:?}", id, total_size);
        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(anyhow::Error::from))
            .boxed();
        Ok(MediaStream { total_size, body })
    }
}
