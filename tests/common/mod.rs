// Shared fakes for integration tests: scripted remote store, recording channel,
// static credential provider.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::time::Instant;

use doc_relay_engine::channel::NotificationChannel;
use doc_relay_engine::error::AuthError;
use doc_relay_engine::remote::{
    CredentialProvider, MediaStream, RemoteFile, RemoteHandle, RemoteStore,
};
use doc_relay_engine::RelayConfig;

/// What the next `stream_media` call does.
pub enum Script {
    Fail(&'static str),
    Serve {
        total: Option<u64>,
        chunks: Vec<Vec<u8>>,
    },
    /// Yield the chunks, then error out mid-stream.
    BreakAfter {
        total: Option<u64>,
        chunks: Vec<Vec<u8>>,
    },
    Hang,
}

pub struct FakeStore {
    files: Mutex<HashMap<String, Vec<RemoteFile>>>,
    scripts: Mutex<VecDeque<Script>>,
    default_body: Vec<u8>,
    pub searches: AtomicUsize,
    pub stream_calls: Mutex<Vec<(String, Instant)>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            scripts: Mutex::new(VecDeque::new()),
            default_body: b"%PDF-1.4 fake document body".to_vec(),
            searches: AtomicUsize::new(0),
            stream_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_file(self, file_name: &str, id: &str) -> Self {
        self.files
            .lock()
            .entry(file_name.to_string())
            .or_default()
            .push(RemoteFile {
                id: id.to_string(),
                name: file_name.to_string(),
            });
        self
    }

    pub fn push_script(&self, script: Script) {
        self.scripts.lock().push_back(script);
    }

    pub fn default_body(&self) -> &[u8] {
        &self.default_body
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn stream_instants(&self) -> Vec<Instant> {
        self.stream_calls.lock().iter().map(|(_, at)| *at).collect()
    }

    pub fn streamed_ids(&self) -> Vec<String> {
        self.stream_calls.lock().iter().map(|(id, _)| id.clone()).collect()
    }
}

fn chunk_stream(chunks: Vec<Vec<u8>>, tail_error: bool) -> MediaStream {
    let items: Vec<Result<Bytes>> = chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect();
    let body = futures_util::stream::iter(items);
    let body = if tail_error {
        body.chain(futures_util::stream::once(async {
            Err(anyhow!("connection reset mid-stream"))
        }))
        .boxed()
    } else {
        body.boxed()
    };
    MediaStream {
        total_size: None,
        body,
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn search(&self, file_name: &str) -> Result<Vec<RemoteFile>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(self.files.lock().get(file_name).cloned().unwrap_or_default())
    }

    async fn stream_media(&self, id: &str, _timeout: Duration) -> Result<MediaStream> {
        self.stream_calls.lock().push((id.to_string(), Instant::now()));
        let script = self.scripts.lock().pop_front();
        match script {
            None => {
                let mut media = chunk_stream(vec![self.default_body.clone()], false);
                media.total_size = Some(self.default_body.len() as u64);
                Ok(media)
            }
            Some(Script::Fail(reason)) => Err(anyhow!(reason)),
            Some(Script::Serve { total, chunks }) => {
                let mut media = chunk_stream(chunks, false);
                media.total_size = total;
                Ok(media)
            }
            Some(Script::BreakAfter { total, chunks }) => {
                let mut media = chunk_stream(chunks, true);
                media.total_size = total;
                Ok(media)
            }
            Some(Script::Hang) => Ok(MediaStream {
                total_size: Some(10),
                body: futures_util::stream::pending().boxed(),
            }),
        }
    }
}

pub struct StaticProvider {
    store: Option<Arc<FakeStore>>,
}

impl StaticProvider {
    pub fn new(store: Arc<FakeStore>) -> Self {
        Self { store: Some(store) }
    }

    pub fn unauthenticated() -> Self {
        Self { store: None }
    }
}

#[async_trait]
impl CredentialProvider for StaticProvider {
    async fn handle(&self) -> Result<RemoteHandle, AuthError> {
        match &self.store {
            Some(store) => Ok(Arc::clone(store) as RemoteHandle),
            None => Err(AuthError::Expired),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeliveredDocument {
    pub destination: i64,
    pub path: PathBuf,
    pub caption: String,
    pub contents: Option<Vec<u8>>,
}

#[derive(Default)]
pub struct RecordingChannel {
    pub messages: Mutex<Vec<(i64, String, Instant)>>,
    pub documents: Mutex<Vec<DeliveredDocument>>,
    pub fail_documents: AtomicBool,
    /// Reject (but still record) messages containing this text.
    pub reject_containing: Mutex<Option<String>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages.lock().iter().map(|(_, t, _)| t.clone()).collect()
    }

    pub fn texts_for(&self, destination: i64) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|(d, _, _)| *d == destination)
            .map(|(_, t, _)| t.clone())
            .collect()
    }

    pub fn instants(&self) -> Vec<Instant> {
        self.messages.lock().iter().map(|(_, _, at)| *at).collect()
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn documents(&self) -> Vec<DeliveredDocument> {
        self.documents.lock().clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn deliver_message(&self, destination: i64, text: &str) -> Result<()> {
        self.messages
            .lock()
            .push((destination, text.to_string(), Instant::now()));
        let reject = self.reject_containing.lock().clone();
        match reject {
            Some(needle) if text.contains(&needle) => Err(anyhow!("message rejected")),
            _ => Ok(()),
        }
    }

    async fn deliver_document(&self, destination: i64, path: &Path, caption: &str) -> Result<()> {
        let contents = std::fs::read(path).ok();
        self.documents.lock().push(DeliveredDocument {
            destination,
            path: path.to_path_buf(),
            caption: caption.to_string(),
            contents,
        });
        if self.fail_documents.load(Ordering::SeqCst) {
            return Err(anyhow!("upload refused"));
        }
        Ok(())
    }
}

pub fn test_config(transient_dir: &Path) -> RelayConfig {
    RelayConfig {
        transient_dir: transient_dir.to_string_lossy().into_owned(),
        ..RelayConfig::default()
    }
}

/// Poll `cond` every 50ms (virtual time when paused) until it holds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..2000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("condition not reached in time");
}

pub fn dir_entries(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default()
}
