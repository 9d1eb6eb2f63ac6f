// Transfer orchestrator: streams one remote document into a locked transient
// file, with throttled progress notices and exponential-backoff retries.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fs2::FileExt;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::dispatcher::Dispatcher;
use super::notice::Notice;
use super::progress::ProgressThrottle;
use super::retry::{RetryDecision, RetryPolicy};
use super::stats::RelayStats;
use crate::config::RelayConfig;
use crate::error::{RelayError, TransferError};
use crate::remote::RemoteStore;

/// Exclusive advisory lock on `<transient path>.lock`, held for one attempt.
/// Acquiring it touches the filesystem synchronously; call it off the runtime.
struct TransientLock {
    file: File,
    path: PathBuf,
}

impl TransientLock {
    fn acquire(target: &Path) -> Result<Self, TransferError> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let path = lock_path(target);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        FileExt::try_lock_exclusive(&file)
            .map_err(|_| TransferError::Locked(target.to_path_buf()))?;
        Ok(Self { file, path })
    }
}

impl Drop for TransientLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = fs::remove_file(&self.path);
    }
}

pub fn lock_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

struct StreamOutcome {
    written: u64,
    expected: Option<u64>,
}

pub struct TransferOrchestrator {
    transient_dir: PathBuf,
    extension: String,
    policy: RetryPolicy,
    stream_timeout: Duration,
    progress_step: u8,
    dispatcher: Dispatcher,
    stats: Arc<RelayStats>,
    sequence: AtomicU64,
}

impl TransferOrchestrator {
    pub fn new(config: &RelayConfig, dispatcher: Dispatcher, stats: Arc<RelayStats>) -> Self {
        Self {
            transient_dir: config.transient_dir(),
            extension: config.document_extension.trim_start_matches('.').to_string(),
            policy: RetryPolicy::from_config(config),
            stream_timeout: config.stream_timeout(),
            progress_step: config.progress_step_percent,
            dispatcher,
            stats,
            sequence: AtomicU64::new(0),
        }
    }

    /// Fresh transient path, unique across concurrent requests for the same id.
    pub fn transient_path(&self, remote_id: &str) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let mut name = format!("temp_{}_{}_{}", sanitize_id(remote_id), millis, seq);
        if !self.extension.is_empty() {
            name.push('.');
            name.push_str(&self.extension);
        }
        self.transient_dir.join(name)
    }

    /// Download `remote_id` into a new transient file.
    ///
    /// On success the caller owns the returned file and must delete it. On
    /// failure the user has already been told and nothing is left on disk.
    pub async fn transfer(
        &self,
        store: &dyn RemoteStore,
        remote_id: &str,
        destination: i64,
        display_name: &str,
    ) -> Result<PathBuf, RelayError> {
        let path = self.transient_path(remote_id);
        self.transfer_into(store, remote_id, destination, display_name, &path)
            .await?;
        Ok(path)
    }

    /// Same as [`transfer`](Self::transfer) with a caller-chosen transient path.
    pub async fn transfer_into(
        &self,
        store: &dyn RemoteStore,
        remote_id: &str,
        destination: i64,
        display_name: &str,
        path: &Path,
    ) -> Result<(), RelayError> {
        self.dispatcher.notify(
            destination,
            &Notice::Downloading {
                name: display_name.to_string(),
            },
        );

        let mut retry = self.policy.start();
        loop {
            let attempt = retry.attempt();
            self.stats.record_attempt();
            debug!(
                "transfer id={} attempt={} path={}",
                remote_id,
                attempt,
                path.display()
            );

            let error = match self.attempt(store, remote_id, path, destination).await {
                Ok(bytes) => {
                    info!(
                        "transfer id={} complete: {} bytes in {} attempt(s)",
                        remote_id, bytes, attempt
                    );
                    return Ok(());
                }
                Err(e) => e,
            };

            self.stats.record_attempt_failed();
            remove_partial(path).await;
            warn!(
                "transfer id={} attempt {} failed: {}",
                remote_id, attempt, error
            );
            self.dispatcher
                .notify(destination, &Notice::AttemptFailed(error.to_string()));

            match retry.on_failure() {
                RetryDecision::RetryAfter(delay) => {
                    debug!("transfer id={} backing off {:?}", remote_id, delay);
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp => {
                    warn!("transfer id={} gave up after {} attempts", remote_id, attempt);
                    self.dispatcher.notify(destination, &Notice::RetriesExhausted);
                    return Err(RelayError::RetriesExhausted { attempts: attempt });
                }
            }
        }
    }

    /// Acquire -> stream -> verify. The lock is released when this returns.
    async fn attempt(
        &self,
        store: &dyn RemoteStore,
        remote_id: &str,
        path: &Path,
        destination: i64,
    ) -> Result<u64, TransferError> {
        let target = path.to_path_buf();
        let _lock = tokio::task::spawn_blocking(move || TransientLock::acquire(&target))
            .await
            .map_err(|e| TransferError::Io(std::io::Error::other(e)))??;

        let outcome = tokio::time::timeout(
            self.stream_timeout,
            self.stream_to_file(store, remote_id, path, destination),
        )
        .await
        .map_err(|_| TransferError::Timeout(self.stream_timeout))??;

        verify(path, outcome.expected).await?;
        Ok(outcome.written)
    }

    async fn stream_to_file(
        &self,
        store: &dyn RemoteStore,
        remote_id: &str,
        path: &Path,
        destination: i64,
    ) -> Result<StreamOutcome, TransferError> {
        let media = store
            .stream_media(remote_id, self.stream_timeout)
            .await
            .map_err(TransferError::Stream)?;

        let mut file = tokio::fs::File::create(path).await?;
        let mut throttle = ProgressThrottle::new(self.progress_step, media.total_size);
        let mut body = media.body;
        let mut written = 0u64;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(TransferError::Stream)?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            self.stats.record_transferred(chunk.len() as u64);

            if let Some(pct) = throttle.observe(written) {
                self.dispatcher.notify(destination, &Notice::Progress(pct));
            }
        }

        file.flush().await?;
        file.sync_all().await?;

        Ok(StreamOutcome {
            written,
            expected: media.total_size,
        })
    }
}

/// The file must exist, be non-empty, and not be shorter than announced.
async fn verify(path: &Path, expected: Option<u64>) -> Result<(), TransferError> {
    let len = match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(TransferError::Empty),
        Err(e) => return Err(e.into()),
    };
    if len == 0 {
        return Err(TransferError::Empty);
    }
    if let Some(expected) = expected {
        if len < expected {
            return Err(TransferError::Truncated {
                written: len,
                expected,
            });
        }
    }
    Ok(())
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("removed partial file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("could not remove partial file {}: {}", path.display(), e),
    }
}
