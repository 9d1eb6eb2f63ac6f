// Request coordinator: authenticate, resolve name -> id, then hand the
// transfer-and-deliver sequence to its own task so the front-end never waits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::cache::LookupCache;
use super::dispatcher::Dispatcher;
use super::notice::{document_caption, Notice};
use super::stats::RelayStats;
use super::transfer::TransferOrchestrator;
use crate::channel::NotificationChannel;
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::remote::{CredentialProvider, RemoteHandle, RemoteStore};

/// One end-to-end request from the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub destination: i64,
    pub document_name: String,
}

/// What `handle` did before returning to the caller.
#[derive(Debug)]
pub enum HandleOutcome {
    /// Transfer-and-deliver is running on its own task.
    Spawned(JoinHandle<()>),
    AuthFailed,
    NotFound,
    SearchFailed,
}

/// Finished transient file; deleted on every exit path, unwinding included.
pub struct TransientFile {
    path: PathBuf,
    removed: bool,
}

impl TransientFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn remove(mut self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!("removed transient file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "could not remove transient file {}: {}",
                self.path.display(),
                e
            ),
        }
        self.removed = true;
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if !self.removed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Keeps the active-transfer gauge honest even if the task unwinds.
struct ActiveTransfer(Arc<RelayStats>);

impl ActiveTransfer {
    fn begin(stats: Arc<RelayStats>) -> Self {
        stats.increment_transfers();
        Self(stats)
    }
}

impl Drop for ActiveTransfer {
    fn drop(&mut self) {
        self.0.decrement_transfers();
    }
}

pub struct RequestCoordinator {
    config: RelayConfig,
    credentials: Arc<dyn CredentialProvider>,
    channel: Arc<dyn NotificationChannel>,
    cache: Arc<LookupCache>,
    dispatcher: Dispatcher,
    orchestrator: Arc<TransferOrchestrator>,
    stats: Arc<RelayStats>,
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
}

impl RequestCoordinator {
    pub fn new(
        config: RelayConfig,
        credentials: Arc<dyn CredentialProvider>,
        channel: Arc<dyn NotificationChannel>,
        dispatcher: Dispatcher,
        stats: Arc<RelayStats>,
    ) -> Self {
        let cache = Arc::new(LookupCache::new(config.cache_ttl()));
        let orchestrator = Arc::new(TransferOrchestrator::new(
            &config,
            dispatcher.clone(),
            Arc::clone(&stats),
        ));
        let permits = Arc::new(Semaphore::new(config.max_concurrent_transfers));
        Self {
            config,
            credentials,
            channel,
            cache,
            dispatcher,
            orchestrator,
            stats,
            tracker: TaskTracker::new(),
            permits,
        }
    }

    /// Entry point for one document request. Returns as soon as the transfer
    /// has been handed off; every outcome is reported to `destination`.
    pub async fn handle(&self, destination: i64, document_name: &str) -> HandleOutcome {
        let ctx = RequestContext {
            destination,
            document_name: document_name.to_string(),
        };

        let store = match self.credentials.handle().await {
            Ok(store) => store,
            Err(e) => {
                warn!("request {} for '{}': {}", destination, document_name, e);
                self.dispatcher.notify(destination, &Notice::AuthFailed);
                return HandleOutcome::AuthFailed;
            }
        };

        let remote_id = match self.resolve(store.as_ref(), document_name).await {
            Ok(id) => id,
            Err(RelayError::NotFound(file_name)) => {
                info!("request {}: no remote file {}", destination, file_name);
                self.dispatcher.notify(
                    destination,
                    &Notice::NotFound {
                        name: document_name.to_string(),
                    },
                );
                return HandleOutcome::NotFound;
            }
            Err(e) => {
                error!("request {} for '{}': {}", destination, document_name, e);
                self.dispatcher.notify(destination, &Notice::Internal);
                return HandleOutcome::SearchFailed;
            }
        };

        HandleOutcome::Spawned(self.spawn_transfer(ctx, store, remote_id))
    }

    /// Cache first, then the remote store. The first search result wins.
    pub async fn resolve(&self, store: &dyn RemoteStore, name: &str) -> Result<String, RelayError> {
        if let Some(id) = self.cache.lookup(name) {
            self.stats.record_cache_hit();
            return Ok(id);
        }
        self.stats.record_cache_miss();

        let file_name = self.config.remote_file_name(name);
        let files = store.search(&file_name).await.map_err(RelayError::Search)?;
        if files.len() > 1 {
            debug!("{} files named {}, taking the first", files.len(), file_name);
        }
        let first = files
            .into_iter()
            .next()
            .ok_or(RelayError::NotFound(file_name))?;

        self.cache.store(name, &first.id);
        Ok(first.id)
    }

    fn spawn_transfer(
        &self,
        ctx: RequestContext,
        store: RemoteHandle,
        remote_id: String,
    ) -> JoinHandle<()> {
        let orchestrator = Arc::clone(&self.orchestrator);
        let channel = Arc::clone(&self.channel);
        let dispatcher = self.dispatcher.clone();
        let stats = Arc::clone(&self.stats);
        let permits = Arc::clone(&self.permits);

        self.tracker.spawn(async move {
            // The semaphore is never closed, so this only waits for capacity.
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let _active = ActiveTransfer::begin(stats);

            transfer_and_deliver(ctx, store, remote_id, &orchestrator, channel, dispatcher).await;
        })
    }

    /// Wait until every spawned transfer-and-deliver sequence has finished.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }
}

async fn transfer_and_deliver(
    ctx: RequestContext,
    store: RemoteHandle,
    remote_id: String,
    orchestrator: &TransferOrchestrator,
    channel: Arc<dyn NotificationChannel>,
    dispatcher: Dispatcher,
) {
    let path = match orchestrator
        .transfer(store.as_ref(), &remote_id, ctx.destination, &ctx.document_name)
        .await
    {
        Ok(path) => path,
        Err(e) => {
            warn!("request {} for '{}': {}", ctx.destination, ctx.document_name, e);
            dispatcher.notify(ctx.destination, &Notice::TransferFailed);
            return;
        }
    };

    let transient = TransientFile::new(path);
    let caption = document_caption(&ctx.document_name);
    match channel
        .deliver_document(ctx.destination, transient.path(), &caption)
        .await
    {
        Ok(()) => {
            info!("delivered '{}' to {}", ctx.document_name, ctx.destination);
            dispatcher.notify(ctx.destination, &Notice::Delivered);
        }
        Err(e) => {
            let reason = e.to_string();
            warn!(
                "request {} for '{}': {}",
                ctx.destination,
                ctx.document_name,
                RelayError::Delivery(e)
            );
            dispatcher.notify(ctx.destination, &Notice::DeliveryFailed(reason));
        }
    }

    transient.remove().await;
}
