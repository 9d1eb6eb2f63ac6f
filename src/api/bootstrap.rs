use std::sync::{Arc, Once};

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::commands::CommandRouter;
use crate::channel::NotificationChannel;
use crate::config::RelayConfig;
use crate::engine::coordinator::{HandleOutcome, RequestCoordinator};
use crate::engine::dispatcher::Dispatcher;
use crate::engine::stats::{RelayStats, StatsSnapshot};
use crate::remote::CredentialProvider;

static INIT_TRACING: Once = Once::new();

/// Install the global fmt subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();

        info!("relay tracing initialized");
    });
}

/// Fully wired relay: dispatcher worker, coordinator, and command router.
pub struct RelayEngine {
    coordinator: Arc<RequestCoordinator>,
    router: CommandRouter,
    dispatcher_worker: JoinHandle<()>,
}

impl RelayEngine {
    /// Must be called inside a tokio runtime.
    pub fn start(
        config: RelayConfig,
        credentials: Arc<dyn CredentialProvider>,
        channel: Arc<dyn NotificationChannel>,
    ) -> Result<Self> {
        config.validate()?;

        let stats = Arc::new(RelayStats::new());
        let (dispatcher, dispatcher_worker) = Dispatcher::start(
            Arc::clone(&channel),
            config.dispatch_interval(),
            Arc::clone(&stats),
        );
        info!(
            "relay starting: rate={}/s ttl={}s attempts={} transient_dir={}",
            config.rate_limit_per_sec,
            config.cache_ttl_secs,
            config.max_attempts,
            config.transient_dir().display()
        );

        let coordinator = Arc::new(RequestCoordinator::new(
            config,
            credentials,
            channel,
            dispatcher,
            stats,
        ));
        let router = CommandRouter::new(Arc::clone(&coordinator));

        Ok(Self {
            coordinator,
            router,
            dispatcher_worker,
        })
    }

    /// Feed one incoming chat message.
    pub async fn on_message(&self, destination: i64, text: &str) -> Option<HandleOutcome> {
        self.router.route(destination, text).await
    }

    pub fn coordinator(&self) -> &Arc<RequestCoordinator> {
        &self.coordinator
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.coordinator.stats().snapshot()
    }

    /// Wait for in-flight transfers, then let the dispatcher flush every
    /// accepted notice before its worker stops.
    pub async fn shutdown(self) {
        self.coordinator.drain().await;
        self.coordinator.dispatcher().shutdown();
        let _ = self.dispatcher_worker.await;
        info!("relay stopped");
    }
}
