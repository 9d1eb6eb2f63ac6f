// Rate-limited outbound queue: one global FIFO drained by a single paced worker.
//
// Ordering is global across all destinations, so a burst of progress notices
// for one transfer delays everyone queued behind it. Delivery failures are
// logged and counted, never retried.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::notice::Notice;
use super::stats::RelayStats;
use crate::channel::NotificationChannel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub destination: i64,
    pub text: String,
}

/// Cheap to clone; every clone feeds the same queue.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<OutboundMessage>,
    stats: Arc<RelayStats>,
    shutdown_token: CancellationToken,
}

impl Dispatcher {
    /// Spawn the worker. Deliveries are spaced at least `interval` apart.
    pub fn start(
        channel: Arc<dyn NotificationChannel>,
        interval: Duration,
        stats: Arc<RelayStats>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown_token = CancellationToken::new();

        let worker = tokio::spawn(Self::run(
            rx,
            channel,
            interval,
            Arc::clone(&stats),
            shutdown_token.clone(),
        ));

        let dispatcher = Self {
            tx,
            stats,
            shutdown_token,
        };
        (dispatcher, worker)
    }

    /// Queue a message and return immediately.
    pub fn enqueue(&self, destination: i64, text: impl Into<String>) {
        let message = OutboundMessage {
            destination,
            text: text.into(),
        };
        self.stats.record_enqueued();
        if let Err(e) = self.tx.send(message) {
            // Only possible once the worker has stopped.
            warn!(
                "dispatcher stopped, dropping message for {}: {}",
                destination, e.0.text
            );
            self.stats.record_dispatched(false);
        }
    }

    pub fn notify(&self, destination: i64, notice: &Notice) {
        self.enqueue(destination, notice.to_string());
    }

    /// Stop accepting messages. The worker keeps pacing until everything
    /// already queued has been delivered, then exits.
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }

    async fn run(
        mut rx: mpsc::UnboundedReceiver<OutboundMessage>,
        channel: Arc<dyn NotificationChannel>,
        interval: Duration,
        stats: Arc<RelayStats>,
        shutdown_token: CancellationToken,
    ) {
        let mut pacer = tokio::time::interval(interval);
        pacer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut closing = false;
        loop {
            let message = tokio::select! {
                biased;
                _ = shutdown_token.cancelled(), if !closing => {
                    // Refuse new messages; recv() still yields what was accepted.
                    rx.close();
                    closing = true;
                    debug!("dispatcher closing, draining accepted messages");
                    continue;
                }
                message = rx.recv() => match message {
                    Some(m) => m,
                    // Closed or every sender dropped, and the queue is drained.
                    None => break,
                },
            };

            pacer.tick().await;

            let delivery = channel.deliver_message(message.destination, &message.text);
            match AssertUnwindSafe(delivery).catch_unwind().await {
                Ok(Ok(())) => {
                    stats.record_dispatched(true);
                    debug!("delivered message to {}", message.destination);
                }
                Ok(Err(e)) => {
                    stats.record_dispatched(false);
                    warn!("channel rejected message for {}: {}", message.destination, e);
                }
                Err(_) => {
                    stats.record_dispatched(false);
                    error!("channel panicked delivering to {}", message.destination);
                }
            }
        }

        debug!("dispatcher worker stopped");
    }
}
