//! Background pollers feeding the dashboard
//!
//! Both pollers wake on a short fixed tick, decide whether a fetch is due and
//! report progress as [`PollerEvent`]s. Neither ever blocks the render loop.

pub mod inventory;
pub mod metrics;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::RefreshConfig;
use crate::core::events::{Event, PollerEvent};
use crate::integrations::api::FleetApi;

pub use inventory::InventoryPoller;
pub use metrics::MetricsPoller;

tokio::task_local! {
    static POLLER: &'static str;
}

/// True while running inside one of the poller tasks
pub fn in_poller_task() -> bool {
    POLLER.try_with(|_| ()).is_ok()
}

/// A poller that ended while the dashboard was still running
#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("{0} poller stopped unexpectedly")]
    Exited(&'static str),

    #[error("poller panicked: {0}")]
    Panicked(String),

    #[error("poller task was cancelled")]
    Cancelled,
}

impl From<JoinError> for PollerError {
    fn from(e: JoinError) -> Self {
        if !e.is_panic() {
            return Self::Cancelled;
        }
        let payload = e.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self::Panicked(message)
    }
}

/// Interval bookkeeping, measured from the start of the last fetch
#[derive(Debug, Clone)]
pub struct Schedule {
    interval: Duration,
    last_started: Option<Instant>,
}

impl Schedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_started: None,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_started {
            None => true,
            Some(started) => now.saturating_duration_since(started) >= self.interval,
        }
    }

    pub fn mark_started(&mut self, now: Instant) {
        self.last_started = Some(now);
    }
}

/// One-shot "fetch now" request for the metrics poller
#[derive(Debug, Clone, Copy)]
pub struct RefreshRequest;

/// Sending half of the single-slot refresh queue
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    tx: mpsc::Sender<RefreshRequest>,
}

impl RefreshHandle {
    pub fn channel() -> (Self, mpsc::Receiver<RefreshRequest>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, rx)
    }

    /// Returns false when a request is already queued (or the poller is gone)
    pub fn request(&self) -> bool {
        self.tx.try_send(RefreshRequest).is_ok()
    }
}

/// Sends poller progress to the render loop. Fails once the loop has gone.
#[derive(Debug, Clone)]
pub(crate) struct Reporter {
    tx: mpsc::UnboundedSender<Event>,
}

impl Reporter {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { tx }
    }

    pub(crate) fn report(&self, event: PollerEvent) -> bool {
        self.tx.send(Event::Poller(event)).is_ok()
    }
}

pub(crate) fn ticker(tick: Duration) -> tokio::time::Interval {
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Resolves once the stop signal is raised or its sender is gone
pub(crate) async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stop| *stop).await;
}

/// Running poller tasks and the signal that stops them
pub struct PollerHandles {
    stop_tx: watch::Sender<bool>,
    tasks: JoinSet<&'static str>,
}

impl PollerHandles {
    /// Start both pollers on the current runtime. `inventory_seeded_at` marks
    /// a node list fetched before the dashboard started, so the first
    /// scheduled inventory fetch waits a full interval.
    pub fn spawn(
        client: Arc<dyn FleetApi>,
        events: mpsc::UnboundedSender<Event>,
        selection: watch::Receiver<Option<String>>,
        refresh_rx: mpsc::Receiver<RefreshRequest>,
        config: &RefreshConfig,
        inventory_seeded_at: Option<Instant>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);

        let mut inventory = InventoryPoller::new(
            Arc::clone(&client),
            events.clone(),
            config.poller_tick(),
            config.inventory_interval(),
        );
        if let Some(at) = inventory_seeded_at {
            inventory = inventory.seeded(at);
        }
        let metrics = MetricsPoller::new(
            client,
            events,
            selection,
            refresh_rx,
            config.poller_tick(),
            config.metrics_interval(),
        );

        let mut tasks = JoinSet::new();
        spawn_poller(&mut tasks, "inventory", inventory.run(stop_rx.clone()));
        spawn_poller(&mut tasks, "metrics", metrics.run(stop_rx));

        Self { stop_tx, tasks }
    }

    /// Resolves when a poller ends on its own, before any stop was requested.
    /// Cancel safe; pends forever once every poller has been reaped.
    pub async fn failed(&mut self) -> PollerError {
        match self.tasks.join_next().await {
            Some(Ok(name)) => PollerError::Exited(name),
            Some(Err(e)) => PollerError::from(e),
            None => std::future::pending().await,
        }
    }

    /// Ask the pollers to stop and wait until they have. Reports the first
    /// poller that panicked on the way out.
    pub async fn shutdown(mut self) -> Result<(), PollerError> {
        let _ = self.stop_tx.send(true);

        let mut first_error = None;
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                let e = PollerError::from(e);
                tracing::error!(error = %e, "poller failed during shutdown");
                first_error.get_or_insert(e);
            }
        }
        tracing::info!("pollers stopped");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn spawn_poller<F>(tasks: &mut JoinSet<&'static str>, name: &'static str, poller: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tasks.spawn(POLLER.scope(name, async move {
        poller.await;
        name
    }));
}
