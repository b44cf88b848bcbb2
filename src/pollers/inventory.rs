//! Inventory poller - refreshes the full node list on a coarse interval

use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::core::events::{Event, PollerEvent};
use crate::core::state::PollerPhase;
use crate::integrations::api::FleetApi;
use crate::pollers::{stopped, ticker, Reporter, Schedule};

pub struct InventoryPoller {
    client: Arc<dyn FleetApi>,
    reporter: Reporter,
    tick: Duration,
    schedule: Schedule,
    phase: PollerPhase,
    has_succeeded: bool,
}

impl InventoryPoller {
    pub fn new(
        client: Arc<dyn FleetApi>,
        events: mpsc::UnboundedSender<Event>,
        tick: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            reporter: Reporter::new(events),
            tick,
            schedule: Schedule::new(interval),
            phase: PollerPhase::Idle,
            has_succeeded: false,
        }
    }

    /// Treat a node list fetched at `at` elsewhere as this poller's first
    /// success, so the next fetch waits out the interval
    pub fn seeded(mut self, at: Instant) -> Self {
        self.has_succeeded = true;
        self.schedule.mark_started(at);
        self
    }

    fn is_due(&self, now: Instant) -> bool {
        !self.has_succeeded || self.schedule.is_due(now)
    }

    fn transition(&mut self, phase: PollerPhase) {
        tracing::trace!(from = ?self.phase, to = ?phase, "inventory poller");
        self.phase = phase;
    }

    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        tracing::debug!("inventory poller started");
        let mut ticker = ticker(self.tick);

        loop {
            tokio::select! {
                biased;
                _ = stopped(&mut stop) => break,
                _ = ticker.tick() => {}
            }
            if *stop.borrow() {
                break;
            }
            if !self.is_due(Instant::now()) {
                continue;
            }
            if !self.fetch(&mut stop).await {
                break;
            }
        }

        tracing::debug!("inventory poller stopped");
    }

    /// One Idle -> Fetching -> Idle cycle. Returns false when the poller
    /// should exit.
    async fn fetch(&mut self, stop: &mut watch::Receiver<bool>) -> bool {
        self.transition(PollerPhase::Fetching);
        self.schedule.mark_started(Instant::now());
        if !self.reporter.report(PollerEvent::InventoryStarted) {
            return false;
        }

        let result = tokio::select! {
            biased;
            _ = stopped(stop) => {
                tracing::debug!("abandoning inventory fetch on shutdown");
                return false;
            }
            result = self.client.fetch_nodes() => result,
        };
        self.transition(PollerPhase::Idle);

        let event = match result {
            Ok(nodes) => {
                self.has_succeeded = true;
                tracing::info!(count = nodes.len(), "node inventory updated");
                PollerEvent::InventoryFetched {
                    nodes,
                    fetched_at: Local::now(),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "node inventory fetch failed, keeping previous list");
                PollerEvent::InventoryFailed {
                    error: e.to_string(),
                }
            }
        };
        self.reporter.report(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::tests::node;
    use crate::integrations::api::{ApiError, MockFleetApi};
    use reqwest::StatusCode;

    async fn next_poller_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> PollerEvent {
        match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
            Ok(Some(Event::Poller(event))) => event,
            other => panic!("expected a poller event, got {:?}", other),
        }
    }

    type Spawned = (
        watch::Sender<bool>,
        mpsc::UnboundedReceiver<Event>,
        tokio::task::JoinHandle<()>,
    );

    fn spawn(api: MockFleetApi, interval: Duration) -> Spawned {
        spawn_with(api, interval, None)
    }

    fn spawn_with(api: MockFleetApi, interval: Duration, seeded_at: Option<Instant>) -> Spawned {
        let (tx, rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut poller = InventoryPoller::new(Arc::new(api), tx, Duration::from_millis(5), interval);
        if let Some(at) = seeded_at {
            poller = poller.seeded(at);
        }
        (stop_tx, rx, tokio::spawn(poller.run(stop_rx)))
    }

    #[tokio::test]
    async fn test_fetches_immediately_on_first_tick() {
        let mut api = MockFleetApi::new();
        api.expect_fetch_nodes()
            .times(1)
            .returning(|| Ok(vec![node("a"), node("b")]));

        let (stop_tx, mut rx, handle) = spawn(api, Duration::from_secs(30));

        assert!(matches!(
            next_poller_event(&mut rx).await,
            PollerEvent::InventoryStarted
        ));
        match next_poller_event(&mut rx).await {
            PollerEvent::InventoryFetched { nodes, .. } => assert_eq!(nodes.len(), 2),
            other => panic!("unexpected event {:?}", other),
        }

        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("poller stops")
            .unwrap();
    }

    #[tokio::test]
    async fn test_failure_is_reported_and_retried_until_first_success() {
        let mut api = MockFleetApi::new();
        let mut seq = mockall::Sequence::new();
        api.expect_fetch_nodes()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(ApiError::Status(StatusCode::SERVICE_UNAVAILABLE)));
        api.expect_fetch_nodes()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![node("a")]));

        let (stop_tx, mut rx, handle) = spawn(api, Duration::from_secs(30));

        assert!(matches!(
            next_poller_event(&mut rx).await,
            PollerEvent::InventoryStarted
        ));
        match next_poller_event(&mut rx).await {
            PollerEvent::InventoryFailed { error } => assert!(error.contains("503")),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(
            next_poller_event(&mut rx).await,
            PollerEvent::InventoryStarted
        ));
        assert!(matches!(
            next_poller_event(&mut rx).await,
            PollerEvent::InventoryFetched { .. }
        ));

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_exits_when_render_loop_is_gone() {
        let mut api = MockFleetApi::new();
        api.expect_fetch_nodes().returning(|| Ok(Vec::new()));

        let (_stop_tx, rx, handle) = spawn(api, Duration::from_millis(1));
        drop(rx);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("poller should notice the closed channel")
            .unwrap();
    }

    #[tokio::test]
    async fn test_seeded_poller_waits_a_full_interval() {
        let mut api = MockFleetApi::new();
        api.expect_fetch_nodes().times(0);

        let (stop_tx, mut rx, handle) =
            spawn_with(api, Duration::from_secs(30), Some(Instant::now()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
