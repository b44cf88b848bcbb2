//! Metrics poller - live samples for whichever node is selected

use chrono::Local;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::core::events::{Event, PollerEvent};
use crate::core::state::{MetricFamilySnapshot, NodeMetrics, PollerPhase};
use crate::integrations::api::{ApiError, FleetApi};
use crate::metrics::MetricFamily;
use crate::pollers::{stopped, ticker, RefreshRequest, Reporter, Schedule};

pub struct MetricsPoller {
    client: Arc<dyn FleetApi>,
    reporter: Reporter,
    selection: watch::Receiver<Option<String>>,
    refresh_rx: mpsc::Receiver<RefreshRequest>,
    tick: Duration,
    schedule: Schedule,
    phase: PollerPhase,
}

impl MetricsPoller {
    pub fn new(
        client: Arc<dyn FleetApi>,
        events: mpsc::UnboundedSender<Event>,
        selection: watch::Receiver<Option<String>>,
        refresh_rx: mpsc::Receiver<RefreshRequest>,
        tick: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            reporter: Reporter::new(events),
            selection,
            refresh_rx,
            tick,
            schedule: Schedule::new(interval),
            phase: PollerPhase::Idle,
        }
    }

    fn transition(&mut self, phase: PollerPhase) {
        tracing::trace!(from = ?self.phase, to = ?phase, "metrics poller");
        self.phase = phase;
    }

    /// Drain the refresh slot. Several requests collapse into one fetch.
    fn take_refresh_request(&mut self) -> bool {
        let mut requested = false;
        while self.refresh_rx.try_recv().is_ok() {
            requested = true;
        }
        requested
    }

    fn current_selection(&self) -> Option<String> {
        self.selection.borrow().clone()
    }

    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        tracing::debug!("metrics poller started");
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

            let forced = self.take_refresh_request();
            let Some(node_id) = self.current_selection() else {
                continue;
            };
            if !forced && !self.schedule.is_due(Instant::now()) {
                continue;
            }
            if !self.fetch(node_id, &mut stop).await {
                break;
            }
        }

        tracing::debug!("metrics poller stopped");
    }

    /// One Idle -> Fetching -> Idle cycle for `node_id`. Returns false when
    /// the poller should exit.
    async fn fetch(&mut self, node_id: String, stop: &mut watch::Receiver<bool>) -> bool {
        self.transition(PollerPhase::Fetching);
        self.schedule.mark_started(Instant::now());
        if !self.reporter.report(PollerEvent::MetricsStarted {
            node_id: node_id.clone(),
        }) {
            return false;
        }

        let result = tokio::select! {
            biased;
            _ = stopped(stop) => {
                tracing::debug!(node_id = %node_id, "abandoning metrics fetch on shutdown");
                return false;
            }
            result = fetch_families(self.client.as_ref(), &node_id) => result,
        };
        self.transition(PollerPhase::Idle);

        let event = match result {
            Ok(families) => {
                if self.current_selection().as_deref() != Some(node_id.as_str()) {
                    tracing::debug!(node_id = %node_id, "selection moved during fetch, discarding metrics");
                    PollerEvent::MetricsDiscarded { node_id }
                } else {
                    PollerEvent::MetricsFetched(NodeMetrics {
                        node_id,
                        families,
                        fetched_at: Local::now(),
                    })
                }
            }
            Err((family, e)) => {
                tracing::warn!(node_id = %node_id, %family, error = %e, "metrics fetch failed");
                PollerEvent::MetricsFailed {
                    node_id,
                    error: e.to_string(),
                }
            }
        };
        self.reporter.report(event)
    }
}

/// Fetch cpu, mem and disk in order. The first failure aborts the cycle so a
/// snapshot never mixes families from different instants.
async fn fetch_families(
    client: &dyn FleetApi,
    node_id: &str,
) -> Result<BTreeMap<MetricFamily, MetricFamilySnapshot>, (MetricFamily, ApiError)> {
    let mut families = BTreeMap::new();
    for family in MetricFamily::ALL {
        let samples = client
            .fetch_live_metrics(node_id, family)
            .await
            .map_err(|e| (family, e))?;
        families.insert(family, MetricFamilySnapshot { family, samples });
    }
    Ok(families)
}
