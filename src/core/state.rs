//! Dashboard state owned by the render loop
//!
//! Pollers never touch this directly: their results arrive as events and are
//! merged here, so every mutation happens on the render loop.

use chrono::{DateTime, Local};
use std::collections::BTreeMap;

use crate::integrations::api::{MetricSample, Node};
use crate::metrics::{sample_map, MetricFamily, SampleMap};

/// Phase of one background poller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollerPhase {
    #[default]
    Idle,
    Fetching,
}

/// Samples of one family captured at a single fetch instant
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamilySnapshot {
    pub family: MetricFamily,
    pub samples: Vec<MetricSample>,
}

impl MetricFamilySnapshot {
    pub fn sample_map(&self) -> SampleMap<'_> {
        sample_map(self.family, &self.samples)
    }
}

/// All three families fetched for one node in one poller cycle
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMetrics {
    pub node_id: String,
    pub families: BTreeMap<MetricFamily, MetricFamilySnapshot>,
    pub fetched_at: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Up,
    Down,
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsOutcome {
    Applied,
    /// Selection moved on while the fetch was running
    Discarded,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub nodes: Vec<Node>,
    pub selection_index: usize,
    pub selected_node_id: Option<String>,
    pub metrics: BTreeMap<MetricFamily, MetricFamilySnapshot>,
    /// Node the current `metrics` belong to
    pub metrics_node_id: Option<String>,
    pub last_inventory_update: Option<DateTime<Local>>,
    pub last_metrics_update: Option<DateTime<Local>>,
    pub inventory_phase: PollerPhase,
    pub metrics_phase: PollerPhase,
    /// Node the metrics poller is currently fetching for
    pub metrics_target: Option<String>,
    /// A forced refresh was requested and not yet picked up
    pub refresh_pending: bool,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.nodes.get(self.selection_index)
    }

    /// Metrics for the selected node, if the last completed fetch was for it
    pub fn selected_metrics(&self) -> Option<&BTreeMap<MetricFamily, MetricFamilySnapshot>> {
        match (&self.selected_node_id, &self.metrics_node_id) {
            (Some(selected), Some(fetched)) if selected == fetched => Some(&self.metrics),
            _ => None,
        }
    }

    /// True while the selected node has no samples yet but a fetch for it is
    /// running or about to start.
    pub fn metrics_loading(&self) -> bool {
        let Some(selected) = self.selected_node_id.as_deref() else {
            return false;
        };
        if self.selected_metrics().is_some() {
            return false;
        }
        self.refresh_pending
            || (self.metrics_phase == PollerPhase::Fetching
                && self.metrics_target.as_deref() == Some(selected))
    }

    /// Footer status text
    pub fn busy_status(&self) -> Option<&'static str> {
        if self.inventory_phase == PollerPhase::Fetching {
            Some("updating node list...")
        } else if self.metrics_phase == PollerPhase::Fetching {
            Some("updating node data...")
        } else {
            None
        }
    }

    pub fn inventory_started(&mut self) {
        self.inventory_phase = PollerPhase::Fetching;
    }

    pub fn inventory_failed(&mut self) {
        self.inventory_phase = PollerPhase::Idle;
    }

    /// Replace the node list wholesale. Returns true when the selected node
    /// changed as a consequence.
    pub fn apply_inventory(&mut self, nodes: Vec<Node>, fetched_at: DateTime<Local>) -> bool {
        self.nodes = nodes;
        self.last_inventory_update = Some(fetched_at);
        self.inventory_phase = PollerPhase::Idle;

        if let Some(id) = &self.selected_node_id {
            if let Some(pos) = self.nodes.iter().position(|n| &n.id == id) {
                self.selection_index = pos;
            }
        }
        self.sync_selection()
    }

    /// Move the cursor. Returns true when the selected node changed.
    pub fn move_selection(&mut self, movement: Movement) -> bool {
        let last = self.nodes.len().saturating_sub(1);
        self.selection_index = match movement {
            Movement::Up => self.selection_index.saturating_sub(1),
            Movement::Down => (self.selection_index + 1).min(last),
            Movement::First => 0,
            Movement::Last => last,
        };
        self.request_refresh();
        self.sync_selection()
    }

    pub fn request_refresh(&mut self) {
        if self.selected_node_id.is_some() || !self.nodes.is_empty() {
            self.refresh_pending = true;
        }
    }

    pub fn metrics_started(&mut self, node_id: &str) {
        self.metrics_phase = PollerPhase::Fetching;
        self.metrics_target = Some(node_id.to_string());
        if self.selected_node_id.as_deref() == Some(node_id) {
            self.refresh_pending = false;
        }
    }

    /// Fetch ended without a result (failure or early discard)
    pub fn metrics_finished(&mut self) {
        self.metrics_phase = PollerPhase::Idle;
        self.metrics_target = None;
    }

    /// Replace `metrics` wholesale, unless the selection has moved to another
    /// node since the fetch began.
    pub fn apply_metrics(&mut self, update: NodeMetrics) -> MetricsOutcome {
        self.metrics_finished();

        if self.selected_node_id.as_deref() != Some(update.node_id.as_str()) {
            return MetricsOutcome::Discarded;
        }

        self.metrics = update.families;
        self.metrics_node_id = Some(update.node_id);
        self.last_metrics_update = Some(update.fetched_at);
        self.refresh_pending = false;
        MetricsOutcome::Applied
    }

    fn sync_selection(&mut self) -> bool {
        self.selection_index = self
            .selection_index
            .min(self.nodes.len().saturating_sub(1));

        let selected = self.selected_node().map(|n| n.id.clone());
        let changed = selected != self.selected_node_id;
        self.selected_node_id = selected;
        if self.selected_node_id.is_none() {
            self.refresh_pending = false;
        }
        changed
    }
}
