//! Merges poller results and key presses into the dashboard state
//!
//! The controller lives on the render loop. It is the only place that
//! mutates [`DashboardState`] and the only publisher of the selected node id.

use crossterm::event::KeyEvent;
use tokio::sync::watch;

use crate::core::events::{EventResult, KeyBindings, PollerEvent};
use crate::core::state::{DashboardState, MetricsOutcome, Movement};
use crate::pollers::RefreshHandle;

pub struct Controller {
    state: DashboardState,
    selection_tx: watch::Sender<Option<String>>,
    refresh: RefreshHandle,
}

impl Controller {
    pub fn new(selection_tx: watch::Sender<Option<String>>, refresh: RefreshHandle) -> Self {
        Self {
            state: DashboardState::new(),
            selection_tx,
            refresh,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn handle_poller(&mut self, event: PollerEvent) {
        match event {
            PollerEvent::InventoryStarted => self.state.inventory_started(),
            PollerEvent::InventoryFetched { nodes, fetched_at } => {
                if self.state.apply_inventory(nodes, fetched_at) {
                    self.publish_selection();
                }
            }
            PollerEvent::InventoryFailed { error } => {
                tracing::debug!(%error, "keeping previous node list");
                self.state.inventory_failed();
            }
            PollerEvent::MetricsStarted { node_id } => self.state.metrics_started(&node_id),
            PollerEvent::MetricsFetched(metrics) => {
                let node_id = metrics.node_id.clone();
                if self.state.apply_metrics(metrics) == MetricsOutcome::Discarded {
                    tracing::debug!(%node_id, "dropping metrics for a node no longer selected");
                }
            }
            PollerEvent::MetricsDiscarded { node_id } => {
                tracing::debug!(%node_id, "metrics fetch outlived its selection");
                self.state.metrics_finished();
            }
            PollerEvent::MetricsFailed { node_id, error } => {
                tracing::debug!(%node_id, %error, "keeping previous metrics");
                self.state.metrics_finished();
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> EventResult {
        if KeyBindings::quit().matches(&key)
            || KeyBindings::quit_upper().matches(&key)
            || KeyBindings::quit_alt().matches(&key)
        {
            return EventResult::Quit;
        }

        if KeyBindings::refresh().matches(&key) {
            self.request_refresh();
            return EventResult::Continue;
        }

        let movement = if KeyBindings::up().matches(&key) || KeyBindings::vim_up().matches(&key) {
            Movement::Up
        } else if KeyBindings::down().matches(&key) || KeyBindings::vim_down().matches(&key) {
            Movement::Down
        } else if KeyBindings::first().matches(&key) || KeyBindings::home().matches(&key) {
            Movement::First
        } else if KeyBindings::last().matches(&key) || KeyBindings::end().matches(&key) {
            Movement::Last
        } else {
            return EventResult::Continue;
        };

        if self.state.move_selection(movement) {
            self.publish_selection();
        } else {
            self.request_refresh();
        }
        EventResult::Continue
    }

    fn request_refresh(&mut self) {
        self.state.request_refresh();
        if self.state.selected_node_id.is_some() && !self.refresh.request() {
            tracing::trace!("refresh already queued");
        }
    }

    /// Hand the new selection to the metrics poller and ask it to load the
    /// node right away.
    fn publish_selection(&mut self) {
        let selected = self.state.selected_node_id.clone();
        tracing::debug!(node_id = ?selected, "selection changed");
        self.selection_tx.send_replace(selected);
        self.request_refresh();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RefreshConfig;
    use crate::core::events::Event;
    use crate::core::state::tests::{node, node_metrics};
    use crate::integrations::api::MockFleetApi;
    use crate::pollers::{PollerHandles, RefreshRequest};
    use crate::ui::renderer::Renderer;
    use crate::ui::theme::Theme;
    use chrono::Local;
    use crossterm::event::{KeyCode, KeyModifiers};
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn controller() -> (
        Controller,
        watch::Receiver<Option<String>>,
        mpsc::Receiver<RefreshRequest>,
    ) {
        let (selection_tx, selection_rx) = watch::channel(None);
        let (refresh, refresh_rx) = RefreshHandle::channel();
        (Controller::new(selection_tx, refresh), selection_rx, refresh_rx)
    }

    fn inventory(ids: &[&str]) -> PollerEvent {
        PollerEvent::InventoryFetched {
            nodes: ids.iter().map(|id| node(id)).collect(),
            fetched_at: Local::now(),
        }
    }

    #[test]
    fn test_quit_keys() {
        let (mut controller, _, _) = controller();
        assert_eq!(controller.handle_key(key(KeyCode::Char('q'))), EventResult::Quit);
        assert_eq!(
            controller.handle_key(KeyEvent::new(KeyCode::Char('Q'), KeyModifiers::SHIFT)),
            EventResult::Quit
        );
        assert_eq!(
            controller.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            EventResult::Quit
        );
        assert_eq!(controller.handle_key(key(KeyCode::Char('x'))), EventResult::Continue);
    }

    #[test]
    fn test_first_inventory_publishes_selection() {
        let (mut controller, selection_rx, mut refresh_rx) = controller();
        controller.handle_poller(inventory(&["a", "b"]));

        assert_eq!(selection_rx.borrow().as_deref(), Some("a"));
        assert!(refresh_rx.try_recv().is_ok());
        assert!(controller.state().metrics_loading());
    }

    #[test]
    fn test_movement_publishes_and_requests_refresh() {
        let (mut controller, selection_rx, mut refresh_rx) = controller();
        controller.handle_poller(inventory(&["a", "b", "c"]));
        let _ = refresh_rx.try_recv();

        controller.handle_key(key(KeyCode::PageDown));
        assert_eq!(selection_rx.borrow().as_deref(), Some("c"));
        assert!(refresh_rx.try_recv().is_ok());

        // clamped movement still forces a reload of the same node
        controller.handle_key(key(KeyCode::Down));
        assert_eq!(controller.state().selection_index, 2);
        assert!(refresh_rx.try_recv().is_ok());

        controller.handle_key(key(KeyCode::Char('k')));
        assert_eq!(selection_rx.borrow().as_deref(), Some("b"));
    }

    #[test]
    fn test_refresh_key_without_nodes_is_ignored() {
        let (mut controller, _, mut refresh_rx) = controller();
        controller.handle_key(key(KeyCode::Char('u')));
        assert!(refresh_rx.try_recv().is_err());
        assert!(!controller.state().refresh_pending);
    }

    #[test]
    fn test_stale_metrics_are_dropped() {
        let (mut controller, _, _) = controller();
        controller.handle_poller(inventory(&["x", "y"]));
        controller.handle_poller(PollerEvent::MetricsStarted {
            node_id: "x".to_string(),
        });
        controller.handle_key(key(KeyCode::Down));

        controller.handle_poller(PollerEvent::MetricsFetched(node_metrics("x")));
        assert!(controller.state().metrics.is_empty());
        assert!(controller.state().last_metrics_update.is_none());
        assert_eq!(controller.state().busy_status(), None);
    }

    #[test]
    fn test_failed_inventory_keeps_nodes() {
        let (mut controller, _, _) = controller();
        controller.handle_poller(inventory(&["a"]));
        controller.handle_poller(PollerEvent::InventoryStarted);
        controller.handle_poller(PollerEvent::InventoryFailed {
            error: "timeout".to_string(),
        });

        assert_eq!(controller.state().nodes.len(), 1);
        assert_eq!(controller.state().busy_status(), None);
    }

    fn screen_lines(controller: &Controller) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal
            .draw(|frame| Renderer::render(frame, controller.state(), &Theme::default()))
            .unwrap();
        let buffer = terminal.backend().buffer();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol())
                    .collect()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_forced_refresh_loads_selected_node() {
        let mut api = MockFleetApi::new();
        api.expect_fetch_nodes().returning(|| Ok(vec![node("a")]));
        api.expect_fetch_live_metrics()
            .returning(|node_id, family| Ok(node_metrics(node_id).families[&family].samples.clone()));

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (selection_tx, selection_rx) = watch::channel(None);
        let (refresh, refresh_rx) = RefreshHandle::channel();
        let config = RefreshConfig {
            poller_tick_ms: 5,
            ..Default::default()
        };
        let pollers = PollerHandles::spawn(
            Arc::new(api),
            events_tx,
            selection_rx,
            refresh_rx,
            &config,
            None,
        );
        let mut controller = Controller::new(selection_tx, refresh);

        tokio::time::timeout(Duration::from_secs(2), async {
            while controller.state().last_metrics_update.is_none() {
                if let Some(Event::Poller(event)) = events_rx.recv().await {
                    controller.handle_poller(event);
                }
            }
        })
        .await
        .expect("metrics should load");
        pollers.shutdown().await.unwrap();

        let lines = screen_lines(&controller);
        assert!(lines.iter().all(|line| !line.contains("loading...")));
        assert!(lines.iter().any(|line| line.contains("% used (")));
        let footer = &lines[29];
        assert!(footer.starts_with("Updated: "));
        assert!(!footer.starts_with("Updated: /"));
        assert!(footer.trim_end().ends_with("Nodes: 1"));
    }
}
