//! Unified event handling system

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::core::state::NodeMetrics;
use crate::integrations::api::Node;

/// All possible events in the system
#[derive(Debug, Clone)]
pub enum Event {
    // Input events
    Key(KeyEvent),
    Resize(u16, u16),

    // Render tick
    Tick,

    // Background fetch progress
    Poller(PollerEvent),

    // Lifecycle (signals)
    Quit,
}

/// Progress reported by the background pollers
#[derive(Debug, Clone)]
pub enum PollerEvent {
    InventoryStarted,
    InventoryFetched {
        nodes: Vec<Node>,
        fetched_at: DateTime<Local>,
    },
    InventoryFailed {
        error: String,
    },
    MetricsStarted {
        node_id: String,
    },
    MetricsFetched(NodeMetrics),
    /// The poller saw the selection move before publishing the result
    MetricsDiscarded {
        node_id: String,
    },
    MetricsFailed {
        node_id: String,
        error: String,
    },
}

/// Result of handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    Quit,
}

pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    pub fn new() -> (Self, mpsc::UnboundedSender<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, tx)
    }

    /// Start terminal input, render tick and signal sources
    pub fn spawn_sources(event_tx: mpsc::UnboundedSender<Event>, render_tick: Duration) {
        tokio::spawn(Self::terminal_events(event_tx.clone()));
        tokio::spawn(Self::tick_events(event_tx.clone(), render_tick, Event::Tick));
        tokio::spawn(Self::signal_events(event_tx));
    }

    async fn terminal_events(tx: mpsc::UnboundedSender<Event>) {
        use crossterm::event::{self, Event as CrosstermEvent};
        use futures::StreamExt;

        let mut reader = event::EventStream::new();
        while let Some(event_result) = reader.next().await {
            let event = match event_result {
                Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Event::Key(key),
                Ok(CrosstermEvent::Resize(w, h)) => Event::Resize(w, h),
                Ok(_) => continue,
                Err(e) => {
                    tracing::error!(error = %e, "terminal input stream failed");
                    break;
                }
            };
            if tx.send(event).is_err() {
                break;
            }
        }
    }

    async fn tick_events(tx: mpsc::UnboundedSender<Event>, interval: Duration, event: Event) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if tx.send(event.clone()).is_err() {
                break;
            }
        }
    }

    /// SIGINT/SIGTERM become the same quit request as the `q` key
    async fn signal_events(tx: mpsc::UnboundedSender<Event>) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut terminate = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "cannot listen for SIGTERM");
                    let _ = tokio::signal::ctrl_c().await;
                    let _ = tx.send(Event::Quit);
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT"),
                _ = terminate.recv() => tracing::info!("received SIGTERM"),
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("received Ctrl-C");
        }

        let _ = tx.send(Event::Quit);
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// Key binding helper
pub struct KeyBinding {
    pub key: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn ctrl(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    /// Shift is ignored: uppercase letters already carry it in the code
    pub fn matches(&self, event: &KeyEvent) -> bool {
        event.code == self.key && event.modifiers.difference(KeyModifiers::SHIFT) == self.modifiers
    }
}

/// Standard key bindings
pub struct KeyBindings;

impl KeyBindings {
    pub fn quit() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('q'))
    }

    pub fn quit_upper() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('Q'))
    }

    pub fn quit_alt() -> KeyBinding {
        KeyBinding::ctrl(KeyCode::Char('c'))
    }

    pub fn refresh() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('u'))
    }

    pub fn up() -> KeyBinding {
        KeyBinding::new(KeyCode::Up)
    }

    pub fn down() -> KeyBinding {
        KeyBinding::new(KeyCode::Down)
    }

    pub fn vim_up() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('k'))
    }

    pub fn vim_down() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('j'))
    }

    pub fn first() -> KeyBinding {
        KeyBinding::new(KeyCode::PageUp)
    }

    pub fn last() -> KeyBinding {
        KeyBinding::new(KeyCode::PageDown)
    }

    pub fn home() -> KeyBinding {
        KeyBinding::new(KeyCode::Home)
    }

    pub fn end() -> KeyBinding {
        KeyBinding::new(KeyCode::End)
    }
}
