//! Main application orchestrator

use anyhow::Result;
use chrono::Local;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Terminal,
};
use std::io::{self, Stdout};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::config::{Config, DisplayConfig};
use crate::core::controller::Controller;
use crate::core::events::{Event, EventHandler, EventResult, PollerEvent};
use crate::core::state::DashboardState;
use crate::core::terminal::{install_panic_hook, CrosstermMode, TerminalGuard, TerminalMode};
use crate::integrations::api::{FleetApi, Node};
use crate::pollers::{PollerError, PollerHandles, RefreshHandle};
use crate::ui::layout::fits;
use crate::ui::renderer::Renderer;
use crate::ui::theme::Theme;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error(
        "Minimum screen size must be {min_width}x{min_height} lines (terminal is {width}x{height})"
    )]
    ScreenTooSmall {
        width: u16,
        height: u16,
        min_width: u16,
        min_height: u16,
    },

    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),

    #[error(transparent)]
    Poller(#[from] PollerError),
}

/// Refuse to draw into a terminal below the configured minimum
pub fn check_screen_size(area: Rect, display: &DisplayConfig) -> Result<(), DashboardError> {
    if fits(area, display.min_width, display.min_height) {
        Ok(())
    } else {
        Err(DashboardError::ScreenTooSmall {
            width: area.width,
            height: area.height,
            min_width: display.min_width,
            min_height: display.min_height,
        })
    }
}

pub struct App<B: Backend, M: TerminalMode> {
    terminal: Terminal<B>,
    guard: TerminalGuard<M>,
    theme: Theme,
    config: Config,
    client: Arc<dyn FleetApi>,
    initial_nodes: Option<Vec<Node>>,
}

impl App<CrosstermBackend<Stdout>, CrosstermMode> {
    /// Switch the terminal into dashboard mode. It is restored when the app
    /// finishes, is dropped, or the process panics.
    ///
    /// `nodes` is the inventory fetched while validating credentials; it is
    /// shown on the first frame.
    pub fn new(
        config: Config,
        client: Arc<dyn FleetApi>,
        nodes: Vec<Node>,
    ) -> Result<Self, DashboardError> {
        let guard = TerminalGuard::acquire(CrosstermMode)?;
        install_panic_hook(guard.active_flag());

        let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        Ok(Self::with_terminal(terminal, guard, config, client).with_inventory(nodes))
    }

    pub async fn run(self) -> Result<()> {
        let (event_handler, event_tx) = EventHandler::new();
        EventHandler::spawn_sources(event_tx.clone(), self.config.refresh.render_tick());
        self.drive(event_handler, event_tx).await
    }
}

impl<B: Backend, M: TerminalMode> App<B, M> {
    pub fn with_terminal(
        terminal: Terminal<B>,
        guard: TerminalGuard<M>,
        config: Config,
        client: Arc<dyn FleetApi>,
    ) -> Self {
        let theme = Theme::from_name(&config.display.theme);
        tracing::debug!(theme = %theme.name, "theme selected");

        Self {
            terminal,
            guard,
            theme,
            config,
            client,
            initial_nodes: None,
        }
    }

    pub fn with_inventory(mut self, nodes: Vec<Node>) -> Self {
        self.initial_nodes = Some(nodes);
        self
    }

    /// Run the dashboard on events from `event_handler` until a quit request,
    /// a fatal render error or a dead poller. Pollers are joined and the
    /// terminal restored on every path.
    async fn drive(
        mut self,
        mut event_handler: EventHandler,
        event_tx: mpsc::UnboundedSender<Event>,
    ) -> Result<()> {
        let (selection_tx, selection_rx) = watch::channel(None);
        let (refresh, refresh_rx) = RefreshHandle::channel();
        let initial_nodes = self.initial_nodes.take();
        let mut pollers = PollerHandles::spawn(
            Arc::clone(&self.client),
            event_tx,
            selection_rx,
            refresh_rx,
            &self.config.refresh,
            initial_nodes.as_ref().map(|_| Instant::now()),
        );

        let mut controller = Controller::new(selection_tx, refresh);
        if let Some(nodes) = initial_nodes {
            controller.handle_poller(PollerEvent::InventoryFetched {
                nodes,
                fetched_at: Local::now(),
            });
        }
        tracing::info!(url = %self.config.api.url, "dashboard started");

        let result = self
            .event_loop(&mut event_handler, &mut controller, &mut pollers)
            .await;

        // pollers first: nothing may draw once the terminal is handed back
        let stopped = pollers.shutdown().await;
        let restored = self.guard.restore();

        result?;
        stopped?;
        restored.map_err(DashboardError::Terminal)?;
        Ok(())
    }

    async fn event_loop(
        &mut self,
        event_handler: &mut EventHandler,
        controller: &mut Controller,
        pollers: &mut PollerHandles,
    ) -> Result<(), DashboardError> {
        self.render(controller.state())?;

        loop {
            let event = tokio::select! {
                biased;
                event = event_handler.next() => match event {
                    Some(event) => event,
                    None => break,
                },
                error = pollers.failed() => {
                    tracing::error!(%error, "stopping dashboard");
                    return Err(error.into());
                }
            };

            let result = match event {
                Event::Tick => {
                    self.render(controller.state())?;
                    EventResult::Continue
                }
                Event::Resize(width, height) => {
                    check_screen_size(Rect::new(0, 0, width, height), &self.config.display)?;
                    self.render(controller.state())?;
                    EventResult::Continue
                }
                Event::Key(key) => controller.handle_key(key),
                Event::Poller(event) => {
                    controller.handle_poller(event);
                    EventResult::Continue
                }
                Event::Quit => EventResult::Quit,
            };

            if result == EventResult::Quit {
                tracing::info!("quit requested");
                break;
            }
        }
        Ok(())
    }

    fn render(&mut self, state: &DashboardState) -> Result<(), DashboardError> {
        let size = self.terminal.size()?;
        check_screen_size(
            Rect::new(0, 0, size.width, size.height),
            &self.config.display,
        )?;

        let theme = &self.theme;
        self.terminal
            .draw(|frame| Renderer::render(frame, state, theme))?;
        Ok(())
    }
}
