//! Main UI renderer

use chrono::Local;
use ratatui::{style::Style, widgets::Block, Frame};

use crate::core::state::DashboardState;
use crate::ui::layout::ScreenLayout;
use crate::ui::theme::Theme;
use crate::ui::widgets::*;

pub struct Renderer;

impl Renderer {
    /// Draw one full frame. The caller has already checked the minimum size.
    pub fn render(frame: &mut Frame, state: &DashboardState, theme: &Theme) {
        let area = frame.area();

        frame.render_widget(
            Block::default().style(Style::default().bg(theme.colors.bg_primary)),
            area,
        );

        let layout = ScreenLayout::compute(area);

        frame.render_widget(Header::new(theme, Local::now()), layout.header);
        frame.render_widget(DetailPanel::new(state, theme), layout.detail);
        frame.render_widget(NodeTable::new(state, theme), layout.table);
        frame.render_widget(Footer::new(state, theme), layout.footer);
    }
}
