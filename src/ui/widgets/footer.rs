//! Footer widget: last update, busy status and node count

use ratatui::{buffer::Buffer, layout::Rect, text::Span, widgets::Widget};
use unicode_width::UnicodeWidthStr;

use crate::core::state::DashboardState;
use crate::ui::theme::Theme;

pub struct Footer<'a> {
    state: &'a DashboardState,
    theme: &'a Theme,
}

impl<'a> Footer<'a> {
    pub fn new(state: &'a DashboardState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }
}

impl<'a> Widget for Footer<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let style = self.theme.styles.footer;

        let updated = self
            .state
            .last_metrics_update
            .map(|at| at.format("%I:%M:%S %p").to_string())
            .unwrap_or_else(|| "/".to_string());
        buf.set_span(
            area.x,
            area.y,
            &Span::styled(format!("Updated: {}", updated), style),
            area.width,
        );

        if let Some(status) = self.state.busy_status() {
            let width = status.width() as u16;
            let x = area.x + area.width.saturating_sub(width) / 2;
            buf.set_span(x, area.y, &Span::styled(status, style), width);
        }

        let count = format!("Nodes: {}", self.state.nodes.len());
        let width = count.width() as u16;
        let x = area.x + area.width.saturating_sub(width);
        buf.set_span(x, area.y, &Span::styled(count, style), width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::tests::{node, node_metrics};
    use chrono::{Local, TimeZone};

    fn render(state: &DashboardState) -> String {
        let area = Rect::new(0, 0, 80, 1);
        let mut buf = Buffer::empty(area);
        Footer::new(state, &Theme::default()).render(area, &mut buf);
        (0..area.width).map(|x| buf[(x, 0)].symbol()).collect()
    }

    #[test]
    fn test_footer_before_any_update() {
        let line = render(&DashboardState::new());
        assert!(line.starts_with("Updated: /"));
        assert!(line.ends_with("Nodes: 0"));
    }

    #[test]
    fn test_footer_shows_metrics_time_and_status() {
        let mut state = DashboardState::new();
        state.apply_inventory(vec![node("a"), node("b")], Local::now());
        let mut metrics = node_metrics("a");
        metrics.fetched_at = Local.with_ymd_and_hms(2024, 1, 2, 21, 4, 5).unwrap();
        state.apply_metrics(metrics);
        state.inventory_started();

        let line = render(&state);
        assert!(line.starts_with("Updated: 09:04:05 PM"));
        assert!(line.contains("updating node list..."));
        assert!(line.ends_with("Nodes: 2"));
    }
}
