//! Node inventory table

use ratatui::{buffer::Buffer, layout::Rect, text::Span, widgets::Widget};

use crate::core::state::DashboardState;
use crate::ui::layout::{TableLayout, NODE_COLUMNS};
use crate::ui::theme::Theme;

pub struct NodeTable<'a> {
    state: &'a DashboardState,
    theme: &'a Theme,
}

impl<'a> NodeTable<'a> {
    pub fn new(state: &'a DashboardState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }
}

/// First row to draw so that `selected` stays within `visible` rows
pub fn scroll_offset(selected: usize, visible: usize) -> usize {
    if visible == 0 {
        0
    } else {
        selected.saturating_sub(visible - 1)
    }
}

impl<'a> Widget for NodeTable<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let table = TableLayout::compute(area.width, &NODE_COLUMNS);
        let styles = &self.theme.styles;

        let header_area = Rect { height: 1, ..area };
        buf.set_style(header_area, styles.table_header);
        buf.set_span(
            area.x,
            area.y,
            &Span::styled(table.header(), styles.table_header),
            area.width,
        );

        let visible = usize::from(area.height - 1);
        let offset = scroll_offset(self.state.selection_index, visible);
        let rows = self.state.nodes.iter().enumerate().skip(offset).take(visible);

        for (y, (index, node)) in (area.y + 1..).zip(rows) {
            let style = if index == self.state.selection_index {
                styles.row_selected
            } else {
                styles.row
            };
            buf.set_style(Rect { y, height: 1, ..area }, style);
            buf.set_span(area.x, y, &Span::styled(table.row(node), style), area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::tests::node;
    use crate::core::state::Movement;
    use chrono::Local;
    use ratatui::style::Modifier;

    fn state(count: usize) -> DashboardState {
        let mut state = DashboardState::new();
        let nodes = (0..count).map(|i| node(&format!("n{}", i))).collect();
        state.apply_inventory(nodes, Local::now());
        state
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width).map(|x| buf[(x, y)].symbol()).collect()
    }

    #[test]
    fn test_scroll_offset_keeps_selection_visible() {
        assert_eq!(scroll_offset(0, 5), 0);
        assert_eq!(scroll_offset(4, 5), 0);
        assert_eq!(scroll_offset(5, 5), 1);
        assert_eq!(scroll_offset(9, 5), 5);
        assert_eq!(scroll_offset(3, 0), 0);
    }

    #[test]
    fn test_header_and_selected_row_are_reversed() {
        let mut state = state(3);
        state.move_selection(Movement::Down);
        let area = Rect::new(0, 0, 80, 6);
        let mut buf = Buffer::empty(area);

        NodeTable::new(&state, &Theme::classic()).render(area, &mut buf);

        assert!(row_text(&buf, 0).contains("SERVER IP"));
        assert!(buf[(0, 0)].modifier.contains(Modifier::REVERSED));
        assert!(row_text(&buf, 2).contains("n1.example.com"));
        assert!(buf[(0, 2)].modifier.contains(Modifier::REVERSED));
        assert!(!buf[(0, 1)].modifier.contains(Modifier::REVERSED));
    }

    #[test]
    fn test_rows_scroll_with_selection() {
        let mut state = state(10);
        state.move_selection(Movement::Last);
        let area = Rect::new(0, 0, 80, 4);
        let mut buf = Buffer::empty(area);

        NodeTable::new(&state, &Theme::classic()).render(area, &mut buf);

        assert!(row_text(&buf, 1).contains("n7.example.com"));
        assert!(row_text(&buf, 3).contains("n9.example.com"));
    }
}
