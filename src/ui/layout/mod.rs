//! Layout calculation
//!
//! Everything here is a pure function of the terminal size, so it is simply
//! recomputed on every frame.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use unicode_width::UnicodeWidthChar;

use crate::integrations::api::Node;

/// Columns of text kept free to the right of a chart bar
pub const CHART_TEXT_RESERVE: u16 = 55;
pub const MIN_CHART_WIDTH: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Node attribute shown in a table column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeField {
    Name,
    IpAddress,
    Provider,
    Status,
}

impl NodeField {
    pub fn value(self, node: &Node) -> &str {
        match self {
            Self::Name => &node.name,
            Self::IpAddress => &node.ipaddress,
            Self::Provider => &node.provider_name,
            Self::Status => &node.status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub label: &'static str,
    pub field: NodeField,
    pub width_percent: u16,
    pub align: Align,
}

pub const NODE_COLUMNS: [ColumnSpec; 4] = [
    ColumnSpec {
        label: "name",
        field: NodeField::Name,
        width_percent: 35,
        align: Align::Center,
    },
    ColumnSpec {
        label: "server ip",
        field: NodeField::IpAddress,
        width_percent: 25,
        align: Align::Center,
    },
    ColumnSpec {
        label: "provider",
        field: NodeField::Provider,
        width_percent: 25,
        align: Align::Center,
    },
    ColumnSpec {
        label: "status",
        field: NodeField::Status,
        width_percent: 15,
        align: Align::Center,
    },
];

/// `round(percent / 100 * total)`
pub fn column_width(width_percent: u16, total: u16) -> usize {
    (f64::from(width_percent) / 100.0 * f64::from(total)).round() as usize
}

/// Pad or truncate `text` to exactly `width` display columns.
pub fn fit_cell(text: &str, width: usize, align: Align) -> String {
    let mut fitted = String::with_capacity(width);
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        fitted.push(ch);
        used += w;
    }

    let pad = width - used;
    let (left, right) = match align {
        Align::Left => (0, pad),
        Align::Right => (pad, 0),
        Align::Center => (pad / 2, pad - pad / 2),
    };
    format!("{}{}{}", " ".repeat(left), fitted, " ".repeat(right))
}

/// Concrete column widths for one terminal width
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    columns: Vec<(ColumnSpec, usize)>,
}

impl TableLayout {
    /// Every column but the last is rounded on its own; the last one takes
    /// whatever is left so the row never exceeds `width`.
    pub fn compute(width: u16, specs: &[ColumnSpec]) -> Self {
        let mut remaining = usize::from(width);
        let columns = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let w = if i + 1 == specs.len() {
                    remaining
                } else {
                    column_width(spec.width_percent, width).min(remaining)
                };
                remaining -= w;
                (*spec, w)
            })
            .collect();
        Self { columns }
    }

    #[cfg(test)]
    pub fn widths(&self) -> Vec<usize> {
        self.columns.iter().map(|(_, w)| *w).collect()
    }

    /// Upper-cased column labels, one fixed-width cell each
    pub fn header_cells(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|(spec, w)| fit_cell(&spec.label.to_uppercase(), *w, spec.align))
            .collect()
    }

    pub fn row_cells(&self, node: &Node) -> Vec<String> {
        self.columns
            .iter()
            .map(|(spec, w)| fit_cell(spec.field.value(node), *w, spec.align))
            .collect()
    }

    pub fn header(&self) -> String {
        self.header_cells().concat()
    }

    pub fn row(&self, node: &Node) -> String {
        self.row_cells(node).concat()
    }
}

/// Non-interactive rendering of the node table
pub fn plain_table(nodes: &[Node], width: u16) -> Vec<String> {
    let table = TableLayout::compute(width, &NODE_COLUMNS);
    std::iter::once(table.header())
        .chain(nodes.iter().map(|node| table.row(node)))
        .map(|line| line.trim_end().to_string())
        .collect()
}

/// Width of a chart bar inside a detail panel of `panel_width` columns
pub fn chart_width(panel_width: u16) -> u16 {
    panel_width
        .saturating_sub(CHART_TEXT_RESERVE)
        .max(MIN_CHART_WIDTH)
}

/// Filled cells for `percent`, rounded and clamped to the bar
pub fn filled_cells(percent: f64, width: u16) -> u16 {
    let filled = (percent.clamp(0.0, 100.0) / 100.0 * f64::from(width)).round();
    (filled as u16).min(width)
}

/// Screen regions of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenLayout {
    pub header: Rect,
    pub detail: Rect,
    pub table: Rect,
    pub footer: Rect,
}

impl ScreenLayout {
    pub const HEADER_HEIGHT: u16 = 2;
    pub const DETAIL_HEIGHT: u16 = 10;

    pub fn compute(area: Rect) -> Self {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(Self::HEADER_HEIGHT),
                Constraint::Length(Self::DETAIL_HEIGHT),
                Constraint::Min(2),
                Constraint::Length(1),
            ])
            .split(area);

        Self {
            header: chunks[0],
            detail: chunks[1],
            table: chunks[2],
            footer: chunks[3],
        }
    }
}

/// True when `area` is at least `min_width` x `min_height`
pub fn fits(area: Rect, min_width: u16, min_height: u16) -> bool {
    area.width >= min_width && area.height >= min_height
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::tests::node;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_column_widths_follow_terminal_width() {
        assert_eq!(TableLayout::compute(100, &NODE_COLUMNS).widths(), vec![35, 25, 25, 15]);
        // 80 * 0.35 = 28, 80 * 0.15 = 12
        assert_eq!(TableLayout::compute(80, &NODE_COLUMNS).widths(), vec![28, 20, 20, 12]);
        // rounding: 90 * 0.35 = 31.5
        assert_eq!(column_width(35, 90), 32);
    }

    #[test]
    fn test_rounding_never_overflows_the_row() {
        // 31.5 and 22.5 both round up; the status column absorbs it
        let table = TableLayout::compute(90, &NODE_COLUMNS);
        assert_eq!(table.widths(), vec![32, 23, 23, 12]);
        assert_eq!(table.header().chars().count(), 90);

        for width in [80u16, 81, 97, 133, 211] {
            let total: usize = TableLayout::compute(width, &NODE_COLUMNS).widths().iter().sum();
            assert_eq!(total, usize::from(width));
        }
    }

    #[test]
    fn test_fit_cell_alignment() {
        assert_eq!(fit_cell("ab", 6, Align::Left), "ab    ");
        assert_eq!(fit_cell("ab", 6, Align::Right), "    ab");
        assert_eq!(fit_cell("ab", 5, Align::Center), " ab  ");
        assert_eq!(fit_cell("abcdef", 4, Align::Center), "abcd");
        assert_eq!(fit_cell("", 0, Align::Left), "");
    }

    #[test]
    fn test_fit_cell_counts_wide_characters() {
        // each CJK char takes two columns
        assert_eq!(fit_cell("日本語", 5, Align::Left), "日本 ");
    }

    #[test]
    fn test_header_and_rows_share_widths() {
        let table = TableLayout::compute(100, &NODE_COLUMNS);
        let header = table.header();
        let row = table.row(&node("web01"));

        assert_eq!(header.chars().count(), 100);
        assert_eq!(row.chars().count(), 100);
        assert!(header.starts_with(&fit_cell("NAME", 35, Align::Center)));
        assert!(row.contains("web01.example.com"));
    }

    #[test]
    fn test_layout_is_idempotent() {
        let n = node("db1");
        let first = TableLayout::compute(97, &NODE_COLUMNS);
        let second = TableLayout::compute(97, &NODE_COLUMNS);
        assert_eq!(first, second);
        assert_eq!(first.row(&n), second.row(&n));
        assert_eq!(first.header(), second.header());
    }

    #[test]
    fn test_plain_table_lists_every_node() {
        let lines = plain_table(&[node("a"), node("b")], 100);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("SERVER IP"));
        assert!(lines[2].contains("b.example.com"));
    }

    #[test]
    fn test_chart_width_has_a_floor() {
        assert_eq!(chart_width(120), 65);
        assert_eq!(chart_width(60), MIN_CHART_WIDTH);
    }

    #[test]
    fn test_filled_cells_rounds_and_clamps() {
        for width in [10u16, 25, 65] {
            assert_eq!(filled_cells(0.0, width), 0);
            assert_eq!(filled_cells(100.0, width), width);
            assert_eq!(filled_cells(150.0, width), width);
        }
        assert_eq!(filled_cells(63.0, 10), 6);
        assert_eq!(filled_cells(65.0, 10), 7);
        assert_eq!(filled_cells(-3.0, 10), 0);
    }

    #[test]
    fn test_screen_layout_regions() {
        let layout = ScreenLayout::compute(Rect::new(0, 0, 80, 24));
        assert_eq!(layout.header.height, 2);
        assert_eq!(layout.detail.y, 2);
        assert_eq!(layout.detail.height, 10);
        assert_eq!(layout.table.y, 12);
        assert_eq!(layout.table.height, 11);
        assert_eq!(layout.footer.y, 23);
    }

    #[test]
    fn test_minimum_size() {
        assert!(fits(Rect::new(0, 0, 80, 24), 80, 24));
        assert!(!fits(Rect::new(0, 0, 79, 24), 80, 24));
        assert!(!fits(Rect::new(0, 0, 80, 23), 80, 24));
    }
}
