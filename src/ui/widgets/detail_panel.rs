//! Detail panel for the selected node: identity, metric charts and tags

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::Widget,
};

use crate::core::state::DashboardState;
use crate::metrics::{MetricFamily, MetricMissing};
use crate::ui::layout::{chart_width, filled_cells};
use crate::ui::theme::{ChartTier, Theme};

pub const PLACEHOLDER: &str = "/";
pub const LOADING: &str = "loading...";
pub const CHART_ERROR: &str = "error loading chart metric";

const INDENT: u16 = 2;
const LABEL_WIDTH: usize = 8;

/// What to draw after a family's label
#[derive(Debug, Clone, PartialEq)]
pub enum ChartContent {
    Placeholder,
    Loading,
    Missing(MetricMissing),
    Chart { percent: f64, text: String },
}

impl ChartContent {
    pub fn for_family(state: &DashboardState, family: MetricFamily) -> Self {
        let Some(families) = state.selected_metrics() else {
            return if state.metrics_loading() {
                Self::Loading
            } else {
                Self::Placeholder
            };
        };
        let Some(snapshot) = families.get(&family) else {
            return Self::Placeholder;
        };

        let samples = snapshot.sample_map();
        let chart = family.percent(&samples).and_then(|percent| {
            family
                .display_text(&samples)
                .map(|text| (percent, text))
        });
        match chart {
            Ok((percent, text)) => Self::Chart { percent, text },
            Err(missing) => Self::Missing(missing),
        }
    }

    fn tier(&self) -> ChartTier {
        match self {
            Self::Chart { percent, .. } => ChartTier::for_percent(Some(*percent)),
            _ => ChartTier::for_percent(None),
        }
    }
}

pub struct DetailPanel<'a> {
    state: &'a DashboardState,
    theme: &'a Theme,
}

impl<'a> DetailPanel<'a> {
    pub fn new(state: &'a DashboardState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    fn field(&self, label: &'a str, value: String) -> Line<'a> {
        Line::from(vec![
            Span::styled(label, self.theme.styles.label),
            Span::styled(value, self.theme.styles.text),
        ])
    }

    fn chart_line(&self, family: MetricFamily, bar_width: u16) -> Line<'a> {
        let styles = &self.theme.styles;
        let label = Span::styled(
            format!("{:<width$}", family.label(), width = LABEL_WIDTH),
            styles.label,
        );
        let content = ChartContent::for_family(self.state, family);

        let rest = match &content {
            ChartContent::Placeholder => vec![Span::styled(PLACEHOLDER, styles.placeholder)],
            ChartContent::Loading => vec![Span::styled(LOADING, styles.placeholder)],
            ChartContent::Missing(missing) => {
                tracing::debug!(error = %missing, "cannot chart metric");
                vec![Span::styled(CHART_ERROR, styles.chart_error)]
            }
            ChartContent::Chart { percent, text } => {
                let filled = filled_cells(*percent, bar_width) as usize;
                let empty = bar_width as usize - filled;
                let bar_style = self.theme.chart_style(content.tier());
                vec![
                    Span::styled("[", styles.text),
                    Span::styled("|".repeat(filled), bar_style),
                    Span::raw(" ".repeat(empty)),
                    Span::styled("] ", styles.text),
                    Span::styled(format!("{:.0}% used ({})", percent, text), styles.text),
                ]
            }
        };

        Line::from(std::iter::once(label).chain(rest).collect::<Vec<_>>())
    }
}

impl<'a> Widget for DetailPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let node = self.state.selected_node();
        let text_of = |value: Option<String>| value.unwrap_or_else(|| PLACEHOLDER.to_string());

        let name = text_of(node.map(|n| n.name.clone()));
        let ip = text_of(node.map(|n| n.ipaddress.clone()));
        let tags = text_of(node.map(|n| n.tags.join(", ")));

        let bar_width = chart_width(area.width);
        let lines = [
            (1, self.field("Node: ", name)),
            (2, self.field("IP address: ", ip)),
            (4, self.chart_line(MetricFamily::Cpu, bar_width)),
            (5, self.chart_line(MetricFamily::Mem, bar_width)),
            (6, self.chart_line(MetricFamily::Disk, bar_width)),
            (8, self.field("Tags: ", tags)),
        ];

        let width = area.width.saturating_sub(INDENT);
        for (offset, line) in lines {
            if offset < area.height {
                buf.set_line(area.x + INDENT, area.y + offset, &line, width);
            }
        }
    }
}
