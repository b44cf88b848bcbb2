//! Color themes for the dashboard

use ratatui::style::{Color, Modifier, Style};

/// Complete theme definition
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    pub colors: ThemeColors,
    pub styles: ThemeStyles,
}

#[derive(Debug, Clone)]
pub struct ThemeColors {
    pub bg_primary: Color,
    pub fg_primary: Color,
    pub fg_muted: Color,

    pub accent: Color,

    // Chart tiers
    pub chart_low: Color,
    pub chart_mid: Color,
    pub chart_high: Color,
    pub chart_neutral: Color,

    pub error: Color,
    pub selection_fg: Color,
    pub selection_bg: Color,
}

#[derive(Debug, Clone)]
pub struct ThemeStyles {
    pub header: Style,
    pub rule: Style,
    pub footer: Style,
    pub label: Style,
    pub text: Style,
    pub placeholder: Style,
    pub chart_error: Style,
    pub table_header: Style,
    pub row: Style,
    pub row_selected: Style,
    pub chart_low: Style,
    pub chart_mid: Style,
    pub chart_high: Style,
    pub chart_neutral: Style,
}

/// Utilization band a chart is colored by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartTier {
    Low,
    Mid,
    High,
    /// Percent could not be computed
    Neutral,
}

impl ChartTier {
    pub fn for_percent(percent: Option<f64>) -> Self {
        match percent {
            None => Self::Neutral,
            Some(p) if p < 50.0 => Self::Low,
            Some(p) if p <= 75.0 => Self::Mid,
            Some(_) => Self::High,
        }
    }
}

impl Theme {
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "tokyo-night" | "tokyonight" => Self::tokyo_night(),
            "classic" => Self::classic(),
            other => {
                tracing::warn!(theme = other, "unknown theme, using classic");
                Self::classic()
            }
        }
    }

    /// Plain terminal palette: green, blue and red chart tiers
    pub fn classic() -> Self {
        let colors = ThemeColors {
            bg_primary: Color::Reset,
            fg_primary: Color::Reset,
            fg_muted: Color::DarkGray,
            accent: Color::Reset,
            chart_low: Color::Green,
            chart_mid: Color::Blue,
            chart_high: Color::Red,
            chart_neutral: Color::Reset,
            error: Color::Red,
            selection_fg: Color::Reset,
            selection_bg: Color::Reset,
        };

        let mut theme = Self::from_colors("Classic", colors);
        // no palette to lean on: fall back to attributes
        theme.styles.table_header = Style::default().add_modifier(Modifier::REVERSED);
        theme.styles.row_selected = Style::default().add_modifier(Modifier::REVERSED);
        theme
    }

    pub fn tokyo_night() -> Self {
        let colors = ThemeColors {
            bg_primary: Color::Rgb(26, 27, 38),
            fg_primary: Color::Rgb(192, 202, 245),
            fg_muted: Color::Rgb(86, 95, 137),
            accent: Color::Rgb(122, 162, 247),
            chart_low: Color::Rgb(158, 206, 106),
            chart_mid: Color::Rgb(224, 175, 104),
            chart_high: Color::Rgb(247, 118, 142),
            chart_neutral: Color::Rgb(169, 177, 214),
            error: Color::Rgb(247, 118, 142),
            selection_fg: Color::Rgb(192, 202, 245),
            selection_bg: Color::Rgb(52, 59, 88),
        };

        Self::from_colors("Tokyo Night", colors)
    }

    pub fn chart_style(&self, tier: ChartTier) -> Style {
        match tier {
            ChartTier::Low => self.styles.chart_low,
            ChartTier::Mid => self.styles.chart_mid,
            ChartTier::High => self.styles.chart_high,
            ChartTier::Neutral => self.styles.chart_neutral,
        }
    }

    fn from_colors(name: &str, colors: ThemeColors) -> Self {
        let bold = Modifier::BOLD;
        let styles = ThemeStyles {
            header: Style::default()
                .fg(colors.fg_primary)
                .add_modifier(bold),
            rule: Style::default().fg(colors.fg_muted),
            footer: Style::default()
                .fg(colors.fg_primary)
                .add_modifier(bold),
            label: Style::default().fg(colors.accent),
            text: Style::default().fg(colors.fg_primary),
            placeholder: Style::default().fg(colors.fg_muted),
            chart_error: Style::default().fg(colors.error),
            table_header: Style::default()
                .fg(colors.bg_primary)
                .bg(colors.accent)
                .add_modifier(bold),
            row: Style::default().fg(colors.fg_primary),
            row_selected: Style::default()
                .fg(colors.selection_fg)
                .bg(colors.selection_bg)
                .add_modifier(bold),
            chart_low: Style::default().fg(colors.chart_low),
            chart_mid: Style::default().fg(colors.chart_mid),
            chart_high: Style::default().fg(colors.chart_high),
            chart_neutral: Style::default().fg(colors.chart_neutral),
        };

        Self {
            name: name.to_string(),
            colors,
            styles,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(ChartTier::for_percent(Some(0.0)), ChartTier::Low);
        assert_eq!(ChartTier::for_percent(Some(49.9)), ChartTier::Low);
        assert_eq!(ChartTier::for_percent(Some(50.0)), ChartTier::Mid);
        assert_eq!(ChartTier::for_percent(Some(75.0)), ChartTier::Mid);
        assert_eq!(ChartTier::for_percent(Some(75.1)), ChartTier::High);
        assert_eq!(ChartTier::for_percent(None), ChartTier::Neutral);
    }

    #[test]
    fn test_classic_uses_ansi_tiers() {
        let theme = Theme::from_name("classic");
        assert_eq!(theme.chart_style(ChartTier::Low).fg, Some(Color::Green));
        assert_eq!(theme.chart_style(ChartTier::Mid).fg, Some(Color::Blue));
        assert_eq!(theme.chart_style(ChartTier::High).fg, Some(Color::Red));
    }

    #[test]
    fn test_unknown_theme_falls_back_to_classic() {
        assert_eq!(Theme::from_name("solarized").name, "Classic");
        assert_eq!(Theme::from_name("Tokyo-Night").name, "Tokyo Night");
    }
}
