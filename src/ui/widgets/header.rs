//! Header widget

use chrono::{DateTime, Local};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::Span,
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

use crate::ui::theme::Theme;

pub const TITLE: &str = "Nodetop";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct Header<'a> {
    theme: &'a Theme,
    now: DateTime<Local>,
}

impl<'a> Header<'a> {
    pub fn new(theme: &'a Theme, now: DateTime<Local>) -> Self {
        Self { theme, now }
    }
}

impl<'a> Widget for Header<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let style = self.theme.styles.header;
        let clock = self.now.format("%m/%d/%Y %I:%M %p").to_string();

        buf.set_span(area.x, area.y, &Span::styled(VERSION, style), area.width);

        let title_width = TITLE.width() as u16;
        let title_x = area.x + area.width.saturating_sub(title_width) / 2;
        buf.set_span(title_x, area.y, &Span::styled(TITLE, style), title_width);

        let clock_width = clock.width() as u16;
        let clock_x = area.x + area.width.saturating_sub(clock_width);
        buf.set_span(clock_x, area.y, &Span::styled(clock, style), clock_width);

        if area.height > 1 {
            let rule = "_".repeat(area.width as usize);
            buf.set_span(
                area.x,
                area.y + 1,
                &Span::styled(rule, self.theme.styles.rule),
                area.width,
            );
        }
    }
}
