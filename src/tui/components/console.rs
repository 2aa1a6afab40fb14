//! Scrolling job log

use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::install::{LogLine, LogSource};
use crate::tui::styles::Theme;

/// Log view that follows the newest line until scrolled back.
#[derive(Default)]
pub struct Console {
    /// Lines scrolled up from the bottom; 0 follows the tail.
    offset: usize,
}

impl Console {
    pub fn scroll_up(&mut self, lines: usize, total: usize) {
        self.offset = (self.offset + lines).min(total.saturating_sub(1));
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.offset = self.offset.saturating_sub(lines);
    }

    pub fn follow(&mut self) {
        self.offset = 0;
    }

    pub fn is_following(&self) -> bool {
        self.offset == 0
    }

    /// Index range of `total` lines visible in a view `height` lines tall.
    pub fn window(&self, total: usize, height: usize) -> std::ops::Range<usize> {
        let end = total.saturating_sub(self.offset);
        end.saturating_sub(height)..end
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, log: &[LogLine], theme: &Theme) {
        let title = if self.is_following() {
            " Output ".to_string()
        } else {
            format!(" Output (scrolled {} lines, End to follow) ", self.offset)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border))
            .title(title)
            .title_style(Style::default().fg(theme.title).bold());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines: Vec<Line> = log[self.window(log.len(), inner.height as usize)]
            .iter()
            .map(|line| styled_line(line, theme))
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

fn styled_line<'a>(line: &'a LogLine, theme: &Theme) -> Line<'a> {
    match line.source {
        LogSource::Process => Line::from(vec![
            Span::raw("  "),
            Span::styled(line.text.as_str(), Style::default().fg(theme.dimmed)),
        ]),
        LogSource::System => {
            let text = line.text.as_str();
            let style = if text.starts_with('✓') || text.starts_with("SUCCESS") {
                Style::default().fg(theme.success)
            } else if text.starts_with('✗') || text.starts_with("ERROR") {
                Style::default().fg(theme.error).bold()
            } else if text.starts_with('⚠') {
                Style::default().fg(theme.warning)
            } else if text.starts_with("STEP") {
                Style::default().fg(theme.accent).bold()
            } else if text.starts_with('=') || text.starts_with('$') {
                Style::default().fg(theme.dimmed)
            } else {
                Style::default().fg(theme.text)
            };
            Line::styled(text, style)
        }
    }
}
