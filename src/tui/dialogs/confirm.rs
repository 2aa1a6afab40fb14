//! Confirmation dialog

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::*;

use super::{centered, DialogResult};
use crate::tui::styles::Theme;

pub struct ConfirmDialog {
    title: String,
    message: String,
    danger: bool,
    selected: bool, // true = Yes, false = No
}

impl ConfirmDialog {
    pub fn new(title: &str, message: &str) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            danger: false,
            selected: true,
        }
    }

    /// Ask before installing `source`. The estimate is only a rough guide.
    pub fn install(file_name: &str, size_mb: f64, estimate_secs: u64) -> Self {
        let message = format!(
            "Install {}?\n\nSize: {:.1} MB\nEstimated time: about {} seconds\n\nThe package will be converted with debtap and installed with pacman.",
            file_name, size_mb, estimate_secs
        );
        Self::new("Install Package", &message)
    }

    /// Ask before stopping a running job. Defaults to No.
    pub fn abort() -> Self {
        Self {
            danger: true,
            selected: false,
            ..Self::new(
                "Abort Installation",
                "Stop the running command and abort the installation?",
            )
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> DialogResult<()> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => DialogResult::Cancel,
            KeyCode::Enter => {
                if self.selected {
                    DialogResult::Submit(())
                } else {
                    DialogResult::Cancel
                }
            }
            KeyCode::Char('y') | KeyCode::Char('Y') => DialogResult::Submit(()),
            KeyCode::Left | KeyCode::Char('h') => {
                self.selected = true;
                DialogResult::Continue
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.selected = false;
                DialogResult::Continue
            }
            KeyCode::Tab => {
                self.selected = !self.selected;
                DialogResult::Continue
            }
            _ => DialogResult::Continue,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let height = 6 + self.message.lines().count() as u16;
        let dialog_area = centered(area, 60, height);
        frame.render_widget(Clear, dialog_area);

        let tone = if self.danger { theme.error } else { theme.accent };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(tone))
            .title(format!(" {} ", self.title))
            .title_style(Style::default().fg(tone).bold());

        let inner = block.inner(dialog_area);
        frame.render_widget(block, dialog_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Min(1), Constraint::Length(2)])
            .split(inner);

        let message = Paragraph::new(&*self.message)
            .style(Style::default().fg(theme.text))
            .wrap(Wrap { trim: false });
        frame.render_widget(message, chunks[0]);

        let yes_style = if self.selected {
            Style::default().fg(tone).bold()
        } else {
            Style::default().fg(theme.dimmed)
        };
        let no_style = if !self.selected {
            Style::default().fg(theme.running).bold()
        } else {
            Style::default().fg(theme.dimmed)
        };

        let buttons = Line::from(vec![
            Span::raw("  "),
            Span::styled("[Yes]", yes_style),
            Span::raw("    "),
            Span::styled("[No]", no_style),
        ]);

        frame.render_widget(
            Paragraph::new(buttons).alignment(Alignment::Center),
            chunks[1],
        );
    }
}
