//! Administrator password prompt

use crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::*;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use super::{centered, DialogResult};
use crate::tui::styles::Theme;

pub struct PasswordDialog {
    input: Input,
    error: Option<String>,
    validating: bool,
}

impl PasswordDialog {
    pub fn new() -> Self {
        Self {
            input: Input::default(),
            error: None,
            validating: false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> DialogResult<String> {
        if self.validating {
            return DialogResult::Continue;
        }
        match key.code {
            KeyCode::Esc => DialogResult::Cancel,
            KeyCode::Enter => {
                if self.input.value().is_empty() {
                    self.error = Some("Password cannot be empty".to_string());
                    return DialogResult::Continue;
                }
                self.validating = true;
                self.error = None;
                DialogResult::Submit(self.input.value().to_string())
            }
            _ => {
                self.input.handle_event(&Event::Key(key));
                DialogResult::Continue
            }
        }
    }

    /// Show `message` and clear the field for another attempt.
    pub fn reject(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.validating = false;
        self.input.reset();
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let dialog_area = centered(area, 56, 10);
        frame.render_widget(Clear, dialog_area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.accent))
            .title(" Administrator Privileges ")
            .title_style(Style::default().fg(theme.title).bold());

        let inner = block.inner(dialog_area);
        frame.render_widget(block, dialog_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(1),
            ])
            .split(inner);

        frame.render_widget(
            Paragraph::new("Enter your password to install packages:")
                .style(Style::default().fg(theme.text)),
            chunks[0],
        );

        let masked: String = "•".repeat(self.input.value().chars().count());
        let field = Line::from(vec![
            Span::styled("Password: ", Style::default().fg(theme.accent)),
            Span::styled(masked, Style::default().fg(theme.text)),
            Span::styled(
                if self.validating { "" } else { "█" },
                Style::default().fg(theme.accent),
            ),
        ]);
        frame.render_widget(Paragraph::new(field), chunks[1]);

        let status = if self.validating {
            Line::styled("Verifying...", Style::default().fg(theme.running))
        } else if let Some(error) = &self.error {
            Line::styled(format!("✗ {}", error), Style::default().fg(theme.error))
        } else {
            Line::default()
        };
        frame.render_widget(Paragraph::new(status), chunks[2]);

        let hint = Line::from(vec![
            Span::styled("Enter", Style::default().fg(theme.hint)),
            Span::raw(" confirm  "),
            Span::styled("Esc", Style::default().fg(theme.hint)),
            Span::raw(" cancel"),
        ]);
        frame.render_widget(Paragraph::new(hint), chunks[3]);
    }
}

impl Default for PasswordDialog {
    fn default() -> Self {
        Self::new()
    }
}
