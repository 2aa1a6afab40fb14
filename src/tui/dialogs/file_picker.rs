//! Package selection: a path field plus the `.deb` files found nearby

use std::fs;
use std::path::{Path, PathBuf};

use crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::*;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use super::{centered, DialogResult};
use crate::install::paths::{self, DEB_EXTENSION};
use crate::tui::styles::Theme;

pub struct FilePicker {
    input: Input,
    candidates: Vec<PathBuf>,
    selected: Option<usize>,
    error: Option<String>,
}

impl FilePicker {
    pub fn new(search_dirs: &[PathBuf]) -> Self {
        Self {
            input: Input::default(),
            candidates: scan_packages(search_dirs),
            selected: None,
            error: None,
        }
    }

    /// The directories searched when no explicit list is given.
    pub fn default_dirs() -> Vec<PathBuf> {
        let mut dirs_list = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            dirs_list.push(cwd);
        }
        if let Some(downloads) = dirs::download_dir() {
            if !dirs_list.contains(&downloads) {
                dirs_list.push(downloads);
            }
        }
        dirs_list
    }

    /// Prefill the field with a rejected path and show why.
    pub fn with_error(mut self, path: &Path, error: impl Into<String>) -> Self {
        self.input = Input::new(path.to_string_lossy().to_string());
        self.error = Some(error.into());
        self
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> DialogResult<PathBuf> {
        match key.code {
            KeyCode::Esc => DialogResult::Cancel,
            KeyCode::Enter => self.submit(),
            KeyCode::Up => {
                self.select(match self.selected {
                    Some(0) | None => self.candidates.len().checked_sub(1),
                    Some(i) => Some(i - 1),
                });
                DialogResult::Continue
            }
            KeyCode::Down => {
                self.select(match self.selected {
                    Some(i) if i + 1 < self.candidates.len() => Some(i + 1),
                    _ if self.candidates.is_empty() => None,
                    _ => Some(0),
                });
                DialogResult::Continue
            }
            _ => {
                if self.input.handle_event(&Event::Key(key)).is_some() {
                    self.selected = None;
                    self.error = None;
                }
                DialogResult::Continue
            }
        }
    }

    fn select(&mut self, index: Option<usize>) {
        self.selected = index;
        if let Some(path) = index.and_then(|i| self.candidates.get(i)) {
            self.input = Input::new(path.to_string_lossy().to_string());
            self.error = None;
        }
    }

    fn submit(&mut self) -> DialogResult<PathBuf> {
        let raw = self.input.value().trim();
        if raw.is_empty() {
            self.error = Some("Enter the path of a .deb package".to_string());
            return DialogResult::Continue;
        }

        match paths::validate_input(&expand_home(raw)) {
            Ok(path) => DialogResult::Submit(path),
            Err(e) => {
                self.error = Some(e.to_string());
                DialogResult::Continue
            }
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let list_height = self.candidates.len().clamp(1, 10) as u16;
        let dialog_area = centered(area, 72, list_height + 10);
        frame.render_widget(Clear, dialog_area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.accent))
            .title(" Select Package ")
            .title_style(Style::default().fg(theme.title).bold());

        let inner = block.inner(dialog_area);
        frame.render_widget(block, dialog_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(inner);

        let label = "Path: ";
        let width = chunks[0].width.saturating_sub(label.len() as u16 + 1) as usize;
        let scroll = self.input.visual_scroll(width);
        let field = Line::from(vec![
            Span::styled(label, Style::default().fg(theme.accent)),
            Span::styled(
                self.input.value().chars().skip(scroll).collect::<String>(),
                Style::default().fg(theme.text),
            ),
        ]);
        frame.render_widget(Paragraph::new(field), chunks[0]);
        frame.set_cursor_position((
            chunks[0].x + label.len() as u16 + (self.input.visual_cursor().saturating_sub(scroll)) as u16,
            chunks[0].y,
        ));

        if let Some(error) = &self.error {
            frame.render_widget(
                Paragraph::new(format!("✗ {}", error)).style(Style::default().fg(theme.error)),
                chunks[1],
            );
        }

        frame.render_widget(
            Paragraph::new("Packages found:").style(Style::default().fg(theme.dimmed)),
            chunks[2],
        );

        if self.candidates.is_empty() {
            frame.render_widget(
                Paragraph::new("  (no .deb files in the current or Downloads directory)")
                    .style(Style::default().fg(theme.dimmed)),
                chunks[3],
            );
        } else {
            let items: Vec<ListItem> = self
                .candidates
                .iter()
                .map(|p| ListItem::new(format!("  {}", p.display())))
                .collect();
            let list = List::new(items)
                .style(Style::default().fg(theme.text))
                .highlight_style(Style::default().fg(theme.accent).bold())
                .highlight_symbol("▶");
            let mut state = ListState::default().with_selected(self.selected);
            frame.render_stateful_widget(list, chunks[3], &mut state);
        }

        let hint = Line::from(vec![
            Span::styled("↑/↓", Style::default().fg(theme.hint)),
            Span::raw(" choose  "),
            Span::styled("Enter", Style::default().fg(theme.hint)),
            Span::raw(" install  "),
            Span::styled("Esc", Style::default().fg(theme.hint)),
            Span::raw(" quit"),
        ]);
        frame.render_widget(Paragraph::new(hint), chunks[4]);
    }
}

/// `.deb` files directly inside `search_dirs`, sorted by path.
pub fn scan_packages(search_dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = search_dirs
        .iter()
        .filter_map(|dir| fs::read_dir(dir).ok())
        .flat_map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()))
        .filter(|p| p.is_file() && has_deb_extension(p))
        .collect();
    found.sort();
    found.dedup();
    found
}

fn has_deb_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(DEB_EXTENSION))
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(raw)),
        None => PathBuf::from(raw),
    }
}
