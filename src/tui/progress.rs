//! Install progress screen: replays worker events into a local job copy

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, TryRecvError};
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::*;

use super::components::{Console, StepList};
use super::dialogs::{ConfirmDialog, DialogResult};
use super::styles::Theme;
use crate::install::{AbortHandle, FailureKind, InstallJob, JobEvent, JobState};
use crate::logging::JobLogWriter;

/// How long to wait for the worker to report back after an abort.
const ABORT_GRACE: Duration = Duration::from_secs(2);
const PAGE: usize = 10;

#[derive(Debug, PartialEq, Eq)]
pub enum ProgressAction {
    Continue,
    Exit,
}

pub struct ProgressView {
    job: InstallJob,
    reached: JobState,
    events: mpsc::Receiver<JobEvent>,
    disconnected: bool,
    abort: AbortHandle,
    abort_grace: Duration,
    abort_deadline: Option<Instant>,
    confirm_abort: Option<ConfirmDialog>,
    console: Console,
    data_dir: Option<PathBuf>,
    log_writer: Option<JobLogWriter>,
}

impl ProgressView {
    pub fn new(
        source: PathBuf,
        events: mpsc::Receiver<JobEvent>,
        abort: AbortHandle,
        data_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            job: InstallJob::new(source),
            reached: JobState::Idle,
            events,
            disconnected: false,
            abort,
            abort_grace: ABORT_GRACE,
            abort_deadline: None,
            confirm_abort: None,
            console: Console::default(),
            data_dir,
            log_writer: None,
        }
    }

    pub fn job(&self) -> &InstallJob {
        &self.job
    }

    /// The job as last reported. A job the worker never finished is marked
    /// failed here so it can't be mistaken for a success.
    pub fn into_job(mut self) -> InstallJob {
        if !self.job.is_finished() {
            if self.abort.is_aborted() {
                self.job.abandon(
                    FailureKind::UserCancelled,
                    format!("Cancelled by user; worker did not stop within {:?}", self.abort_grace),
                );
            } else {
                self.job
                    .abandon(FailureKind::Interrupted, "Install worker ended without a result");
            }
        }
        self.job
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_writer.as_ref().map(|w| w.path())
    }

    fn finished(&self) -> bool {
        self.job().is_finished() || self.disconnected
    }

    /// Drain pending worker events. Returns `Exit` once an abort has been
    /// answered by the worker or its grace period has run out.
    pub fn tick(&mut self) -> ProgressAction {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.apply(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }

        match self.abort_deadline {
            Some(_) if self.finished() => ProgressAction::Exit,
            Some(deadline) if Instant::now() >= deadline => {
                tracing::warn!("Worker did not finish within {:?} of abort", self.abort_grace);
                ProgressAction::Exit
            }
            _ => ProgressAction::Continue,
        }
    }

    fn apply(&mut self, event: JobEvent) {
        match &event {
            JobEvent::Started { source, .. } => {
                self.log_writer = self.data_dir.as_deref().and_then(|dir| {
                    JobLogWriter::create(dir, source, chrono::Local::now())
                        .map_err(|e| tracing::warn!("Job log unavailable: {:#}", e))
                        .ok()
                });
                self.reached = JobState::Idle;
            }
            JobEvent::StateChanged(state) if !state.is_terminal() => self.reached = *state,
            _ => {}
        }
        if let Some(writer) = self.log_writer.as_mut() {
            writer.write_event(&event);
        }
        self.job.apply(&event);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ProgressAction {
        if let Some(dialog) = self.confirm_abort.as_mut() {
            match dialog.handle_key(key) {
                DialogResult::Continue => {}
                DialogResult::Cancel => self.confirm_abort = None,
                DialogResult::Submit(()) => {
                    self.confirm_abort = None;
                    if !self.finished() {
                        self.abort.abort();
                        self.abort_deadline = Some(Instant::now() + self.abort_grace);
                    }
                }
            }
            return ProgressAction::Continue;
        }

        let quit = matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL));

        let total = self.job.log().len();
        match key.code {
            _ if quit && self.finished() => return ProgressAction::Exit,
            _ if quit && self.abort_deadline.is_none() => {
                self.confirm_abort = Some(ConfirmDialog::abort());
            }
            KeyCode::Up | KeyCode::Char('k') => self.console.scroll_up(1, total),
            KeyCode::Down | KeyCode::Char('j') => self.console.scroll_down(1),
            KeyCode::PageUp => self.console.scroll_up(PAGE, total),
            KeyCode::PageDown => self.console.scroll_down(PAGE),
            KeyCode::End | KeyCode::Char('G') => self.console.follow(),
            _ => {}
        }
        ProgressAction::Continue
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(6),
                Constraint::Min(5),
                Constraint::Length(1),
            ])
            .split(area);

        let name = self
            .job
            .source()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut title = vec![
            Span::styled("Installing ", Style::default().fg(theme.text)),
            Span::styled(name, Style::default().fg(theme.accent).bold()),
        ];
        if !self.finished() {
            let elapsed = chrono::Local::now() - self.job.started_at();
            title.push(Span::styled(
                format!("  {}s", elapsed.num_seconds().max(0)),
                Style::default().fg(theme.dimmed),
            ));
        }
        let header = Paragraph::new(Line::from(title))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border))
                .title(" deb-install ")
                .title_style(Style::default().fg(theme.title).bold()),
        );
        frame.render_widget(header, chunks[0]);

        StepList::render(frame, chunks[1], self.job.state(), self.reached, theme);
        self.console.render(frame, chunks[2], self.job.log(), theme);
        frame.render_widget(Paragraph::new(self.status_line(theme)), chunks[3]);

        if let Some(dialog) = &self.confirm_abort {
            dialog.render(frame, area, theme);
        }
    }

    fn status_line(&self, theme: &Theme) -> Line<'static> {
        let key = |k: &'static str| Span::styled(k, Style::default().fg(theme.hint));
        if self.abort_deadline.is_some() && !self.finished() {
            return Line::styled("Aborting...", Style::default().fg(theme.warning));
        }
        if self.finished() {
            let summary = match self.job.failure() {
                None if self.job.succeeded() => {
                    Span::styled("✓ Installed  ", Style::default().fg(theme.success))
                }
                None => Span::styled("✗ interrupted  ", Style::default().fg(theme.error)),
                Some(f) => Span::styled(format!("✗ {}  ", f.kind), Style::default().fg(theme.error)),
            };
            return Line::from(vec![summary, key("q"), Span::raw(" quit  "), key("↑/↓"), Span::raw(" scroll")]);
        }
        Line::from(vec![key("q"), Span::raw(" abort  "), key("↑/↓/PgUp/PgDn"), Span::raw(" scroll  "), key("End"), Span::raw(" follow")])
    }
}
