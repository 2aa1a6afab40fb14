//! Screen flow: pick a file, authenticate, confirm, then watch the job

use std::fs;
use std::io::Stdout;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::*;
use ratatui::widgets::Block;
use ratatui::Terminal;

use super::dialogs::{ConfirmDialog, DialogResult, FilePicker, PasswordDialog};
use super::progress::{ProgressAction, ProgressView};
use super::styles::Theme;
use crate::config::Config;
use crate::install::{self, paths, AbortHandle, ElevatedSession, InstallError, InstallJob};

const TICK: Duration = Duration::from_millis(100);
const MAX_PASSWORD_ATTEMPTS: usize = 3;

/// How the UI ended.
pub enum Outcome {
    /// The user backed out before a job started.
    Cancelled,
    /// Setup failed before a job started.
    Rejected(InstallError),
    Finished {
        job: InstallJob,
        log_path: Option<PathBuf>,
    },
}

enum Screen {
    SelectFile(FilePicker),
    Password(PasswordDialog),
    Confirm(ConfirmDialog),
    Progress(Box<ProgressView>),
}

pub struct App {
    theme: Theme,
    config: Option<Config>,
    data_dir: Option<PathBuf>,
    skip_confirm: bool,
    screen: Screen,
    source: Option<PathBuf>,
    session: Option<ElevatedSession>,
    pending_password: Option<String>,
    password_attempts: usize,
}

impl App {
    pub fn new(
        path: Option<PathBuf>,
        config: Config,
        data_dir: Option<PathBuf>,
        skip_confirm: bool,
    ) -> Self {
        let mut app = Self {
            theme: Theme::default(),
            config: Some(config),
            data_dir,
            skip_confirm,
            screen: Screen::SelectFile(FilePicker::new(&FilePicker::default_dirs())),
            source: None,
            session: None,
            pending_password: None,
            password_attempts: 0,
        };

        if let Some(path) = path {
            match paths::validate_input(&path) {
                Ok(source) => app.source_selected(source),
                Err(e) => {
                    app.screen = Screen::SelectFile(
                        FilePicker::new(&FilePicker::default_dirs()).with_error(&path, e.to_string()),
                    );
                }
            }
        }
        app
    }

    pub fn run(mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<Outcome> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if let Some(password) = self.pending_password.take() {
                if let Some(outcome) = self.verify_password(password) {
                    return Ok(outcome);
                }
                continue;
            }

            if event::poll(TICK)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        if let Some(outcome) = self.handle_key(key) {
                            return Ok(outcome);
                        }
                    }
                }
            }

            if let Screen::Progress(view) = &mut self.screen {
                if view.tick() == ProgressAction::Exit {
                    return Ok(self.finish());
                }
            }
        }
    }

    fn handle_key(&mut self, key: event::KeyEvent) -> Option<Outcome> {
        match &mut self.screen {
            Screen::SelectFile(picker) => match picker.handle_key(key) {
                DialogResult::Continue => None,
                DialogResult::Cancel => Some(Outcome::Cancelled),
                DialogResult::Submit(source) => {
                    self.source_selected(source);
                    None
                }
            },
            Screen::Password(dialog) => match dialog.handle_key(key) {
                DialogResult::Continue => None,
                DialogResult::Cancel => Some(Outcome::Cancelled),
                DialogResult::Submit(password) => {
                    self.pending_password = Some(password);
                    None
                }
            },
            Screen::Confirm(dialog) => match dialog.handle_key(key) {
                DialogResult::Continue => None,
                DialogResult::Cancel => Some(Outcome::Cancelled),
                DialogResult::Submit(()) => {
                    self.start_job();
                    None
                }
            },
            Screen::Progress(view) => match view.handle_key(key) {
                ProgressAction::Continue => None,
                ProgressAction::Exit => Some(self.finish()),
            },
        }
    }

    fn source_selected(&mut self, source: PathBuf) {
        self.source = Some(source);
        match ElevatedSession::without_prompt() {
            Some(session) => {
                self.session = Some(session);
                self.authenticated();
            }
            None => self.screen = Screen::Password(PasswordDialog::new()),
        }
    }

    fn verify_password(&mut self, password: String) -> Option<Outcome> {
        self.password_attempts += 1;
        match ElevatedSession::acquire(password) {
            Ok(session) => {
                tracing::info!("Administrator access granted");
                self.session = Some(session);
                self.authenticated();
                None
            }
            Err(e) if e.is_retryable() && self.password_attempts < MAX_PASSWORD_ATTEMPTS => {
                if let Screen::Password(dialog) = &mut self.screen {
                    dialog.reject(format!(
                        "{} ({} of {} attempts)",
                        e, self.password_attempts, MAX_PASSWORD_ATTEMPTS
                    ));
                }
                None
            }
            Err(e) => Some(Outcome::Rejected(e.into())),
        }
    }

    fn authenticated(&mut self) {
        if self.skip_confirm {
            self.start_job();
        } else if let Some(source) = &self.source {
            self.screen = Screen::Confirm(install_confirmation(source));
        }
    }

    fn start_job(&mut self) {
        let (Some(source), Some(session), Some(config)) =
            (self.source.clone(), self.session.take(), self.config.take())
        else {
            return;
        };

        let abort = AbortHandle::new();
        let (events, _worker) = install::spawn_job(
            source.clone(),
            config,
            session,
            abort.clone(),
            self.data_dir.clone(),
        );
        self.screen = Screen::Progress(Box::new(ProgressView::new(
            source,
            events,
            abort,
            self.data_dir.clone(),
        )));
    }

    fn finish(&mut self) -> Outcome {
        let screen = std::mem::replace(
            &mut self.screen,
            Screen::Password(PasswordDialog::new()),
        );
        match screen {
            Screen::Progress(view) => {
                let log_path = view.log_path().map(Path::to_path_buf);
                Outcome::Finished {
                    job: (*view).into_job(),
                    log_path,
                }
            }
            _ => Outcome::Cancelled,
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(
            Block::default().style(Style::default().bg(self.theme.background)),
            area,
        );
        match &self.screen {
            Screen::SelectFile(picker) => picker.render(frame, area, &self.theme),
            Screen::Password(dialog) => dialog.render(frame, area, &self.theme),
            Screen::Confirm(dialog) => dialog.render(frame, area, &self.theme),
            Screen::Progress(view) => view.render(frame, area, &self.theme),
        }
    }
}

fn install_confirmation(source: &Path) -> ConfirmDialog {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let bytes = fs::metadata(source).map(|m| m.len()).unwrap_or(0);
    ConfirmDialog::install(&name, paths::size_mb(bytes), paths::estimate_seconds(bytes))
}
