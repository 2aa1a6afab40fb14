//! Diagnostic tracing setup and persisted job logs

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing_subscriber::EnvFilter;

use crate::install::{JobEvent, JobState};

/// Set to enable the debug log.
pub const DEBUG_ENV: &str = "DEB_INSTALLER_DEBUG";
const DEBUG_LOG_FILE: &str = "debug.log";
const JOB_LOG_DIR: &str = "logs";

/// Install a tracing subscriber writing to `debug.log` in `data_dir` when
/// [`DEBUG_ENV`] is set. The terminal belongs to the TUI, so nothing is
/// written to stderr.
pub fn init_tracing(data_dir: &Path) -> Result<Option<PathBuf>> {
    if std::env::var_os(DEBUG_ENV).is_none() {
        return Ok(None);
    }

    fs::create_dir_all(data_dir).with_context(|| format!("create {}", data_dir.display()))?;
    let path = data_dir.join(DEBUG_LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("deb_installer=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    tracing::info!("Debug logging to {}", path.display());
    Ok(Some(path))
}

/// Plain-text copy of one job's log under `<data_dir>/logs`.
pub struct JobLogWriter {
    file: File,
    path: PathBuf,
}

impl JobLogWriter {
    pub fn create(data_dir: &Path, source: &Path, started: DateTime<Local>) -> Result<Self> {
        let dir = data_dir.join(JOB_LOG_DIR);
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        let path = dir.join(job_log_file_name(source, started));
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .with_context(|| format!("open {}", path.display()))?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the text form of `event`. Write errors are ignored; the
    /// on-screen log stays authoritative.
    pub fn write_event(&mut self, event: &JobEvent) {
        let line = match event {
            JobEvent::Started { id, source } => {
                format!("JOB {} {}", id, source.display())
            }
            JobEvent::StateChanged(state) => format!("STATE: {}", state_label(state)),
            JobEvent::Log(line) => line.text.clone(),
            JobEvent::Finished(None) => "DONE: ok".to_string(),
            JobEvent::Finished(Some(failure)) => {
                format!("DONE: {}: {}", failure.kind, failure.message)
            }
        };
        let _ = writeln!(self.file, "{}", line);
        let _ = self.file.flush();
    }
}

fn state_label(state: &JobState) -> String {
    match state {
        JobState::Failed(kind) => format!("FAILED ({})", kind),
        other => other.label().to_uppercase(),
    }
}

/// `<timestamp>-<package>.log`, with the package name reduced to safe
/// characters.
pub fn job_log_file_name(source: &Path, started: DateTime<Local>) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "package".to_string());
    let safe: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .take(60)
        .collect();
    format!("{}-{}.log", started.format("%Y%m%d-%H%M%S"), safe)
}
