use std::path::PathBuf;

use uuid::Uuid;

use super::error::JobFailure;
use super::job::JobState;

/// Structured events emitted by a running install job.
///
/// Replaying the events of one job into a fresh [`super::InstallJob`] yields
/// the same job the worker holds.
#[derive(Debug, Clone)]
pub enum JobEvent {
    Started { id: Uuid, source: PathBuf },
    StateChanged(JobState),
    Log(LogLine),
    Finished(Option<JobFailure>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    /// Step markers and status lines written by the installer itself.
    System,
    /// A line printed by an external command.
    Process,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub source: LogSource,
    pub text: String,
}

impl LogLine {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            source: LogSource::System,
            text: text.into(),
        }
    }

    pub fn process(text: impl Into<String>) -> Self {
        Self {
            source: LogSource::Process,
            text: text.into(),
        }
    }
}
