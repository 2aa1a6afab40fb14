//! Install orchestration and the pieces it drives

pub mod elevate;
pub mod error;
pub mod event;
pub mod job;
pub mod lock;
pub mod orchestrator;
pub mod paths;
pub mod runner;

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

pub use elevate::{ElevatedSession, ElevationError};
pub use error::{FailureKind, InstallError, JobFailure, Result};
pub use event::{JobEvent, LogLine, LogSource};
pub use job::{InstallJob, JobState};
pub use orchestrator::Orchestrator;
pub use runner::{AbortHandle, CommandRunner, CommandSpec, CommandStatus, SystemRunner};

use crate::config::Config;

/// Start a job on its own thread with real subprocesses.
///
/// The returned receiver yields the job's events as they happen; joining the
/// handle gives the finished job once the last event has been sent. Dropping
/// the handle detaches the worker, so a front end can exit without waiting
/// on a command that ignores SIGTERM.
pub fn spawn_job(
    path: PathBuf,
    config: Config,
    session: ElevatedSession,
    abort: AbortHandle,
    lock_dir: Option<PathBuf>,
) -> (mpsc::Receiver<JobEvent>, thread::JoinHandle<Option<InstallJob>>) {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let runner = SystemRunner::new(Some(session)).with_abort(abort);
        let mut orchestrator = Orchestrator::new(config, runner).with_events(tx);
        if let Some(dir) = lock_dir {
            orchestrator = orchestrator.with_lock_dir(dir);
        }
        // The outcome is recorded on the job and in the event stream.
        let _ = orchestrator.run(&path);
        orchestrator.into_job()
    });
    (rx, handle)
}
