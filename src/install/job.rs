//! Install job state machine

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use uuid::Uuid;

use super::error::{FailureKind, JobFailure};
use super::event::{JobEvent, LogLine, LogSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    CheckingConverter,
    InstallingConverter,
    Converting,
    Installing,
    Done,
    Failed(FailureKind),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }

    /// Whether `next` is a legal successor. The chain only moves forward;
    /// `Failed` is reachable from every non-terminal state.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;

        match (self, next) {
            (Done | Failed(_), _) => false,
            (_, Failed(_)) => true,
            (Idle, CheckingConverter) => true,
            (CheckingConverter, InstallingConverter | Converting) => true,
            (InstallingConverter, Converting) => true,
            (Converting, Installing) => true,
            (Installing, Done) => true,
            _ => false,
        }
    }

    /// Fraction of the job completed, for progress gauges.
    pub fn progress(&self) -> f64 {
        match self {
            Self::Idle => 0.0,
            Self::CheckingConverter => 0.05,
            Self::InstallingConverter => 0.10,
            Self::Converting => 0.20,
            Self::Installing => 0.75,
            Self::Done => 1.0,
            Self::Failed(_) => 1.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Waiting",
            Self::CheckingConverter => "Checking for converter",
            Self::InstallingConverter => "Installing converter",
            Self::Converting => "Converting package",
            Self::Installing => "Installing package",
            Self::Done => "Installation completed",
            Self::Failed(_) => "Installation failed",
        }
    }
}

/// One install of one `.deb` file.
#[derive(Debug, Clone)]
pub struct InstallJob {
    id: Uuid,
    source: PathBuf,
    state: JobState,
    log: Vec<LogLine>,
    failure: Option<JobFailure>,
    started_at: DateTime<Local>,
}

impl InstallJob {
    pub fn new(source: PathBuf) -> Self {
        Self::with_id(Uuid::new_v4(), source)
    }

    pub fn with_id(id: Uuid, source: PathBuf) -> Self {
        Self {
            id,
            source,
            state: JobState::Idle,
            log: Vec::new(),
            failure: None,
            started_at: Local::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn log(&self) -> &[LogLine] {
        &self.log
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        self.failure.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move to `next`. Returns `false` and leaves the job untouched when the
    /// transition would go backwards or leave a terminal state.
    pub fn advance(&mut self, next: JobState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                "Rejected job transition {:?} -> {:?} for {}",
                self.state,
                next,
                self.id
            );
            return false;
        }
        self.state = next;
        true
    }

    /// End a job whose worker never reported a result. No-op once the job
    /// is already finished.
    pub fn abandon(&mut self, kind: FailureKind, message: impl Into<String>) {
        if !self.advance(JobState::Failed(kind)) {
            return;
        }
        self.failure = Some(JobFailure {
            kind,
            message: message.into(),
            tail: self.process_tail(10),
        });
    }

    /// Whether the job reached `Done` without a recorded failure.
    pub fn succeeded(&self) -> bool {
        self.state == JobState::Done && self.failure.is_none()
    }

    pub fn push_log(&mut self, line: LogLine) {
        self.log.push(line);
    }

    /// The last `n` lines printed by external commands, oldest first.
    pub fn process_tail(&self, n: usize) -> Vec<String> {
        let mut tail: Vec<String> = self
            .log
            .iter()
            .rev()
            .filter(|l| l.source == LogSource::Process)
            .take(n)
            .map(|l| l.text.clone())
            .collect();
        tail.reverse();
        tail
    }

    /// Apply an event produced by the worker. `Started` resets the job.
    pub fn apply(&mut self, event: &JobEvent) {
        match event {
            JobEvent::Started { id, source } => {
                *self = Self::with_id(*id, source.clone());
            }
            JobEvent::StateChanged(state) => {
                self.advance(*state);
            }
            JobEvent::Log(line) => self.push_log(line.clone()),
            JobEvent::Finished(failure) => {
                self.failure = failure.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_chain_with_optional_converter_install() {
        let mut job = InstallJob::new(PathBuf::from("/tmp/app.deb"));
        for state in [
            JobState::CheckingConverter,
            JobState::InstallingConverter,
            JobState::Converting,
            JobState::Installing,
            JobState::Done,
        ] {
            assert!(job.advance(state), "{:?} should be reachable", state);
        }
        assert!(job.is_finished());

        let mut job = InstallJob::new(PathBuf::from("/tmp/app.deb"));
        assert!(job.advance(JobState::CheckingConverter));
        assert!(job.advance(JobState::Converting));
    }

    #[test]
    fn test_backward_and_skipping_transitions_rejected() {
        let mut job = InstallJob::new(PathBuf::from("/tmp/app.deb"));
        assert!(!job.advance(JobState::Converting));
        assert_eq!(job.state(), JobState::Idle);

        job.advance(JobState::CheckingConverter);
        job.advance(JobState::Converting);
        assert!(!job.advance(JobState::CheckingConverter));
        assert!(!job.advance(JobState::InstallingConverter));
        assert!(!job.advance(JobState::Done));
        assert_eq!(job.state(), JobState::Converting);
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut job = InstallJob::new(PathBuf::from("/tmp/app.deb"));
        assert!(job.advance(JobState::Failed(FailureKind::InvalidInput)));
        assert!(!job.advance(JobState::CheckingConverter));
        assert!(!job.advance(JobState::Failed(FailureKind::Io)));
        assert_eq!(job.state(), JobState::Failed(FailureKind::InvalidInput));
    }

    #[test]
    fn test_done_is_terminal() {
        let state = JobState::Done;
        assert!(!state.can_transition_to(JobState::Failed(FailureKind::InstallError)));
    }

    #[test]
    fn test_abandon_unfinished_job() {
        let mut job = InstallJob::new(PathBuf::from("/tmp/app.deb"));
        job.advance(JobState::CheckingConverter);
        job.advance(JobState::Converting);
        job.push_log(LogLine::process("converting..."));
        assert!(!job.succeeded());

        job.abandon(FailureKind::Interrupted, "worker went away");
        assert_eq!(job.state(), JobState::Failed(FailureKind::Interrupted));
        let failure = job.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Interrupted);
        assert_eq!(failure.tail, vec!["converting..."]);
        assert!(!job.succeeded());
    }

    #[test]
    fn test_abandon_leaves_finished_job_alone() {
        let mut job = InstallJob::new(PathBuf::from("/tmp/app.deb"));
        for state in [
            JobState::CheckingConverter,
            JobState::Converting,
            JobState::Installing,
            JobState::Done,
        ] {
            job.advance(state);
        }
        job.abandon(FailureKind::UserCancelled, "too late");
        assert_eq!(job.state(), JobState::Done);
        assert!(job.failure().is_none());
        assert!(job.succeeded());
    }

    #[test]
    fn test_process_tail() {
        let mut job = InstallJob::new(PathBuf::from("/tmp/app.deb"));
        job.push_log(LogLine::system("STEP 1/4"));
        for i in 0..5 {
            job.push_log(LogLine::process(format!("line {}", i)));
        }
        job.push_log(LogLine::system("✗ failed"));

        assert_eq!(job.process_tail(2), vec!["line 3", "line 4"]);
        assert_eq!(job.process_tail(10).len(), 5);
    }

    #[test]
    fn test_apply_replays_worker_job() {
        let id = Uuid::new_v4();
        let events = vec![
            JobEvent::Started {
                id,
                source: PathBuf::from("/tmp/app.deb"),
            },
            JobEvent::StateChanged(JobState::CheckingConverter),
            JobEvent::Log(LogLine::system("STEP 1/4: Checking debtap")),
            JobEvent::Log(LogLine::process("a")),
            JobEvent::Log(LogLine::process("b")),
            JobEvent::StateChanged(JobState::Failed(FailureKind::SetupError)),
            JobEvent::Finished(Some(JobFailure {
                kind: FailureKind::SetupError,
                message: "boom".to_string(),
                tail: vec!["b".to_string()],
            })),
        ];

        let mut replica = InstallJob::new(PathBuf::from("/elsewhere.deb"));
        for event in &events {
            replica.apply(event);
        }

        assert_eq!(replica.id(), id);
        assert_eq!(replica.source(), Path::new("/tmp/app.deb"));
        assert_eq!(replica.state(), JobState::Failed(FailureKind::SetupError));
        let texts: Vec<&str> = replica.log().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["STEP 1/4: Checking debtap", "a", "b"]);
        assert_eq!(replica.failure().unwrap().message, "boom");
    }
}
