//! Running external commands with line-by-line output streaming

use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::elevate::ElevatedSession;
use crate::process;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A command to run: program, arguments and how to run it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Scripted answers written to stdin; stdin is closed afterwards.
    pub stdin: Option<String>,
    /// Run under the job's elevated session.
    pub elevated: bool,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn elevated(mut self) -> Self {
        self.elevated = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The command line as a user would type it, for the job log.
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 2);
        if self.elevated {
            parts.push("sudo".to_string());
        }
        parts.push(shell_quote(&self.program));
        parts.extend(self.args.iter().map(|a| shell_quote(a)));
        parts.join(" ")
    }
}

/// How a command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Exited(i32),
    /// Killed by a signal we did not send.
    Signalled,
    TimedOut,
    /// Terminated through an [`AbortHandle`].
    Aborted,
}

impl CommandStatus {
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exit code {}", code),
            Self::Signalled => f.write_str("terminated by signal"),
            Self::TimedOut => f.write_str("timed out"),
            Self::Aborted => f.write_str("aborted"),
        }
    }
}

/// Executes commands for the orchestrator.
///
/// The system implementation spawns real processes; tests substitute a
/// recording fake so no package is touched and no password is asked for.
pub trait CommandRunner: Send {
    /// Locate `program` on the execution path.
    fn resolve(&self, program: &str) -> Option<PathBuf>;

    /// Run `spec` to completion, passing every stdout/stderr line to
    /// `on_line` as soon as it is read.
    fn run(&mut self, spec: &CommandSpec, on_line: &mut dyn FnMut(String))
        -> io::Result<CommandStatus>;
}

#[derive(Debug, Default)]
struct AbortState {
    running_pgid: Option<u32>,
    aborted: bool,
}

/// Shared handle the front end uses to stop the command currently running.
///
/// Aborting is sticky: once aborted, later commands are killed as soon as
/// they start.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    inner: Arc<Mutex<AbortState>>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send SIGTERM to the process group of the running command, if any.
    pub fn abort(&self) {
        let mut state = self.lock();
        state.aborted = true;
        if let Some(pgid) = state.running_pgid {
            tracing::info!("Terminating process group {}", pgid);
            if let Err(e) = process::terminate_group(pgid) {
                tracing::warn!("Failed to terminate process group {}: {}", pgid, e);
            }
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.lock().aborted
    }

    fn set_running(&self, pgid: Option<u32>) -> bool {
        let mut state = self.lock();
        state.running_pgid = pgid;
        state.aborted
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AbortState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Runs commands as real child processes, each in its own process group.
pub struct SystemRunner {
    session: Option<ElevatedSession>,
    abort: AbortHandle,
}

impl SystemRunner {
    pub fn new(session: Option<ElevatedSession>) -> Self {
        Self {
            session,
            abort: AbortHandle::new(),
        }
    }

    pub fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    fn build_command(&self, spec: &CommandSpec) -> io::Result<(Command, Option<String>)> {
        let (program, args, preamble) = if spec.elevated {
            let session = self.session.as_ref().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "no administrator session for privileged command",
                )
            })?;
            let (program, args) = session.wrap(&spec.program, &spec.args);
            (program, args, session.stdin_preamble())
        } else {
            (spec.program.clone(), spec.args.clone(), None)
        };

        let input = match (preamble, &spec.stdin) {
            (None, None) => None,
            (a, b) => Some(format!(
                "{}{}",
                a.unwrap_or_default(),
                b.as_deref().unwrap_or_default()
            )),
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        Ok((cmd, input))
    }
}

impl CommandRunner for SystemRunner {
    fn resolve(&self, program: &str) -> Option<PathBuf> {
        process::which(program)
    }

    fn run(
        &mut self,
        spec: &CommandSpec,
        on_line: &mut dyn FnMut(String),
    ) -> io::Result<CommandStatus> {
        let (mut cmd, input) = self.build_command(spec)?;
        if self.abort.is_aborted() {
            tracing::debug!("Not starting {}: job aborted", spec.program);
            return Ok(CommandStatus::Aborted);
        }
        tracing::debug!("Running: {}", spec.display());

        let mut child = cmd.spawn()?;
        let pgid = child.id();
        if self.abort.set_running(Some(pgid)) {
            let _ = process::terminate_group(pgid);
        }

        if let (Some(mut stdin), Some(input)) = (child.stdin.take(), input) {
            // A child that exits without reading its stdin is not an error here.
            let _ = stdin.write_all(input.as_bytes());
        }

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_line_reader(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_line_reader(stderr, tx.clone()));
        }
        drop(tx);

        let started = Instant::now();
        let mut timed_out = false;
        loop {
            let wait = match spec.timeout {
                Some(limit) if !timed_out => limit
                    .saturating_sub(started.elapsed())
                    .min(POLL_INTERVAL),
                _ => POLL_INTERVAL,
            };
            match rx.recv_timeout(wait) {
                Ok(line) => on_line(line),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }

            // Checked on every wake-up, not only when the command is quiet.
            if let Some(limit) = spec.timeout {
                if !timed_out && started.elapsed() >= limit {
                    tracing::warn!("{} timed out after {:?}", spec.program, limit);
                    timed_out = true;
                    let _ = process::kill_group(pgid);
                }
            }
        }

        for reader in readers {
            let _ = reader.join();
        }
        let status = child.wait()?;
        let aborted = self.abort.is_aborted();
        self.abort.set_running(None);

        Ok(if timed_out {
            CommandStatus::TimedOut
        } else if aborted && !status.success() {
            CommandStatus::Aborted
        } else {
            match status.code() {
                Some(code) => CommandStatus::Exited(code),
                None => CommandStatus::Signalled,
            }
        })
    }
}

/// Forward each line of `stream` to `tx`. Invalid UTF-8 is replaced rather
/// than ending the stream.
fn spawn_line_reader<R: Read + Send + 'static>(
    stream: R,
    tx: mpsc::Sender<String>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(&['\n', '\r'][..]).to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Shell-quote a string for display in command lines.
///
/// Simple alphanumeric/path strings stay unquoted for readability; anything
/// else is single-quoted.
pub fn shell_quote(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if s.chars()
        .all(|c| c.is_ascii_alphanumeric() || "/._-+=:,".contains(c))
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}
