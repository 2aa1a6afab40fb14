//! Privilege elevation through sudo
//!
//! One [`ElevatedSession`] is obtained per job from a single password prompt
//! and then used to wrap every privileged command of that job.

use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::process;

const SUDO: &str = "sudo";

/// `-S` reads the password from stdin, `-k` ignores cached credentials so the
/// password line is always consumed by sudo, `-p ""` silences the prompt.
const SUDO_FLAGS: [&str; 4] = ["-S", "-k", "-p", ""];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElevationError {
    #[error("Password cannot be empty")]
    EmptyPassword,

    #[error("The password you entered is incorrect")]
    IncorrectPassword,

    #[error("Your user account is not in the sudoers file")]
    NotInSudoers,

    #[error("sudo is not available: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Other(String),
}

impl ElevationError {
    /// Whether asking for the password again can help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::EmptyPassword | Self::IncorrectPassword)
    }
}

#[derive(Clone)]
enum Grant {
    /// Already running as root; commands run unwrapped.
    Root,
    /// Commands run through sudo. `None` means sudo needs no password.
    Sudo(Option<String>),
}

/// Proof of one successful privilege prompt. The secret never leaves this
/// type except on the stdin of a sudo child.
#[derive(Clone)]
pub struct ElevatedSession {
    grant: Grant,
}

impl fmt::Debug for ElevatedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.grant {
            Grant::Root => "root",
            Grant::Sudo(Some(_)) => "sudo",
            Grant::Sudo(None) => "sudo-nopasswd",
        };
        f.debug_struct("ElevatedSession")
            .field("mode", &mode)
            .finish_non_exhaustive()
    }
}

impl ElevatedSession {
    /// A session that needs no prompt: already root, or sudo configured
    /// without a password.
    pub fn without_prompt() -> Option<Self> {
        if process::is_root() {
            return Some(Self { grant: Grant::Root });
        }

        let passwordless = Command::new(SUDO)
            .args(["-n", "true"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);

        passwordless.then(|| Self {
            grant: Grant::Sudo(None),
        })
    }

    /// Validate `password` with sudo and keep it for the rest of the job.
    pub fn acquire(password: String) -> Result<Self, ElevationError> {
        if password.trim().is_empty() {
            return Err(ElevationError::EmptyPassword);
        }

        let mut child = Command::new(SUDO)
            .args(SUDO_FLAGS)
            .arg("whoami")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ElevationError::Unavailable(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            let _ = writeln!(stdin, "{}", password);
        }

        let output = child
            .wait_with_output()
            .map_err(|e| ElevationError::Other(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_sudo_failure(&stderr));
        }

        if String::from_utf8_lossy(&output.stdout).trim() != "root" {
            return Err(ElevationError::Other(
                "Password accepted but commands do not run as root".to_string(),
            ));
        }

        tracing::info!("Administrator access confirmed");
        Ok(Self {
            grant: Grant::Sudo(Some(password)),
        })
    }

    /// Build a session around `password` without validating it.
    pub fn assume(password: Option<String>) -> Self {
        Self {
            grant: Grant::Sudo(password),
        }
    }

    pub fn root() -> Self {
        Self { grant: Grant::Root }
    }

    /// Program and arguments to execute `program args..` with elevated rights.
    pub fn wrap(&self, program: &str, args: &[String]) -> (String, Vec<String>) {
        match self.grant {
            Grant::Root => (program.to_string(), args.to_vec()),
            Grant::Sudo(_) => {
                let mut wrapped: Vec<String> = SUDO_FLAGS.iter().map(|s| s.to_string()).collect();
                wrapped.push(program.to_string());
                wrapped.extend(args.iter().cloned());
                (SUDO.to_string(), wrapped)
            }
        }
    }

    /// Text to write on the wrapped command's stdin ahead of anything else.
    pub(crate) fn stdin_preamble(&self) -> Option<String> {
        match &self.grant {
            Grant::Sudo(Some(password)) => Some(format!("{}\n", password)),
            _ => None,
        }
    }
}

/// Map sudo's complaint on stderr to an [`ElevationError`].
pub fn classify_sudo_failure(stderr: &str) -> ElevationError {
    let lower = stderr.to_lowercase();
    if lower.contains("not in the sudoers") || lower.contains("is not allowed to run sudo") {
        ElevationError::NotInSudoers
    } else if lower.contains("incorrect password")
        || lower.contains("sorry, try again")
        || lower.contains("authentication failure")
    {
        ElevationError::IncorrectPassword
    } else if stderr.trim().is_empty() {
        ElevationError::Other("Unknown error".to_string())
    } else {
        ElevationError::Other(stderr.trim().to_string())
    }
}
