use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use super::elevate::ElevationError;

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("No AUR helper found (tried: {tried}); install {converter} manually")]
    PrerequisiteMissing { converter: String, tried: String },

    #[error("Failed to install {converter}: {reason}")]
    Setup { converter: String, reason: String },

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("Installation failed: {0}")]
    Install(String),

    #[error("Cancelled by user")]
    UserCancelled,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Administrator access failed: {0}")]
    Elevation(#[from] ElevationError),

    #[error("Another installation is already running (lock held on {})", .0.display())]
    AlreadyRunning(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::PrerequisiteMissing { .. } => FailureKind::PrerequisiteMissing,
            Self::Setup { .. } => FailureKind::SetupError,
            Self::Conversion(_) => FailureKind::ConversionError,
            Self::Install(_) => FailureKind::InstallError,
            Self::UserCancelled => FailureKind::UserCancelled,
            Self::InvalidInput(_) => FailureKind::InvalidInput,
            Self::Elevation(_) => FailureKind::ElevationError,
            Self::AlreadyRunning(_) => FailureKind::AlreadyRunning,
            Self::Io(_) => FailureKind::Io,
        }
    }
}

/// The category a failed job ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    PrerequisiteMissing,
    SetupError,
    ConversionError,
    InstallError,
    UserCancelled,
    InvalidInput,
    ElevationError,
    AlreadyRunning,
    Io,
    /// The worker stopped without reporting how the job ended.
    Interrupted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PrerequisiteMissing => "missing prerequisite",
            Self::SetupError => "converter setup failed",
            Self::ConversionError => "conversion failed",
            Self::InstallError => "installation failed",
            Self::UserCancelled => "cancelled",
            Self::InvalidInput => "invalid input",
            Self::ElevationError => "authentication failed",
            Self::AlreadyRunning => "already running",
            Self::Io => "I/O error",
            Self::Interrupted => "interrupted",
        };
        f.write_str(s)
    }
}

/// What a failed job reports: its kind, a readable message, and the last
/// lines the external commands printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
    pub tail: Vec<String>,
}

pub type Result<T> = std::result::Result<T, InstallError>;
