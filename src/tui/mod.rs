//! Terminal UI

mod app;
mod components;
mod dialogs;
mod progress;
mod styles;

use std::io::{self, Stdout};
use std::process::ExitCode;

use anyhow::{Context, Result};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

pub use app::{App, Outcome};

use crate::cli::{print_failure, InstallArgs};
use crate::config::{self, Config};

pub async fn run(args: InstallArgs, config: Config) -> Result<ExitCode> {
    let data_dir = config::data_dir()
        .map_err(|e| tracing::warn!("No data directory, job logs disabled: {:#}", e))
        .ok();

    // The UI loop and password checks block; keep them off the async workers.
    let outcome = tokio::task::block_in_place(|| {
        let mut terminal = setup_terminal()?;
        let app = App::new(args.path, config, data_dir, args.yes);
        let result = app.run(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    })?;

    Ok(report(outcome))
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e).context("enter alternate screen");
    }
    Terminal::new(CrosstermBackend::new(stdout)).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("leave alternate screen")?;
    terminal.show_cursor().context("show cursor")?;
    Ok(())
}

/// Print the outcome once the terminal is back to normal.
fn report(outcome: Outcome) -> ExitCode {
    match outcome {
        Outcome::Cancelled => {
            println!("Installation cancelled.");
            ExitCode::FAILURE
        }
        Outcome::Rejected(e) => {
            eprintln!("✗ {}", e);
            ExitCode::FAILURE
        }
        Outcome::Finished { job, log_path } => {
            let code = match job.failure() {
                None if job.succeeded() => {
                    println!("✓ {} installed", job.source().display());
                    ExitCode::SUCCESS
                }
                None => {
                    eprintln!("✗ {} did not finish installing", job.source().display());
                    ExitCode::FAILURE
                }
                Some(failure) => {
                    print_failure(failure);
                    ExitCode::FAILURE
                }
            };
            if let Some(path) = log_path {
                println!("Log saved to {}", path.display());
            }
            code
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::install::{FailureKind, InstallJob, JobState};

    fn job_at(states: &[JobState]) -> InstallJob {
        let mut job = InstallJob::new(PathBuf::from("/tmp/app.deb"));
        for state in states {
            job.advance(*state);
        }
        job
    }

    #[test]
    fn test_report_done_job_succeeds() {
        let job = job_at(&[
            JobState::CheckingConverter,
            JobState::Converting,
            JobState::Installing,
            JobState::Done,
        ]);
        let code = report(Outcome::Finished { job, log_path: None });
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn test_report_unfinished_job_fails() {
        let job = job_at(&[JobState::CheckingConverter, JobState::Converting]);
        assert!(job.failure().is_none());
        let code = report(Outcome::Finished { job, log_path: None });
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[test]
    fn test_report_failed_job_fails() {
        let mut job = job_at(&[JobState::CheckingConverter]);
        job.abandon(FailureKind::UserCancelled, "Cancelled by user");
        let code = report(Outcome::Finished { job, log_path: None });
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[test]
    fn test_report_cancelled_fails() {
        assert_eq!(report(Outcome::Cancelled), ExitCode::FAILURE);
    }
}
