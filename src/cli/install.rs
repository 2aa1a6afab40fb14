//! Headless install: progress is printed to stdout as it happens

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;

use anyhow::{anyhow, bail, Context, Result};

use super::{print_failure, InstallArgs};
use crate::config::{self, Config};
use crate::install::{
    self, paths, AbortHandle, ElevatedSession, InstallError, JobEvent, LogSource,
};
use crate::logging::JobLogWriter;

const MAX_PASSWORD_ATTEMPTS: usize = 3;

pub async fn run(args: InstallArgs, config: Config) -> Result<ExitCode> {
    let Some(path) = args.path else {
        bail!("A package path is required with --no-tui");
    };
    let source = paths::validate_input(&path)?;

    if !args.yes && !confirm(&source)? {
        println!("Installation cancelled.");
        return Ok(ExitCode::FAILURE);
    }

    let session = acquire_session()?;
    let data_dir = config::data_dir()?;
    let abort = AbortHandle::new();
    let (rx, worker) = install::spawn_job(
        source,
        config,
        session,
        abort.clone(),
        Some(data_dir.clone()),
    );

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nAborting installation...");
            abort.abort();
        }
    });
    let (log_path, job) = tokio::task::spawn_blocking(move || {
        let log_path = print_events(rx, &data_dir);
        (log_path, worker.join())
    })
    .await
    .context("Output printer panicked")?;
    interrupt.abort();

    if let Some(path) = log_path {
        println!("Log saved to {}", path.display());
    }

    let job = job
        .map_err(|_| anyhow!("Install worker panicked"))?
        .context("Install worker ended without a job")?;
    match job.failure() {
        None if job.succeeded() => Ok(ExitCode::SUCCESS),
        None => {
            eprintln!("✗ {} did not finish installing", job.source().display());
            Ok(ExitCode::FAILURE)
        }
        Some(failure) => {
            println!();
            print_failure(failure);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Print every event until the worker hangs up, mirroring it to a job log
/// file. Returns the log file's path.
fn print_events(rx: mpsc::Receiver<JobEvent>, data_dir: &Path) -> Option<PathBuf> {
    let mut writer: Option<JobLogWriter> = None;

    for event in rx {
        if let JobEvent::Started { source, .. } = &event {
            writer = JobLogWriter::create(data_dir, source, chrono::Local::now())
                .map_err(|e| tracing::warn!("Job log unavailable: {:#}", e))
                .ok();
        }
        if let Some(w) = writer.as_mut() {
            w.write_event(&event);
        }

        if let JobEvent::Log(line) = &event {
            match line.source {
                LogSource::System => println!("{}", line.text),
                LogSource::Process => println!("  {}", line.text),
            }
        }
    }

    writer.map(|w| w.path().to_path_buf())
}

fn confirm(source: &Path) -> Result<bool> {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    print!("Install {}? [Y/n] ", name);
    io::stdout().flush()?;

    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    let response = response.trim().to_lowercase();

    Ok(response.is_empty() || response == "y" || response == "yes")
}

fn acquire_session() -> Result<ElevatedSession> {
    if let Some(session) = ElevatedSession::without_prompt() {
        return Ok(session);
    }

    println!("Administrator privileges are required to install packages.");
    let mut attempt = 1;
    loop {
        let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;
        match ElevatedSession::acquire(password) {
            Ok(session) => {
                println!("✓ Administrator access confirmed");
                return Ok(session);
            }
            Err(e) if e.is_retryable() && attempt < MAX_PASSWORD_ATTEMPTS => {
                eprintln!("✗ {}. Please try again.", e);
                attempt += 1;
            }
            Err(e) => return Err(InstallError::from(e).into()),
        }
    }
}
