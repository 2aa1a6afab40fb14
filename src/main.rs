use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use deb_installer::cli::{self, Commands};
use deb_installer::{config, logging, tui, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("✗ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    if let Ok(data_dir) = config::data_dir() {
        if let Err(e) = logging::init_tracing(&data_dir) {
            eprintln!("Warning: debug logging disabled: {:#}", e);
        }
    }

    let mut config = cli::load_config(cli.config.as_deref())?;
    tracing::debug!(?config, "Loaded configuration");

    match cli.command {
        Some(Commands::Check(args)) => cli::check::run(args, config).await,
        Some(Commands::Completions(args)) => {
            cli::completions::run(args)?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            let args = cli.install;
            config.keep_workdir |= args.keep_workdir;
            if args.no_tui {
                cli::install::run(args, config).await
            } else {
                tui::run(args, config).await
            }
        }
    }
}
