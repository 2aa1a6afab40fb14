//! Command-line interface

pub mod check;
pub mod completions;
pub mod install;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::install::JobFailure;

#[derive(Parser)]
#[command(
    name = "deb-install",
    version,
    about = "Convert a .deb package with debtap and install it with pacman",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub install: InstallArgs,

    /// Read configuration from FILE instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct InstallArgs {
    /// Path to the .deb package; a file picker opens when omitted
    pub path: Option<PathBuf>,

    /// Print progress to stdout instead of opening the terminal UI
    #[arg(long)]
    pub no_tui: bool,

    /// Install without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Keep the temporary working directory after the job ends
    #[arg(long)]
    pub keep_workdir: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report whether the converter, an AUR helper and the package manager are available
    Check(check::CheckArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Load the configuration from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Print a failed job's message and the last lines of command output.
pub fn print_failure(failure: &JobFailure) {
    eprintln!("✗ {}", failure.message);
    if !failure.tail.is_empty() {
        eprintln!();
        eprintln!("Last output:");
        for line in &failure.tail {
            eprintln!("  {}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_positional_path() {
        let cli = Cli::try_parse_from(["deb-install", "/tmp/app.deb", "--no-tui", "-y"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.install.path, Some(PathBuf::from("/tmp/app.deb")));
        assert!(cli.install.no_tui);
        assert!(cli.install.yes);
    }

    #[test]
    fn test_parse_no_arguments() {
        let cli = Cli::try_parse_from(["deb-install"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.install.path, None);
    }

    #[test]
    fn test_parse_check_subcommand() {
        let cli = Cli::try_parse_from(["deb-install", "check", "--json"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Check(_))));
    }

    #[test]
    fn test_rejects_two_paths() {
        assert!(Cli::try_parse_from(["deb-install", "a.deb", "b.deb"]).is_err());
    }
}
