//! deb-installer - convert `.deb` packages with debtap and install them with pacman

pub mod cli;
pub mod config;
pub mod install;
pub mod logging;
pub mod process;
pub mod tui;

pub use cli::Cli;
