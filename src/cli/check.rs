//! `deb-install check` command implementation

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::config::Config;
use crate::process;

#[derive(Args)]
pub struct CheckArgs {
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub path: Option<PathBuf>,
}

impl ToolStatus {
    fn locate(name: &str, resolve: &impl Fn(&str) -> Option<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: resolve(name),
        }
    }

    pub fn found(&self) -> bool {
        self.path.is_some()
    }
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub converter: ToolStatus,
    pub aur_helpers: Vec<ToolStatus>,
    pub package_manager: ToolStatus,
    pub sudo: ToolStatus,
    pub running_as_root: bool,
}

impl Report {
    pub fn build(config: &Config, resolve: impl Fn(&str) -> Option<PathBuf>) -> Self {
        Self {
            converter: ToolStatus::locate(&config.converter, &resolve),
            aur_helpers: config
                .aur_helpers
                .iter()
                .map(|h| ToolStatus::locate(&h.name, &resolve))
                .collect(),
            package_manager: ToolStatus::locate(&config.package_manager, &resolve),
            sudo: ToolStatus::locate("sudo", &resolve),
            running_as_root: process::is_root(),
        }
    }

    /// The helper a job would use if the converter is missing.
    pub fn selected_helper(&self) -> Option<&ToolStatus> {
        self.aur_helpers.iter().find(|h| h.found())
    }

    /// Whether a job could get past the converter check and run the install.
    pub fn ready(&self) -> bool {
        let can_convert = self.converter.found() || self.selected_helper().is_some();
        let can_elevate = self.running_as_root || self.sudo.found();
        can_convert && self.package_manager.found() && can_elevate
    }
}

pub async fn run(args: CheckArgs, config: Config) -> Result<ExitCode> {
    let report = Report::build(&config, process::which);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(if report.ready() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_report(report: &Report) {
    print_tool("Converter", &report.converter);
    print_tool("Package manager", &report.package_manager);
    if report.running_as_root {
        println!("✓ Privileges: running as root");
    } else {
        print_tool("Privileges", &report.sudo);
    }

    println!();
    println!("AUR helpers (first found is used):");
    for helper in &report.aur_helpers {
        if helper.found() {
            println!("   ✓ {} - available", helper.name);
        } else {
            println!("   ✗ {} - not found", helper.name);
        }
    }

    println!();
    if report.ready() {
        println!("✓ Ready to install packages");
    } else if !report.converter.found() && report.selected_helper().is_none() {
        println!(
            "✗ Install {} manually: yay -S {} && sudo {} -u",
            report.converter.name, report.converter.name, report.converter.name
        );
    } else {
        println!("✗ Not ready to install packages");
    }
}

fn print_tool(label: &str, tool: &ToolStatus) {
    match &tool.path {
        Some(path) => println!("✓ {}: {} ({})", label, tool.name, path.display()),
        None => println!("✗ {}: {} not found", label, tool.name),
    }
}
