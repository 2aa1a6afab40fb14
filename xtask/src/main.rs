use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask", about = "Development tasks for deb-installer")]
struct Xtask {
    #[command(subcommand)]
    command: Task,
}

#[derive(Subcommand)]
enum Task {
    /// Regenerate the command-line reference
    GenDocs {
        /// Output file, relative to the workspace root
        #[arg(long, default_value = "docs/cli.md")]
        out: PathBuf,
    },
}

fn main() -> io::Result<()> {
    match Xtask::parse().command {
        Task::GenDocs { out } => gen_docs(&out),
    }
}

fn gen_docs(out: &Path) -> io::Result<()> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap_or_else(|| Path::new("."));
    let path = root.join(out);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let markdown = clap_markdown::help_markdown::<deb_installer::Cli>();
    fs::write(&path, markdown)?;
    println!("Wrote {}", path.display());
    Ok(())
}
