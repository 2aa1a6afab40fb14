//! User configuration loaded from `config.toml`

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const APP_DIR_NAME: &str = "deb-installer";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Overrides the directory `config.toml` is read from.
pub const CONFIG_DIR_ENV: &str = "DEB_INSTALLER_CONFIG_DIR";
/// Overrides the directory job logs, the debug log and the lock file live in.
pub const DATA_DIR_ENV: &str = "DEB_INSTALLER_DATA_DIR";

/// An AUR helper candidate. The converter package name is appended to `args`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AurHelper {
    pub name: String,
    pub args: Vec<String>,
}

impl AurHelper {
    fn new(name: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Converter binary, also the AUR package name installed when it is missing.
    pub converter: String,
    /// Tried in order; the first one found on `PATH` wins.
    pub aur_helpers: Vec<AurHelper>,
    pub package_manager: String,
    /// The artifact path is appended to these.
    pub package_manager_args: Vec<String>,
    /// Extension of the package the converter produces, without the leading dot.
    pub artifact_extension: String,
    pub conversion_timeout_secs: u64,
    pub keep_workdir: bool,
    /// Run `<converter> -u` after installing the converter.
    pub update_converter_database: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            converter: "debtap".to_string(),
            aur_helpers: vec![
                AurHelper::new("yay", &["-S", "--noconfirm"]),
                AurHelper::new("paru", &["-S", "--noconfirm"]),
                AurHelper::new("pamac", &["install", "--no-confirm"]),
            ],
            package_manager: "pacman".to_string(),
            package_manager_args: vec![
                "-U".to_string(),
                "--noconfirm".to_string(),
                "--needed".to_string(),
            ],
            artifact_extension: "pkg.tar.zst".to_string(),
            conversion_timeout_secs: 300,
            keep_workdir: false,
            update_converter_database: true,
        }
    }
}

impl Config {
    /// Load `config.toml` from the config directory, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self> {
        let path = config_dir()?.join(CONFIG_FILE_NAME);
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

/// Directory holding `config.toml`.
pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let base = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Cannot find config directory"))?;
    Ok(base.join(APP_DIR_NAME))
}

/// Directory for job logs, the debug log and the job lock.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let base =
        dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("Cannot find data directory"))?;
    Ok(base.join(APP_DIR_NAME))
}
