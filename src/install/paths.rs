//! Input validation and artifact naming

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::error::{InstallError, Result};

pub const DEB_EXTENSION: &str = "deb";

/// Suffixes accepted when the converter names its output differently from
/// the input file.
const ARTIFACT_SUFFIXES: [&str; 2] = [".pkg.tar.zst", ".pkg.tar.xz"];

/// Check that `path` names an existing regular file with a `.deb` extension.
pub fn validate_input(path: &Path) -> Result<PathBuf> {
    let has_deb_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(DEB_EXTENSION));
    if !has_deb_extension {
        return Err(InstallError::InvalidInput(format!(
            "{} is not a .deb package",
            path.display()
        )));
    }

    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(path.to_path_buf()),
        Ok(_) => Err(InstallError::InvalidInput(format!(
            "{} is not a regular file",
            path.display()
        ))),
        Err(_) => Err(InstallError::InvalidInput(format!(
            "{} does not exist",
            path.display()
        ))),
    }
}

/// The file name the converter is expected to produce for `deb`: same base
/// name, `extension` substituted.
pub fn artifact_name(deb: &Path, extension: &str) -> Option<String> {
    let stem = deb.file_stem()?.to_str()?;
    let extension = extension.trim_start_matches('.');
    Some(format!("{}.{}", stem, extension))
}

/// Package name handed to the converter's prompt: the file stem up to the
/// first `_` (Debian files are named `name_version_arch.deb`).
pub fn package_name(deb: &Path) -> String {
    let stem = deb
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    match stem.split_once('_') {
        Some((name, _)) if !name.is_empty() => name.to_string(),
        _ => stem,
    }
}

/// Locate the converted package in `dir`. Prefers `expected`, then the first
/// package archive by name.
pub fn find_artifact(dir: &Path, expected: &str) -> io::Result<Option<PathBuf>> {
    let exact = dir.join(expected);
    if exact.is_file() {
        return Ok(Some(exact));
    }

    let mut candidates: Vec<PathBuf> = list_dir(dir)?
        .into_iter()
        .filter(|name| ARTIFACT_SUFFIXES.iter().any(|s| name.ends_with(s)))
        .map(|name| dir.join(name))
        .filter(|p| p.is_file())
        .collect();
    candidates.sort();
    Ok(candidates.into_iter().next())
}

/// File names in `dir`, sorted.
pub fn list_dir(dir: &Path) -> io::Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .flatten()
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    Ok(names)
}

pub fn size_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

/// Rough duration of a whole job for a package of `bytes`, in seconds.
pub fn estimate_seconds(bytes: u64) -> u64 {
    let mb = size_mb(bytes);
    let conversion = (mb * 2.0).max(10.0) as u64;
    let install = (mb * 0.5).max(5.0) as u64;
    conversion + install + 5
}
