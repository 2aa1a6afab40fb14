//! Process utilities: PATH lookup, privilege checks, process group signalling

use std::ffi::OsStr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use nix::sys::signal::{killpg, Signal};
use nix::unistd::{geteuid, Pid};

/// Whether this process already has root privileges.
pub fn is_root() -> bool {
    geteuid().is_root()
}

/// Resolve `program` the way a shell would, against the given `PATH` value.
///
/// Names containing a `/` are checked directly instead of searched.
pub fn find_in_path(program: &str, path_var: Option<&OsStr>) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }

    if program.contains('/') {
        let candidate = PathBuf::from(program);
        return is_executable(&candidate).then_some(candidate);
    }

    let path_var = path_var?;
    std::env::split_paths(path_var)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

/// Resolve `program` against this process's `PATH`.
pub fn which(program: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH");
    find_in_path(program, path_var.as_deref())
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Ask every process in the group to exit.
pub fn terminate_group(pgid: u32) -> nix::Result<()> {
    signal_group(pgid, Signal::SIGTERM)
}

/// Kill every process in the group.
pub fn kill_group(pgid: u32) -> nix::Result<()> {
    signal_group(pgid, Signal::SIGKILL)
}

fn signal_group(pgid: u32, signal: Signal) -> nix::Result<()> {
    let pgid = i32::try_from(pgid).map_err(|_| nix::errno::Errno::EINVAL)?;
    if pgid <= 1 {
        return Err(nix::errno::Errno::EINVAL);
    }
    killpg(Pid::from_raw(pgid), signal)
}
