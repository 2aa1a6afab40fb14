use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

pub struct CliHarness {
    temp: TempDir,
}

impl CliHarness {
    pub fn new(name: &str) -> Self {
        let temp = tempfile::Builder::new()
            .prefix(&format!("deb-install-e2e-{}-", name))
            .tempdir()
            .unwrap();
        for dir in ["home", "config", "data", "bin"] {
            fs::create_dir_all(temp.path().join(dir)).unwrap();
        }
        Self { temp }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root().join("config")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root().join("data")
    }

    /// Put an executable named `name` on the binary's `PATH`.
    pub fn install_tool(&self, name: &str) {
        let path = self.root().join("bin").join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn run_cli(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_deb-install"))
            .args(args)
            .env_clear()
            .env("HOME", self.root().join("home"))
            .env("PATH", self.root().join("bin"))
            .env("DEB_INSTALLER_CONFIG_DIR", self.config_dir())
            .env("DEB_INSTALLER_DATA_DIR", self.data_dir())
            .stdin(Stdio::null())
            .output()
            .expect("failed to run deb-install")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
