use std::fs;

use serial_test::serial;

use crate::harness::{stderr, CliHarness};

#[test]
#[serial]
fn test_missing_package_is_invalid_input() {
    let h = CliHarness::new("missing_pkg");
    let missing = h.root().join("nope_1.0_amd64.deb");

    let output = h.run_cli(&[missing.to_str().unwrap(), "--no-tui", "--yes"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("Invalid input"), "{}", err);
    assert!(err.contains("does not exist"), "{}", err);
}

#[test]
#[serial]
fn test_wrong_extension_is_invalid_input() {
    let h = CliHarness::new("wrong_ext");
    let rpm = h.write_file("app.rpm", "x");

    let output = h.run_cli(&[rpm.to_str().unwrap(), "--no-tui", "--yes"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("is not a .deb package"), "{}", err);
}

#[test]
#[serial]
fn test_invalid_input_leaves_no_job_traces() {
    let h = CliHarness::new("no_traces");
    let dir = h.root().join("pkg.deb");
    fs::create_dir(&dir).unwrap();

    let output = h.run_cli(&[dir.to_str().unwrap(), "--no-tui", "--yes"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("not a regular file"));
    assert!(!h.data_dir().join("logs").exists());
    assert!(!h.data_dir().join("install.lock").exists());
}

#[test]
#[serial]
fn test_no_tui_requires_path() {
    let h = CliHarness::new("no_path");
    let output = h.run_cli(&["--no-tui"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("A package path is required"));
}

#[test]
#[serial]
fn test_invalid_config_is_reported() {
    let h = CliHarness::new("bad_config");
    fs::write(h.config_dir().join("config.toml"), "unknown_key = 1\n").unwrap();

    let output = h.run_cli(&["check"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid config"), "{}", stderr(&output));
}
