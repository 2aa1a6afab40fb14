use serial_test::serial;

use crate::harness::{stderr, stdout, CliHarness};

#[test]
#[serial]
fn test_check_json_reports_tools() {
    let h = CliHarness::new("check_json");
    for tool in ["debtap", "pacman", "sudo", "paru"] {
        h.install_tool(tool);
    }

    let output = h.run_cli(&["check", "--json"]);
    assert!(output.status.success(), "check failed: {}", stderr(&output));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let bin = h.root().join("bin");
    assert_eq!(
        report["converter"]["path"],
        bin.join("debtap").to_string_lossy().as_ref()
    );
    let helpers: Vec<(String, bool)> = report["aur_helpers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            (
                h["name"].as_str().unwrap().to_string(),
                !h["path"].is_null(),
            )
        })
        .collect();
    assert_eq!(
        helpers,
        [
            ("yay".to_string(), false),
            ("paru".to_string(), true),
            ("pamac".to_string(), false)
        ]
    );
}

#[test]
#[serial]
fn test_check_without_converter_or_helper_fails() {
    let h = CliHarness::new("check_missing");
    h.install_tool("pacman");
    h.install_tool("sudo");

    let output = h.run_cli(&["check"]);
    assert!(!output.status.success());
    let out = stdout(&output);
    assert!(out.contains("✗ Converter: debtap not found"), "{}", out);
    assert!(out.contains("Install debtap manually"), "{}", out);
}

#[test]
#[serial]
fn test_check_uses_config_file() {
    let h = CliHarness::new("check_config");
    h.install_tool("my-debtap");
    h.install_tool("pacman");
    h.install_tool("sudo");
    let config = h.write_file("custom.toml", "converter = \"my-debtap\"\n");

    let output = h.run_cli(&["check", "--config", config.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stdout(&output));
    assert!(stdout(&output).contains("my-debtap"));
}

#[test]
#[serial]
fn test_completions() {
    let h = CliHarness::new("completions");
    let output = h.run_cli(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("deb-install"));
}

#[test]
#[serial]
fn test_help_lists_install_options() {
    let h = CliHarness::new("help");
    let output = h.run_cli(&["--help"]);
    assert!(output.status.success());
    let out = stdout(&output);
    for flag in ["--no-tui", "--yes", "--keep-workdir", "--config", "check"] {
        assert!(out.contains(flag), "help should mention {}:\n{}", flag, out);
    }
}
