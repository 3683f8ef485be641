//! CLI integration tests
//!
//! These tests verify the CLI commands work correctly by running the binary.

#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::Command;

use tempfile::TempDir;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_xsd2jsonschema"))
}

fn fixtures_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path
}

fn fixture(name: &str) -> String {
    fixtures_dir().join(name).to_string_lossy().to_string()
}

// ============================================================================
// Convert Command Tests
// ============================================================================

#[test]
fn test_cli_convert_to_stdout() {
    let output = bin()
        .args(["convert", &fixture("order.xsd")])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "convert should succeed");
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
    assert_eq!(json["$schema"], "http://json-schema.org/draft-07/schema#");
    assert!(json["definitions"]["Customer"].is_object());
}

#[test]
fn test_cli_convert_to_file_with_options() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("order.schema.json");

    let output = bin()
        .args([
            "convert",
            &fixture("order.xsd"),
            "--draft",
            "2020-12",
            "--root",
            "order",
            "--compact",
            "-o",
            out.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "convert -o should succeed");
    assert!(output.stdout.is_empty(), "nothing should be written to stdout");

    let text = std::fs::read_to_string(&out).unwrap();
    assert_eq!(text.lines().count(), 1, "compact output is one line");
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["$schema"], "https://json-schema.org/draft/2020-12/schema");
    assert_eq!(json["required"], serde_json::json!(["order"]));
}

#[test]
fn test_cli_convert_with_config_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("options.json");
    std::fs::write(&config, r#"{"draft": "2020-12", "title": "Orders"}"#).unwrap();

    let output = bin()
        .args([
            "convert",
            &fixture("order.xsd"),
            "--config",
            config.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["title"], "Orders");
    assert!(json["$defs"].is_object());
}

#[test]
fn test_cli_convert_reports_errors() {
    let output = bin()
        .args(["convert", &fixture("unresolved.xsd")])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "unresolved reference should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"), "should print an error");
    assert!(stderr.contains("Foo"), "should name the missing type");
}

#[test]
fn test_cli_rejects_unknown_draft() {
    let output = bin()
        .args(["convert", &fixture("order.xsd"), "--draft", "4"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
}

// ============================================================================
// Inspect Command Tests
// ============================================================================

#[test]
fn test_cli_inspect_summary() {
    let output = bin()
        .args(["inspect", &fixture("order.xsd")])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "inspect should succeed");
    assert!(stdout.contains("xsd2jsonschema"), "should show version");
    assert!(stdout.contains("address.xsd"), "should list imported documents");
    assert!(stdout.contains("type: 6"), "should count types");
}

#[test]
fn test_cli_inspect_json_output() {
    let output = bin()
        .args(["inspect", "--json", &fixture("order.xsd")])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "inspect --json should succeed");
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
    assert_eq!(json["documents"].as_array().unwrap().len(), 3);
    assert_eq!(json["declarations"]["element"], 2);
    assert_eq!(json["declarations"]["type"], 6);
}
