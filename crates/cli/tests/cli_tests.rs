//! CLI integration tests

use std::process::Command;

fn covtype(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "covtype-cli", "--"])
        .args(args)
        .env_remove("COVTYPE_API_URL")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = covtype(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Cover Type"), "Should show app name");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("options"), "Should show options command");
    assert!(stdout.contains("health"), "Should show health command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = covtype(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("covtype"), "Should show binary name");
}

#[test]
fn test_predict_help() {
    let output = covtype(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict help should succeed");
    assert!(stdout.contains("--option"), "Should show option flag");
    assert!(stdout.contains("--input"), "Should show input flag");
    assert!(stdout.contains("--input-file"), "Should show input file flag");
}

#[test]
fn test_format_option() {
    let output = covtype(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("--api-url"), "Should show api-url option");
}

#[test]
fn test_invalid_command() {
    let output = covtype(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");
}

#[test]
fn test_predict_without_input_fails_before_request() {
    let output = covtype(&["--api-url", "http://127.0.0.1:9", "predict", "--option", "1"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Missing input should fail");
    assert!(stderr.contains("feature vector is required"), "{}", stderr);
}

#[test]
fn test_input_and_input_file_conflict() {
    let output = covtype(&[
        "predict",
        "--option",
        "1",
        "--input",
        "1,2,3",
        "--input-file",
        "features.csv",
    ]);
    assert!(!output.status.success(), "Conflicting inputs should fail");
}

#[test]
fn test_invalid_api_url() {
    let output = covtype(&["--api-url", "not a url", "options"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Invalid URL should fail");
    assert!(stderr.contains("Invalid API URL"), "{}", stderr);
}
