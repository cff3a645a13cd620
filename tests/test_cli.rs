// CLI integration tests for project-service

use std::fs;
use std::process::Command;

#[test]
fn test_help_flag_shows_help_message() {
    let output = Command::new(env!("CARGO_BIN_EXE_project-service"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Help should exit with success");
    assert!(
        stdout.contains("inspect"),
        "Help should list the inspect subcommand. Got: {}",
        stdout
    );
}

#[test]
fn test_inspect_prints_projects() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "import \"b.txt\"\n").unwrap();
    fs::write(dir.path().join("b.txt"), "").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_project-service"))
        .arg("--base-dir")
        .arg(dir.path())
        .args(["inspect", "a.txt", "b.txt"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Inspect should succeed: {:?}", output);
    assert!(stdout.contains("(inferred)"), "Got: {}", stdout);
    assert!(stdout.contains("open files: 2"), "Got: {}", stdout);
    assert!(stdout.contains("ref  "), "Got: {}", stdout);
}

#[test]
fn test_inspect_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_project-service"))
        .arg("--base-dir")
        .arg(dir.path())
        .args(["inspect", "missing.txt"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Document not found"), "Got: {}", stderr);
}
