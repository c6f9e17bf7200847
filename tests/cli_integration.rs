//! Integration tests for the `reduce` CLI binary.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn reduce_cmd() -> Command {
    Command::cargo_bin("reduce").unwrap()
}

#[test]
fn cli_help_command() {
    let mut cmd = reduce_cmd();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Reduce a sourcekitd/Swift front-end crash"))
        .stdout(predicate::str::contains("--request"))
        .stdout(predicate::str::contains("--frontend-arg"))
        .stdout(predicate::str::contains("--source"));
}

#[test]
fn missing_request_and_frontend_arg_fails() {
    let mut cmd = reduce_cmd();

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("either --request or at least one --frontend-arg is required"));
}

#[test]
fn request_and_frontend_arg_are_mutually_exclusive() {
    let temp_dir = tempdir().unwrap();
    let request_path = temp_dir.path().join("req.yml");
    std::fs::write(&request_path, "key.sourcefile: \"/a.swift\"\n").unwrap();

    let mut cmd = reduce_cmd();
    cmd.args([
        "--request",
        request_path.to_str().unwrap(),
        "--frontend-arg",
        "-c",
    ]);

    cmd.assert().failure();
}

#[test]
fn nonexistent_request_file_fails() {
    let mut cmd = reduce_cmd();
    cmd.args(["--request", "/nonexistent/req.yml", "--swift-frontend", "/bin/sh"]);

    cmd.assert().failure();
}

/// Writes a fixed-output subject script that always reports the failure of interest
/// regardless of the arguments it's invoked with, so the full reduction pipeline runs
/// to completion deterministically against a real child process.
fn write_always_reproduces_subject(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("subject.sh");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "#!/bin/sh").unwrap();
    writeln!(file, "printf 'CRASHMARKER'").unwrap();
    writeln!(file, "exit 0").unwrap();
    drop(file);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    path
}

#[test]
fn full_frontend_reduction_against_a_fixed_output_subject() {
    let temp_dir = tempdir().unwrap();
    let subject = write_always_reproduces_subject(temp_dir.path());

    let config_path = temp_dir.path().join("oracle.json");
    std::fs::write(
        &config_path,
        format!(
            r#"{{"sourcekitd_helper":null,"sourcekitd":null,"swift_frontend":"{}","plugin_paths":null,"predicate":{{"Contains":{{"field":"Stdout","value":"CRASHMARKER"}}}},"scratch_root":"{}"}}"#,
            subject.to_str().unwrap(),
            temp_dir.path().to_str().unwrap(),
        ),
    )
    .unwrap();

    let output_source = temp_dir.path().join("reduced.swift");
    let output_request = temp_dir.path().join("reduced-request.txt");

    let mut cmd = reduce_cmd();
    cmd.args([
        "--frontend-arg",
        "-c",
        "--frontend-arg",
        "-sdk",
        "--frontend-arg",
        "/fake/sdk",
        "--config",
        config_path.to_str().unwrap(),
        "--output-source",
        output_source.to_str().unwrap(),
        "--output-request",
        output_request.to_str().unwrap(),
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("reduced source written to"))
        .stdout(predicate::str::contains("reduced request written to"));

    assert!(output_source.exists());
    assert!(output_request.exists());
}
