//! The `cringe` binary end to end.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn cringe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cringe"))
        .args(args)
        .env_remove("CRINGE_LOG")
        .output()
        .unwrap()
}

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_run_prints_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "add.i",
        "DO .1 <- #3\nDO .2 <- #4\nPLEASE DO (1000) NEXT\nDO READ OUT .3\nDO GIVE UP\n",
    );
    let output = cringe(&["run", "-b", path.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "7\n");
}

#[test]
fn test_files_are_joined() {
    let dir = tempfile::tempdir().unwrap();
    let main = write(dir.path(), "main.i", "DO (5) NEXT\nDO GIVE UP\n");
    let lib = write(dir.path(), "lib.i", "(5) PLEASE READ OUT #9\nDO RESUME #1\n");
    let output = cringe(&[
        "run",
        "--no-bugs",
        main.to_str().unwrap(),
        lib.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "9\n");
}

#[test]
fn test_structural_fault_exit_status() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "rude.i", &"DO GIVE UP\n".repeat(5));
    let output = cringe(&["run", "-b", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("E079 PROGRAMMER IS INSUFFICIENTLY POLITE"), "{}", err);
    assert!(err.contains("CORRECT SOURCE AND RESUBMIT"));
}

#[test]
fn test_runtime_fault_exit_status() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "edge.i", "PLEASE DO .1 <- #1\n");
    let output = cringe(&["run", "-b", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("E633"));
    assert!(!stderr(&output).contains("RESUBMIT"));
}

#[test]
fn test_wrong_extension_and_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "prog.c", "DO GIVE UP\n");
    let output = cringe(&["run", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("E998"));

    let output = cringe(&["run"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("E777"));
}

#[test]
fn test_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(dir.path(), "cringe.toml", "random_bugs = false\nsyslib = false\n");
    let path = write(dir.path(), "lost.i", "PLEASE DO (1000) NEXT\nDO GIVE UP\n");
    let output = cringe(&[
        "run",
        "--config",
        config.to_str().unwrap(),
        path.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("E129"));
}

#[test]
fn test_check_reports_per_file_lines() {
    let dir = tempfile::tempdir().unwrap();
    let main = write(dir.path(), "main.i", "PLEASE DO (5) NEXT\nDO GIVE UP\n");
    let other = write(dir.path(), "other.i", "DO ,1 <- #0\nDO ABSTAIN FROM (8)\n");
    let output = cringe(&["check", main.to_str().unwrap(), other.to_str().unwrap()]);
    let out = stdout(&output);
    assert!(
        out.contains("main.i:1: warning[E129]"),
        "unexpected output: {}",
        out
    );
    assert!(out.contains("other.i:1: warning[W239]"));
    assert!(out.contains("other.i:2: warning[E139]"));
    // Warnings alone do not fail the check
    assert!(output.status.success());

    let output = cringe(&[
        "check",
        "--deny-warnings",
        main.to_str().unwrap(),
        other.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_completions() {
    let output = cringe(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("cringe"));
}
