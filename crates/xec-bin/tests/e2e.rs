//! End-to-end tests for the `xec` binary: local dispatch, environment and
//! cwd overrides, timeout, retry, and the JSON output mode. SSH/Docker
//! subcommands need a live backend and aren't exercised here.

use std::process::Command;

fn xec_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_xec"))
}

#[test]
fn run_echoes_stdout_from_argv() {
    let output = xec_cmd()
        .args(["run", "--", "echo", "hello from xec"])
        .output()
        .expect("failed to run xec");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello from xec\n");
}

#[test]
fn nonzero_exit_propagates_as_process_exit_code() {
    let output = xec_cmd()
        .args(["run", "--", "sh", "-c", "exit 7"])
        .output()
        .expect("failed to run xec");
    assert_eq!(output.status.code(), Some(7));
}

#[test]
fn nothrow_still_reports_the_exit_code_without_erroring() {
    let output = xec_cmd()
        .args(["--nothrow", "run", "--", "sh", "-c", "exit 3"])
        .output()
        .expect("failed to run xec");
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn env_flag_is_visible_to_the_dispatched_command() {
    let output = xec_cmd()
        .args([
            "--env",
            "XEC_E2E_VAR=present",
            "run",
            "--",
            "sh",
            "-c",
            "echo $XEC_E2E_VAR",
        ])
        .output()
        .expect("failed to run xec");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "present\n");
}

#[test]
fn cd_flag_changes_the_working_directory() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let output = xec_cmd()
        .args(["--cd", tmp.path().to_str().unwrap(), "run", "--", "pwd"])
        .output()
        .expect("failed to run xec");
    assert!(output.status.success());
    let printed = String::from_utf8_lossy(&output.stdout);
    assert_eq!(printed.trim(), tmp.path().canonicalize().unwrap().to_str().unwrap());
}

#[test]
fn timeout_kills_a_long_running_command() {
    let output = xec_cmd()
        .args(["--timeout", "1", "run", "--", "sleep", "5"])
        .output()
        .expect("failed to run xec");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).to_lowercase().contains("timed out"));
}

#[test]
fn json_flag_emits_a_parseable_exec_result() {
    let output = xec_cmd()
        .args(["--json", "run", "--", "echo", "structured"])
        .output()
        .expect("failed to run xec");
    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON");
    assert_eq!(value["adapter_name"], "local");
}

#[test]
fn which_resolves_a_program_on_path() {
    let output = xec_cmd().args(["which", "sh"]).output().expect("failed to run xec");
    assert!(output.status.success());
    assert!(!String::from_utf8_lossy(&output.stdout).trim().is_empty());
}

#[test]
fn which_reports_failure_for_a_nonexistent_program() {
    let status = xec_cmd()
        .args(["which", "definitely-not-a-real-program-xyz"])
        .status()
        .expect("failed to run xec");
    assert!(!status.success());
}

#[test]
fn cli_help_displays_correctly() {
    let output = xec_cmd().arg("--help").output().expect("failed to run xec --help");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("run"));
    assert!(stdout.contains("ssh"));
    assert!(stdout.contains("docker"));
    assert!(stdout.contains("which"));
}
