//! Integration tests for the `scopelink` binary entry point.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn simulator_backend_answers_without_servers() {
    let mut command = cargo_bin_cmd!("scopelink");
    command.args(["--backend", "simulator", "AS", "get_status"]);
    command
        .assert()
        .success()
        .stdout(contains("Microscope is Offline"));
}

#[test]
fn missing_command_exits_with_failure() {
    let mut command = cargo_bin_cmd!("scopelink");
    command.args(["--backend", "simulator", "AS"]);
    command
        .assert()
        .failure()
        .stderr(contains("command name must be provided"));
}

#[test]
fn unknown_commands_are_reported_on_stderr() {
    let mut command = cargo_bin_cmd!("scopelink");
    command.args(["--backend=simulator", "Ceos", "polish_lens"]);
    command
        .assert()
        .failure()
        .stderr(contains("unknown_command"));
}
