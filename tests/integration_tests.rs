// tests/integration_tests.rs
//
// End-to-end tests of the CLI binary: parse/run/report flow, JSON output,
// and exit codes for parse failures and the watchdog.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_program(source: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(source.as_bytes()).expect("write program");
    file
}

#[test]
fn test_run_reports_final_state() {
    let program = write_program("LOAD R1, 0(R0)\nADD R2, R1, R1\n");

    let mut cmd = Command::cargo_bin("tomasulo_rust").expect("binary builds");
    cmd.arg("run")
        .arg("--input")
        .arg(program.path())
        .arg("--init-mem")
        .arg("0=7")
        .assert()
        .success()
        .stdout(predicate::str::contains("TIMING TABLE"))
        .stdout(predicate::str::contains("R1 = 7"))
        .stdout(predicate::str::contains("R2 = 14"));
}

#[test]
fn test_run_with_register_seed() {
    let program = write_program("STORE R3, 4(R0)\n");

    let mut cmd = Command::cargo_bin("tomasulo_rust").expect("binary builds");
    cmd.arg("run")
        .arg("--input")
        .arg(program.path())
        .arg("--init-reg")
        .arg("R3=50")
        .assert()
        .success()
        .stdout(predicate::str::contains("[    4] = 50"));
}

#[test]
fn test_json_snapshot_output() {
    let program = write_program("ADD R1, R0, R0\n");

    let mut cmd = Command::cargo_bin("tomasulo_rust").expect("binary builds");
    let output = cmd
        .arg("run")
        .arg("--input")
        .arg(program.path())
        .arg("--json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let snapshot: serde_json::Value =
        serde_json::from_slice(&output).expect("stdout is valid JSON");
    assert_eq!(snapshot["is_complete"], serde_json::Value::Bool(true));
    assert!(snapshot["timing"].is_object());
}

#[test]
fn test_parse_failure_exits_nonzero() {
    let program = write_program("FROB R1, R2\n");

    let mut cmd = Command::cargo_bin("tomasulo_rust").expect("binary builds");
    cmd.arg("run")
        .arg("--input")
        .arg(program.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Parse error"));
}

#[test]
fn test_watchdog_exits_nonzero() {
    let program = write_program("L: BEQ R0, R0, L\n");

    let mut cmd = Command::cargo_bin("tomasulo_rust").expect("binary builds");
    cmd.arg("run")
        .arg("--input")
        .arg(program.path())
        .arg("--max-cycles")
        .arg("40")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Watchdog exceeded"));
}

#[test]
fn test_trace_prints_cycles() {
    let program = write_program("ADD R1, R0, R0\n");

    let mut cmd = Command::cargo_bin("tomasulo_rust").expect("binary builds");
    cmd.arg("trace")
        .arg("--input")
        .arg(program.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Cycle"));
}

#[test]
fn test_missing_input_fails() {
    let mut cmd = Command::cargo_bin("tomasulo_rust").expect("binary builds");
    cmd.arg("run")
        .arg("--input")
        .arg("no_such_file.s")
        .assert()
        .failure();
}
