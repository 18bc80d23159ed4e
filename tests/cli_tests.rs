//! Binary tests for the sheetsmith command line

#![cfg(not(coverage))]
#![allow(deprecated)] // Command::cargo_bin deprecation - no stable replacement yet

mod common;

use assert_cmd::Command;
use common::people_workbook;
use predicates::prelude::*;
use sheetsmith::excel::ExcelReader;
use sheetsmith::types::SheetSelector;
use tempfile::TempDir;

fn sheetsmith() -> Command {
    let mut cmd = Command::cargo_bin("sheetsmith").unwrap();
    cmd.env_remove("SHEETSMITH_CONFIG").env_remove("SHEETSMITH_LOG");
    cmd
}

// ═══════════════════════════════════════════════════════════════════════════
// SHEETS / READ
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_help() {
    sheetsmith()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("convert"));
}

#[test]
fn test_sheets_lists_names() {
    let dir = TempDir::new().unwrap();
    let path = people_workbook(dir.path());

    sheetsmith()
        .arg("sheets")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("People"));
}

#[test]
fn test_read_prints_json_records() {
    let dir = TempDir::new().unwrap();
    let path = people_workbook(dir.path());

    let output = sheetsmith()
        .args(["read", "--sheet", "People"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records[0]["Name"], "Alice");
    assert_eq!(records[1]["Age"], 25.0);
}

#[test]
fn test_read_missing_file_fails() {
    let dir = TempDir::new().unwrap();

    sheetsmith()
        .arg("read")
        .arg(dir.path().join("missing.xlsx"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_read_missing_required_column_fails() {
    let dir = TempDir::new().unwrap();
    let path = people_workbook(dir.path());

    sheetsmith()
        .args(["read", "--require", "Name,Phone"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Phone"));
}

// ═══════════════════════════════════════════════════════════════════════════
// CONVERT / FORMAT / RUN
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_convert_then_refuse_existing_sheet() {
    let dir = TempDir::new().unwrap();
    let input = people_workbook(dir.path());
    let output = dir.path().join("report.xlsx");

    sheetsmith()
        .arg("convert")
        .arg(&input)
        .arg(&output)
        .args(["--output-sheet", "Report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Convert Complete"));

    let records = ExcelReader::new(&output)
        .read(&SheetSelector::from("Report"))
        .unwrap();
    assert_eq!(records.len(), 2);

    sheetsmith()
        .arg("convert")
        .arg(&input)
        .arg(&output)
        .args(["--output-sheet", "Report"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    sheetsmith()
        .arg("convert")
        .arg(&input)
        .arg(&output)
        .args(["--output-sheet", "Report", "--append", "--no-format"])
        .assert()
        .success();

    let records = ExcelReader::new(&output)
        .read(&SheetSelector::from("Report"))
        .unwrap();
    assert_eq!(records.len(), 4);
}

#[test]
fn test_overwrite_conflicts_with_append() {
    let dir = TempDir::new().unwrap();
    let input = people_workbook(dir.path());

    sheetsmith()
        .arg("convert")
        .arg(&input)
        .arg(dir.path().join("out.xlsx"))
        .args(["--overwrite", "--append"])
        .assert()
        .failure();
}

#[test]
fn test_format_in_place() {
    let dir = TempDir::new().unwrap();
    let path = people_workbook(dir.path());

    sheetsmith()
        .args(["format", "--sheet", "People"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Format Complete"));

    let records = ExcelReader::new(&path)
        .read(&SheetSelector::Index(0))
        .unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn test_run_with_config() {
    let dir = TempDir::new().unwrap();
    let input_dir = dir.path().join("input");
    std::fs::create_dir_all(&input_dir).unwrap();
    people_workbook(&input_dir);

    let root = dir.path().display().to_string();
    let config = dir.path().join("job.yaml");
    std::fs::write(
        &config,
        format!(
            "paths:\n  input_dir: {root}/input\n  output_dir: {root}/output\n  temp_dir: {root}/output/.tmp\n  logs_dir: {root}/logs\n\
             input_file: people.xlsx\noutput_file: people_out.xlsx\noutput_sheet: Staff\n\
             logging:\n  level: info\n  file: run.log\n"
        ),
    )
    .unwrap();

    sheetsmith()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .assert()
        .success();

    let output = dir.path().join("output").join("people_out.xlsx");
    let records = ExcelReader::new(&output)
        .read(&SheetSelector::from("Staff"))
        .unwrap();
    assert_eq!(records.len(), 2);
    assert!(dir.path().join("logs").join("run.log").exists());
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.yaml");
    std::fs::write(&config, "logging:\n  level: shouting\n").unwrap();

    sheetsmith()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("log level"));
}
