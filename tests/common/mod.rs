#![allow(dead_code)]

use assert_cmd::cargo_bin;
use chrono::NaiveDate;
use loanbook::domain::contract::Contract;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

pub const TODAY: &str = "2025-03-10";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `loanbook` running against the shared fixture snapshot on a fixed day.
pub fn loanbook() -> Command {
    let mut cmd = Command::new(cargo_bin!("loanbook"));
    cmd.arg("--data")
        .arg("tests/fixtures/contracts.json")
        .arg("--today")
        .arg(TODAY)
        .env("RUST_LOG", "warn");
    cmd
}

/// Writes contracts to a temporary snapshot file.
pub fn write_snapshot(contracts: &[Contract]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let json = serde_json::to_string_pretty(contracts).unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
