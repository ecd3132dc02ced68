//! CLI integration tests for sql-data-compare.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for configuration problems. None of them need a database.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the sql-data-compare binary.
fn cmd() -> Command {
    Command::cargo_bin("sql-data-compare").unwrap()
}

const VALID_CONFIG: &str = r#"
connections:
  warehouse:
    type: mssql
    host: sql1.internal
    database: Sales
    user: reader
    password: secret
  reporting:
    type: postgres
    host: pg1.internal
    database: sales
    user: reader
    password: secret
output_type: differences
output_format: csv
compare_list:
  - name: Orders Daily
    left_connection: warehouse
    right_connection: reporting
    left_query: SELECT id, amount FROM dbo.Orders
    right_query_file: orders.sql
  - name: Customers
    left_connection: warehouse
    right_connection: reporting
    left_query: SELECT id FROM dbo.Customers
    right_query: SELECT id FROM customers
"#;

fn config_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check-config"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_run_subcommand_help() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--only"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sql-data-compare"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_global_flags_documented() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"))
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"))
        .stdout(predicate::str::contains("[default: config.yaml]"));
}

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

// =============================================================================
// Exit Code Tests - Config Errors (Exit Code 2)
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_2() {
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "check-config"])
        .assert()
        .code(2);
}

#[test]
fn test_invalid_yaml_exits_with_code_2() {
    let file = config_file("invalid: yaml: content: [\n");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "check-config"])
        .assert()
        .code(2);
}

#[test]
fn test_zero_max_sql_in_values_rejected() {
    let file = config_file(&format!("max_sql_in_values: 0\n{}", VALID_CONFIG));

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "check-config"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("max_sql_in_values"));
}

#[test]
fn test_unknown_connection_rejected() {
    let broken = VALID_CONFIG.replace(
        "right_connection: reporting\n    left_query: SELECT id FROM",
        "right_connection: nowhere\n    left_query: SELECT id FROM",
    );
    let file = config_file(&broken);

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nowhere"));
}

#[test]
fn test_run_unknown_only_name_exits_with_code_2() {
    let file = config_file(VALID_CONFIG);

    cmd()
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "run",
            "--only",
            "Missing",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Missing"));
}

// =============================================================================
// Offline Subcommands
// =============================================================================

#[test]
fn test_check_config_reports_counts() {
    let file = config_file(VALID_CONFIG);

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "check-config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration OK"))
        .stdout(predicate::str::contains("Comparisons: 2"));
}

#[test]
fn test_check_config_json() {
    let file = config_file(VALID_CONFIG);

    cmd()
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "--output-json",
            "check-config",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\": true"))
        .stdout(predicate::str::contains("\"comparisons\": 2"));
}

#[test]
fn test_list_shows_specs_and_sources() {
    let file = config_file(VALID_CONFIG);

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Orders Daily"))
        .stdout(predicate::str::contains("warehouse (mssql), inline query"))
        .stdout(predicate::str::contains("reporting (postgres), file orders.sql"))
        .stdout(predicate::str::contains("Customers"));
}
