//! CLI integration tests for crm-bulk.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for error conditions that never reach the network.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the crm-bulk binary, with no token in the environment.
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("crm-bulk").unwrap();
    cmd.env_remove("CRM_AUTH_TOKEN");
    cmd
}

fn write_temp(content: &str) -> tempfile::NamedTempFile {
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
        .stdout(predicate::str::contains("fetch-by-id"))
        .stdout(predicate::str::contains("updated-after"))
        .stdout(predicate::str::contains("value-in"))
        .stdout(predicate::str::contains("criteria"))
        .stdout(predicate::str::contains("insert"))
        .stdout(predicate::str::contains("update-bulk"));
}

#[test]
fn test_updated_after_subcommand_help() {
    cmd()
        .args(["updated-after", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--limit"))
        .stdout(predicate::str::contains("--columns"))
        .stdout(predicate::str::contains("--new-format"));
}

#[test]
fn test_insert_subcommand_help() {
    cmd()
        .args(["insert", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--rows"))
        .stdout(predicate::str::contains("--duplicate-check"))
        .stdout(predicate::str::contains("--larid"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("crm-bulk"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_log_format_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"));
}

#[test]
fn test_verbosity_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_auth_token_flag_mentions_env() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--auth-token"))
        .stdout(predicate::str::contains("CRM_AUTH_TOKEN"));
}

// =============================================================================
// Exit Code Tests - Config Errors (Exit Code 2)
// =============================================================================

#[test]
fn test_missing_token_exits_with_code_2() {
    cmd()
        .args(["criteria", "Leads", "(Company:Acme)"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("auth token required"));
}

#[test]
fn test_invalid_yaml_exits_with_code_2() {
    let file = write_temp("endpoint: [\n");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "--auth-token", "t"])
        .args(["criteria", "Leads", "(Company:Acme)"])
        .assert()
        .code(2);
}

#[test]
fn test_page_size_above_ceiling_exits_with_code_2() {
    let file = write_temp("transfer:\n  page_sizes:\n    value_match: 6\n");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "--auth-token", "t"])
        .args(["value-in", "Leads", "Email", "a@b.c"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("value_match"));
}

#[test]
fn test_missing_config_file_exits_with_code_1() {
    // Missing file is an IO error, not a config error
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "--auth-token", "t"])
        .args(["criteria", "Leads", "(Company:Acme)"])
        .assert()
        .code(1);
}

// =============================================================================
// Exit Code Tests - Invalid Arguments (Exit Code 3)
// =============================================================================

#[test]
fn test_bad_watermark_exits_with_code_3() {
    cmd()
        .args(["--auth-token", "t", "updated-after", "Leads", "2016-09-05"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Invalid argument"));
}

#[test]
fn test_update_rejects_array_rows() {
    let rows = write_temp(r#"[{"Subject": "a"}, {"Subject": "b"}]"#);

    cmd()
        .args(["--auth-token", "t", "update", "Leads", "42", "--rows"])
        .arg(rows.path())
        .assert()
        .code(3);
}

#[test]
fn test_scalar_rows_file_exits_with_code_3() {
    let rows = write_temp("\"not rows\"");

    cmd()
        .args(["--auth-token", "t", "insert", "Leads", "--rows"])
        .arg(rows.path())
        .assert()
        .code(3);
}

// =============================================================================
// Transfers That Never Dispatch
// =============================================================================

#[test]
fn test_value_in_without_values_prints_empty_array() {
    cmd()
        .args(["--auth-token", "t", "value-in", "Leads", "Email"])
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));
}

#[test]
fn test_update_bulk_empty_array_prints_empty_array() {
    let rows = write_temp("[]");

    cmd()
        .args(["--auth-token", "t", "update-bulk", "Leads", "--rows"])
        .arg(rows.path())
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));
}

// =============================================================================
// Exit Code Tests - Retry Exhaustion (Exit Code 4)
// =============================================================================

#[test]
fn test_unreachable_endpoint_exhausts_retries() {
    let config = write_temp(
        "endpoint:\n  base_url: http://127.0.0.1:1\n  timeout_secs: 2\ntransfer:\n  max_consecutive_errors: 1\n",
    );

    cmd()
        .args(["--config", config.path().to_str().unwrap(), "--auth-token", "t"])
        .args(["fetch-by-id", "Leads", "1", "2"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("gave up after 2"));
}

// =============================================================================
// No Subcommand Tests
// =============================================================================

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_fetch_by_id_requires_ids() {
    cmd()
        .args(["--auth-token", "t", "fetch-by-id", "Leads"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("<IDS>"));
}
