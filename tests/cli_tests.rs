//! CLI integration tests for the medfeedback binary
//!
//! These tests verify that the CLI commands work correctly by running
//! the actual compiled binary.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a Command instance for the medfeedback binary
#[allow(deprecated)]
fn medfeedback_cmd() -> Command {
    let mut cmd = Command::cargo_bin("medfeedback").expect("Failed to find medfeedback binary");
    cmd.env("NO_COLOR", "1");
    cmd
}

// ============================================================================
// --version / --help tests
// ============================================================================

#[test]
fn test_version_flag() {
    medfeedback_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_commands() {
    medfeedback_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("classify"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("demo"));
}

#[test]
fn test_missing_subcommand_fails() {
    medfeedback_cmd().assert().failure();
}

// ============================================================================
// classify command tests
// ============================================================================

#[test]
fn test_classify_conflict_for_medico() {
    medfeedback_cmd()
        .args(["classify", "--status", "409", "--entity", "medico"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("conflict: "))
        .stdout(predicate::str::contains(
            "Não é possível excluir este médico pois existem registros vinculados",
        ));
}

#[test]
fn test_classify_not_found_without_entity() {
    medfeedback_cmd()
        .args(["classify", "--status", "404"])
        .assert()
        .success()
        .stdout(predicate::str::contains("O registro não foi encontrado."));
}

#[test]
fn test_classify_network_message() {
    medfeedback_cmd()
        .args(["classify", "--message", "connect ECONNREFUSED 10.0.0.2:443"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Falha de conexão com o servidor."));
}

#[test]
fn test_classify_json_payload() {
    medfeedback_cmd()
        .args([
            "classify",
            "--json",
            r#"{"response":{"status":422,"data":{"message":"CPF inválido"}}}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("backend: CPF inválido"));
}

#[test]
fn test_classify_rejects_unknown_entity() {
    medfeedback_cmd()
        .args(["classify", "--status", "404", "--entity", "clinica"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown entity"));
}

#[test]
fn test_classify_rejects_invalid_json() {
    medfeedback_cmd()
        .args(["classify", "--json", "{not json"])
        .assert()
        .failure();
}

// ============================================================================
// config command tests
// ============================================================================

#[test]
fn test_config_prints_defaults() {
    medfeedback_cmd()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"default_duration_ms\": 5000"))
        .stdout(predicate::str::contains("\"retry_label\": \"Tentar novamente\""));
}

#[test]
fn test_config_reads_file() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("Failed to create temp file");
    writeln!(file, "[retry]\nmax_retries = 6").unwrap();

    medfeedback_cmd()
        .args(["config", "--config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"max_retries\": 6"));
}

#[test]
fn test_config_env_override() {
    medfeedback_cmd()
        .arg("config")
        .env("MEDFEEDBACK__ERRORS__DURATION_MS", "8000")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"duration_ms\": 8000"));
}

#[test]
fn test_config_missing_file_fails() {
    medfeedback_cmd()
        .args(["config", "--config", "/nonexistent/medfeedback.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_config_invalid_value_fails() {
    medfeedback_cmd()
        .arg("config")
        .env("MEDFEEDBACK__RETRY__BACKOFF_MULTIPLIER", "0.5")
        .assert()
        .failure()
        .stderr(predicate::str::contains("retry.backoff_multiplier"));
}

// ============================================================================
// demo command tests
// ============================================================================

#[test]
fn test_demo_runs_full_scenario() {
    medfeedback_cmd()
        .args(["demo", "--time-scale", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Falha de conexão com o servidor."))
        .stdout(predicate::str::contains("[Tentar novamente]"))
        .stdout(predicate::str::contains("Attempt 3/4"))
        .stdout(predicate::str::contains("Succeeded"))
        .stdout(predicate::str::contains("Médico salvo (medico-44)."))
        .stdout(predicate::str::contains("[ Excluir ]  [ Cancelar ]"))
        .stdout(predicate::str::contains(
            "Não é possível excluir este médico pois existem registros vinculados",
        ));
}

#[test]
fn test_demo_rejects_negative_time_scale() {
    medfeedback_cmd()
        .args(["demo", "--time-scale=-1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--time-scale"));
}
