//! Integration tests for the `cpi` binary.
//!
//! Network cases run against a local wiremock server through the hidden
//! `--base-url` flag; state and config live in per-test temp directories.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `cpi` binary with env isolation.
///
/// Clears all `CPI_*` env vars and points config and state at `home`.
fn cpi_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("cpi");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("CPI_CONFIG", home.join("config.toml"))
        .env("CPI_STATE_DIR", home.join("state"))
        .env("NO_COLOR", "1")
        .env_remove("CPI_APP_KEY")
        .env_remove("CPI_BASE_URL")
        .env_remove("CPI_ENDPOINT_HOST")
        .env_remove("CPI_DEVICE_ID")
        .env_remove("CPI_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// `cpi send` aimed at `server`, with a fixed device id.
fn send_cmd(home: &Path, server: &MockServer) -> assert_cmd::Command {
    let mut cmd = cpi_cmd(home);
    cmd.args([
        "send",
        "--app-key",
        "test-key",
        "--device-id",
        "device-1234",
        "--timeout",
        "5",
        "--base-url",
        &server.uri(),
    ]);
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = cpi_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    cpi_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("send")
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    cpi_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cpi"));
}

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    cpi_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_unknown_grant_rejected() {
    let home = tempfile::tempdir().unwrap();
    cpi_cmd(home.path())
        .args(["send", "--app-key", "k", "--grant", "camera"])
        .assert()
        .code(2);
}

#[test]
fn test_zero_timeout_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let output = cpi_cmd(home.path())
        .args(["send", "--app-key", "k", "--device-id", "d", "--timeout", "0"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("timeout"));
}

// ── Send ────────────────────────────────────────────────────────────

#[test]
fn test_send_without_app_key_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let output = cpi_cmd(home.path())
        .args(["send", "--device-id", "d"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("No app key"), "unexpected output:\n{text}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_records_install_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transactions"))
        .and(body_string_contains("appid=test-key"))
        .and(body_string_contains("androiddeviceid=device-1234"))
        .respond_with(ResponseTemplate::new(201).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();

    send_cmd(home.path(), &server)
        .assert()
        .success()
        .stdout(predicate::str::contains("Install recorded"));

    send_cmd(home.path(), &server)
        .assert()
        .success()
        .stdout(predicate::str::contains("already recorded"));

    cpi_cmd(home.path())
        .args(["status", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"install_sent\": true"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_json_output() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transactions"))
        .respond_with(ResponseTemplate::new(201).set_body_string("ok"))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    send_cmd(home.path(), &server)
        .args(["-o", "json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"outcome\": \"sent\"")
                .and(predicate::str::contains("\"device_id\": \"device-1234\"")),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_granted_identifiers_in_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transactions"))
        .and(body_string_contains("androidimei=356938035643809"))
        .and(body_string_contains("macaddress=02%3A00%3A00%3AAB%3ACD%3AEF"))
        .respond_with(ResponseTemplate::new(201).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    send_cmd(home.path(), &server)
        .args([
            "--imei",
            "356938035643809",
            "--mac",
            "02:00:00:AB:CD:EF",
            "--grant",
            "read-phone-state",
            "--grant",
            "access-wifi-state",
        ])
        .assert()
        .success();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_send_exits_nine_and_stays_unrecorded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let output = send_cmd(home.path(), &server).output().unwrap();
    assert_eq!(output.status.code(), Some(9));
    let text = combined_output(&output);
    assert!(text.contains("status 200"), "unexpected output:\n{text}");

    cpi_cmd(home.path())
        .args(["status", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"install_sent\": false"));
}

#[test]
fn test_unreachable_endpoint_exits_seven() {
    let home = tempfile::tempdir().unwrap();
    cpi_cmd(home.path())
        .args([
            "send",
            "--app-key",
            "k",
            "--device-id",
            "d",
            "--timeout",
            "5",
            "--base-url",
            "http://127.0.0.1:9",
        ])
        .assert()
        .code(7);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_generated_device_id_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    for _ in 0..2 {
        cpi_cmd(home.path())
            .args(["send", "--app-key", "k", "--base-url", &server.uri()])
            .assert()
            .code(9);
    }

    let id = std::fs::read_to_string(home.path().join("state").join("device-id")).unwrap();
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    for req in &requests {
        let body = String::from_utf8_lossy(&req.body);
        assert!(body.contains(&format!("androiddeviceid={}", id.trim())), "{body}");
    }
}

// ── Status ──────────────────────────────────────────────────────────

#[test]
fn test_status_fresh_state() {
    let home = tempfile::tempdir().unwrap();
    cpi_cmd(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("not recorded"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_init_show_and_path() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("config.toml");

    cpi_cmd(home.path())
        .args(["config", "init", "--app-key", "from-init"])
        .assert()
        .success();
    assert!(config.exists());

    cpi_cmd(home.path())
        .args(["config", "show", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"app_key\": \"from-init\""));

    cpi_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_refuses_overwrite() {
    let home = tempfile::tempdir().unwrap();
    cpi_cmd(home.path())
        .args(["config", "init", "--app-key", "first"])
        .assert()
        .success();

    let output = cpi_cmd(home.path())
        .args(["config", "init", "--app-key", "second"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("already exists"));

    cpi_cmd(home.path())
        .args(["config", "init", "--app-key", "second", "--force"])
        .assert()
        .success();
}

#[test]
fn test_config_init_rejects_bad_host() {
    let home = tempfile::tempdir().unwrap();
    cpi_cmd(home.path())
        .args(["config", "init", "--app-key", "k", "--host", "https://x/y"])
        .assert()
        .code(2);
    assert!(!home.path().join("config.toml").exists());
}
