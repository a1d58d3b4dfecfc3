//! End-to-end tests for the depguard CLI
//!
//! These tests verify:
//! - Help and version output
//! - Configuration errors are reported before any network call
//! - `--once` exit codes and JSON output schema

use assert_cmd::Command;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const REPO_URL: &str = "https://github.com/octo/app";

/// The binary with every environment fallback removed
fn depguard() -> Command {
    let mut cmd = Command::cargo_bin("depguard").unwrap();
    cmd.env_remove("GITHUB_TOKEN")
        .env_remove("REPO_URL")
        .env_remove("CHECK_INTERVAL")
        .env_remove("DEPGUARD_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("depguard.toml");
    fs::write(&path, content).unwrap();
    path
}

mod cli_surface {
    use super::*;

    #[test]
    fn test_help() {
        depguard()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("npm dependencies"))
            .stdout(predicate::str::contains("--once"))
            .stdout(predicate::str::contains("--workflow"));
    }

    #[test]
    fn test_version() {
        depguard()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("depguard"));
    }

    #[test]
    fn test_unknown_workflow_rejected() {
        depguard()
            .args(["--workflow", "ssh", "--once"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("ssh"));
    }

    #[test]
    fn test_bad_interval_rejected() {
        depguard()
            .args(["--interval", "soon", "--once"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid number in interval"));
    }
}

mod configuration_errors {
    use super::*;

    #[test]
    fn test_missing_repo_url() {
        depguard()
            .args(["--token", "ghp_test", "--once"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("repository URL is required"));
    }

    #[test]
    fn test_missing_token() {
        depguard()
            .args(["--repo", REPO_URL, "--once"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("GitHub token is required"));
    }

    #[test]
    fn test_token_from_environment() {
        // reaches the network stage, so configuration was accepted
        depguard()
            .env("GITHUB_TOKEN", "ghp_env")
            .args(["--repo", REPO_URL, "--api-url", "http://127.0.0.1:1", "--once", "--json"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("\"success\": false"));
    }

    #[test]
    fn test_interval_below_minimum() {
        depguard()
            .args(["--repo", REPO_URL, "--token", "ghp_test", "--interval", "30", "--once"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("at least 60 seconds"));
    }

    #[test]
    fn test_non_github_repository() {
        depguard()
            .args(["--repo", "https://gitlab.com/octo/app", "--token", "ghp_test", "--once"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("gitlab.com/octo/app"));
    }

    #[test]
    fn test_config_file_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[github\nrepo_url = ");

        depguard()
            .arg("--config")
            .arg(&path)
            .arg("--once")
            .assert()
            .failure()
            .stderr(predicate::str::contains("failed to parse config file"));
    }

    #[test]
    fn test_config_file_unknown_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[agent]\ncheck_every = 60\n");

        depguard()
            .arg("--config")
            .arg(&path)
            .arg("--once")
            .assert()
            .failure()
            .stderr(predicate::str::contains("check_every"));
    }

    #[test]
    fn test_config_file_missing() {
        let dir = tempfile::tempdir().unwrap();

        depguard()
            .arg("--config")
            .arg(dir.path().join("absent.toml"))
            .arg("--once")
            .assert()
            .failure()
            .stderr(predicate::str::contains("failed to read config file"));
    }
}

mod single_cycle {
    use super::*;

    #[test]
    fn test_unreachable_api_json_output() {
        let output = depguard()
            .args([
                "--repo",
                REPO_URL,
                "--token",
                "ghp_test",
                "--api-url",
                "http://127.0.0.1:1",
                "--once",
                "--json",
            ])
            .assert()
            .code(1)
            .get_output()
            .stdout
            .clone();

        let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(json["report"]["result"]["success"], false);
        assert_eq!(json["report"]["result"]["pull_request_url"], "");
        assert_eq!(json["report"]["outcome"]["type"], "failed");
        assert_eq!(json["report"]["outcome"]["kind"], "transport_error");
        assert_eq!(json["stats"]["cycles"], 0);
    }

    #[test]
    fn test_missing_manifest_exit_code() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/repos/octo/app")
            .with_status(200)
            .with_body(r#"{"default_branch":"main"}"#)
            .create();
        server
            .mock("GET", "/repos/octo/app/git/ref/heads/main")
            .with_status(200)
            .with_body(r#"{"object":{"sha":"basesha"}}"#)
            .create();
        server
            .mock("GET", "/repos/octo/app/contents/package.json")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create();

        depguard()
            .args(["--repo", REPO_URL, "--token", "ghp_test", "--once"])
            .arg("--api-url")
            .arg(server.url())
            .assert()
            .code(2)
            .stdout(predicate::str::contains("Not applicable"));
    }

    #[test]
    fn test_up_to_date_quiet_prints_nothing() {
        let mut github = mockito::Server::new();
        let mut npm = mockito::Server::new();
        github
            .mock("GET", "/repos/octo/app")
            .with_status(200)
            .with_body(r#"{"default_branch":"main"}"#)
            .create();
        github
            .mock("GET", "/repos/octo/app/git/ref/heads/main")
            .with_status(200)
            .with_body(r#"{"object":{"sha":"basesha"}}"#)
            .create();
        let manifest = STANDARD.encode(r#"{"dependencies":{"react":"^18.2.0"}}"#);
        github
            .mock("GET", "/repos/octo/app/contents/package.json")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(format!(
                r#"{{"sha":"s","encoding":"base64","content":"{}"}}"#,
                manifest
            ))
            .create();
        npm.mock("GET", "/react/latest")
            .with_status(200)
            .with_body(r#"{"version":"18.2.0"}"#)
            .create();

        depguard()
            .args(["--repo", REPO_URL, "--token", "ghp_test", "--once", "--quiet"])
            .arg("--api-url")
            .arg(github.url())
            .arg("--registry-url")
            .arg(npm.url())
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    }
}
