//! Integration tests for the `craftbot` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// A command isolated from the user's config, environment and `.env`.
fn craftbot(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("craftbot").unwrap();
    cmd.current_dir(home.path())
        .env("XDG_CONFIG_HOME", home.path().join("xdg"))
        .env_remove(API_KEY_VAR)
        .env_remove("CRAFTBOT_LOG");
    cmd
}

fn write_config(dir: &Path, servers: &str) -> PathBuf {
    let path = dir.join("craftbot.toml");
    std::fs::write(&path, servers).unwrap();
    path
}

fn server_block(log_path: &Path, password: &str) -> String {
    format!(
        "[[servers]]\nname = \"survival\"\nlog_path = \"{}\"\nrcon_password = \"{}\"\n",
        log_path.display(),
        password
    )
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    craftbot(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_config_path_follows_xdg() {
    let home = TempDir::new().unwrap();
    let expected = home.path().join("xdg").join("craftbot").join("config.toml");
    craftbot(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.display().to_string()));
}

#[test]
fn test_config_init_then_refuses_to_overwrite() {
    let home = TempDir::new().unwrap();
    craftbot(&home)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration"));

    let path = home.path().join("xdg/craftbot/config.toml");
    assert!(path.is_file());

    craftbot(&home)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    craftbot(&home)
        .args(["config", "init", "--force"])
        .assert()
        .success();
    assert!(home.path().join("xdg/craftbot/config.toml.backup").is_file());
}

#[test]
fn test_fresh_template_needs_a_server() {
    let home = TempDir::new().unwrap();
    craftbot(&home).args(["config", "init"]).assert().success();
    craftbot(&home)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("servers"));
}

#[test]
fn test_config_validate_accepts_good_file() {
    let home = TempDir::new().unwrap();
    let log = home.path().join("latest.log");
    let config = write_config(home.path(), &server_block(&log, "pw"));
    craftbot(&home)
        .args(["config", "validate", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid (1 server(s))"));
}

#[test]
fn test_config_validate_reports_position_of_syntax_error() {
    let home = TempDir::new().unwrap();
    let config = write_config(home.path(), "[bot]\ntrigger = \n");
    craftbot(&home)
        .args(["config", "validate", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("craftbot.toml:2:"));
}

#[test]
fn test_check_flags_placeholders_and_missing_key() {
    let home = TempDir::new().unwrap();
    let config = write_config(
        home.path(),
        &server_block(
            Path::new("/full/path/to/your/survival/logs/latest.log"),
            "your_survival_rcon_password",
        ),
    );
    craftbot(&home)
        .args(["check", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("GEMINI_API_KEY is not set"))
        .stdout(predicate::str::contains("log_path is still the sample placeholder"))
        .stdout(predicate::str::contains("rcon_password is still the sample placeholder"));
}

#[test]
fn test_check_passes_for_complete_setup() {
    let home = TempDir::new().unwrap();
    let log = home.path().join("latest.log");
    std::fs::write(&log, "").unwrap();
    let config = write_config(home.path(), &server_block(&log, "pw"));
    craftbot(&home)
        .env(API_KEY_VAR, "test-key")
        .args(["check", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("All checks passed."));
}

#[test]
fn test_check_reads_key_from_dotenv() {
    let home = TempDir::new().unwrap();
    let log = home.path().join("latest.log");
    std::fs::write(&log, "").unwrap();
    std::fs::write(home.path().join(".env"), "GEMINI_API_KEY=from-dotenv\n").unwrap();
    let config = write_config(home.path(), &server_block(&log, "pw"));
    craftbot(&home)
        .args(["check", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("GEMINI_API_KEY is configured"));
}

#[test]
fn test_check_ping_skipped_without_key() {
    let home = TempDir::new().unwrap();
    let log = home.path().join("latest.log");
    std::fs::write(&log, "").unwrap();
    let config = write_config(home.path(), &server_block(&log, "pw"));
    craftbot(&home)
        .args(["check", "--ping", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("skipped, API key not configured"));
}

#[test]
fn test_run_without_config_fails_before_starting() {
    let home = TempDir::new().unwrap();
    craftbot(&home)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("craftbot config init"));
}

#[test]
fn test_run_without_api_key_fails() {
    let home = TempDir::new().unwrap();
    let log = home.path().join("latest.log");
    std::fs::write(&log, "").unwrap();
    let config = write_config(home.path(), &server_block(&log, "pw"));
    craftbot(&home)
        .args(["run", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}
