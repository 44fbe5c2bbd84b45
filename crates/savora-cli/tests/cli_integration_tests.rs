//! CLI integration tests for savora
//!
//! Tests the savora CLI commands end-to-end using assert_cmd. Every test
//! points SAVORA_CONFIG_DIR at its own temp directory and strips the
//! credential environment variables, so nothing here reaches the network.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Helper to create an isolated command
fn savora_cmd(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("savora").unwrap();
    cmd.env("SAVORA_CONFIG_DIR", config_dir.path());
    cmd.env_remove("VOLC_ACCESS_KEY");
    cmd.env_remove("VOLC_SECRET_KEY");
    cmd.env_remove("SAVORA_LLM_API_KEY");
    cmd.env_remove("OPENROUTER_API_KEY");
    cmd.current_dir(config_dir.path());
    cmd
}

/// Disable the weather lookup so recommendations stay offline
fn disable_weather(config_dir: &TempDir) {
    savora_cmd(config_dir)
        .args(["config", "set", "weather.enabled", "false"])
        .assert()
        .success();
}

#[test]
fn test_help_command() {
    let dir = TempDir::new().unwrap();
    savora_cmd(&dir)
        .args(["--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Food recommendations with generated imagery",
        ));
}

#[test]
fn test_version_output() {
    let dir = TempDir::new().unwrap();
    savora_cmd(&dir)
        .args(["--version"])
        .assert()
        .success()
        .stdout(predicate::str::contains("savora"));
}

#[test]
fn test_doctor_command() {
    let dir = TempDir::new().unwrap();
    savora_cmd(&dir)
        .args(["doctor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Savora Health Check"))
        .stdout(predicate::str::contains("[!!] Image credentials"));
}

#[test]
fn test_config_list_shows_keys() {
    let dir = TempDir::new().unwrap();
    savora_cmd(&dir)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("image.model"))
        .stdout(predicate::str::contains("llm.model"))
        .stdout(predicate::str::contains("recommend.session_ttl_hours"));
}

#[test]
fn test_config_list_never_shows_secrets() {
    let dir = TempDir::new().unwrap();
    savora_cmd(&dir)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "image.access_key = (not set - use VOLC_ACCESS_KEY env var)",
        ));
}

#[test]
fn test_config_set_then_get() {
    let dir = TempDir::new().unwrap();

    savora_cmd(&dir)
        .args(["config", "set", "image.width", "512"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set image.width = 512"));

    savora_cmd(&dir)
        .args(["config", "get", "image.width"])
        .assert()
        .success()
        .stdout(predicate::str::contains("512"));

    assert!(dir.path().join("config.toml").exists());
}

#[test]
fn test_config_set_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    savora_cmd(&dir)
        .args(["config", "set", "image.quality", "high"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_config_set_rejects_api_key() {
    let dir = TempDir::new().unwrap();
    savora_cmd(&dir)
        .args(["config", "set", "llm.api_key", "sk-secret"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be stored"));
}

#[test]
fn test_config_set_rejects_image_credentials() {
    let dir = TempDir::new().unwrap();
    savora_cmd(&dir)
        .args(["config", "set", "image.secret_key", "super-secret"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be stored"));
}

#[test]
fn test_config_path_honors_override() {
    let dir = TempDir::new().unwrap();
    savora_cmd(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(dir.path().to_str().unwrap()));
}

#[test]
fn test_config_reset() {
    let dir = TempDir::new().unwrap();

    savora_cmd(&dir)
        .args(["config", "set", "image.width", "512"])
        .assert()
        .success();
    assert!(dir.path().join("config.toml").exists());

    savora_cmd(&dir)
        .args(["config", "reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reset"));
    assert!(!dir.path().join("config.toml").exists());
}

#[test]
fn test_recommend_offline() {
    let dir = TempDir::new().unwrap();
    disable_weather(&dir);

    savora_cmd(&dir)
        .args(["recommend", "--no-image", "--no-llm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Try: "))
        .stdout(predicate::str::contains("Why now: "));
}

#[test]
fn test_recommend_quiet_prints_dish_only() {
    let dir = TempDir::new().unwrap();
    disable_weather(&dir);

    savora_cmd(&dir)
        .args(["--quiet", "recommend", "--no-image", "--no-llm"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not())
        .stdout(predicate::str::contains("Try: ").not());
}

#[test]
fn test_another_without_history_fails() {
    let dir = TempDir::new().unwrap();
    disable_weather(&dir);

    savora_cmd(&dir)
        .args(["another", "--session", "nobody"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no recent recommendation"));
}

#[test]
fn test_another_after_recommend_succeeds() {
    let dir = TempDir::new().unwrap();
    disable_weather(&dir);

    savora_cmd(&dir)
        .args(["recommend", "--no-image", "--no-llm", "--session", "lunch-crew"])
        .assert()
        .success();

    // History survives into a separate process
    assert!(dir.path().join("sessions.json").exists());

    savora_cmd(&dir)
        .args(["another", "--session", "lunch-crew"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Try: "));
}

#[test]
fn test_image_cleanup_on_empty_directory() {
    let dir = TempDir::new().unwrap();

    savora_cmd(&dir)
        .args(["image", "cleanup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0 old image(s)."));
}

#[test]
fn test_image_generate_without_credentials_fails() {
    let dir = TempDir::new().unwrap();

    savora_cmd(&dir)
        .args(["image", "generate", "a bowl of ramen"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("credentials"));
}
