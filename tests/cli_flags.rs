use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn reel_tui() -> Command {
    Command::cargo_bin("reel-tui").unwrap()
}

#[test]
fn prints_version() {
    reel_tui()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    reel_tui()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reel-TUI"))
        .stdout(predicate::str::contains("--version"))
        .stdout(predicate::str::contains("--demo"));
}

#[test]
fn missing_api_key_fails_before_terminal_setup() {
    let home = tempdir().unwrap();
    reel_tui()
        .env_remove("OMDB_API_KEY")
        .env_remove("REEL_TUI_OMDB__API_KEY")
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_CACHE_HOME", home.path().join("cache"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing OMDb API key"))
        .stderr(predicate::str::contains("OMDB_API_KEY"));
}

#[test]
fn rejects_unknown_arguments() {
    reel_tui()
        .arg("--bogus")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("unknown argument"));
}

#[test]
fn config_flag_requires_a_path() {
    reel_tui()
        .arg("--config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--config requires a path"));
}
