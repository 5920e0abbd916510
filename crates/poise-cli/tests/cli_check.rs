use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("poise-ops/tests/fixtures")
}

#[allow(deprecated)]
fn poise_cmd(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("poise").unwrap();
    cmd.current_dir(tmp.path())
        .env("HOME", tmp.path())
        .env("POISE_INDEX", fixtures_dir().join("index"))
        .env_remove("RUST_LOG");
    cmd
}

fn web_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::copy(
        fixtures_dir().join("web-service.toml"),
        tmp.path().join("pyproject.toml"),
    )
    .unwrap();
    tmp
}

#[test]
fn test_check_valid_manifest() {
    let tmp = web_project();

    poise_cmd(&tmp)
        .args(["check"])
        .assert()
        .success()
        .stderr(predicate::str::contains("web-service v0.3.0"))
        .stderr(predicate::str::contains("3 groups"));
}

#[test]
fn test_check_without_manifest_fails() {
    let tmp = TempDir::new().unwrap();

    poise_cmd(&tmp)
        .args(["check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pyproject.toml"));
}

#[test]
fn test_check_malformed_manifest() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("pyproject.toml"),
        "[tool.poetry]\nname = \"broken\"\nversion = \"0.1.0\"\n\n[tool.poetry.dependencies]\nfastapi = \"^^0.95\"\n",
    )
    .unwrap();

    poise_cmd(&tmp)
        .args(["check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Parse error"));
}

#[test]
fn test_check_explicit_manifest_path() {
    let tmp = TempDir::new().unwrap();
    let elsewhere = tmp.path().join("service.toml");
    fs::copy(fixtures_dir().join("web-service.toml"), &elsewhere).unwrap();

    poise_cmd(&tmp)
        .arg("--manifest-path")
        .arg(&elsewhere)
        .args(["check"])
        .assert()
        .success();
}

#[test]
fn test_check_lock_freshness() {
    let tmp = web_project();

    poise_cmd(&tmp)
        .args(["check", "--lock"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("poise lock"));

    poise_cmd(&tmp).args(["lock"]).assert().success();
    poise_cmd(&tmp).args(["check", "--lock"]).assert().success();

    let manifest = fs::read_to_string(tmp.path().join("pyproject.toml")).unwrap();
    fs::write(
        tmp.path().join("pyproject.toml"),
        manifest.replace("fastapi = \"^0.95.0\"", "fastapi = \"^0.96.0\""),
    )
    .unwrap();

    poise_cmd(&tmp)
        .args(["check", "--lock"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of date"));
}
