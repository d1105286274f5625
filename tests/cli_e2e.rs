//! End-to-end CLI tests for the leecher binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;
use support::{exam_table, pdf_bytes};

/// Binary isolated from the user's config dir and credentials, logging into `dir`.
fn leecher(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("leecher").unwrap();
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir)
        .env_remove("QCONCURSOS_EMAIL")
        .env_remove("QCONCURSOS_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_binary_help_displays_usage() {
    let temp = TempDir::new().unwrap();
    leecher(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Crawl public exam archives"))
        .stdout(predicate::str::contains("crawl"))
        .stdout(predicate::str::contains("search"));
}

#[test]
fn test_binary_version_displays_version() {
    let temp = TempDir::new().unwrap();
    leecher(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("leecher"));
}

#[test]
fn test_binary_without_subcommand_fails() {
    let temp = TempDir::new().unwrap();
    leecher(temp.path()).assert().failure();
}

#[test]
fn test_binary_invalid_year_rejected() {
    let temp = TempDir::new().unwrap();
    leecher(temp.path())
        .args(["crawl", "--from-year", "1950"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("year must be within"));
}

#[test]
fn test_binary_invalid_config_file_fails() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("bad.toml");
    std::fs::write(&config, "concurrency = 99\n").unwrap();

    leecher(temp.path())
        .arg("--config")
        .arg(&config)
        .args(["search", "ti"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency"));
}

#[test]
fn test_binary_qconcursos_without_credentials_fails() {
    let temp = TempDir::new().unwrap();
    leecher(temp.path())
        .args(["search", "ti", "--site", "qconcursos"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("QCONCURSOS_EMAIL"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_search_downloads_into_layout() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("out");

    Mock::given(method("GET"))
        .and(path("/provas/ti/1/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(exam_table(&[("Analista A", "2021", "FGV")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/provas/ti/2/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(exam_table(&[])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/analista-a.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_bytes(2048)))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = leecher(temp.path());
    cmd.args(["-q", "--rate-limit-ms", "0", "--base-url"])
        .arg(server.uri())
        .arg("--output-dir")
        .arg(&output)
        .args(["search", "ti", "--year", "2021", "--no-answer-keys"]);

    tokio::task::spawn_blocking(move || {
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("1 of 1 files downloaded"));
    })
    .await
    .unwrap();

    assert!(
        output
            .join("FGV/IBGE_2021/exams/Analista A (2021).pdf")
            .is_file()
    );
    assert!(temp.path().join("leecher.log").is_file());
}
