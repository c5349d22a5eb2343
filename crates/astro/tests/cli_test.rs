#![allow(deprecated)]

mod common;

use assert_cmd::Command;
use common::TestProject;
use predicates::prelude::*;

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("astro").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("メディアサーバー"))
        .stdout(predicate::str::contains("--answers"))
        .stdout(predicate::str::contains("--keep-artifacts"))
        .stdout(predicate::str::contains("--no-up"))
        .stdout(predicate::str::contains("render"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("astro").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("astro"));
}

/// 非対話セットアップでスタックのディレクトリが準備されることを確認
#[test]
fn test_setup_with_answers_without_up() {
    let project = TestProject::new();
    let settings = project.write_settings();
    let answers = project.write_answers(
        "media_server: jellyfin\ntorrent: qbittorrent\nusenet: none\ngateway: none\naddons: []\n",
    );

    let mut cmd = Command::cargo_bin("astro").unwrap();
    cmd.arg("--config")
        .arg(&settings)
        .arg("--answers")
        .arg(&answers)
        .arg("--no-up")
        .assert()
        .success()
        .stdout(predicate::str::contains("docker compose"));

    let root = project.stack_root();
    assert!(root.join("docker-compose.yml").is_file());
    assert!(root.join("astro-answers.yaml").is_file());
    assert!(root.join("media").join("movies").is_dir());
    assert!(root.join("downloads").join("torrents").is_dir());
    assert!(root.join("config").join("homepage").join("services.yaml").is_file());

    let compose = std::fs::read_to_string(root.join("docker-compose.yml")).unwrap();
    assert!(compose.contains("jellyfin"));
    assert!(!compose.contains("traefik"));
}

/// 2回目の実行でも既存の内容が壊れないことを確認
#[test]
fn test_setup_is_repeatable() {
    let project = TestProject::new();
    let settings = project.write_settings();
    let answers = project.write_answers("media_server: emby\n");

    for _ in 0..2 {
        Command::cargo_bin("astro")
            .unwrap()
            .arg("--config")
            .arg(&settings)
            .arg("--answers")
            .arg(&answers)
            .arg("--no-up")
            .assert()
            .success();
    }

    let saved = std::fs::read_to_string(project.stack_root().join("astro-answers.yaml")).unwrap();
    assert!(saved.contains("media_server: emby"));
}

/// 未知の選択肢は構成エラー (4)
#[test]
fn test_unknown_variant_exit_code() {
    let project = TestProject::new();
    let settings = project.write_settings();
    let answers = project.write_answers("media_server: kodi\n");

    let mut cmd = Command::cargo_bin("astro").unwrap();
    cmd.arg("--config")
        .arg(&settings)
        .arg("--answers")
        .arg(&answers)
        .arg("--no-up")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("kodi"));

    assert!(!project.stack_root().exists());
}

/// 設定ファイルが見つからなければ設定エラー (3)
#[test]
fn test_missing_config_exit_code() {
    let project = TestProject::new();

    let mut cmd = Command::cargo_bin("astro").unwrap();
    cmd.arg("--config")
        .arg(project.path().join("missing.yaml"))
        .arg("--no-up")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("設定エラー"));
}

/// ルートの位置にファイルがあればプロビジョニングエラー (5)
#[test]
fn test_provisioning_failure_exit_code() {
    let project = TestProject::new();
    let settings = project.write_settings();
    let answers = project.write_answers("media_server: jellyfin\n");
    std::fs::write(project.stack_root(), "not a directory").unwrap();

    let mut cmd = Command::cargo_bin("astro").unwrap();
    cmd.arg("--config")
        .arg(&settings)
        .arg("--answers")
        .arg(&answers)
        .arg("--no-up")
        .assert()
        .code(5)
        .stderr(predicate::str::contains("プロビジョニングエラー"));
}
