//! コンテナランタイムへの受け渡し

use crate::error::{ContainerError, Result};
use crate::waiter::{RetryPolicy, wait_for_daemon, wait_for_services};
use bollard::Docker;
use std::ffi::OsString;
use std::path::Path;
use tokio::process::Command;
use tracing::info;

/// スタックを起動するランタイムのトレイト
#[allow(async_fn_in_trait)]
pub trait StackRuntime {
    /// ランタイムが応答するまで待機
    async fn ensure_ready(&self) -> Result<()>;
    /// Compose ドキュメントからスタックを起動
    async fn up(&self, compose_file: &Path, project_dir: &Path) -> Result<()>;
    /// 起動したコンテナが動き始めるまで待機
    async fn wait(&self, services: &[String]) -> Result<()>;
}

/// compose サブコマンドを持つ CLI
const COMPOSE_PROGRAM: &str = "docker";

/// `docker compose` によるランタイム
pub struct ComposeRuntime {
    docker: Docker,
    policy: RetryPolicy,
}

impl ComposeRuntime {
    pub fn new(docker: Docker, policy: RetryPolicy) -> Self {
        Self { docker, policy }
    }
}

/// `docker compose` に渡す引数
pub fn compose_up_args(compose_file: &Path, project_dir: &Path) -> Vec<OsString> {
    vec![
        "compose".into(),
        "-f".into(),
        compose_file.into(),
        "--project-directory".into(),
        project_dir.into(),
        "up".into(),
        "-d".into(),
    ]
}

/// `<program> compose ... up -d` を実行
///
/// 失敗時の stderr はそのまま返します（リトライしない）。
pub async fn invoke_compose(program: &str, compose_file: &Path, project_dir: &Path) -> Result<()> {
    info!(
        compose_file = %compose_file.display(),
        program,
        "Starting stack"
    );

    let output = Command::new(program)
        .args(compose_up_args(compose_file, project_dir))
        .output()
        .await
        .map_err(|e| ContainerError::CommandSpawnFailed {
            program: program.to_string(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ContainerError::OrchestrationInvocation {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(())
}

impl StackRuntime for ComposeRuntime {
    async fn ensure_ready(&self) -> Result<()> {
        wait_for_daemon(&self.docker, &self.policy).await
    }

    async fn up(&self, compose_file: &Path, project_dir: &Path) -> Result<()> {
        invoke_compose(COMPOSE_PROGRAM, compose_file, project_dir).await
    }

    async fn wait(&self, services: &[String]) -> Result<()> {
        wait_for_services(&self.docker, services, &self.policy).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_up_args() {
        let args = compose_up_args(
            Path::new("/opt/astro/docker-compose.yml"),
            Path::new("/opt/astro"),
        );
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "compose",
                "-f",
                "/opt/astro/docker-compose.yml",
                "--project-directory",
                "/opt/astro",
                "up",
                "-d",
            ]
        );
    }

    #[tokio::test]
    async fn test_invoke_compose_success() {
        let result = invoke_compose("true", Path::new("compose.yml"), Path::new(".")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_invoke_compose_surfaces_stderr() {
        // sh は "compose" という名前のスクリプトを開こうとして失敗する
        let err = invoke_compose("sh", Path::new("compose.yml"), Path::new("."))
            .await
            .unwrap_err();

        match err {
            ContainerError::OrchestrationInvocation { code, stderr } => {
                assert_ne!(code, Some(0));
                assert!(stderr.contains("compose"), "stderr: {}", stderr);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invoke_compose_missing_program() {
        let err = invoke_compose(
            "astro-definitely-not-installed",
            Path::new("compose.yml"),
            Path::new("."),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ContainerError::CommandSpawnFailed { .. }));
    }
}
