use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error(
        "Dockerに接続できません: {0}\n\nヒント:\n  • Dockerが起動しているか確認してください: systemctl status docker\n  • 現在のユーザーが docker グループに所属しているか確認してください"
    )]
    DockerConnectionFailed(String),

    #[error("Docker APIエラー: {0}")]
    DockerApiError(String),

    #[error(
        "{target} の準備完了を待機中にタイムアウトしました（{attempts}回試行）\n\nヒント:\n  • docker ps コマンドが正常に動作するか確認してください\n  • 設定ファイルの readiness を増やしてみてください"
    )]
    RuntimeNotReady { target: String, attempts: u32 },

    #[error("{program} を実行できません: {message}")]
    CommandSpawnFailed { program: String, message: String },

    #[error("docker compose が失敗しました（終了コード: {}）\n{stderr}", code.map(|c| c.to_string()).unwrap_or_else(|| "なし".to_string()))]
    OrchestrationInvocation { code: Option<i32>, stderr: String },
}

impl From<bollard::errors::Error> for ContainerError {
    fn from(err: bollard::errors::Error) -> Self {
        let err_str = err.to_string();
        if err_str.contains("Connection refused") || err_str.contains("No such file or directory")
        {
            ContainerError::DockerConnectionFailed(err_str)
        } else {
            ContainerError::DockerApiError(err_str)
        }
    }
}

pub type Result<T> = std::result::Result<T, ContainerError>;
