use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "設定ファイルが見つかりません: {path}\n\nヒント:\n  • --config または ASTRO_CONFIG_PATH のパスを確認してください"
    )]
    NotFound { path: PathBuf },

    #[error("設定ファイルを解析できません: {path}\n理由: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("設定値が不正です: {0}")]
    Invalid(String),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
