use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AstroError {
    #[error("セットアップがキャンセルされました")]
    UserAborted,

    #[error("未知の選択肢です: {axis} = '{value}'\n選択可能な値: {expected}")]
    UnknownServiceVariant {
        axis: &'static str,
        value: String,
        expected: String,
    },

    #[error(
        "構成ドキュメントを生成できません: {0}\n\nヒント:\n  • これは内部エラーです。選択内容と一緒に報告してください"
    )]
    RenderError(String),

    #[error(
        "ディレクトリを作成できません: {path}\n理由: {message}\n\nヒント:\n  • 権限とディスク容量を確認してから再実行してください"
    )]
    PathCreationError { path: PathBuf, message: String },

    #[error("回答ファイルを読み込めません: {path}\n理由: {message}")]
    InvalidAnswers { path: PathBuf, message: String },

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AstroError>;
