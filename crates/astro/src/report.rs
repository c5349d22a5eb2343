//! 失敗の分類と終了コード

use astro_config::ConfigError;
use astro_container::ContainerError;
use astro_core::AstroError;
use colored::Colorize;
use std::process::ExitCode;

/// 失敗の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Aborted,
    Configuration,
    /// カタログ・レンダリングの内部エラー
    Internal,
    Provisioning,
    Orchestration,
    /// Docker が応答しない
    Runtime,
    Other,
}

impl FailureCategory {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Other => 1,
            Self::Aborted => 2,
            Self::Configuration => 3,
            Self::Internal => 4,
            Self::Provisioning => 5,
            Self::Orchestration => 6,
            Self::Runtime => 7,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Aborted => "セットアップを中止しました",
            Self::Configuration => "設定エラー",
            Self::Internal => "構成エラー",
            Self::Provisioning => "プロビジョニングエラー",
            Self::Orchestration => "スタック起動エラー",
            Self::Runtime => "Docker接続エラー",
            Self::Other => "エラー",
        }
    }
}

/// エラーチェーンから分類を決める
pub fn categorize(err: &anyhow::Error) -> FailureCategory {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<AstroError>() {
            return match e {
                AstroError::UserAborted => FailureCategory::Aborted,
                AstroError::UnknownServiceVariant { .. } | AstroError::RenderError(_) => {
                    FailureCategory::Internal
                }
                AstroError::InvalidAnswers { .. } => FailureCategory::Configuration,
                AstroError::PathCreationError { .. } => FailureCategory::Provisioning,
                AstroError::Io(_) => FailureCategory::Other,
            };
        }
        if let Some(e) = cause.downcast_ref::<ContainerError>() {
            return match e {
                ContainerError::OrchestrationInvocation { .. }
                | ContainerError::CommandSpawnFailed { .. } => FailureCategory::Orchestration,
                ContainerError::RuntimeNotReady { .. }
                | ContainerError::DockerConnectionFailed(_)
                | ContainerError::DockerApiError(_) => FailureCategory::Runtime,
            };
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return FailureCategory::Configuration;
        }
    }
    FailureCategory::Other
}

/// エラーを表示して終了コードを返す
pub fn report(err: &anyhow::Error) -> ExitCode {
    let category = categorize(err);

    eprintln!();
    if category == FailureCategory::Aborted {
        eprintln!("{}", category.title().yellow());
        eprintln!("  何も変更していません");
    } else {
        eprintln!("{}", format!("✗ {}", category.title()).red().bold());
        eprintln!();
        eprintln!("{}", "原因:".yellow());
        for line in format!("{:#}", err).lines() {
            eprintln!("  {}", line);
        }
    }

    tracing::debug!(category = ?category, error = ?err, "Setup failed");
    ExitCode::from(category.exit_code())
}
