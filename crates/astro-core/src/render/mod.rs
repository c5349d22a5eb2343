//! ドキュメントレンダラー
//!
//! `StackPlan` を検証してから、Compose ドキュメントとダッシュボード設定を生成します。

pub mod compose;
pub mod homepage;

pub use compose::{ComposeDocument, ComposeNetwork, ComposeService};

use crate::error::Result;
use crate::layout::COMPOSE_FILE;
use crate::model::{Dashboard, StackPlan};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 生成したファイル（パスはスタックルートからの相対パス）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub contents: String,
}

impl RenderedFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// 1回分の生成結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedStack {
    pub compose: String,
    pub dashboard: Vec<RenderedFile>,
}

impl RenderedStack {
    /// 全ファイル（Compose が先頭）
    pub fn files(&self) -> impl Iterator<Item = (&Path, &str)> {
        std::iter::once((Path::new(COMPOSE_FILE), self.compose.as_str())).chain(
            self.dashboard
                .iter()
                .map(|f| (f.path.as_path(), f.contents.as_str())),
        )
    }

    /// 全ファイルを `dir` 配下に書き出す（ステージング用）
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        for (relative, contents) in self.files() {
            let path = dir.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, contents)?;
            debug!(path = %path.display(), "Wrote rendered file");
        }
        Ok(())
    }
}

/// Compose ドキュメントだけを生成
pub fn render_compose(plan: &StackPlan) -> Result<String> {
    plan.validate()?;
    ComposeDocument::from_plan(plan).to_yaml()
}

/// Compose ドキュメントとダッシュボード設定を生成
pub fn render_stack(plan: &StackPlan) -> Result<RenderedStack> {
    let compose = render_compose(plan)?;

    let dashboard = match plan.dashboard.kind {
        Dashboard::Homepage => homepage::render(&plan.dashboard)?,
        Dashboard::Heimdall => {
            info!("Heimdall has no file-based configuration, skipping dashboard files");
            Vec::new()
        }
    };

    info!(
        services = plan.services.len(),
        dashboard_files = dashboard.len(),
        "Rendered stack documents"
    );

    Ok(RenderedStack { compose, dashboard })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use crate::error::AstroError;
    use crate::layout::StackConfig;
    use crate::model::{ProbedCapabilities, Selection};

    #[test]
    fn test_render_rejects_invalid_plan() {
        let mut plan = assemble(
            &Selection::default(),
            &ProbedCapabilities::default(),
            &StackConfig::default(),
        );
        plan.services[1].depend_on("missing");

        assert!(matches!(
            render_compose(&plan),
            Err(AstroError::RenderError(_))
        ));
    }

    #[test]
    fn test_heimdall_renders_no_dashboard_files() {
        let selection = Selection {
            dashboard: Dashboard::Heimdall,
            ..Selection::default()
        };
        let plan = assemble(
            &selection,
            &ProbedCapabilities::default(),
            &StackConfig::default(),
        );

        let rendered = render_stack(&plan).unwrap();
        assert!(rendered.dashboard.is_empty());
        assert_eq!(rendered.files().count(), 1);
    }

    #[test]
    fn test_write_to_staging() {
        let dir = tempfile::tempdir().unwrap();
        let plan = assemble(
            &Selection::default(),
            &ProbedCapabilities::default(),
            &StackConfig::default(),
        );

        render_stack(&plan).unwrap().write_to(dir.path()).unwrap();

        assert!(dir.path().join("docker-compose.yml").is_file());
        assert!(dir.path().join("config/homepage/services.yaml").is_file());
    }
}
