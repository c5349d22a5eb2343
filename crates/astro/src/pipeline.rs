//! セットアップのパイプライン
//!
//! Probing → Collecting → Assembling → Rendering → Provisioning → Invoking の順に
//! 実行します。どこかで失敗した時点で止まり、スタックは起動しません。

use crate::setup::{Phase, SetupLogger};
use anyhow::Context;
use astro_container::{CapabilityProber, StackRuntime};
use astro_core::{
    Answers, ProbedCapabilities, Provisioner, RenderedStack, Selection,
    StackConfig, StackPlan, assemble, render_stack,
};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// パイプラインの実行オプション
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// ステージングディレクトリを残す
    pub keep_artifacts: bool,
}

/// 成功時の結果
#[derive(Debug)]
pub struct RunOutcome {
    pub plan: StackPlan,
    /// 残したステージングディレクトリ
    pub artifacts: Option<PathBuf>,
    pub started: bool,
}

pub struct Pipeline<'a> {
    config: &'a StackConfig,
    options: RunOptions,
    logger: SetupLogger,
    phase: Phase,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a StackConfig, options: RunOptions, logger: SetupLogger) -> Self {
        Self {
            config,
            options,
            logger,
            phase: Phase::Probing,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn logger(&self) -> &SetupLogger {
        &self.logger
    }

    /// 前回の回答（なければ既定値）
    pub fn previous_selection(&self) -> Selection {
        let path = self.config.answers_path();
        if !path.is_file() {
            return Selection::default();
        }

        match Answers::load(&path).and_then(|answers| Selection::from_answers(&answers)) {
            Ok(selection) => {
                debug!(path = %path.display(), "Loaded previous answers");
                selection
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable previous answers");
                Selection::default()
            }
        }
    }

    /// パイプライン全体を実行
    ///
    /// `runtime` が None のときは Provisioning で止まります（--no-up）。
    pub async fn run<C, R>(
        &mut self,
        prober: &CapabilityProber,
        collect: C,
        runtime: Option<&R>,
    ) -> anyhow::Result<RunOutcome>
    where
        C: FnOnce(Selection, &ProbedCapabilities) -> anyhow::Result<Selection>,
        R: StackRuntime,
    {
        let result = self.run_phases(prober, collect, runtime).await;
        match &result {
            Ok(_) => self.phase = Phase::Done,
            Err(e) => {
                self.logger.step_failed(&format!("{:#}", e));
                self.phase = Phase::Failed;
            }
        }
        result
    }

    async fn run_phases<C, R>(
        &mut self,
        prober: &CapabilityProber,
        collect: C,
        runtime: Option<&R>,
    ) -> anyhow::Result<RunOutcome>
    where
        C: FnOnce(Selection, &ProbedCapabilities) -> anyhow::Result<Selection>,
        R: StackRuntime,
    {
        self.enter(Phase::Probing);
        let capabilities = prober.probe().await;
        self.logger.step_success(Some(&describe_capabilities(&capabilities)));

        self.enter(Phase::Collecting);
        let selection = collect(self.previous_selection(), &capabilities)?;
        self.logger.step_success(None);

        self.enter(Phase::Assembling);
        let plan = assemble(&selection, &capabilities, self.config);
        for notice in &plan.notices {
            self.logger.log_warning(&notice.to_string());
        }
        self.logger
            .step_success(Some(&format!("{} 個のサービス", plan.services.len())));

        self.enter(Phase::Rendering);
        let rendered = render_stack(&plan)?;
        let artifacts = self.stage(&rendered)?;
        self.logger.step_success(None);

        self.enter(Phase::Provisioning);
        let provisioner = Provisioner::new(self.config);
        let report = provisioner.provision(&plan, &rendered)?;
        provisioner.save_answers(&selection.to_answers())?;
        self.logger.step_success(Some(&format!(
            "ディレクトリ {} 個を作成、ファイル {} 個を配置",
            report.created_dirs.len(),
            report.installed.len()
        )));

        self.enter(Phase::Invoking);
        let started = match runtime {
            Some(runtime) => {
                self.invoke(runtime, &plan).await?;
                true
            }
            None => {
                self.logger.step_skipped("--no-up");
                false
            }
        };

        Ok(RunOutcome {
            plan,
            artifacts,
            started,
        })
    }

    fn enter(&mut self, phase: Phase) {
        debug!(phase = phase.id(), "Entering phase");
        self.phase = phase;
        self.logger.start_step(phase);
    }

    /// 生成物を一時ディレクトリに書き出す
    fn stage(&self, rendered: &RenderedStack) -> anyhow::Result<Option<PathBuf>> {
        let staging = tempfile::Builder::new()
            .prefix("astro-render-")
            .tempdir()
            .context("ステージングディレクトリを作成できません")?;
        rendered.write_to(staging.path())?;

        if self.options.keep_artifacts {
            let kept = staging.keep();
            self.logger
                .log_detail(&format!("生成物: {}", kept.display()));
            Ok(Some(kept))
        } else {
            Ok(None)
        }
    }

    async fn invoke<R: StackRuntime>(&mut self, runtime: &R, plan: &StackPlan) -> anyhow::Result<()> {
        runtime.ensure_ready().await?;
        runtime
            .up(&self.config.compose_path(), &self.config.root)
            .await?;

        let services: Vec<String> = plan.service_names().map(String::from).collect();
        match runtime.wait(&services).await {
            Ok(()) => {
                self.logger.step_success(Some("全サービスが起動しました"));
            }
            Err(e) => {
                // compose up 自体は成功しているので失敗にはしない
                warn!(error = %e, "Services did not become ready in time");
                self.logger.log_warning(
                    "一部のサービスの起動確認がタイムアウトしました（docker ps で確認してください）",
                );
                self.logger.step_success(Some("スタックを起動しました"));
            }
        }

        info!(services = services.len(), "Stack started");
        Ok(())
    }
}

fn describe_capabilities(capabilities: &ProbedCapabilities) -> String {
    let gpus = if capabilities.gpus.is_empty() {
        "なし".to_string()
    } else {
        capabilities
            .gpus
            .iter()
            .map(|gpu| format!("{:?}", gpu))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "GPU: {} / アドレス: {}",
        gpus,
        capabilities.host_address.as_deref().unwrap_or("不明")
    )
}
