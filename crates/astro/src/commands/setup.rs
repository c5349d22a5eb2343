//! 対話セットアップ（引数なしの `astro`）

use crate::pipeline::{Pipeline, RunOptions, RunOutcome};
use crate::setup::SetupLogger;
use crate::tui;
use astro_config::Settings;
use astro_container::{CapabilityProber, ComposeRuntime, ContainerError};
use astro_core::{Answers, DashboardGroup, Selection, StackConfig};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Default, clap::Args)]
pub struct SetupArgs {
    /// 回答ファイル (YAML / JSON) を使って非対話で実行
    #[arg(long, value_name = "FILE")]
    pub answers: Option<PathBuf>,
    /// 生成したドキュメントのステージングディレクトリを残す
    #[arg(long)]
    pub keep_artifacts: bool,
    /// ディレクトリの準備までで止める（docker compose up しない）
    #[arg(long)]
    pub no_up: bool,
}

pub async fn handle(args: &SetupArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let settings = Settings::load(config_path)?;
    let config = settings.stack_config();

    println!("{}", "Astro セットアップ".cyan().bold());
    println!("スタックの場所: {}", config.root.display().to_string().cyan());
    println!();

    // 検出だけなら Docker がなくても続行できる
    let docker = match bollard::Docker::connect_with_local_defaults() {
        Ok(docker) => Some(docker),
        Err(e) => {
            debug!(error = %e, "Docker client unavailable");
            None
        }
    };
    let prober = CapabilityProber::new(docker.clone(), &config.network_name);

    let runtime = if args.no_up {
        None
    } else {
        let docker = docker.ok_or_else(|| {
            ContainerError::DockerConnectionFailed(
                "Docker クライアントを初期化できません".to_string(),
            )
        })?;
        Some(ComposeRuntime::new(docker, settings.readiness.clone()))
    };

    let options = RunOptions {
        keep_artifacts: args.keep_artifacts,
    };
    let mut pipeline = Pipeline::new(&config, options, SetupLogger::new());

    let outcome = match &args.answers {
        Some(path) => {
            let selection = Selection::from_answers(&Answers::load(path)?)?;
            pipeline
                .run(&prober, move |_, _| Ok(selection), runtime.as_ref())
                .await
        }
        None => {
            let vpn_available = config.vpn_credentials.is_some();
            pipeline
                .run(
                    &prober,
                    |initial, capabilities| {
                        tui::run_setup_wizard(initial, capabilities, vpn_available)
                    },
                    runtime.as_ref(),
                )
                .await
        }
    };

    pipeline.logger().print_summary(config.root.display().to_string().as_str());
    let outcome = outcome?;
    print_next_steps(&config, &outcome);
    Ok(())
}

fn print_next_steps(config: &StackConfig, outcome: &RunOutcome) {
    println!();
    if outcome.started {
        println!("{}", "✓ スタックを起動しました".green().bold());
    } else {
        println!("{}", "✓ スタックの準備ができました".green().bold());
        println!(
            "  起動するには: docker compose -f {} up -d",
            config.compose_path().display()
        );
    }

    let dashboard = &outcome.plan.dashboard;
    let entries: Vec<_> = DashboardGroup::ALL
        .iter()
        .flat_map(|group| dashboard.entries_in(*group))
        .collect();

    if !entries.is_empty() {
        println!();
        println!("{}", "アクセス先:".bold());
        for entry in entries {
            println!("  • {:<14} {}", entry.display_name, entry.url.cyan());
        }
    }

    if let Some(artifacts) = &outcome.artifacts {
        println!();
        println!("生成物: {}", artifacts.display());
    }
}
