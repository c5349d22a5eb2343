mod commands;
mod pipeline;
mod report;
mod setup;
mod tui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "astro")]
#[command(
    about = "質問に答えるだけで、メディアサーバーのスタックが動き出す。",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    setup: commands::setup::SetupArgs,

    /// 設定ファイルのパス（既定: ASTRO_CONFIG_PATH, /etc/astro/astro.yaml, ~/.config/astro/astro.yaml）
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// 回答ファイルから docker-compose.yml とダッシュボード設定を生成（起動しない）
    Render {
        /// 回答ファイル (YAML / JSON)
        answers: PathBuf,
        /// 出力ディレクトリ（省略時は docker-compose.yml を標準出力へ）
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ログは stderr へ（既定は warn、RUST_LOG で変更）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report::report(&err),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Version) => {
            println!("astro {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Render { answers, output }) => {
            commands::render::handle(&answers, output.as_deref(), cli.config.as_deref()).await
        }
        None => commands::setup::handle(&cli.setup, cli.config.as_deref()).await,
    }
}
