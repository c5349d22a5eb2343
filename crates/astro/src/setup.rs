//! セットアップの進捗表示
//!
//! 各フェーズの開始・完了・所要時間をタイムスタンプ付きで出力する。

use chrono::Local;
use colored::Colorize;
use std::time::{Duration, Instant};

/// セットアップのフェーズ
///
/// `Collecting` だけが再入可能（ウィザード内で戻れる）。
/// どのフェーズで失敗しても `Failed` になり、`Invoking` には進まない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// ホスト環境の検出
    Probing,
    /// 構成の選択
    Collecting,
    /// スタック計画の組み立て
    Assembling,
    /// ドキュメント生成
    Rendering,
    /// ディレクトリ作成とファイル配置
    Provisioning,
    /// docker compose up
    Invoking,
    Done,
    Failed,
}

impl Phase {
    /// フェーズの日本語名
    pub fn name(&self) -> &'static str {
        match self {
            Self::Probing => "ホスト環境の検出",
            Self::Collecting => "構成の選択",
            Self::Assembling => "スタックの組み立て",
            Self::Rendering => "ドキュメント生成",
            Self::Provisioning => "ディレクトリ準備",
            Self::Invoking => "スタック起動",
            Self::Done => "完了",
            Self::Failed => "失敗",
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Probing => "probing",
            Self::Collecting => "collecting",
            Self::Assembling => "assembling",
            Self::Rendering => "rendering",
            Self::Provisioning => "provisioning",
            Self::Invoking => "invoking",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// フェーズの実行結果
#[derive(Debug, Clone)]
pub enum StepResult {
    /// 成功
    Success {
        duration: Duration,
        message: Option<String>,
    },
    /// スキップ（--no-up 等）
    Skipped { reason: String },
    /// 失敗
    Failed { error: String, duration: Duration },
}

impl StepResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Skipped { .. })
    }

    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::Success { duration, .. } => Some(*duration),
            Self::Failed { duration, .. } => Some(*duration),
            Self::Skipped { .. } => None,
        }
    }
}

/// セットアップログ出力器
pub struct SetupLogger {
    start_time: Instant,
    step_results: Vec<(Phase, StepResult)>,
    current_step: Option<(Phase, Instant)>,
    quiet: bool,
}

impl SetupLogger {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            step_results: Vec::new(),
            current_step: None,
            quiet: false,
        }
    }

    /// 何も出力しない（結果の記録だけ行う）
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::new()
        }
    }

    /// フェーズ開始をログ出力
    pub fn start_step(&mut self, phase: Phase) {
        if !self.quiet {
            println!("[{}] {} {}", timestamp().dimmed(), "▶".cyan(), phase.name());
        }
        self.current_step = Some((phase, Instant::now()));
    }

    /// フェーズ成功をログ出力
    pub fn step_success(&mut self, message: Option<&str>) {
        if let Some((phase, start)) = self.current_step.take() {
            let duration = start.elapsed();

            if !self.quiet {
                let duration_str = format_duration(duration);
                match message {
                    Some(msg) => println!(
                        "[{}] {} {} ({})",
                        timestamp().dimmed(),
                        "✓".green().bold(),
                        msg,
                        duration_str.dimmed()
                    ),
                    None => println!(
                        "[{}] {} {} 完了 ({})",
                        timestamp().dimmed(),
                        "✓".green().bold(),
                        phase.name(),
                        duration_str.dimmed()
                    ),
                }
            }

            self.step_results.push((
                phase,
                StepResult::Success {
                    duration,
                    message: message.map(String::from),
                },
            ));
        }
    }

    /// フェーズスキップをログ出力
    pub fn step_skipped(&mut self, reason: &str) {
        if let Some((phase, _)) = self.current_step.take() {
            if !self.quiet {
                println!(
                    "[{}] {} {} ({})",
                    timestamp().dimmed(),
                    "⏭".yellow(),
                    phase.name(),
                    reason.dimmed()
                );
            }

            self.step_results.push((
                phase,
                StepResult::Skipped {
                    reason: reason.to_string(),
                },
            ));
        }
    }

    /// フェーズ失敗をログ出力
    pub fn step_failed(&mut self, error: &str) {
        if let Some((phase, start)) = self.current_step.take() {
            let duration = start.elapsed();

            if !self.quiet {
                // 詳細は最後にまとめて表示するので1行目だけ
                let headline = error.lines().next().unwrap_or_default();
                println!(
                    "[{}] {} {}: {}",
                    timestamp().dimmed(),
                    "✗".red().bold(),
                    phase.name(),
                    headline.red()
                );
            }

            self.step_results.push((
                phase,
                StepResult::Failed {
                    error: error.to_string(),
                    duration,
                },
            ));
        }
    }

    /// 詳細メッセージをログ出力
    pub fn log_detail(&self, message: &str) {
        if !self.quiet {
            println!("[{}]   → {}", timestamp().dimmed(), message.cyan());
        }
    }

    /// 注意メッセージをログ出力
    pub fn log_warning(&self, message: &str) {
        if !self.quiet {
            println!("[{}]   {} {}", timestamp().dimmed(), "⚠".yellow(), message.yellow());
        }
    }

    /// サマリーを出力
    pub fn print_summary(&self, title: &str) {
        if self.quiet {
            return;
        }

        let total_duration = self.start_time.elapsed();
        let error_count = self
            .step_results
            .iter()
            .filter(|(_, result)| matches!(result, StepResult::Failed { .. }))
            .count();

        let slowest_step = self
            .step_results
            .iter()
            .filter_map(|(phase, result)| result.duration().map(|d| (phase, d)))
            .max_by_key(|(_, d)| *d);

        println!();
        println!("{}", "═".repeat(44));
        println!("Setup Summary: {}", title.cyan().bold());
        println!("{}", "─".repeat(44));
        println!("Total time:    {}", format_duration(total_duration).green());

        if let Some((phase, duration)) = slowest_step {
            println!(
                "Slowest step:  {} ({})",
                phase.name(),
                format_duration(duration)
            );
        }

        if error_count > 0 {
            println!("Errors:        {}", error_count.to_string().red().bold());
        } else {
            println!("Errors:        {}", "0".green());
        }
        println!("{}", "═".repeat(44));
    }

    /// 全フェーズが成功したか
    pub fn all_success(&self) -> bool {
        self.step_results
            .iter()
            .all(|(_, result)| result.is_success())
    }

    /// 記録済みの結果
    pub fn results(&self) -> &[(Phase, StepResult)] {
        &self.step_results
    }
}

impl Default for SetupLogger {
    fn default() -> Self {
        Self::new()
    }
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Duration を読みやすい形式にフォーマット
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 60 {
        let minutes = total_secs / 60;
        let secs = total_secs % 60;
        format!("{}m {}s", minutes, secs)
    } else if total_secs >= 1 {
        format!("{}.{}s", total_secs, millis / 100)
    } else {
        format!("{}ms", millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
    }

    #[test]
    fn test_logger_records_results() {
        let mut logger = SetupLogger::quiet();

        logger.start_step(Phase::Probing);
        logger.step_success(None);

        logger.start_step(Phase::Invoking);
        logger.step_skipped("--no-up");
        assert!(logger.all_success());

        logger.start_step(Phase::Provisioning);
        logger.step_failed("ディレクトリを作成できません\n詳細");
        assert!(!logger.all_success());

        let phases: Vec<Phase> = logger.results().iter().map(|(p, _)| *p).collect();
        assert_eq!(
            phases,
            vec![Phase::Probing, Phase::Invoking, Phase::Provisioning]
        );
    }

    #[test]
    fn test_step_without_start_is_ignored() {
        let mut logger = SetupLogger::quiet();
        logger.step_success(Some("noop"));
        logger.step_failed("noop");
        assert!(logger.results().is_empty());
    }
}
