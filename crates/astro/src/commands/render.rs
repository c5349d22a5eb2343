//! `astro render`: 回答ファイルからドキュメントだけを生成

use astro_config::Settings;
use astro_container::CapabilityProber;
use astro_core::{Answers, Selection, assemble, render_stack};
use colored::Colorize;
use std::path::Path;

pub async fn handle(
    answers: &Path,
    output: Option<&Path>,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    let settings = Settings::load(config_path)?;
    let config = settings.stack_config();
    let selection = Selection::from_answers(&Answers::load(answers)?)?;

    // 出力を安定させるため、デバイスノードだけを見る
    let capabilities = CapabilityProber::new(None, &config.network_name)
        .without_commands()
        .probe()
        .await;

    let plan = assemble(&selection, &capabilities, &config);
    for notice in &plan.notices {
        eprintln!("{} {}", "⚠".yellow(), notice.to_string().yellow());
    }

    let rendered = render_stack(&plan)?;

    match output {
        Some(dir) => {
            rendered.write_to(dir)?;
            for (relative, _) in rendered.files() {
                println!("  {} {}", "✓".green(), dir.join(relative).display());
            }
        }
        None => print!("{}", rendered.compose),
    }

    Ok(())
}
