//! vmpilot command implementations

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vmpilot_config::Config;
use vmpilot_environment::HttpLauncher;
use vmpilot_provider::AnthropicProvider;
use vmpilot_session::{load_tasks, SessionOptions, SessionReport, SessionRunner, TaskSpec};

/// Command-line adjustments applied on top of the config file
#[derive(Debug, Default)]
pub struct RunOverrides {
    pub no_browser: bool,
    pub transcript_dir: Option<PathBuf>,
}

/// Write a default config unless one exists
pub async fn init_command(config_path: &Path) -> Result<()> {
    println!("◆ Initializing vmpilot...");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    vmpilot_config::init_at(config_path)
        .await
        .with_context(|| format!("Failed to initialize {}", config_path.display()))?;

    println!("\n◆ Config ready at {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Set model.api_key (Anthropic) and environment.api_key (desktop service)");
    println!("  2. Run a task: vmpilot run --task \"Create a data visualization example\"");

    Ok(())
}

/// Show status
pub async fn status_command(config_path: &Path) -> Result<()> {
    println!("◆ vmpilot Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!(
        "Config:      {} {}",
        config_path.display(),
        if config_path.exists() {
            "[OK]"
        } else {
            "[Missing]"
        }
    );

    let config = Config::load_from(config_path).await?;
    println!("Model:       {}", config.model.model);
    println!("Model key:   {}", key_status(config.has_model_key()));
    println!("Desktop API: {}", config.environment.api_base);
    println!("Desktop key: {}", key_status(config.has_environment_key()));
    println!("Instance:    {}", config.environment.instance_type);
    println!("Tools:       {}", config.agent.tools.join(", "));
    println!(
        "Turn cap:    {}",
        config
            .agent
            .max_turns
            .map(|n| n.to_string())
            .unwrap_or_else(|| "none".to_string())
    );

    println!("\n◆ Ready");

    Ok(())
}

fn key_status(set: bool) -> &'static str {
    if set {
        "[Set]"
    } else {
        "[Missing]"
    }
}

/// Run one task
pub async fn run_command(
    config_path: &Path,
    task: String,
    description: Option<String>,
    max_turns: Option<u32>,
    instance_type: Option<String>,
    overrides: RunOverrides,
) -> Result<()> {
    let config = Config::load_from(config_path).await?;
    let runner = build_runner(&config, overrides)?;

    let spec = TaskSpec {
        task,
        description,
        max_turns,
        instance_type,
    };
    let cancel = cancel_on_ctrl_c();
    let report = runner.run_with_cancel(&spec, &cancel).await?;
    print_report(&report);

    Ok(())
}

/// Run every task in a file, continuing past failures
pub async fn batch_command(config_path: &Path, file: &Path, overrides: RunOverrides) -> Result<()> {
    let config = Config::load_from(config_path).await?;
    let tasks = load_tasks(file)
        .await
        .with_context(|| format!("Failed to read tasks from {}", file.display()))?;
    if tasks.is_empty() {
        println!("No tasks in {}", file.display());
        return Ok(());
    }

    let runner = build_runner(&config, overrides)?;
    info!("◆ RUNNING {} TASKS", tasks.len());
    let cancel = cancel_on_ctrl_c();
    let entries = runner.run_batch_with_cancel(&tasks, &cancel).await;

    println!("\n◆ Batch summary");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    let mut failed = 0;
    for entry in &entries {
        match &entry.result {
            Ok(report) => println!(
                "✓ {} ({} turns on {})",
                entry.task.task, report.outcome.turns, report.environment_id
            ),
            Err(e) => {
                failed += 1;
                println!("✗ {}: {}", entry.task.task, e);
            }
        }
    }

    if entries.len() < tasks.len() {
        println!("- {} tasks skipped", tasks.len() - entries.len());
    }

    if failed > 0 || entries.len() < tasks.len() {
        anyhow::bail!(
            "{} of {} tasks failed, {} skipped",
            failed,
            tasks.len(),
            tasks.len() - entries.len()
        );
    }
    Ok(())
}

/// A token that fires on the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("◆ INTERRUPT RECEIVED, STOPPING THE DESKTOP");
            token.cancel();
        }
    });
    cancel
}

fn build_runner(config: &Config, overrides: RunOverrides) -> Result<SessionRunner<AnthropicProvider>> {
    anyhow::ensure!(
        config.has_model_key(),
        "No model API key configured. Set model.api_key in the config file"
    );
    anyhow::ensure!(
        config.has_environment_key(),
        "No desktop API key configured. Set environment.api_key in the config file"
    );

    let provider = AnthropicProvider::with_timeout(
        config.model.api_key.clone(),
        config.model.api_base.clone(),
        Some(config.model.model.clone()),
        config.model_timeout(),
    )
    .context("Failed to build model client")?;
    let launcher = HttpLauncher::with_timeout(
        config.environment.api_key.clone(),
        config.environment.api_base.clone(),
        config.environment_timeout(),
    )
    .context("Failed to build desktop client")?;

    let mut options = SessionOptions::from_config(config)?;
    if overrides.no_browser {
        options.start_browser = false;
    }
    if let Some(dir) = overrides.transcript_dir {
        options = options.with_transcript_dir(dir);
    }

    Ok(SessionRunner::new(
        Arc::new(launcher),
        Arc::new(provider),
        options,
    ))
}

fn print_report(report: &SessionReport) {
    if !report.outcome.final_text.is_empty() {
        println!("\n◆ {}", report.outcome.final_text);
    }
    println!(
        "\n◆ Done in {} turns on {} ({}s)",
        report.outcome.turns,
        report.environment_id,
        (report.finished_at - report.started_at).num_seconds()
    );
    if let Some(path) = &report.transcript {
        println!("◆ Transcript saved to {}", path.display());
    }
}
