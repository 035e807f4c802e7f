//! vmpilot - drive a language model through tasks on a remote desktop

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;

mod commands;

use commands::{batch_command, init_command, run_command, status_command, RunOverrides};

/// vmpilot - tool-driven model sessions on a remote desktop
#[derive(Parser)]
#[command(name = "vmpilot")]
#[command(about = "◆ Drive a language model through tasks on a remote virtual desktop")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Config file (defaults to ~/.vmpilot/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config
    Init,
    /// Show configuration status
    Status,
    /// Run one task on a fresh desktop
    Run {
        /// Task for the model
        #[arg(short, long)]
        task: String,
        /// Additional context for the task
        #[arg(short, long)]
        description: Option<String>,
        /// Stop after this many model calls
        #[arg(long)]
        max_turns: Option<u32>,
        /// Desktop size to request
        #[arg(long)]
        instance_type: Option<String>,
        /// Do not start a browser in the desktop
        #[arg(long)]
        no_browser: bool,
        /// Save the conversation transcript to this directory
        #[arg(long)]
        transcript_dir: Option<PathBuf>,
    },
    /// Run every task in a JSON file, one desktop each
    Batch {
        /// JSON array of {task, description?, max_turns?, instance_type?}
        #[arg(short, long)]
        file: PathBuf,
        /// Do not start a browser in the desktops
        #[arg(long)]
        no_browser: bool,
        /// Save conversation transcripts to this directory
        #[arg(long)]
        transcript_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(vmpilot_config::config_path);

    match cli.command {
        Commands::Init => {
            if let Err(e) = init_command(&config_path).await {
                error!("Init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Status => {
            if let Err(e) = status_command(&config_path).await {
                error!("Status failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Run {
            task,
            description,
            max_turns,
            instance_type,
            no_browser,
            transcript_dir,
        } => {
            let overrides = RunOverrides {
                no_browser,
                transcript_dir,
            };
            if let Err(e) = run_command(
                &config_path,
                task,
                description,
                max_turns,
                instance_type,
                overrides,
            )
            .await
            {
                error!("Run failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Batch {
            file,
            no_browser,
            transcript_dir,
        } => {
            let overrides = RunOverrides {
                no_browser,
                transcript_dir,
            };
            if let Err(e) = batch_command(&config_path, &file, overrides).await {
                error!("Batch failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}
