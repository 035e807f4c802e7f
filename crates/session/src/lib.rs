//! Task sessions
//!
//! A session acquires one remote desktop, runs the conversation loop against
//! it and stops the desktop again on every path. Batches run sessions one
//! after another.

use chrono::{DateTime, Local};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vmpilot_agent::tools::registry_for;
use vmpilot_agent::{
    AgentError, BuiltinTool, ContextBuilder, ConversationLoop, FallbackRecovery, LoopOutcome,
    LoopSettings,
};
use vmpilot_config::paths::safe_filename;
use vmpilot_config::Config;
use vmpilot_environment::{Environment, EnvironmentError, EnvironmentLauncher};
use vmpilot_provider::{Message, Provider};

/// Session errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("◆ SESSION INTERRUPTED")]
    Interrupted,

    #[error("◆ UNKNOWN TOOL IN CONFIG: {0}")]
    UnknownTool(String),

    #[error("◆ TRANSCRIPT IO ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("◆ MALFORMED TASK FILE: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// One task to hand to the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Overrides the configured turn cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    /// Overrides the configured instance type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
}

impl TaskSpec {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Read a JSON array of tasks
pub async fn load_tasks(path: &Path) -> Result<Vec<TaskSpec>> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Everything a session needs besides the task itself
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub instance_type: String,
    pub start_browser: bool,
    pub tools: Vec<BuiltinTool>,
    pub fallback: Option<FallbackRecovery>,
    pub settings: LoopSettings,
    pub persona: String,
    pub output_dir: Option<String>,
    /// Where finished conversations are written, if anywhere
    pub transcript_dir: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            instance_type: "medium".to_string(),
            start_browser: false,
            tools: BuiltinTool::ALL.to_vec(),
            fallback: None,
            settings: LoopSettings::default(),
            persona: String::new(),
            output_dir: None,
            transcript_dir: None,
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        let tools = config
            .agent
            .tools
            .iter()
            .map(|name| {
                BuiltinTool::from_name(name).ok_or_else(|| SessionError::UnknownTool(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let fallback = config.agent.fallback.as_ref().map(|f| {
            FallbackRecovery::new(
                f.trigger_tool.clone(),
                f.fallback_tool.clone(),
                f.fallback_input.clone(),
            )
        });

        Ok(Self {
            instance_type: config.environment.instance_type.clone(),
            start_browser: config.environment.start_browser,
            tools,
            fallback,
            settings: LoopSettings {
                model: config.model.model.clone(),
                max_tokens: config.model.max_tokens,
                temperature: config.model.temperature,
                betas: config.model.betas.clone(),
                max_turns: config.agent.max_turns,
            },
            persona: config.agent.persona.clone(),
            output_dir: config.agent.output_dir.clone(),
            transcript_dir: None,
        })
    }

    pub fn with_transcript_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.transcript_dir = Some(dir.into());
        self
    }
}

/// What a finished session reports
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub environment_id: String,
    pub cdp_url: Option<String>,
    pub outcome: LoopOutcome,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub transcript: Option<PathBuf>,
}

/// One batch entry and how it went
#[derive(Debug)]
pub struct BatchEntry {
    pub task: TaskSpec,
    pub result: Result<SessionReport>,
}

/// Transcript file contents
#[derive(Debug, Serialize)]
struct Transcript<'a> {
    task: &'a TaskSpec,
    environment_id: &'a str,
    started_at: DateTime<Local>,
    finished_at: DateTime<Local>,
    turns: u32,
    messages: &'a [Message],
}

/// Runs tasks, one desktop per task
pub struct SessionRunner<P: Provider + ?Sized> {
    launcher: Arc<dyn EnvironmentLauncher>,
    provider: Arc<P>,
    options: SessionOptions,
}

impl<P: Provider + ?Sized> SessionRunner<P> {
    pub fn new(
        launcher: Arc<dyn EnvironmentLauncher>,
        provider: Arc<P>,
        options: SessionOptions,
    ) -> Self {
        Self {
            launcher,
            provider,
            options,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Run one task. The desktop is stopped exactly once whatever happens;
    /// a failed stop is only reported when the task itself succeeded.
    pub async fn run(&self, spec: &TaskSpec) -> Result<SessionReport> {
        self.run_with_cancel(spec, &CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), but gives up when `cancel` fires.
    ///
    /// Cancellation and panics inside the conversation still stop the
    /// desktop before returning `Interrupted` or resuming the panic.
    pub async fn run_with_cancel(
        &self,
        spec: &TaskSpec,
        cancel: &CancellationToken,
    ) -> Result<SessionReport> {
        if cancel.is_cancelled() {
            return Err(SessionError::Interrupted);
        }

        let instance_type = spec
            .instance_type
            .as_deref()
            .unwrap_or(&self.options.instance_type);
        let started_at = Local::now();

        let env = self.launcher.launch(instance_type).await?;
        info!("◆ SESSION STARTED ON {}: {}", env.id(), spec.task);

        let driven = tokio::select! {
            driven = AssertUnwindSafe(self.drive(env.clone(), spec, started_at)).catch_unwind() => driven,
            _ = cancel.cancelled() => {
                warn!("◆ SESSION ON {} INTERRUPTED", env.id());
                Ok(Err(SessionError::Interrupted))
            }
        };
        let released = env.stop().await;

        let result = match driven {
            Ok(result) => result,
            Err(panic) => {
                match released {
                    Ok(()) => warn!("◆ SESSION PANICKED, {} RELEASED", env.id()),
                    Err(e) => warn!("◆ SESSION PANICKED, FAILED TO RELEASE {}: {}", env.id(), e),
                }
                std::panic::resume_unwind(panic);
            }
        };

        match (result, released) {
            (Ok(report), Ok(())) => {
                info!(
                    "◆ SESSION COMPLETE AFTER {} TURNS ON {}",
                    report.outcome.turns, report.environment_id
                );
                Ok(report)
            }
            (Ok(_), Err(e)) => {
                warn!("◆ FAILED TO RELEASE {}: {}", env.id(), e);
                Err(e.into())
            }
            (Err(e), Err(release)) => {
                warn!("◆ FAILED TO RELEASE {}: {}", env.id(), release);
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
        }
    }

    /// Run tasks one after another; a failed task does not stop the batch
    pub async fn run_batch(&self, specs: &[TaskSpec]) -> Vec<BatchEntry> {
        self.run_batch_with_cancel(specs, &CancellationToken::new())
            .await
    }

    /// Like [`run_batch`](Self::run_batch); once `cancel` fires the
    /// remaining tasks are skipped and get no entry.
    pub async fn run_batch_with_cancel(
        &self,
        specs: &[TaskSpec],
        cancel: &CancellationToken,
    ) -> Vec<BatchEntry> {
        let mut entries = Vec::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("◆ BATCH INTERRUPTED, SKIPPING {} TASKS", specs.len() - i);
                break;
            }
            info!("◆ BATCH TASK {}/{}: {}", i + 1, specs.len(), spec.task);
            let result = self.run_with_cancel(spec, cancel).await;
            if let Err(e) = &result {
                warn!("◆ BATCH TASK {} FAILED: {}", i + 1, e);
            }
            entries.push(BatchEntry {
                task: spec.clone(),
                result,
            });
        }
        entries
    }

    async fn drive(
        &self,
        env: Arc<dyn Environment>,
        spec: &TaskSpec,
        started_at: DateTime<Local>,
    ) -> Result<SessionReport> {
        let cdp_url = if self.options.start_browser {
            let url = env.start_browser().await?;
            debug!("◆ BROWSER READY AT {}", url);
            Some(url)
        } else {
            None
        };

        let mut context = ContextBuilder::new(self.options.persona.clone());
        if let Some(dir) = &self.options.output_dir {
            context = context.with_output_dir(dir.clone());
        }

        let mut settings = self.options.settings.clone();
        if spec.max_turns.is_some() {
            settings.max_turns = spec.max_turns;
        }

        let mut agent = ConversationLoop::new(
            self.provider.clone(),
            registry_for(env.clone(), &self.options.tools),
            context.build_system_prompt(),
        )
        .with_settings(settings);
        if let Some(fallback) = &self.options.fallback {
            agent.add_recovery(Box::new(fallback.clone()));
        }

        let message = ContextBuilder::task_message(&spec.task, spec.description.as_deref());
        let outcome = match agent.run(&message).await {
            Ok(outcome) => outcome,
            Err(AgentError::MaxTurns { max_turns, partial }) => {
                // Keep what the capped conversation did
                if let Err(e) = self
                    .save_transcript(spec, env.id(), started_at, Local::now(), &partial)
                    .await
                {
                    warn!("◆ FAILED TO SAVE PARTIAL TRANSCRIPT: {}", e);
                }
                return Err(AgentError::MaxTurns { max_turns, partial }.into());
            }
            Err(e) => return Err(e.into()),
        };
        let finished_at = Local::now();

        let transcript = self
            .save_transcript(spec, env.id(), started_at, finished_at, &outcome)
            .await?;

        Ok(SessionReport {
            environment_id: env.id().to_string(),
            cdp_url,
            outcome,
            started_at,
            finished_at,
            transcript,
        })
    }

    async fn save_transcript(
        &self,
        spec: &TaskSpec,
        environment_id: &str,
        started_at: DateTime<Local>,
        finished_at: DateTime<Local>,
        outcome: &LoopOutcome,
    ) -> Result<Option<PathBuf>> {
        let dir = match &self.options.transcript_dir {
            Some(dir) => dir,
            None => return Ok(None),
        };
        let transcript = Transcript {
            task: spec,
            environment_id,
            started_at,
            finished_at,
            turns: outcome.turns,
            messages: &outcome.history,
        };
        Ok(Some(write_transcript(dir, &transcript).await?))
    }
}

async fn write_transcript(dir: &Path, transcript: &Transcript<'_>) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let name = format!(
        "{}-{}.json",
        transcript.started_at.format("%Y%m%d-%H%M%S"),
        safe_filename(transcript.environment_id)
    );
    let path = dir.join(name);
    let content = serde_json::to_string_pretty(transcript)?;
    tokio::fs::write(&path, content).await?;
    debug!("◆ TRANSCRIPT SAVED TO {:?}", path);
    Ok(path)
}
