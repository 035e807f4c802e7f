//! Configuration management for vmpilot
//!
//! One JSON file holds the model endpoint, the remote desktop service and the
//! agent's loop settings. Every field has a default, so a missing file or a
//! partial one is always usable.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("◆ CONFIG IO ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("◆ CONFIG PARSE FAILED: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Model endpoint and generation limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default = "default_betas")]
    pub betas: Vec<String>,
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: None,
            betas: default_betas(),
            timeout_secs: default_model_timeout(),
        }
    }
}

fn default_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_betas() -> Vec<String> {
    vec!["computer-use-2024-10-22".to_string()]
}

fn default_model_timeout() -> u64 {
    120
}

/// Remote desktop service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_environment_base")]
    pub api_base: String,
    #[serde(default = "default_instance_type")]
    pub instance_type: String,
    #[serde(default = "default_true")]
    pub start_browser: bool,
    #[serde(default = "default_environment_timeout")]
    pub timeout_secs: u64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_environment_base(),
            instance_type: default_instance_type(),
            start_browser: true,
            timeout_secs: default_environment_timeout(),
        }
    }
}

fn default_environment_base() -> String {
    "https://api.scrapybara.com/v1".to_string()
}

fn default_instance_type() -> String {
    "medium".to_string()
}

fn default_true() -> bool {
    true
}

fn default_environment_timeout() -> u64 {
    300
}

/// Substitute call issued when a tool comes back empty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackConfig {
    pub trigger_tool: String,
    pub fallback_tool: String,
    #[serde(default)]
    pub fallback_input: Value,
}

impl FallbackConfig {
    /// Take a screenshot when a shell command prints nothing
    pub fn screenshot_after_bash() -> Self {
        Self {
            trigger_tool: "bash".to_string(),
            fallback_tool: "computer".to_string(),
            fallback_input: json!({"action": "screenshot"}),
        }
    }
}

/// Conversation loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Unset runs until the model stops calling tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    #[serde(default = "default_tools")]
    pub tools: Vec<String>,
    #[serde(default = "default_fallback")]
    pub fallback: Option<FallbackConfig>,
    #[serde(default)]
    pub persona: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: None,
            tools: default_tools(),
            fallback: default_fallback(),
            persona: String::new(),
            output_dir: None,
        }
    }
}

fn default_tools() -> Vec<String> {
    ["code_execution", "bash", "computer", "str_replace_editor"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_fallback() -> Option<FallbackConfig> {
    Some(FallbackConfig::screenshot_after_bash())
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

impl Config {
    /// Load from specific location; a missing file yields defaults
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("◆ NO CONFIG AT {:?}, USING DEFAULTS", path);
            return Ok(Config::default());
        }

        debug!("◆ READING CONFIG FROM {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("◆ WRITING CONFIG TO {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    pub fn has_model_key(&self) -> bool {
        !self.model.api_key.is_empty()
    }

    pub fn has_environment_key(&self) -> bool {
        !self.environment.api_key.is_empty()
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model.timeout_secs)
    }

    pub fn environment_timeout(&self) -> Duration {
        Duration::from_secs(self.environment.timeout_secs)
    }
}

/// Write a default config unless one exists, then load it
pub async fn init_at(path: &Path) -> Result<Config> {
    if path.exists() {
        warn!("◆ CONFIG ALREADY EXISTS AT {:?}", path);
    } else {
        Config::default().save_to(path).await?;
        info!("◆ CONFIG CREATED AT {:?}", path);
    }

    Config::load_from(path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_observed_sessions() {
        let config = Config::default();
        assert_eq!(config.model.model, "claude-3-5-sonnet-20241022");
        assert_eq!(config.model.max_tokens, 4096);
        assert_eq!(config.model.betas, vec!["computer-use-2024-10-22"]);
        assert_eq!(config.environment.instance_type, "medium");
        assert!(config.environment.start_browser);
        assert!(config.agent.max_turns.is_none());
        assert_eq!(
            config.agent.fallback,
            Some(FallbackConfig::screenshot_after_bash())
        );
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.agent.tools.len(), 4);
        assert_eq!(config.model_timeout(), Duration::from_secs(120));
        assert_eq!(config.environment_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_fallback_can_be_disabled() {
        let config: Config = serde_json::from_str(r#"{"agent": {"fallback": null}}"#).unwrap();
        assert!(config.agent.fallback.is_none());
    }

    #[test]
    fn test_key_checks() {
        let mut config = Config::default();
        assert!(!config.has_model_key());
        assert!(!config.has_environment_key());
        config.model.api_key = "sk-ant".to_string();
        config.environment.api_key = "env-key".to_string();
        assert!(config.has_model_key());
        assert!(config.has_environment_key());
    }
}
