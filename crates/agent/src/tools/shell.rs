//! Shell commands inside the desktop

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use vmpilot_environment::{BashRequest, Environment};

use super::{Tool, ToolError};
use crate::result::ToolResult;

/// Terminal command tool
pub struct BashTool {
    env: Arc<dyn Environment>,
}

impl BashTool {
    pub const NAME: &'static str = "bash";

    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self { env }
    }
}

#[derive(Deserialize)]
struct BashArgs {
    command: Option<String>,
    #[serde(default)]
    restart: bool,
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        Self::NAME
    }
    fn description(&self) -> &str {
        "Run a shell command in the desktop's persistent bash session. \
         Set restart to true to start a fresh shell."
    }
    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "command": { "type": "string", "description": "Bash command to run" },
                "restart": { "type": "boolean", "description": "Restart the shell", "default": false }
            }
        })
    }
    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: BashArgs = serde_json::from_value(input)?;
        if args.command.is_none() && !args.restart {
            return Err("no command provided".into());
        }

        debug!("◆ BASH ON {}: {:?}", self.env.id(), args.command);
        let out = self
            .env
            .bash(BashRequest {
                command: args.command,
                restart: args.restart,
            })
            .await?;
        Ok(out.into())
    }
}
