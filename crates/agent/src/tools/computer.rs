//! Mouse, keyboard and screenshots

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use vmpilot_environment::{ComputerAction, Environment};

use super::{Tool, ToolError};
use crate::result::ToolResult;

/// GUI interaction tool
pub struct ComputerTool {
    env: Arc<dyn Environment>,
}

impl ComputerTool {
    pub const NAME: &'static str = "computer";

    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl Tool for ComputerTool {
    fn name(&self) -> &str {
        Self::NAME
    }
    fn description(&self) -> &str {
        "Control the desktop's mouse and keyboard and take screenshots."
    }
    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ComputerAction::NAMES,
                    "description": "Action to perform"
                },
                "coordinate": {
                    "type": "array",
                    "items": { "type": "integer" },
                    "description": "[x, y] pixel position for mouse_move and left_click_drag"
                },
                "text": { "type": "string", "description": "Text to type or key combination to press" }
            },
            "required": ["action"]
        })
    }
    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult, ToolError> {
        let action: ComputerAction = serde_json::from_value(input)?;
        debug!("◆ COMPUTER ON {}: {:?}", self.env.id(), action);
        let out = self.env.computer(action).await?;
        Ok(out.into())
    }
}
