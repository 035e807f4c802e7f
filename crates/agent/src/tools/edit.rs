//! File viewing and editing inside the desktop

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use vmpilot_environment::{EditRequest, Environment};

use super::{Tool, ToolError};
use crate::result::ToolResult;

/// File editing tool
pub struct EditTool {
    env: Arc<dyn Environment>,
}

impl EditTool {
    pub const NAME: &'static str = "str_replace_editor";

    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl Tool for EditTool {
    fn name(&self) -> &str {
        Self::NAME
    }
    fn description(&self) -> &str {
        "View, create and edit files. str_replace requires old_str to match exactly once."
    }
    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "command": { "type": "string", "enum": EditRequest::COMMANDS, "description": "Edit command" },
                "path": { "type": "string", "description": "Absolute file path" },
                "file_text": { "type": "string", "description": "Content for create" },
                "old_str": { "type": "string", "description": "Text to replace" },
                "new_str": { "type": "string", "description": "Replacement or inserted text" },
                "insert_line": { "type": "integer", "description": "Line after which to insert" },
                "view_range": {
                    "type": "array",
                    "items": { "type": "integer" },
                    "description": "[start, end] lines to view"
                }
            },
            "required": ["command", "path"]
        })
    }
    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult, ToolError> {
        let request: EditRequest = serde_json::from_value(input)?;
        debug!("◆ EDIT ON {}: {:?}", self.env.id(), request);
        let out = self.env.edit(request).await?;
        Ok(out.into())
    }
}
