//! Recovery hooks for tool calls that come back empty

use serde_json::{json, Value};
use vmpilot_provider::ToolCall;

use crate::tools::{BashTool, ComputerTool};

/// Substitutes another request when a call yields nothing to report.
///
/// The substitute is dispatched once and its result answers the original
/// correlation id.
pub trait RecoveryHook: Send + Sync {
    fn recover(&self, call: &ToolCall) -> Option<ToolCall>;
}

/// Fixed fallback for one tool
#[derive(Debug, Clone)]
pub struct FallbackRecovery {
    trigger_tool: String,
    fallback_tool: String,
    fallback_input: Value,
}

impl FallbackRecovery {
    pub fn new(
        trigger_tool: impl Into<String>,
        fallback_tool: impl Into<String>,
        fallback_input: Value,
    ) -> Self {
        Self {
            trigger_tool: trigger_tool.into(),
            fallback_tool: fallback_tool.into(),
            fallback_input,
        }
    }

    /// Take a screenshot when a shell command produced nothing
    pub fn screenshot_after_bash() -> Self {
        Self::new(
            BashTool::NAME,
            ComputerTool::NAME,
            json!({ "action": "screenshot" }),
        )
    }
}

impl RecoveryHook for FallbackRecovery {
    fn recover(&self, call: &ToolCall) -> Option<ToolCall> {
        (call.name == self.trigger_tool).then(|| {
            ToolCall::new(
                call.id.clone(),
                self.fallback_tool.clone(),
                self.fallback_input.clone(),
            )
        })
    }
}
