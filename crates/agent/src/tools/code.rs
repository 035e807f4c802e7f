//! Sandboxed Python execution

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use vmpilot_environment::{CodeRequest, Environment};
use vmpilot_provider::{object_schema, ParamSpec};

use super::{Tool, ToolError};
use crate::result::ToolResult;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const KERNEL: &str = "python3";

/// Code execution tool; each call runs in a fresh kernel
pub struct CodeExecutionTool {
    env: Arc<dyn Environment>,
    default_timeout: u64,
}

impl CodeExecutionTool {
    pub const NAME: &'static str = "code_execution";

    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self {
            env,
            default_timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Deserialize)]
struct CodeArgs {
    code: String,
    timeout: Option<u64>,
}

#[async_trait]
impl Tool for CodeExecutionTool {
    fn name(&self) -> &str {
        Self::NAME
    }
    fn description(&self) -> &str {
        "Execute Python code in the virtual environment. The code runs in a fresh \
         Python kernel each time; stdout is returned."
    }
    fn parameters(&self) -> serde_json::Value {
        object_schema(vec![
            ParamSpec::string("code", "Python code to execute").required(),
            ParamSpec::integer("timeout", "Maximum execution time in seconds")
                .with_default(json!(self.default_timeout)),
        ])
    }
    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: CodeArgs = serde_json::from_value(input)?;
        let timeout = args.timeout.unwrap_or(self.default_timeout);

        debug!("◆ EXECUTING CODE ON {} (TIMEOUT {}s)", self.env.id(), timeout);
        let response = self
            .env
            .execute_code(CodeRequest {
                code: args.code,
                timeout,
                kernel_name: KERNEL.to_string(),
            })
            .await?;

        Ok(ToolResult {
            output: Some(response.stdout()),
            error: response.error,
            base64_image: None,
        })
    }
}
