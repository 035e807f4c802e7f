//! Tool capability, registry and the built-in desktop tools

pub mod code;
pub mod computer;
pub mod edit;
pub mod shell;

pub use code::CodeExecutionTool;
pub use computer::ComputerTool;
pub use edit::EditTool;
pub use shell::BashTool;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};
use vmpilot_environment::Environment;
use vmpilot_provider::ToolDescriptor;

use crate::result::ToolResult;

/// Failure raised by a tool; the registry turns it into an error result
pub type ToolError = Box<dyn std::error::Error + Send + Sync>;

pub type BoxedTool = Box<dyn Tool>;

/// A named, schema-described capability the model may invoke
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> Value;
    async fn execute(&self, input: Value) -> Result<ToolResult, ToolError>;

    /// What the model is told about this tool
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(self.name(), self.description(), self.parameters())
    }
}

/// Fixed set of tools, dispatched by name
pub struct ToolRegistry {
    tools: Vec<BoxedTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn from_tools(tools: Vec<BoxedTool>) -> Self {
        let mut registry = Self::new();
        for tool in tools {
            registry.register_boxed(tool);
        }
        registry
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_boxed(Box::new(tool));
    }

    /// Register a tool; a later tool with the same name replaces the earlier
    /// one in its original position
    pub fn register_boxed(&mut self, tool: BoxedTool) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => {
                warn!("◆ TOOL '{}' REGISTERED TWICE, KEEPING THE LATER ONE", name);
                self.tools[slot] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&slot| self.tools[slot].as_ref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Descriptors in registration order
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run the named tool.
    ///
    /// Returns `None` when no tool has that name. Errors raised by the tool
    /// come back as a result with `error` set, so one faulty tool never ends
    /// the conversation.
    pub async fn dispatch(&self, name: &str, input: Value) -> Option<ToolResult> {
        let Some(tool) = self.get(name) else {
            warn!("◆ UNKNOWN TOOL '{}' REQUESTED, DROPPING CALL", name);
            return None;
        };

        debug!("◆ DISPATCHING {} WITH {}", name, input);
        match tool.execute(input).await {
            Ok(result) => Some(result),
            Err(e) => {
                let mut message = e.to_string();
                if message.is_empty() {
                    message = format!("tool '{}' failed", name);
                }
                warn!("◆ TOOL {} FAILED: {}", name, message);
                Some(ToolResult::error(message))
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The desktop tools this crate ships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltinTool {
    #[serde(rename = "bash")]
    Bash,
    #[serde(rename = "computer")]
    Computer,
    #[serde(rename = "str_replace_editor")]
    Edit,
    #[serde(rename = "code_execution")]
    CodeExecution,
}

impl BuiltinTool {
    pub const ALL: [BuiltinTool; 4] = [
        BuiltinTool::CodeExecution,
        BuiltinTool::Bash,
        BuiltinTool::Computer,
        BuiltinTool::Edit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinTool::Bash => BashTool::NAME,
            BuiltinTool::Computer => ComputerTool::NAME,
            BuiltinTool::Edit => EditTool::NAME,
            BuiltinTool::CodeExecution => CodeExecutionTool::NAME,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Instantiate the tool against a desktop
    pub fn build(self, env: Arc<dyn Environment>) -> BoxedTool {
        match self {
            BuiltinTool::Bash => Box::new(BashTool::new(env)),
            BuiltinTool::Computer => Box::new(ComputerTool::new(env)),
            BuiltinTool::Edit => Box::new(EditTool::new(env)),
            BuiltinTool::CodeExecution => Box::new(CodeExecutionTool::new(env)),
        }
    }
}

impl FromStr for BuiltinTool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown tool '{}'", s))
    }
}

/// Registry holding the given built-in tools, in order, bound to `env`
pub fn registry_for(env: Arc<dyn Environment>, tools: &[BuiltinTool]) -> ToolRegistry {
    ToolRegistry::from_tools(tools.iter().map(|t| t.build(env.clone())).collect())
}
