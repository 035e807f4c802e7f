//! Tool-augmented conversation loop
//!
//! Mediates between a request/response language model and the side-effecting
//! tools of a remote desktop until the model stops asking for actions.

use thiserror::Error;

pub mod context;
pub mod loop_agent;
pub mod recovery;
pub mod result;
pub mod tools;

pub use context::ContextBuilder;
pub use loop_agent::{ConversationLoop, LoopOutcome, LoopSettings};
pub use recovery::{FallbackRecovery, RecoveryHook};
pub use result::{encode_tool_result, ToolResult};
pub use tools::{BuiltinTool, Tool, ToolRegistry};

/// Conversation loop errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("◆ MODEL CALL FAILED: {0}")]
    Provider(#[from] vmpilot_provider::ProviderError),

    /// The cap was hit; `partial` holds the conversation so far
    #[error("◆ TURN LIMIT OF {max_turns} REACHED")]
    MaxTurns {
        max_turns: u32,
        partial: Box<LoopOutcome>,
    },
}

pub type Result<T> = std::result::Result<T, AgentError>;
