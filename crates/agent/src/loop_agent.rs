//! Conversation loop - drives the model until it stops requesting tools

use std::sync::Arc;
use tracing::{debug, info, warn};

use vmpilot_provider::{
    ChatParams, ContentBlock, Message, Provider, Role, ToolCall, ToolChoice,
};

use crate::recovery::RecoveryHook;
use crate::result::{encode_tool_result, ToolResult};
use crate::tools::ToolRegistry;

/// Generation limits and loop bounds
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Empty selects the provider's default model
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub betas: Vec<String>,
    /// `None` runs until the model stops calling tools
    pub max_turns: Option<u32>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: 4096,
            temperature: None,
            betas: Vec::new(),
            max_turns: None,
        }
    }
}

/// What a finished conversation leaves behind
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub history: Vec<Message>,
    /// Model calls made
    pub turns: u32,
    /// Text of the last assistant turn
    pub final_text: String,
}

/// The conversation state machine.
///
/// Each turn sends the whole history to the model, dispatches every tool call
/// in the reply in order, and answers them in one user message. A turn that
/// yields no tool results ends the conversation.
pub struct ConversationLoop<P: Provider + ?Sized> {
    provider: Arc<P>,
    tools: ToolRegistry,
    system: String,
    settings: LoopSettings,
    recovery: Vec<Box<dyn RecoveryHook>>,
}

impl<P: Provider + ?Sized> ConversationLoop<P> {
    pub fn new(provider: Arc<P>, tools: ToolRegistry, system: impl Into<String>) -> Self {
        Self {
            provider,
            tools,
            system: system.into(),
            settings: LoopSettings::default(),
            recovery: Vec::new(),
        }
    }

    pub fn with_settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_recovery<H: RecoveryHook + 'static>(mut self, hook: H) -> Self {
        self.recovery.push(Box::new(hook));
        self
    }

    pub fn add_recovery(&mut self, hook: Box<dyn RecoveryHook>) {
        self.recovery.push(hook);
    }

    /// Run a conversation seeded with one user message holding `task`
    pub async fn run(&self, task: &str) -> crate::Result<LoopOutcome> {
        self.run_with_history(vec![Message::user_text(task)]).await
    }

    /// Run from an existing history; the last message should be a user turn
    pub async fn run_with_history(&self, mut history: Vec<Message>) -> crate::Result<LoopOutcome> {
        let mut turns = 0;

        loop {
            if let Some(max) = self.settings.max_turns {
                if turns >= max {
                    warn!("◆ STOPPING AFTER {} TURNS", turns);
                    let final_text = history
                        .iter()
                        .rev()
                        .find(|m| m.role == Role::Assistant)
                        .map(Message::text)
                        .unwrap_or_default();
                    return Err(crate::AgentError::MaxTurns {
                        max_turns: max,
                        partial: Box::new(LoopOutcome {
                            history,
                            turns,
                            final_text,
                        }),
                    });
                }
            }
            turns += 1;
            debug!("◆ TURN {} ({} MESSAGES)", turns, history.len());

            let params = ChatParams {
                model: self.settings.model.clone(),
                system: self.system.clone(),
                messages: history.clone(),
                tools: self.tools.descriptors(),
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
                tool_choice: ToolChoice::Auto,
                betas: self.settings.betas.clone(),
            };

            let response = self.provider.chat(params).await?;

            let mut results = Vec::new();
            for block in &response.content {
                match block {
                    ContentBlock::Text { text } => info!("◆ ASSISTANT: {}", text),
                    ContentBlock::ToolUse { id, name, input } => {
                        info!("◆ TOOL USE: {} ({})", name, id);
                        let call = ToolCall::new(id, name, input.clone());
                        if let Some(result) = self.dispatch_call(&call).await {
                            log_result(&call, &result);
                            results.push(encode_tool_result(&result, &call.id));
                        }
                    }
                    ContentBlock::ToolResult(_) | ContentBlock::Other(_) => {}
                }
            }

            let requested = response.has_tool_calls();
            let final_text = response.text_content();
            history.push(Message::assistant(response.content));

            if results.is_empty() {
                if requested {
                    warn!("◆ NO TOOL CALL PRODUCED A RESULT, ENDING CONVERSATION");
                }
                info!("◆ CONVERSATION DONE AFTER {} TURNS", turns);
                return Ok(LoopOutcome {
                    history,
                    turns,
                    final_text,
                });
            }

            history.push(Message::tool_results(results));
        }
    }

    /// Dispatch one call, consulting the recovery hooks when it yields nothing
    async fn dispatch_call(&self, call: &ToolCall) -> Option<ToolResult> {
        let result = self.tools.dispatch(&call.name, call.input.clone()).await;
        if matches!(&result, Some(r) if !r.is_empty()) {
            return result;
        }

        for hook in &self.recovery {
            if let Some(substitute) = hook.recover(call) {
                info!(
                    "◆ {} YIELDED NOTHING, FALLING BACK TO {}",
                    call.name, substitute.name
                );
                if let Some(recovered) = self.tools.dispatch(&substitute.name, substitute.input).await
                {
                    return Some(recovered);
                }
            }
        }

        result
    }
}

fn log_result(call: &ToolCall, result: &ToolResult) {
    if let Some(output) = result.output_text() {
        info!("◆ {} OUTPUT: {}", call.name, output);
    }
    if let Some(error) = result.error_text() {
        warn!("◆ {} ERROR: {}", call.name, error);
    }
    if result.image_data().is_some() {
        debug!("◆ {} RETURNED A SCREENSHOT", call.name);
    }
}
