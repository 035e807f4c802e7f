//! Model provider boundary
//!
//! Content-block messages, tool descriptors and the `Provider` trait the
//! conversation loop talks to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use thiserror::Error;
use tracing::{debug, trace};

pub mod anthropic;

pub use anthropic::AnthropicProvider;

/// Media type attached to every screenshot a tool returns
pub const IMAGE_MEDIA_TYPE: &str = "image/png";

/// Model provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("◆ MODEL UNREACHABLE: {0}")]
    Request(#[from] reqwest::Error),

    #[error("◆ MALFORMED PAYLOAD: {0}")]
    Json(#[from] serde_json::Error),

    #[error("◆ MODEL REJECTED REQUEST: {0}")]
    Api(String),

    #[error("◆ NO API KEY CONFIGURED")]
    NoApiKey,

    #[error("◆ INVALID MODEL RESPONSE")]
    InvalidResponse,

    #[error("◆ RATE LIMITED")]
    RateLimited,
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Conversation role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One block of message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult(ToolResultBlock),
    /// Block kinds this crate does not model, kept verbatim
    #[serde(untagged)]
    Other(Value),
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

/// Outcome of one tool invocation, paired with the request that caused it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultBlock {
    pub tool_use_id: String,
    pub content: ToolResultContent,
    #[serde(default)]
    pub is_error: bool,
}

/// Tool result payload: bare error text, or a sequence of parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    Text(String),
    Parts(Vec<ResultPart>),
}

impl ToolResultContent {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Parts(parts) => parts.is_empty(),
        }
    }
}

/// Part of a successful tool result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResultPart {
    Text { text: String },
    Image { source: ImageSource },
}

impl ResultPart {
    pub fn png(data: impl Into<String>) -> Self {
        Self::Image {
            source: ImageSource {
                source_type: "base64".to_string(),
                media_type: IMAGE_MEDIA_TYPE.to_string(),
                data: data.into(),
            },
        }
    }
}

/// Inline image payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

/// Transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![ContentBlock::text(text)])
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// Bundle tool results into the user turn that answers them
    pub fn tool_results(results: Vec<ToolResultBlock>) -> Self {
        Self::user(results.into_iter().map(ContentBlock::ToolResult).collect())
    }

    /// Concatenated text blocks
    pub fn text(&self) -> String {
        collect_text(&self.content)
    }
}

fn collect_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|b| match b {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

/// Model response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Usage,
}

impl ChatResponse {
    pub fn new(content: Vec<ContentBlock>) -> Self {
        let stop_reason = if content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
        {
            "tool_use"
        } else {
            "end_turn"
        };
        Self {
            content,
            stop_reason: Some(stop_reason.to_string()),
            usage: Usage::default(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(vec![ContentBlock::text(content)])
    }

    /// Tool-use blocks in the order the model emitted them
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => {
                    Some(ToolCall::new(id, name, input.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }

    pub fn text_content(&self) -> String {
        collect_text(&self.content)
    }
}

/// Token accounting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Capability advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Request parameters
#[derive(Debug, Clone)]
pub struct ChatParams {
    pub model: String,
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDescriptor>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub tool_choice: ToolChoice,
    pub betas: Vec<String>,
}

impl Default for ChatParams {
    fn default() -> Self {
        Self {
            model: String::new(),
            system: String::new(),
            messages: Vec::new(),
            tools: Vec::new(),
            max_tokens: 4096,
            temperature: None,
            tool_choice: ToolChoice::Auto,
            betas: Vec::new(),
        }
    }
}

/// Tool selection mode
#[derive(Debug, Clone, PartialEq)]
pub enum ToolChoice {
    Auto,
    Required(String),
    None,
}

/// Language model endpoint
#[async_trait]
pub trait Provider: Send + Sync {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse>;
    fn default_model(&self) -> String;
    fn is_configured(&self) -> bool;
}

/// JSON schema primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
}

/// One named tool parameter
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamType,
    pub description: String,
    pub required: bool,
    pub default: Option<Value>,
    pub allowed: Vec<String>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: false,
            default: None,
            allowed: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::String, description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::Integer, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Restrict a string parameter to a fixed set of values
    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }
}

/// Build JSON schema
pub fn object_schema(properties: Vec<ParamSpec>) -> Value {
    let mut props = serde_json::Map::new();
    let mut required = Vec::new();

    for spec in properties {
        let mut prop = serde_json::json!({
            "type": spec.kind,
            "description": spec.description
        });
        if let Some(default) = spec.default {
            prop["default"] = default;
        }
        if !spec.allowed.is_empty() {
            prop["enum"] = serde_json::json!(spec.allowed);
        }
        if spec.required {
            required.push(spec.name.clone());
        }
        props.insert(spec.name, prop);
    }

    trace!("◆ SCHEMA BUILT: {} PARAMETERS", props.len());

    serde_json::json!({
        "type": "object",
        "properties": props,
        "required": required
    })
}

/// Parse response content; block kinds without a typed variant are kept as
/// `ContentBlock::Other` so the assistant turn is stored as received
pub fn parse_content_blocks(blocks: &[Value]) -> Vec<ContentBlock> {
    blocks
        .iter()
        .map(|raw| match serde_json::from_value::<ContentBlock>(raw.clone()) {
            Ok(block) => block,
            Err(e) => {
                debug!("◆ OPAQUE CONTENT BLOCK {:?}: {}", raw.get("type"), e);
                ContentBlock::Other(raw.clone())
            }
        })
        .collect()
}
