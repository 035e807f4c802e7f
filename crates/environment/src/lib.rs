//! Remote desktop environment boundary
//!
//! A session acquires one virtual desktop, drives it through shell, GUI,
//! file-edit and code-kernel actions, and stops it when the task ends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub mod http;

pub use http::{HttpEnvironment, HttpLauncher};

/// Environment errors
#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("◆ DESKTOP UNREACHABLE: {0}")]
    Request(#[from] reqwest::Error),

    #[error("◆ MALFORMED PAYLOAD: {0}")]
    Json(#[from] serde_json::Error),

    #[error("◆ DESKTOP REJECTED ACTION ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("◆ NO ENVIRONMENT API KEY CONFIGURED")]
    NoApiKey,

    #[error("◆ INVALID ENVIRONMENT RESPONSE: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, EnvironmentError>;

/// Result of a shell, GUI or edit action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_image: Option<String>,
}

/// Shell request; `restart` replaces the shell process
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BashRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default)]
    pub restart: bool,
}

/// Mouse, keyboard and screen action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ComputerAction {
    Key { text: String },
    Type { text: String },
    MouseMove { coordinate: [i64; 2] },
    LeftClick,
    LeftClickDrag { coordinate: [i64; 2] },
    RightClick,
    MiddleClick,
    DoubleClick,
    Screenshot,
    CursorPosition,
}

impl ComputerAction {
    pub const NAMES: [&'static str; 10] = [
        "key",
        "type",
        "mouse_move",
        "left_click",
        "left_click_drag",
        "right_click",
        "middle_click",
        "double_click",
        "screenshot",
        "cursor_position",
    ];
}

/// File viewing and editing command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EditRequest {
    View {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        view_range: Option<[i64; 2]>,
    },
    Create {
        path: String,
        file_text: String,
    },
    StrReplace {
        path: String,
        old_str: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_str: Option<String>,
    },
    Insert {
        path: String,
        insert_line: u64,
        new_str: String,
    },
    UndoEdit {
        path: String,
    },
}

impl EditRequest {
    pub const COMMANDS: [&'static str; 5] = ["view", "create", "str_replace", "insert", "undo_edit"];
}

/// Code-kernel execution request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRequest {
    pub code: String,
    pub timeout: u64,
    pub kernel_name: String,
}

/// One kernel output item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelOutput {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl KernelOutput {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            kind: "stream".to_string(),
            name: Some("stdout".to_string()),
            text: Some(text.into()),
        }
    }
}

/// Code-kernel execution response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeOutput {
    #[serde(default)]
    pub outputs: Vec<KernelOutput>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CodeOutput {
    /// Concatenated stdout stream text, in emission order
    pub fn stdout(&self) -> String {
        self.outputs
            .iter()
            .filter(|o| o.kind == "stream" && o.name.as_deref() == Some("stdout"))
            .filter_map(|o| o.text.as_deref())
            .collect()
    }
}

/// One acquired virtual desktop
#[async_trait]
pub trait Environment: Send + Sync {
    fn id(&self) -> &str;
    async fn bash(&self, request: BashRequest) -> Result<ActionOutput>;
    async fn computer(&self, action: ComputerAction) -> Result<ActionOutput>;
    async fn edit(&self, request: EditRequest) -> Result<ActionOutput>;
    async fn execute_code(&self, request: CodeRequest) -> Result<CodeOutput>;
    /// Start a browser inside the desktop; returns its CDP url
    async fn start_browser(&self) -> Result<String>;
    async fn stop(&self) -> Result<()>;
}

/// Acquires desktops
#[async_trait]
pub trait EnvironmentLauncher: Send + Sync {
    async fn launch(&self, instance_type: &str) -> Result<Arc<dyn Environment>>;
}
