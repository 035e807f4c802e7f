//! Shared fakes for agent integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use vmpilot_environment::{
    ActionOutput, BashRequest, CodeOutput, CodeRequest, ComputerAction, EditRequest,
    Environment, EnvironmentError, Result as EnvResult,
};
use vmpilot_provider::{ChatParams, ChatResponse, Provider, ProviderError};

/// In-memory desktop that records every action it receives
#[derive(Default)]
pub struct FakeEnvironment {
    pub calls: Mutex<Vec<String>>,
    pub bash_output: ActionOutput,
    pub fail_bash: bool,
    pub screenshot: String,
    pub code_output: CodeOutput,
    pub code_requests: Mutex<Vec<CodeRequest>>,
    pub stops: AtomicUsize,
}

impl FakeEnvironment {
    pub fn new() -> Self {
        Self {
            screenshot: "iVBORw0KGgo=".to_string(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl Environment for FakeEnvironment {
    fn id(&self) -> &str {
        "fake-1"
    }

    async fn bash(&self, request: BashRequest) -> EnvResult<ActionOutput> {
        self.record(format!("bash:{}", request.command.unwrap_or_default()));
        if self.fail_bash {
            return Err(EnvironmentError::Api {
                status: 500,
                message: "shell crashed".to_string(),
            });
        }
        Ok(self.bash_output.clone())
    }

    async fn computer(&self, action: ComputerAction) -> EnvResult<ActionOutput> {
        self.record(format!("computer:{:?}", action));
        match action {
            ComputerAction::Screenshot => Ok(ActionOutput {
                base64_image: Some(self.screenshot.clone()),
                ..Default::default()
            }),
            _ => Ok(ActionOutput {
                output: Some("done".to_string()),
                ..Default::default()
            }),
        }
    }

    async fn edit(&self, request: EditRequest) -> EnvResult<ActionOutput> {
        self.record(format!("edit:{:?}", request));
        Ok(ActionOutput {
            output: Some("edited".to_string()),
            ..Default::default()
        })
    }

    async fn execute_code(&self, request: CodeRequest) -> EnvResult<CodeOutput> {
        self.record(format!("code:{}", request.code));
        self.code_requests.lock().unwrap().push(request);
        Ok(self.code_output.clone())
    }

    async fn start_browser(&self) -> EnvResult<String> {
        self.record("browser");
        Ok("ws://fake/cdp".to_string())
    }

    async fn stop(&self) -> EnvResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Provider that replays scripted responses and keeps every request
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ChatResponse, ProviderError>>>,
    pub requests: Mutex<Vec<ChatParams>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<ChatResponse, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ChatParams> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError> {
        self.requests.lock().unwrap().push(params);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Api("script exhausted".to_string())))
    }

    fn default_model(&self) -> String {
        "scripted".to_string()
    }

    fn is_configured(&self) -> bool {
        true
    }
}
