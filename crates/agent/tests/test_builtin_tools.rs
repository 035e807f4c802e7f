//! Tests for the built-in desktop tools

mod common;

use common::FakeEnvironment;
use serde_json::json;
use std::sync::Arc;
use vmpilot_agent::tools::{BashTool, CodeExecutionTool, ComputerTool, EditTool};
use vmpilot_agent::{Tool, ToolResult};
use vmpilot_environment::{ActionOutput, CodeOutput, KernelOutput};

#[tokio::test]
async fn test_bash_tool_passes_command() {
    let env = Arc::new(FakeEnvironment {
        bash_output: ActionOutput {
            output: Some("hello\n".to_string()),
            ..Default::default()
        },
        ..FakeEnvironment::new()
    });
    let tool = BashTool::new(env.clone());

    let result = tool.execute(json!({"command": "echo hello"})).await.unwrap();

    assert_eq!(result, ToolResult::output("hello\n"));
    assert_eq!(env.calls(), vec!["bash:echo hello"]);
}

#[tokio::test]
async fn test_bash_tool_requires_command_or_restart() {
    let env = Arc::new(FakeEnvironment::new());
    let tool = BashTool::new(env.clone());

    assert!(tool.execute(json!({})).await.is_err());
    assert!(tool.execute(json!({"restart": true})).await.is_ok());
}

#[tokio::test]
async fn test_bash_tool_environment_error_propagates_to_registry() {
    let env = Arc::new(FakeEnvironment {
        fail_bash: true,
        ..FakeEnvironment::new()
    });
    let tool = BashTool::new(env);

    let err = tool.execute(json!({"command": "ls"})).await.unwrap_err();
    assert!(err.to_string().contains("shell crashed"));
}

#[tokio::test]
async fn test_computer_tool_screenshot() {
    let env = Arc::new(FakeEnvironment::new());
    let tool = ComputerTool::new(env.clone());

    let result = tool.execute(json!({"action": "screenshot"})).await.unwrap();

    assert_eq!(result.base64_image.as_deref(), Some("iVBORw0KGgo="));
    assert_eq!(env.calls(), vec!["computer:Screenshot"]);
}

#[tokio::test]
async fn test_computer_tool_rejects_unknown_action() {
    let env = Arc::new(FakeEnvironment::new());
    let tool = ComputerTool::new(env.clone());

    assert!(tool.execute(json!({"action": "teleport"})).await.is_err());
    assert!(env.calls().is_empty());
}

#[test]
fn test_computer_tool_schema_lists_actions() {
    let tool = ComputerTool::new(Arc::new(FakeEnvironment::new()));
    let params = tool.parameters();
    let actions = params["properties"]["action"]["enum"].as_array().unwrap();
    assert!(actions.contains(&json!("screenshot")));
    assert!(actions.contains(&json!("left_click")));
    assert_eq!(params["required"], json!(["action"]));
}

#[tokio::test]
async fn test_edit_tool_create() {
    let env = Arc::new(FakeEnvironment::new());
    let tool = EditTool::new(env.clone());

    let result = tool
        .execute(json!({"command": "create", "path": "/home/user/a.py", "file_text": "print(1)"}))
        .await
        .unwrap();

    assert_eq!(result.output.as_deref(), Some("edited"));
    assert_eq!(env.calls().len(), 1);
    assert!(env.calls()[0].starts_with("edit:Create"));
}

#[tokio::test]
async fn test_code_tool_collects_stdout_and_default_timeout() {
    let env = Arc::new(FakeEnvironment {
        code_output: CodeOutput {
            outputs: vec![KernelOutput::stdout("2\n")],
            error: None,
        },
        ..FakeEnvironment::new()
    });
    let tool = CodeExecutionTool::new(env.clone());

    let result = tool.execute(json!({"code": "print(1+1)"})).await.unwrap();

    assert_eq!(result.output.as_deref(), Some("2\n"));
    assert!(result.error.is_none());
    let requests = env.code_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].timeout, 30);
    assert_eq!(requests[0].kernel_name, "python3");
}

#[tokio::test]
async fn test_code_tool_custom_timeout_and_kernel_error() {
    let env = Arc::new(FakeEnvironment {
        code_output: CodeOutput {
            outputs: vec![KernelOutput::stdout("before\n")],
            error: Some("ZeroDivisionError: division by zero".to_string()),
        },
        ..FakeEnvironment::new()
    });
    let tool = CodeExecutionTool::new(env.clone());

    let result = tool
        .execute(json!({"code": "print('before'); 1/0", "timeout": 5}))
        .await
        .unwrap();

    assert_eq!(result.output.as_deref(), Some("before\n"));
    assert_eq!(
        result.error.as_deref(),
        Some("ZeroDivisionError: division by zero")
    );
    assert_eq!(env.code_requests.lock().unwrap()[0].timeout, 5);
}

#[test]
fn test_code_tool_schema() {
    let tool = CodeExecutionTool::new(Arc::new(FakeEnvironment::new()));
    let params = tool.parameters();
    assert_eq!(params["properties"]["code"]["type"], "string");
    assert_eq!(params["properties"]["timeout"]["default"], 30);
    assert_eq!(params["required"], json!(["code"]));
}
