//! Tool results and their wire encoding

use vmpilot_environment::ActionOutput;
use vmpilot_provider::{ResultPart, ToolResultBlock, ToolResultContent};

/// Uniform outcome of one tool invocation
///
/// `output` and `error` may both be set when a tool fails part way through;
/// `base64_image` is independent of either. Empty strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolResult {
    pub output: Option<String>,
    pub error: Option<String>,
    pub base64_image: Option<String>,
}

impl ToolResult {
    pub fn output(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            ..Default::default()
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn image(base64_image: impl Into<String>) -> Self {
        Self {
            base64_image: Some(base64_image.into()),
            ..Default::default()
        }
    }

    pub fn with_image(mut self, base64_image: impl Into<String>) -> Self {
        self.base64_image = Some(base64_image.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn output_text(&self) -> Option<&str> {
        non_empty(&self.output)
    }

    pub fn error_text(&self) -> Option<&str> {
        non_empty(&self.error)
    }

    pub fn image_data(&self) -> Option<&str> {
        non_empty(&self.base64_image)
    }

    pub fn is_error(&self) -> bool {
        self.error_text().is_some()
    }

    /// Nothing to report: no output, no error, no image
    pub fn is_empty(&self) -> bool {
        self.output_text().is_none() && self.error_text().is_none() && self.image_data().is_none()
    }
}

impl From<ActionOutput> for ToolResult {
    fn from(out: ActionOutput) -> Self {
        Self {
            output: out.output,
            error: out.error,
            base64_image: out.base64_image,
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Encode a result as the tool-result block answering `tool_use_id`
///
/// An error wins the channel: its text is sent verbatim and any output or
/// image is dropped.
pub fn encode_tool_result(result: &ToolResult, tool_use_id: &str) -> ToolResultBlock {
    if let Some(error) = result.error_text() {
        return ToolResultBlock {
            tool_use_id: tool_use_id.to_string(),
            content: ToolResultContent::Text(error.to_string()),
            is_error: true,
        };
    }

    let mut parts = Vec::new();
    if let Some(output) = result.output_text() {
        parts.push(ResultPart::Text {
            text: output.to_string(),
        });
    }
    if let Some(image) = result.image_data() {
        parts.push(ResultPart::png(image));
    }

    ToolResultBlock {
        tool_use_id: tool_use_id.to_string(),
        content: ToolResultContent::Parts(parts),
        is_error: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_strings_count_as_unset() {
        let result = ToolResult {
            output: Some(String::new()),
            error: Some(String::new()),
            base64_image: Some(String::new()),
        };
        assert!(result.is_empty());
        assert!(!result.is_error());
    }

    #[test]
    fn test_from_action_output() {
        let result: ToolResult = ActionOutput {
            output: Some("ok".to_string()),
            error: None,
            base64_image: Some("img".to_string()),
        }
        .into();
        assert_eq!(result, ToolResult::output("ok").with_image("img"));
    }
}
