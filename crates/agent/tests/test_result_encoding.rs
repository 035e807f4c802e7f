//! Tests for tool result encoding

use vmpilot_agent::{encode_tool_result, ToolResult};
use vmpilot_provider::{ResultPart, ToolResultContent, IMAGE_MEDIA_TYPE};

#[test]
fn test_error_wins_over_output_and_image() {
    let result = ToolResult::output("partial")
        .with_image("aW1n")
        .with_error("command failed: exit 2");

    let block = encode_tool_result(&result, "toolu_1");

    assert!(block.is_error);
    assert_eq!(block.tool_use_id, "toolu_1");
    assert_eq!(
        block.content,
        ToolResultContent::Text("command failed: exit 2".to_string())
    );
}

#[test]
fn test_error_text_preserved_verbatim() {
    let text = "  Traceback (most recent call last):\n  ZeroDivisionError\n";
    let block = encode_tool_result(&ToolResult::error(text), "t");
    assert_eq!(block.content, ToolResultContent::Text(text.to_string()));
}

#[test]
fn test_empty_result_encodes_empty_sequence() {
    let block = encode_tool_result(&ToolResult::default(), "toolu_2");

    assert!(!block.is_error);
    assert_eq!(block.content, ToolResultContent::Parts(vec![]));
    assert!(block.content.is_empty());
}

#[test]
fn test_output_only() {
    let block = encode_tool_result(&ToolResult::output("2\n"), "toolu_3");

    assert!(!block.is_error);
    assert_eq!(
        block.content,
        ToolResultContent::Parts(vec![ResultPart::Text {
            text: "2\n".to_string()
        }])
    );
}

#[test]
fn test_output_then_image_order() {
    let block = encode_tool_result(&ToolResult::output("clicked").with_image("iVBOR"), "t4");

    match block.content {
        ToolResultContent::Parts(parts) => {
            assert_eq!(parts.len(), 2);
            assert!(matches!(parts[0], ResultPart::Text { .. }));
            match &parts[1] {
                ResultPart::Image { source } => {
                    assert_eq!(source.source_type, "base64");
                    assert_eq!(source.media_type, IMAGE_MEDIA_TYPE);
                    assert_eq!(source.data, "iVBOR");
                }
                other => panic!("Expected image part, got {:?}", other),
            }
        }
        other => panic!("Expected parts, got {:?}", other),
    }
}

#[test]
fn test_image_only_screenshot() {
    let block = encode_tool_result(&ToolResult::image("iVBOR"), "t5");
    assert_eq!(
        block.content,
        ToolResultContent::Parts(vec![ResultPart::png("iVBOR")])
    );
}

#[test]
fn test_empty_output_with_image_skips_text() {
    let result = ToolResult {
        output: Some(String::new()),
        error: None,
        base64_image: Some("iVBOR".to_string()),
    };
    let block = encode_tool_result(&result, "t6");
    assert_eq!(
        block.content,
        ToolResultContent::Parts(vec![ResultPart::png("iVBOR")])
    );
}
