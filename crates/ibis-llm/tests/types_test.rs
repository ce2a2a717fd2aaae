use ibis_llm::{Content, ContentPart, Message, Tool, ToolCall, ToolChoice};
use serde_json::json;

#[test]
fn test_content_text_creation() {
    let content = Content::text("Hello, world!");
    assert_eq!(content.as_text(), Some("Hello, world!"));
}

#[test]
fn test_content_from_string() {
    let content: Content = "Test".into();
    assert_eq!(content.as_text(), Some("Test"));
}

#[test]
fn test_multipart_content_deserialization() {
    let json = r#"[{"type":"text","text":"look"},{"type":"media","file_uri":"gs://b/a.png","mime_type":"image/png"}]"#;
    let content: Content = serde_json::from_str(json).unwrap();

    match &content {
        Content::Parts(parts) => {
            assert_eq!(parts.len(), 2);
            assert!(matches!(&parts[1], ContentPart::Media { mime_type, .. } if mime_type == "image/png"));
        }
        _ => panic!("Expected Parts variant"),
    }
    assert_eq!(content.text_lossy(), "look");
    assert_eq!(content.as_text(), None);
}

#[test]
fn test_blank_content_is_empty() {
    assert!(Content::text("   ").is_empty());
    assert!(!Content::Parts(vec![ContentPart::Media {
        file_uri: "gs://b/a.pdf".to_string(),
        mime_type: "application/pdf".to_string(),
    }])
    .is_empty());
}

#[test]
fn test_message_roles() {
    assert_eq!(Message::system("You are helpful").role(), "system");
    assert_eq!(Message::human("Hello").role(), "user");
    assert_eq!(Message::ai("Hi there!").role(), "assistant");
    assert_eq!(Message::tool_result("call_123", "42").role(), "tool");
}

#[test]
fn test_message_serialization_human() {
    let msg = Message::human("Hello");
    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"role\":\"user\""));
    assert!(json.contains("Hello"));
}

#[test]
fn test_message_deserialization() {
    let json = r#"{"role":"user","content":"Test"}"#;
    let msg: Message = serde_json::from_str(json).unwrap();
    assert_eq!(msg.role(), "user");
    assert_eq!(msg.content().and_then(|c| c.as_text()), Some("Test"));
}

#[test]
fn test_ai_with_tools_exposes_calls() {
    let msg = Message::ai_with_tools(vec![ToolCall::new("call_1", "coding_tool", "{}")]);
    assert_eq!(msg.tool_calls().len(), 1);
    assert!(msg.content().is_none());
    assert!(Message::human("x").tool_calls().is_empty());
}

#[test]
fn test_tool_serialization() {
    let tool = Tool::new(
        "coding_tool",
        "Write and review code",
        json!({"type": "object", "properties": {"code_instructions": {"type": "string"}}}),
    );
    let value = serde_json::to_value(&tool).unwrap();
    assert_eq!(value["type"], "function");
    assert_eq!(value["function"]["name"], "coding_tool");
    assert_eq!(tool.name(), "coding_tool");
}

#[test]
fn test_tool_call_arguments() {
    #[derive(serde::Deserialize)]
    struct Args {
        code_instructions: String,
    }

    let call = ToolCall::new("call_1", "coding_tool", r#"{"code_instructions":"fizzbuzz"}"#);
    let args: Args = call.parse_arguments().unwrap();
    assert_eq!(args.code_instructions, "fizzbuzz");

    let empty = ToolCall::new("call_2", "coding_tool", "");
    assert_eq!(empty.arguments_value().unwrap(), json!({}));
}

#[test]
fn test_tool_choice_serialization() {
    assert_eq!(serde_json::to_value(ToolChoice::auto()).unwrap(), json!("auto"));
    assert_eq!(
        serde_json::to_value(ToolChoice::force("coding_tool")).unwrap(),
        json!({"type": "function", "function": {"name": "coding_tool"}})
    );
}
