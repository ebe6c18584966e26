use super::*;
use crate::config::Config;

#[test]
fn roles_serialize_lowercase() {
    let message = ChatMessage::user("হ্যালো");
    let json = serde_json::to_string(&message).expect("should serialize");
    assert_eq!(json, r#"{"role":"user","content":"হ্যালো"}"#);

    let system = serde_json::to_string(&ChatMessage::system("s")).expect("should serialize");
    assert!(system.contains(r#""role":"system""#));

    let assistant = serde_json::to_string(&ChatMessage::assistant("a")).expect("should serialize");
    assert!(assistant.contains(r#""role":"assistant""#));
}

#[test]
fn chat_request_serializes_messages_in_order() {
    let messages = vec![
        ChatMessage::system("You are a helpful assistant."),
        ChatMessage::user("first"),
        ChatMessage::assistant("second"),
    ];
    let request = ChatCompletionRequest {
        model: "llama3-70b-8192",
        messages: &messages,
        max_tokens: 512,
    };
    let json = serde_json::to_string(&request).expect("should serialize");

    assert!(json.contains(r#""model":"llama3-70b-8192""#));
    assert!(json.contains(r#""max_tokens":512"#));
    let first = json.find("first").expect("first message present");
    let second = json.find("second").expect("second message present");
    assert!(first < second);
}

#[test]
fn response_parsing_takes_the_first_choice() {
    let json = r#"{
        "choices": [
            {"message": {"role": "assistant", "content": "answer one"}},
            {"message": {"role": "assistant", "content": "answer two"}}
        ]
    }"#;
    let response: ChatCompletionResponse = serde_json::from_str(json).expect("should parse");
    let content = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content);
    assert_eq!(content.as_deref(), Some("answer one"));
}

#[test]
fn client_requires_a_key() {
    let config = Config::default();
    let result = GroqClient::new(&config);
    assert!(matches!(result, Err(RagError::Config(_))));
}

#[test]
fn client_builds_with_a_key() {
    let mut config = Config::default();
    config.groq.key = "gsk_test_key".to_string();
    let client = GroqClient::new(&config);
    assert!(client.is_ok());
}
