use futures::StreamExt;
use ibis_api::remote::RemoteAgentClient;
use ibis_api::schema::{ChatMessage, Feedback, InputChat, MessageContent, StreamRequest};
use ibis_observability::StaticToken;
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;

fn request() -> StreamRequest {
    StreamRequest {
        input: InputChat {
            messages: vec![ChatMessage::Human {
                content: MessageContent::Text("Hi".to_string()),
                id: None,
            }],
        },
        config: None,
    }
}

#[tokio::test]
async fn test_stream_messages_decodes_lines() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        r#"[{"type":"AIMessageChunk","content":"Hel"},{"run_id":"r1","langgraph_step":1}]"#,
        "\n",
        r#"[{"type":"AIMessageChunk","content":"lo"},{"run_id":"r1","langgraph_step":1}]"#,
        "\n",
    );
    let mock = server
        .mock("POST", "/stream_messages")
        .match_body(Matcher::PartialJson(json!({"input": {"messages": [{"type": "human", "content": "Hi"}]}})))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let client = RemoteAgentClient::new(format!("{}/", server.url())).unwrap();
    let items: Vec<_> = client
        .stream_messages(&request())
        .await
        .unwrap()
        .map(|item| item.unwrap())
        .collect()
        .await;

    mock.assert_async().await;
    assert_eq!(items.len(), 2);
    let text: String = items
        .iter()
        .filter_map(|(message, _)| message["content"].as_str())
        .collect();
    assert_eq!(text, "Hello");
    assert_eq!(items[0].1["run_id"], "r1");
}

#[tokio::test]
async fn test_token_sent_as_bearer() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/feedback")
        .match_header("authorization", "Bearer id-token")
        .match_body(Matcher::PartialJson(json!({"score": 5, "run_id": "r1"})))
        .with_status(200)
        .with_body(r#"{"status":"success"}"#)
        .create_async()
        .await;

    let client = RemoteAgentClient::new(server.url())
        .unwrap()
        .with_token(Arc::new(StaticToken::new("id-token")));
    let feedback: Feedback = serde_json::from_value(json!({"score": 5, "run_id": "r1"})).unwrap();
    client.send_feedback(&feedback).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_surfaces_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/stream_messages")
        .with_status(422)
        .with_body("unknown variant `robot`")
        .create_async()
        .await;

    let client = RemoteAgentClient::new(server.url()).unwrap();
    let err = match client.stream_messages(&request()).await {
        Ok(_) => panic!("Expected error"),
        Err(e) => e.to_string(),
    };
    assert!(err.contains("422"));
}
