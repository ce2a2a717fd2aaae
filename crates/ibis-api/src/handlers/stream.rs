use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::sync::Arc;

use ibis_graph::{Graph, GraphInput, LLMConfig, StreamEvent as GraphStreamEvent};
use ibis_llm::Message as LLMMessage;
use ibis_observability::TracingContext;

use crate::schema::{ensure_valid_config, InputChat, RunConfig, StreamRequest};
use crate::middleware::logging::record_run_id;
use crate::state::AppState;
use crate::tracing_props::set_tracing_properties;

/// Stream chat events in response to an input chat
#[utoipa::path(
    post,
    path = "/stream_messages",
    request_body = StreamRequest,
    responses(
        (status = 200, description = "Line-delimited JSON `[message, metadata]` pairs", content_type = "text/event-stream"),
        (status = 422, description = "Invalid message type or malformed body")
    ),
    tag = "agent"
)]
pub async fn stream_chat_events(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StreamRequest>,
) -> Response {
    let llm_config = LLMConfig::from(&state.config.llm);
    let config = ensure_valid_config(request.config);
    record_run_id(&config.run_id);
    let body = stream_messages(Arc::clone(&state.graph), llm_config, request.input, Some(config.into()));

    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(body),
    )
        .into_response()
}

/// Run the graph and yield one `\n`-terminated JSON line per unit of output.
///
/// Nothing runs until the stream is first polled. A graph error ends the
/// stream with an `Err` item.
pub fn stream_messages(
    graph: Arc<Graph>,
    llm_config: LLMConfig,
    input: InputChat,
    config: Option<RunConfig>,
) -> impl Stream<Item = Result<String, std::io::Error>> {
    async_stream::stream! {
        let mut config = ensure_valid_config(config);
        let mut tracing_ctx = TracingContext::new();
        if let Err(e) = set_tracing_properties(&mut config, &mut tracing_ctx) {
            tracing::warn!(run_id = %config.run_id, error = %e, "Failed to set tracing properties");
        }

        let conversation_id = match tracing_ctx.get("session_id").and_then(Value::as_str) {
            Some(session_id) if session_id != "None" => session_id.to_string(),
            _ => config.run_id.clone(),
        };
        let messages: Vec<LLMMessage> = input.messages.into_iter().map(LLMMessage::from).collect();
        let graph_input = GraphInput::new(conversation_id, messages, llm_config)
            .with_run_id(config.run_id.clone())
            .with_tracing(tracing_ctx);

        let mut events = graph.spawn_run(graph_input);
        let mut metadata = StepMetadata::new(config.run_id.clone());

        while let Some(event) = events.recv().await {
            match event {
                GraphStreamEvent::NodeStart { node, step } => {
                    metadata.node = node;
                    metadata.step = step;
                }
                GraphStreamEvent::Message { content } => {
                    yield Ok(line(ai_chunk(&metadata.run_id, content, Vec::new()), &metadata));
                }
                GraphStreamEvent::ToolCall { index, id, name, arguments } => {
                    let chunk = json!({
                        "name": name,
                        "args": arguments.unwrap_or_default(),
                        "id": id,
                        "index": index,
                        "type": "tool_call_chunk",
                    });
                    yield Ok(line(ai_chunk(&metadata.run_id, String::new(), vec![chunk]), &metadata));
                }
                GraphStreamEvent::ToolResult { tool_call_id, tool_name, result, is_error, .. } => {
                    let message = json!({
                        "type": "tool",
                        "content": result,
                        "tool_call_id": tool_call_id,
                        "name": tool_name,
                        "status": if is_error { "error" } else { "success" },
                    });
                    yield Ok(line(message, &metadata));
                }
                GraphStreamEvent::Error { message, .. } => {
                    tracing::error!(run_id = %metadata.run_id, "Agent run failed: {}", message);
                    yield Err(std::io::Error::other(message));
                    break;
                }
                GraphStreamEvent::InitStream { .. }
                | GraphStreamEvent::Done { .. }
                | GraphStreamEvent::EndStream { .. } => {}
            }
        }
    }
}

/// Node and step currently producing output
struct StepMetadata {
    run_id: String,
    node: String,
    step: usize,
}

impl StepMetadata {
    fn new(run_id: String) -> Self {
        Self {
            run_id,
            node: String::new(),
            step: 0,
        }
    }

    fn to_value(&self) -> Value {
        json!({
            "run_id": self.run_id,
            "langgraph_node": self.node,
            "langgraph_step": self.step,
        })
    }
}

fn ai_chunk(run_id: &str, content: String, tool_call_chunks: Vec<Value>) -> Value {
    json!({
        "type": "AIMessageChunk",
        "content": content,
        "id": format!("run-{}", run_id),
        "tool_call_chunks": tool_call_chunks,
    })
}

fn line(message: Value, metadata: &StepMetadata) -> String {
    format!("{}\n", json!([message, metadata.to_value()]))
}
