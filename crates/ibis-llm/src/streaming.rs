use anyhow::Result;
use futures::StreamExt;
use reqwest::Response;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;

use crate::traits::EventStream;

pub type ByteChunks = Pin<Box<dyn futures::Stream<Item = Result<Vec<u8>>> + Send>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Message {
        content: String,
    },

    ToolCall {
        index: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        arguments: Option<String>,
    },

    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta {
    pub role: Option<String>,
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallDelta {
    #[serde(default)]
    pub index: u32,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub tool_type: Option<String>,
    pub function: Option<FunctionDelta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDelta {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

impl ChatStreamChunk {
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
    }

    pub fn to_stream_events(&self) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if let Some(choice) = self.choices.first() {
            if let Some(content) = &choice.delta.content {
                if !content.is_empty() {
                    events.push(StreamEvent::Message {
                        content: content.clone(),
                    });
                }
            }

            if let Some(tool_calls) = &choice.delta.tool_calls {
                for tc in tool_calls {
                    events.push(StreamEvent::ToolCall {
                        index: tc.index,
                        id: tc.id.clone(),
                        name: tc.function.as_ref().and_then(|f| f.name.clone()),
                        arguments: tc.function.as_ref().and_then(|f| f.arguments.clone()),
                    });
                }
            }

            if let Some(finish_reason) = &choice.finish_reason {
                events.push(StreamEvent::Done {
                    finish_reason: Some(finish_reason.clone()),
                });
            }
        }

        events
    }
}

/// Parse a chat-completions SSE body into stream events
pub fn parse_chat_sse_stream(response: Response) -> EventStream {
    let chunks = response
        .bytes_stream()
        .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(anyhow::Error::from));
    parse_sse_chunks(Box::pin(chunks))
}

/// Line-buffered SSE parser over raw byte chunks
///
/// Lines may be split across chunks; a `data: [DONE]` line ends the stream.
pub fn parse_sse_chunks(mut byte_chunks: ByteChunks) -> EventStream {
    Box::pin(async_stream::stream! {
        let mut buffer: VecDeque<u8> = VecDeque::with_capacity(8192);

        'outer: while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    buffer.extend(bytes);

                    while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                        let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();

                        let Ok(line_str) = std::str::from_utf8(&line_bytes) else {
                            yield Err(anyhow::anyhow!("Stream contained invalid UTF-8"));
                            continue;
                        };
                        let line = line_str.trim();

                        let Some(data) = line.strip_prefix("data:") else {
                            continue;
                        };
                        let data = data.trim_start();

                        if data == "[DONE]" {
                            break 'outer;
                        }

                        match serde_json::from_str::<ChatStreamChunk>(data) {
                            Ok(chunk) => {
                                for event in chunk.to_stream_events() {
                                    yield Ok(event);
                                }
                            }
                            Err(e) => yield Err(anyhow::anyhow!("Failed to parse chat chunk: {}", e)),
                        }
                    }
                }
                Err(e) => {
                    yield Err(anyhow::anyhow!("Stream error: {}", e));
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &[&str]) -> ByteChunks {
        let owned: Vec<anyhow::Result<Vec<u8>>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        Box::pin(stream::iter(owned))
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let events: Vec<StreamEvent> = parse_sse_chunks(chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel",
            "lo\"},\"finish_reason\":null}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n",
            "data: [DONE]\n",
        ]))
        .map(|e| e.unwrap())
        .collect()
        .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::Message { content: "Hello".to_string() },
                StreamEvent::Done { finish_reason: Some("stop".to_string()) },
            ]
        );
    }

    #[tokio::test]
    async fn test_tool_call_deltas() {
        let events: Vec<StreamEvent> = parse_sse_chunks(chunks(&[
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"type\":\"function\",\"function\":{\"name\":\"coding_tool\",\"arguments\":\"\"}}]},\"finish_reason\":null}]}\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{}\"}}]},\"finish_reason\":null}]}\n",
        ]))
        .map(|e| e.unwrap())
        .collect()
        .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            StreamEvent::ToolCall { id: Some(id), name: Some(name), .. } if id == "call_1" && name == "coding_tool"
        ));
        assert!(matches!(
            &events[1],
            StreamEvent::ToolCall { id: None, arguments: Some(args), .. } if args == "{}"
        ));
    }

    #[tokio::test]
    async fn test_malformed_chunk_is_an_error() {
        let results: Vec<Result<StreamEvent>> =
            parse_sse_chunks(chunks(&["data: {not json}\n"])).collect().await;
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }
}
