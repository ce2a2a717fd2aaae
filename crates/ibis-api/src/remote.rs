//! Client side of the agent API: connection selection and a line-stream client.

use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::{Stream, StreamExt};
use ibis_observability::AccessTokenProvider;
use serde_json::Value;

use crate::schema::{Feedback, StreamRequest};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/";

/// One decoded line: the message and its run metadata
pub type StreamItem = (Value, Value);
pub type ItemStream = Pin<Box<dyn Stream<Item = Result<StreamItem>> + Send>>;

/// Where chat requests go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentTarget {
    /// In-process graph
    Local,
    /// A deployed server, optionally with a bearer token on every request
    RemoteUrl { url: String, authenticate: bool },
}

impl AgentTarget {
    /// `SERVICE_URL` selects a remote server; so does a deployment checkout (a `Dockerfile`
    /// in the working directory), which falls back to the default URL.
    pub fn from_env() -> Self {
        match std::env::var("SERVICE_URL") {
            Ok(url) => Self::remote(url),
            Err(_) if Path::new("Dockerfile").exists() => Self::remote(DEFAULT_BASE_URL),
            Err(_) => Self::Local,
        }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        Self::RemoteUrl {
            url: url.into(),
            authenticate: false,
        }
    }

    pub fn with_authentication(self, enabled: bool) -> Self {
        match self {
            Self::RemoteUrl { url, .. } => Self::RemoteUrl {
                url,
                authenticate: enabled,
            },
            local => local,
        }
    }
}

/// Talks to `/stream_messages` and `/feedback` of a running server
pub struct RemoteAgentClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<Arc<dyn AccessTokenProvider>>,
}

impl RemoteAgentClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Attach a bearer token to every request
    pub fn with_token(mut self, token: Arc<dyn AccessTokenProvider>) -> Self {
        self.token = Some(token);
        self
    }

    async fn post(&self, path: &str, body: &impl serde::Serialize) -> Result<reqwest::Response> {
        let mut request = self.http.post(format!("{}{}", self.base_url, path)).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.access_token().await?);
        }

        let response = request.send().await.context("Failed to send request")?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Agent API error ({}): {}", status, error_text);
        }
        Ok(response)
    }

    /// Stream decoded `[message, metadata]` lines for a chat request
    pub async fn stream_messages(&self, request: &StreamRequest) -> Result<ItemStream> {
        let response = self.post("/stream_messages", request).await?;
        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(anyhow::Error::from));
        Ok(decode_lines(bytes))
    }

    pub async fn send_feedback(&self, feedback: &Feedback) -> Result<()> {
        self.post("/feedback", feedback).await?;
        Ok(())
    }
}

/// Split a byte stream on `\n` and decode each non-empty line
pub fn decode_lines<S>(bytes: S) -> ItemStream
where
    S: Stream<Item = Result<Vec<u8>>> + Send + 'static,
{
    Box::pin(async_stream::try_stream! {
        let mut buffer: Vec<u8> = Vec::new();
        futures::pin_mut!(bytes);

        while let Some(chunk) = bytes.next().await {
            buffer.extend_from_slice(&chunk?);
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if let Some(item) = parse_line(&line)? {
                    yield item;
                }
            }
        }
        if let Some(item) = parse_line(&buffer)? {
            yield item;
        }
    })
}

/// Decode one `[message, metadata]` line; blank lines yield `None`
pub fn parse_line(line: &[u8]) -> Result<Option<StreamItem>> {
    let text = std::str::from_utf8(line).context("Stream line is not UTF-8")?.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let (message, metadata): (Value, Value) =
        serde_json::from_str(text).with_context(|| format!("Invalid stream line: {}", text))?;
    Ok(Some((message, metadata)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_only_applies_to_remote() {
        assert_eq!(AgentTarget::Local.with_authentication(true), AgentTarget::Local);
        assert_eq!(
            AgentTarget::remote("http://x/").with_authentication(true),
            AgentTarget::RemoteUrl {
                url: "http://x/".to_string(),
                authenticate: true
            }
        );
    }

    #[test]
    fn test_parse_line() {
        let (message, metadata) = parse_line(br#"[{"type":"tool","content":"ok"},{"langgraph_step":2}]"#)
            .unwrap()
            .unwrap();
        assert_eq!(message["type"], "tool");
        assert_eq!(metadata["langgraph_step"], 2);
        assert!(parse_line(b"  \n").unwrap().is_none());
        assert!(parse_line(b"{not json").is_err());
    }

    #[tokio::test]
    async fn test_decode_lines_across_chunk_boundaries() {
        let chunks: Vec<Result<Vec<u8>>> = vec![
            Ok(br#"[{"type":"AIMessageChunk","content":"He"},{}]"#.to_vec()),
            Ok(b"\n[{\"type\":\"AIMessageChunk\",".to_vec()),
            Ok(b"\"content\":\"llo\"},{}]\n".to_vec()),
        ];

        let items: Vec<StreamItem> = decode_lines(futures::stream::iter(chunks))
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[1].0["content"], "llo");
    }
}
