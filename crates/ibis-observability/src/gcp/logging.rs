use super::auth::AccessTokenProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

const LOGGING_BASE_URL: &str = "https://logging.googleapis.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Structured log sink
#[async_trait]
pub trait LogWriter: Send + Sync {
    async fn write_struct(&self, payload: Value, severity: LogSeverity) -> Result<()>;
}

/// Cloud Logging v2 `entries:write` client bound to one log name
pub struct CloudLoggingClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    log_name: String,
    token: Arc<dyn AccessTokenProvider>,
}

impl CloudLoggingClient {
    pub fn new(
        token: Arc<dyn AccessTokenProvider>,
        project_id: impl Into<String>,
        log_name: impl Into<String>,
    ) -> Result<Self> {
        Self::with_base_url(token, project_id, log_name, LOGGING_BASE_URL)
    }

    pub fn with_base_url(
        token: Arc<dyn AccessTokenProvider>,
        project_id: impl Into<String>,
        log_name: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            http: super::http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            log_name: log_name.into(),
            token,
        })
    }

    fn full_log_name(&self) -> String {
        format!("projects/{}/logs/{}", self.project_id, self.log_name)
    }
}

#[async_trait]
impl LogWriter for CloudLoggingClient {
    async fn write_struct(&self, payload: Value, severity: LogSeverity) -> Result<()> {
        let body = serde_json::json!({
            "entries": [{
                "logName": self.full_log_name(),
                "resource": { "type": "global" },
                "severity": severity,
                "jsonPayload": payload,
            }]
        });

        let response = self
            .http
            .post(format!("{}/v2/entries:write", self.base_url))
            .bearer_auth(self.token.access_token().await?)
            .json(&body)
            .send()
            .await
            .context("Failed to send log entries")?;

        super::handle_response(response, "Cloud Logging").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::StaticToken;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_write_struct_posts_entry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/entries:write")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "entries": [{
                    "logName": "projects/p/logs/ibis-crew-ai",
                    "severity": "INFO",
                    "jsonPayload": {"score": 4}
                }]
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = CloudLoggingClient::with_base_url(
            Arc::new(StaticToken::new("t")),
            "p",
            "ibis-crew-ai",
            server.url(),
        )
        .unwrap();
        client
            .write_struct(serde_json::json!({"score": 4}), LogSeverity::Info)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_write_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v2/entries:write")
            .with_status(400)
            .with_body("entry too large")
            .create_async()
            .await;

        let client =
            CloudLoggingClient::with_base_url(Arc::new(StaticToken::new("t")), "p", "l", server.url()).unwrap();
        let err = client
            .write_struct(serde_json::json!({}), LogSeverity::Info)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("entry too large"));
    }
}
