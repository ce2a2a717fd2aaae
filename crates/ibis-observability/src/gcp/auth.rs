use anyhow::{Context, Result};
use async_trait::async_trait;
pub use ibis_llm::auth::{AccessTokenProvider, StaticToken};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Token from the GCE/Cloud Run metadata server, cached until shortly before expiry
pub struct MetadataServerToken {
    http: reqwest::Client,
    url: String,
    cached: Mutex<Option<(String, Instant)>>,
}

impl MetadataServerToken {
    pub fn new() -> Result<Self> {
        Self::with_url(METADATA_TOKEN_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: super::http_client()?,
            url: url.into(),
            cached: Mutex::new(None),
        })
    }
}

#[async_trait]
impl AccessTokenProvider for MetadataServerToken {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some((token, expires_at)) = cached.as_ref() {
            if Instant::now() < *expires_at {
                return Ok(token.clone());
            }
        }

        let response = self
            .http
            .get(&self.url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .context("Failed to reach metadata server")?;
        let response = super::handle_response(response, "Metadata server").await?;
        let body: MetadataTokenResponse = response
            .json()
            .await
            .context("Failed to parse metadata token response")?;

        let lifetime = Duration::from_secs(body.expires_in.saturating_sub(60));
        *cached = Some((body.access_token.clone(), Instant::now() + lifetime));
        Ok(body.access_token)
    }
}
