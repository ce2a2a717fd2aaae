// Bearer token sources for Google APIs

use anyhow::{Context, Result};
use async_trait::async_trait;

/// Source of OAuth2 bearer tokens, asked once per request
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A fixed token, e.g. from `gcloud auth print-access-token`
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn from_env() -> Result<Self> {
        let token = std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN")
            .context("GOOGLE_OAUTH_ACCESS_TOKEN environment variable is required")?;
        Ok(Self(token))
    }
}

#[async_trait]
impl AccessTokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
