use super::auth::AccessTokenProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;

const STORAGE_BASE_URL: &str = "https://storage.googleapis.com";

/// Object storage operations needed for span payload offload
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    async fn upload(&self, bucket: &str, object: &str, content: Vec<u8>, content_type: &str) -> Result<()>;
}

/// Cloud Storage JSON API client
pub struct GcsClient {
    http: reqwest::Client,
    base_url: String,
    token: Arc<dyn AccessTokenProvider>,
}

impl GcsClient {
    pub fn new(token: Arc<dyn AccessTokenProvider>) -> Result<Self> {
        Self::with_base_url(token, STORAGE_BASE_URL)
    }

    pub fn with_base_url(token: Arc<dyn AccessTokenProvider>, base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: super::http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Create `bucket` in `location` unless it already exists
    ///
    /// A leading `gs://` is stripped from the bucket name.
    pub async fn create_bucket_if_not_exists(&self, bucket: &str, project: &str, location: &str) -> Result<()> {
        let bucket = bucket.strip_prefix("gs://").unwrap_or(bucket);

        if self.bucket_exists(bucket).await? {
            tracing::info!(bucket_name = %bucket, "Bucket already exists");
            return Ok(());
        }

        let response = self
            .http
            .post(format!("{}/storage/v1/b", self.base_url))
            .bearer_auth(self.token.access_token().await?)
            .query(&[("project", project)])
            .json(&serde_json::json!({ "name": bucket, "location": location }))
            .send()
            .await
            .context("Failed to send create bucket request")?;
        super::handle_response(response, "Cloud Storage").await?;

        tracing::info!(bucket_name = %bucket, bucket_location = %location, "Created bucket in location");
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for GcsClient {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        let response = self
            .http
            .get(format!("{}/storage/v1/b/{}", self.base_url, bucket))
            .bearer_auth(self.token.access_token().await?)
            .send()
            .await
            .context("Failed to send get bucket request")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        super::handle_response(response, "Cloud Storage").await?;
        Ok(true)
    }

    async fn upload(&self, bucket: &str, object: &str, content: Vec<u8>, content_type: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/upload/storage/v1/b/{}/o", self.base_url, bucket))
            .bearer_auth(self.token.access_token().await?)
            .query(&[("uploadType", "media"), ("name", object)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(content)
            .send()
            .await
            .context("Failed to send upload request")?;

        super::handle_response(response, "Cloud Storage").await?;
        Ok(())
    }
}
