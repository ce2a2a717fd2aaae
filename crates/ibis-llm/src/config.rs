// Connection settings for the Vertex AI OpenAI-compatible chat endpoint

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOCATION: &str = "us-central1";

/// Configuration for the Vertex AI provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexConfig {
    pub project_id: String,
    pub location: String,
    /// Overrides the derived endpoint (used by tests and proxies)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl VertexConfig {
    pub fn new(project_id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            location: location.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Build from `GOOGLE_CLOUD_PROJECT` and `LOCATION`
    pub fn from_env() -> Result<Self> {
        let project_id = std::env::var("GOOGLE_CLOUD_PROJECT")
            .context("GOOGLE_CLOUD_PROJECT environment variable is required")?;
        let location = std::env::var("LOCATION").unwrap_or_else(|_| DEFAULT_LOCATION.to_string());

        Ok(Self::new(project_id, location))
    }

    /// Base URL of the OpenAI-compatible surface, without a trailing slash
    pub fn endpoint(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!(
                "https://{location}-aiplatform.googleapis.com/v1beta1/projects/{project}/locations/{location}/endpoints/openapi",
                location = self.location,
                project = self.project_id,
            ),
        }
    }
}

/// Vertex expects publisher-qualified model ids on this endpoint
pub fn qualified_model(model: &str) -> String {
    if model.contains('/') {
        model.to_string()
    } else {
        format!("google/{}", model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_derived_from_project_and_location() {
        let config = VertexConfig::new("my-project", "europe-west1");
        assert_eq!(
            config.endpoint(),
            "https://europe-west1-aiplatform.googleapis.com/v1beta1/projects/my-project/locations/europe-west1/endpoints/openapi"
        );
    }

    #[test]
    fn test_base_url_override_strips_trailing_slash() {
        let config = VertexConfig::new("p", "us-central1").with_base_url("http://127.0.0.1:9000/");
        assert_eq!(config.endpoint(), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_qualified_model() {
        assert_eq!(qualified_model("gemini-2.0-flash-001"), "google/gemini-2.0-flash-001");
        assert_eq!(qualified_model("google/gemini-2.0-flash-001"), "google/gemini-2.0-flash-001");
    }
}
