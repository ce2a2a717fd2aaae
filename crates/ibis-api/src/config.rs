use config::{Config as ConfigLoader, ConfigError, Environment, File};
use ibis_graph::{GraphConfig, LLMConfig};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub llm: LlmConfig,
    pub telemetry: TelemetryConfig,
    pub crew: CrewSettings,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(skip)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub location: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Step bound for one agent run
    pub max_iterations: usize,
}

impl From<&LlmConfig> for LLMConfig {
    fn from(config: &LlmConfig) -> Self {
        LLMConfig::new(config.model.clone())
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
    }
}

impl From<&LlmConfig> for GraphConfig {
    fn from(config: &LlmConfig) -> Self {
        GraphConfig::new(config.max_iterations)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    pub enabled: bool,
    #[serde(default)]
    pub project_id: Option<String>,
    /// Defaults to `{project_id}-ibis-crew-ai-logs-data`
    #[serde(default)]
    pub bucket_name: Option<String>,
    #[serde(default)]
    pub debug: bool,
    pub batch_size: usize,
    pub flush_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrewSettings {
    /// Directory with `agents.yaml` and `tasks.yaml`; the built-in crew when unset
    #[serde(default)]
    pub config_dir: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. `IBIS_<SECTION>__<KEY>` environment variables
    /// 4. Deployment variables: `LOCATION`, `GOOGLE_CLOUD_PROJECT`, `BUCKET_NAME`
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("IBIS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("llm.location", std::env::var("LOCATION").ok())?
            .set_override_option("telemetry.project_id", std::env::var("GOOGLE_CLOUD_PROJECT").ok())?
            .set_override_option("telemetry.bucket_name", std::env::var("BUCKET_NAME").ok())?;

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        // Without a static token the metadata server is used
        cfg.access_token = std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN").ok();

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [server]
        host = "127.0.0.1"
        port = 3000

        [cors]
        enabled = true
        origins = ["http://localhost:8501"]

        [llm]
        model = "gemini-2.0-flash-001"
        location = "europe-west1"
        temperature = 0.0
        max_tokens = 4096
        max_iterations = 10

        [telemetry]
        enabled = false
        batch_size = 64
        flush_interval_ms = 1000

        [crew]
        model = "gemini-2.0-flash-001"

        [logging]
        level = "debug"
        format = "json"
    "#;

    #[test]
    fn test_config_structure() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.request_timeout_secs, 300);
        assert_eq!(config.llm.location, "europe-west1");
        assert!(config.telemetry.bucket_name.is_none());
        assert!(config.crew.config_dir.is_none());
        assert!(config.access_token.is_none());
    }

    #[test]
    fn test_llm_section_converts_to_graph_types() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let llm: LLMConfig = (&config.llm).into();
        let graph: GraphConfig = (&config.llm).into();

        assert_eq!(llm.model, "gemini-2.0-flash-001");
        assert_eq!(llm.max_tokens, Some(4096));
        assert_eq!(graph.max_iterations, 10);
    }

    #[test]
    fn test_default_file_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/default.toml");
        let config = Config::from_file(path).unwrap();
        assert_eq!(config.llm.max_iterations, 25);
        assert_eq!(config.logging.format, "pretty");
    }
}
