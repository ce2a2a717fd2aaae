//! Assembles the agent graph: Vertex chat model plus the crew-backed coding tool.

use std::sync::Arc;

use anyhow::{Context, Result};
use ibis_crew::{CodingTool, CrewConfig, DevCrew};
use ibis_graph::{Graph, GraphConfig};
use ibis_llm::{ChatClient, VertexClient, VertexConfig};
use ibis_observability::{AccessTokenProvider, MetadataServerToken, Observer, StaticToken};

use crate::config::Config;

/// Static token from the environment, else the metadata server
pub fn token_provider(config: &Config) -> Result<Arc<dyn AccessTokenProvider>> {
    Ok(match &config.access_token {
        Some(token) => Arc::new(StaticToken::new(token.clone())),
        None => Arc::new(MetadataServerToken::new()?),
    })
}

/// Vertex client that asks `token` for a bearer token on every request
pub fn vertex_client(config: &Config, token: Arc<dyn AccessTokenProvider>) -> Result<Arc<dyn ChatClient>> {
    let project_id = config
        .telemetry
        .project_id
        .clone()
        .context("GOOGLE_CLOUD_PROJECT is required for the Vertex AI client")?;

    let client = VertexClient::new(VertexConfig::new(project_id, config.llm.location.clone()), token)?;
    Ok(Arc::new(client))
}

pub fn build_graph(
    config: &Config,
    client: Arc<dyn ChatClient>,
    observer: Option<Arc<dyn Observer>>,
) -> Result<Graph> {
    let crew_config = match &config.crew.config_dir {
        Some(dir) => CrewConfig::load(dir)?,
        None => CrewConfig::builtin()?,
    };
    let crew = DevCrew::new(Arc::clone(&client), crew_config).with_model(config.crew.model.clone());

    let mut builder = Graph::builder()
        .llm_client(client)
        .tool(Arc::new(CodingTool::new(Arc::new(crew))))
        .config(GraphConfig::from(&config.llm));
    if let Some(observer) = observer {
        builder = builder.observer(observer);
    }
    builder.build()
}
