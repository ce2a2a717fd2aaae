use std::sync::Arc;
use anyhow::{Result, anyhow};

use ibis_llm::ChatClient;
use ibis_observability::Observer;
use crate::graph::Graph;
use crate::tools::{ToolExecutor, ToolRegistry};
use crate::types::GraphConfig;

/// Builder for constructing a Graph with optional components
#[derive(Default)]
pub struct GraphBuilder {
    llm_client: Option<Arc<dyn ChatClient>>,
    tools: ToolRegistry,
    config: Option<GraphConfig>,
    system_prompt: Option<String>,
    observer: Option<Arc<dyn Observer>>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chat model client
    pub fn llm_client(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.llm_client = Some(client);
        self
    }

    /// Register a tool the model may call
    pub fn tool(mut self, tool: Arc<dyn ToolExecutor>) -> Self {
        self.tools = self.tools.register(tool);
        self
    }

    /// Set the graph configuration (required)
    pub fn config(mut self, config: GraphConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the agent's system instruction
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Attach an observer for run and node lifecycle callbacks
    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Build the Graph
    pub fn build(self) -> Result<Graph> {
        let llm_client = self.llm_client
            .ok_or_else(|| anyhow!("LLM client is required"))?;
        let config = self.config
            .ok_or_else(|| anyhow!("Graph config with a step bound is required"))?;
        if config.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be at least 1"));
        }

        Ok(Graph::new(
            llm_client,
            Arc::new(self.tools),
            config,
            self.system_prompt,
            self.observer,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ibis_llm::ScriptedChatClient;

    #[test]
    fn test_build_requires_config() {
        let result = GraphBuilder::new()
            .llm_client(Arc::new(ScriptedChatClient::default()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_requires_client() {
        let result = GraphBuilder::new().config(GraphConfig::new(10)).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_step_bound_rejected() {
        let result = GraphBuilder::new()
            .llm_client(Arc::new(ScriptedChatClient::default()))
            .config(GraphConfig::new(0))
            .build();
        assert!(result.is_err());
    }
}
