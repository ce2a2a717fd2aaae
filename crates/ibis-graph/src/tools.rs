use anyhow::Result;
use async_trait::async_trait;
use ibis_llm::Tool;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A tool the model can call
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Name, description and JSON schema advertised to the model
    fn definition(&self) -> Tool;

    async fn execute(&self, arguments: Value) -> Result<String>;
}

/// Named collection of tools bound to the agent node
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolExecutor>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; a tool with the same name is replaced
    pub fn register(mut self, tool: Arc<dyn ToolExecutor>) -> Self {
        let name = tool.definition().name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn list_tools(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Definitions in registration order
    pub fn llm_tools(&self) -> Vec<Tool> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    pub async fn execute(&self, tool_name: &str, arguments: Value) -> Result<String> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {}", tool_name))?;
        tool.execute(arguments).await
    }
}

/// Tool double with a fixed reply that records the arguments it receives
pub struct MockToolExecutor {
    name: String,
    reply: std::result::Result<String, String>,
    calls: Mutex<Vec<Value>>,
}

impl MockToolExecutor {
    pub fn replying(name: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reply: Ok(reply.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reply: Err(error.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ToolExecutor for MockToolExecutor {
    fn definition(&self) -> Tool {
        Tool::new(
            self.name.clone(),
            "Test tool",
            serde_json::json!({"type": "object", "properties": {}}),
        )
    }

    async fn execute(&self, arguments: Value) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(arguments);
        }
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(error) => anyhow::bail!("{}", error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registry_dispatches_by_name() {
        let registry = ToolRegistry::new()
            .register(Arc::new(MockToolExecutor::replying("coding_tool", "print('hi')")))
            .register(Arc::new(MockToolExecutor::replying("search", "nothing")));

        assert_eq!(registry.list_tools(), vec!["coding_tool", "search"]);
        assert_eq!(registry.llm_tools()[0].name(), "coding_tool");
        let out = registry
            .execute("coding_tool", serde_json::json!({"code_instructions": "x"}))
            .await
            .unwrap();
        assert_eq!(out, "print('hi')");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error() {
        let registry = ToolRegistry::new();
        let err = registry.execute("missing", Value::Null).await.unwrap_err();
        assert!(err.to_string().contains("Unknown tool: missing"));
    }
}
