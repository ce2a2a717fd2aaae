use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ibis_graph::ToolExecutor;
use ibis_llm::Tool;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::crew::DevCrew;

pub const CODING_TOOL_NAME: &str = "coding_tool";

#[derive(Debug, Deserialize)]
struct CodingToolArgs {
    code_instructions: String,
}

/// Exposes the crew to the agent graph as `coding_tool(code_instructions)`
pub struct CodingTool {
    crew: Arc<DevCrew>,
}

impl CodingTool {
    pub fn new(crew: Arc<DevCrew>) -> Self {
        Self { crew }
    }
}

#[async_trait]
impl ToolExecutor for CodingTool {
    fn definition(&self) -> Tool {
        Tool::new(
            CODING_TOOL_NAME,
            "Use this tool to write a python program given a set of requirements and or instructions.",
            json!({
                "type": "object",
                "properties": {
                    "code_instructions": {
                        "type": "string",
                        "description": "Requirements or instructions for the program"
                    }
                },
                "required": ["code_instructions"]
            }),
        )
    }

    async fn execute(&self, arguments: Value) -> Result<String> {
        let args: CodingToolArgs =
            serde_json::from_value(arguments).context("Invalid coding_tool arguments")?;

        let inputs = HashMap::from([("code_instructions".to_string(), args.code_instructions)]);
        let output = self.crew.kickoff(&inputs).await?;
        Ok(output.final_output)
    }
}
