//! Sequential execution of the crew's tasks against a chat model.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use ibis_llm::{ChatClient, ChatOptions, ChatRequest, Message};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{AgentDefinition, CrewConfig, TaskDefinition};
use crate::error::{CrewError, CrewResult};

pub const DEFAULT_CREW_MODEL: &str = "gemini-2.0-flash-001";

/// Output of a single task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    pub task: String,
    pub agent: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewOutput {
    pub task_outputs: Vec<TaskOutput>,
    /// Output of the last task
    pub final_output: String,
}

pub struct DevCrew {
    client: Arc<dyn ChatClient>,
    model: String,
    config: CrewConfig,
}

impl DevCrew {
    pub fn new(client: Arc<dyn ChatClient>, config: CrewConfig) -> Self {
        Self {
            client,
            model: DEFAULT_CREW_MODEL.to_string(),
            config,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn config(&self) -> &CrewConfig {
        &self.config
    }

    /// Run every task in declared order. Each task sees the previous task's output.
    pub async fn kickoff(&self, inputs: &HashMap<String, String>) -> CrewResult<CrewOutput> {
        let started = Instant::now();
        let mut task_outputs: Vec<TaskOutput> = Vec::with_capacity(self.config.tasks().len());

        for (task_name, task) in self.config.tasks() {
            let agent = self.config.agent(&task.agent).ok_or_else(|| CrewError::UnknownAgent {
                task: task_name.clone(),
                agent: task.agent.clone(),
            })?;
            let description = interpolate(&task.description, inputs)?;
            let context = task_outputs.last().map(|o| o.output.as_str());

            debug!(task = %task_name, agent = %task.agent, "Starting crew task");
            let output = self.run_task(task_name, agent, task, &description, context).await?;

            task_outputs.push(TaskOutput {
                task: task_name.clone(),
                agent: task.agent.clone(),
                output,
            });
        }

        let final_output = task_outputs
            .last()
            .map(|o| o.output.clone())
            .unwrap_or_default();

        info!(
            tasks = task_outputs.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Crew finished"
        );

        Ok(CrewOutput {
            task_outputs,
            final_output,
        })
    }

    async fn run_task(
        &self,
        task_name: &str,
        agent: &AgentDefinition,
        task: &TaskDefinition,
        description: &str,
        context: Option<&str>,
    ) -> CrewResult<String> {
        let messages = vec![
            Message::system(agent_prompt(agent)),
            Message::human(task_prompt(description, &task.expected_output, context)),
        ];
        let request = ChatRequest::new(self.model.clone(), messages)
            .with_options(ChatOptions::new().temperature(0.0));

        let response = self.client.chat(request).await.map_err(|e| CrewError::TaskFailed {
            task: task_name.to_string(),
            message: e.to_string(),
        })?;

        response.content.ok_or_else(|| CrewError::TaskFailed {
            task: task_name.to_string(),
            message: "model returned no content".to_string(),
        })
    }
}

fn agent_prompt(agent: &AgentDefinition) -> String {
    format!(
        "You are {}. {}\nYour personal goal is: {}",
        agent.role, agent.backstory, agent.goal
    )
}

fn task_prompt(description: &str, expected_output: &str, context: Option<&str>) -> String {
    let mut prompt = format!(
        "Current Task: {}\n\nThis is the expected criteria for your final answer: {}\nyou MUST return the actual complete content as the final answer, not a summary.",
        description, expected_output
    );
    if let Some(context) = context {
        prompt.push_str("\n\nThis is the context you're working with:\n");
        prompt.push_str(context);
    }
    prompt
}

/// Replace `{name}` placeholders with kickoff inputs
fn interpolate(template: &str, inputs: &HashMap<String, String>) -> CrewResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_placeholder(&after[..close]) => {
                let key = &after[..close];
                let value = inputs
                    .get(key)
                    .ok_or_else(|| CrewError::MissingInput(key.to_string()))?;
                out.push_str(value);
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn is_placeholder(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
