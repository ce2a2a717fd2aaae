//! YAML crew definitions: agents keyed by name, tasks in execution order.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CrewError, CrewResult};

const BUILTIN_AGENTS: &str = include_str!("../config/agents.yaml");
const BUILTIN_TASKS: &str = include_str!("../config/tasks.yaml");

/// A role-configured agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    #[serde(default)]
    pub allow_delegation: bool,
}

/// A unit of work assigned to one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// May contain `{input_name}` placeholders filled at kickoff
    pub description: String,
    pub expected_output: String,
    pub agent: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrewConfig {
    agents: Vec<(String, AgentDefinition)>,
    tasks: Vec<(String, TaskDefinition)>,
}

impl CrewConfig {
    /// The engineer/QA crew shipped with the crate.
    pub fn builtin() -> CrewResult<Self> {
        Self::from_yaml(BUILTIN_AGENTS, BUILTIN_TASKS)
    }

    /// Load `agents.yaml` and `tasks.yaml` from a directory.
    pub fn load(dir: impl AsRef<Path>) -> CrewResult<Self> {
        let dir = dir.as_ref();
        let agents_path = dir.join("agents.yaml");
        let tasks_path = dir.join("tasks.yaml");
        for path in [&agents_path, &tasks_path] {
            if !path.exists() {
                return Err(CrewError::NotFound(path.clone()));
            }
        }
        debug!("Loading crew definition from {:?}", dir);

        Self::from_yaml(&fs::read_to_string(agents_path)?, &fs::read_to_string(tasks_path)?)
    }

    pub fn from_yaml(agents_yaml: &str, tasks_yaml: &str) -> CrewResult<Self> {
        let config = Self {
            agents: ordered_entries(agents_yaml, "agents.yaml")?,
            tasks: ordered_entries(tasks_yaml, "tasks.yaml")?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CrewResult<()> {
        if self.tasks.is_empty() {
            return Err(CrewError::InvalidFormat {
                source_name: "tasks.yaml".to_string(),
                message: "no tasks defined".to_string(),
            });
        }
        for (name, task) in &self.tasks {
            if self.agent(&task.agent).is_none() {
                return Err(CrewError::UnknownAgent {
                    task: name.clone(),
                    agent: task.agent.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn agent(&self, name: &str) -> Option<&AgentDefinition> {
        self.agents.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    /// Tasks in declaration order.
    pub fn tasks(&self) -> &[(String, TaskDefinition)] {
        &self.tasks
    }

    pub fn agent_names(&self) -> Vec<&str> {
        self.agents.iter().map(|(n, _)| n.as_str()).collect()
    }
}

/// Top-level mapping entries in file order; folded (`>`) scalars are trimmed.
fn ordered_entries<T: DeserializeOwned>(yaml: &str, source_name: &str) -> CrewResult<Vec<(String, T)>> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    let mapping = value.as_mapping().ok_or_else(|| CrewError::InvalidFormat {
        source_name: source_name.to_string(),
        message: "expected a mapping at the top level".to_string(),
    })?;

    mapping
        .iter()
        .map(|(key, entry)| {
            let name = key
                .as_str()
                .ok_or_else(|| CrewError::InvalidFormat {
                    source_name: source_name.to_string(),
                    message: "entry names must be strings".to_string(),
                })?
                .to_string();
            let parsed: T = serde_yaml::from_value(trim_strings(entry.clone()))?;
            Ok((name, parsed))
        })
        .collect()
}

fn trim_strings(value: serde_yaml::Value) -> serde_yaml::Value {
    match value {
        serde_yaml::Value::String(s) => serde_yaml::Value::String(s.trim().to_string()),
        serde_yaml::Value::Mapping(map) => serde_yaml::Value::Mapping(
            map.into_iter().map(|(k, v)| (k, trim_strings(v))).collect(),
        ),
        other => other,
    }
}
