//! Error types for crew loading and execution.

use std::path::PathBuf;
use thiserror::Error;

pub type CrewResult<T> = Result<T, CrewError>;

#[derive(Error, Debug)]
pub enum CrewError {
    #[error("Crew definition not found at path: {0}")]
    NotFound(PathBuf),

    #[error("Invalid crew definition in {source_name}: {message}")]
    InvalidFormat { source_name: String, message: String },

    #[error("Task '{task}' references unknown agent '{agent}'")]
    UnknownAgent { task: String, agent: String },

    #[error("Missing kickoff input: {0}")]
    MissingInput(String),

    #[error("Task '{task}' failed: {message}")]
    TaskFailed { task: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
