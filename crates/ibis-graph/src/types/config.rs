use serde::{Deserialize, Serialize};

/// Execution limits for one graph run
///
/// Has no `Default`; callers choose the step bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Maximum number of node executions (model and tool steps combined)
    pub max_iterations: usize,
}

impl GraphConfig {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl LLMConfig {
    /// Deterministic sampling with a 4096 token ceiling
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: Some(0.0),
            max_tokens: Some(4096),
        }
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }
}
