pub mod state;
pub mod config;
pub mod events;

pub use state::{GraphState, GraphInput, ToolRun};
pub use config::{GraphConfig, LLMConfig};
pub use events::StreamEvent;
