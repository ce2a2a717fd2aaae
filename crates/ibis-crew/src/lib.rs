//! Engineer/QA crew executed as an ordered list of model-backed tasks.

pub mod config;
pub mod crew;
pub mod error;
pub mod tool;

pub use config::{AgentDefinition, CrewConfig, TaskDefinition};
pub use crew::{CrewOutput, DevCrew, TaskOutput, DEFAULT_CREW_MODEL};
pub use error::{CrewError, CrewResult};
pub use tool::{CodingTool, CODING_TOOL_NAME};
