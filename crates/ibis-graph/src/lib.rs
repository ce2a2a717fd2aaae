pub mod node;
pub mod router;
pub mod nodes;
pub mod graph;
pub mod builder;
pub mod tools;
pub mod types;
pub mod prompt;

pub use node::{Node, NodeType, EventSender};
pub use router::{Router, NextNode, SimpleRouter};
pub use graph::Graph;
pub use builder::GraphBuilder;
pub use tools::{ToolExecutor, ToolRegistry, MockToolExecutor};
pub use types::{GraphState, GraphInput, GraphConfig, LLMConfig, StreamEvent};
