use std::sync::Arc;

use ibis_graph::Graph;
use ibis_observability::LogWriter;

use crate::config::Config;

/// Shared application state passed to all handlers
///
/// The Graph is stateless and created once at startup; each request gets its own run.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub graph: Arc<Graph>,
    /// Sink for feedback records
    pub feedback_log: Arc<dyn LogWriter>,
}

impl AppState {
    pub fn new(config: Config, graph: Graph, feedback_log: Arc<dyn LogWriter>) -> Self {
        Self {
            config: Arc::new(config),
            graph: Arc::new(graph),
            feedback_log,
        }
    }
}
