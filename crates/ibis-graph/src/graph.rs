use crate::node::{Node, NodeType};
use crate::nodes::{LLMNode, ToolNode};
use crate::router::{NextNode, Router, SimpleRouter};
use crate::tools::ToolRegistry;
use crate::types::{GraphConfig, GraphInput, GraphState, StreamEvent};
use anyhow::Result;
use ibis_llm::{ChatClient, Message};
use ibis_observability::{
    NodeObservation, NodeObservationData, ObservedMessage, Observer, ToolCallInfo, ToolResultInfo,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

pub struct Graph {
    llm_client: Arc<dyn ChatClient>,
    tools: Arc<ToolRegistry>,
    config: GraphConfig,
    system_prompt: Option<String>,
    observer: Option<Arc<dyn Observer>>,
}

/// Everything a spawned run owns
struct RunContext {
    llm_node: LLMNode,
    tool_node: ToolNode,
    config: GraphConfig,
    observer: Option<Arc<dyn Observer>>,
}

impl Graph {
    pub(crate) fn new(
        llm_client: Arc<dyn ChatClient>,
        tools: Arc<ToolRegistry>,
        config: GraphConfig,
        system_prompt: Option<String>,
        observer: Option<Arc<dyn Observer>>,
    ) -> Self {
        Self {
            llm_client,
            tools,
            config,
            system_prompt,
            observer,
        }
    }

    /// Create a builder for fluent construction
    pub fn builder() -> crate::builder::GraphBuilder {
        crate::builder::GraphBuilder::new()
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Spawn execution in background, return event receiver
    ///
    /// Dropping the receiver stops the run at its next event emission.
    pub fn spawn_run(&self, input: GraphInput) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(1000);

        let mut llm_node = LLMNode::new(Arc::clone(&self.llm_client), Arc::clone(&self.tools));
        if let Some(prompt) = &self.system_prompt {
            llm_node = llm_node.with_system_prompt(prompt.clone());
        }
        let ctx = RunContext {
            llm_node,
            tool_node: ToolNode::new(Arc::clone(&self.tools)),
            config: self.config.clone(),
            observer: self.observer.clone(),
        };

        tokio::spawn(async move {
            if let Err(e) = Self::execute_loop(input, tx.clone(), ctx).await {
                tracing::warn!(error = %e, "Graph run failed");
                let _ = tx
                    .send(StreamEvent::Error {
                        message: e.to_string(),
                        node_id: None,
                    })
                    .await;
            }
        });

        rx
    }

    async fn execute_loop(
        input: GraphInput,
        event_tx: mpsc::Sender<StreamEvent>,
        ctx: RunContext,
    ) -> Result<()> {
        let start_time = Instant::now();
        let properties = input.tracing.properties();
        let mut state = GraphState::from_input(input);

        if let Some(observer) = &ctx.observer {
            if let Err(e) = observer
                .trace_start(state.run_id.clone(), state.conversation_id.clone(), properties)
                .await
            {
                tracing::error!("Failed to start trace: {}", e);
            }
        }

        let result = Self::run_nodes(&mut state, &event_tx, &ctx).await;
        let total_duration = start_time.elapsed().as_millis() as u64;

        let status = match &result {
            Ok(status) => status.as_str(),
            Err(_) => "error",
        };
        if let Some(observer) = &ctx.observer {
            if let Err(e) = observer
                .trace_end(state.run_id.clone(), status.to_string(), total_duration)
                .await
            {
                tracing::error!("Failed to end trace: {}", e);
            }
        }

        if result? == "success" {
            event_tx
                .send(StreamEvent::EndStream {
                    status: "success".to_string(),
                    total_duration_ms: total_duration,
                })
                .await?;
        }

        Ok(())
    }

    /// Drive the node loop; returns the run status
    async fn run_nodes(
        state: &mut GraphState,
        event_tx: &mpsc::Sender<StreamEvent>,
        ctx: &RunContext,
    ) -> Result<String> {
        event_tx
            .send(StreamEvent::InitStream {
                run_id: state.run_id.clone(),
                conversation_id: state.conversation_id.clone(),
                timestamp: chrono::Utc::now().timestamp_millis(),
            })
            .await?;

        let router = SimpleRouter;
        let mut current_node = NodeType::LLM;
        let mut iteration = 0;

        loop {
            // Guardrail: max iterations
            if iteration >= ctx.config.max_iterations {
                tracing::warn!(
                    run_id = %state.run_id,
                    max_iterations = ctx.config.max_iterations,
                    "Step bound reached"
                );
                event_tx
                    .send(StreamEvent::Error {
                        message: format!("Max iterations ({}) reached", ctx.config.max_iterations),
                        node_id: Some(current_node.name().to_string()),
                    })
                    .await?;
                return Ok("max_iterations".to_string());
            }
            iteration += 1;

            event_tx
                .send(StreamEvent::NodeStart {
                    node: current_node.name().to_string(),
                    step: iteration,
                })
                .await?;

            let node_start = chrono::Utc::now();
            let timer = Instant::now();
            let messages_before = state.messages.len();
            let runs_before = state.tool_runs.len();

            match current_node {
                NodeType::LLM => ctx.llm_node.execute(state, event_tx.clone()).await?,
                NodeType::Tool => ctx.tool_node.execute(state, event_tx.clone()).await?,
            }

            if let Some(observer) = &ctx.observer {
                let observation = Self::create_observation(
                    state,
                    current_node,
                    iteration,
                    node_start,
                    timer.elapsed().as_millis() as u64,
                    messages_before,
                    runs_before,
                );
                let traced = match current_node {
                    NodeType::LLM => observer.trace_llm_node(observation).await,
                    NodeType::Tool => observer.trace_tool_node(observation).await,
                };
                if let Err(e) = traced {
                    tracing::error!("Failed to trace node execution: {}", e);
                }
            }

            match router.next(state, current_node) {
                NextNode::End => return Ok("success".to_string()),
                NextNode::LLM => current_node = NodeType::LLM,
                NextNode::Tool => current_node = NodeType::Tool,
            }
        }
    }

    /// Create observation data for tracing
    fn create_observation(
        state: &GraphState,
        node_type: NodeType,
        step: usize,
        started_at: chrono::DateTime<chrono::Utc>,
        duration_ms: u64,
        messages_before: usize,
        runs_before: usize,
    ) -> NodeObservation {
        let new_messages = &state.messages[messages_before..];

        let data = match node_type {
            NodeType::LLM => NodeObservationData::Llm {
                input_messages: state.messages[..messages_before]
                    .iter()
                    .map(ObservedMessage::from)
                    .collect(),
                output: new_messages.iter().map(ObservedMessage::from).collect(),
                model: state.llm_config.model.clone(),
            },
            NodeType::Tool => {
                let tool_calls = state.messages[..messages_before]
                    .last()
                    .map(|msg| msg.tool_calls().iter().map(ToolCallInfo::from).collect())
                    .unwrap_or_default();

                let tool_results = new_messages
                    .iter()
                    .zip(&state.tool_runs[runs_before..])
                    .filter_map(|(msg, run)| match msg {
                        Message::Tool { content, .. } => Some(ToolResultInfo {
                            tool_call_id: run.tool_call_id.clone(),
                            tool_name: run.tool_name.clone(),
                            result: content.text_lossy(),
                            is_error: run.is_error,
                            duration_ms: run.duration_ms,
                        }),
                        _ => None,
                    })
                    .collect();

                NodeObservationData::Tool {
                    tool_calls,
                    tool_results,
                }
            }
        };

        NodeObservation {
            run_id: state.run_id.clone(),
            conversation_id: state.conversation_id.clone(),
            node_name: node_type.name().to_string(),
            step,
            started_at,
            duration_ms,
            data,
        }
    }
}
