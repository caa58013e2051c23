//! Agent control loop
//!
//! DECIDE → (EXECUTE → DECIDE)* → DONE
//!
//! An explicit state machine over [`LoopState`]. Each request gets a fresh
//! [`SessionState`]; nothing but the tool set and the model client is shared
//! between requests.

use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::execution::Executor;
use crate::models::{format_processing_time, AdvisorResponse, Decision, SessionState, ToolCall};
use crate::openai::OpenAiClient;
use crate::reasoning::{OpenAiReasoningStep, ReasoningStep};
use crate::tools::{PolygonClient, ToolSet};
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Where the loop currently is
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    Deciding,
    Executing(ToolCall),
    Done(String),
}

/// Runs the decide/execute cycle for one request at a time
pub struct Agent {
    reasoning: Box<dyn ReasoningStep>,
    executor: Executor,
    max_iterations: Option<usize>,
}

impl Agent {
    pub fn new(
        reasoning: Box<dyn ReasoningStep>,
        executor: Executor,
        max_iterations: Option<usize>,
    ) -> Self {
        Self {
            reasoning,
            executor,
            max_iterations,
        }
    }

    /// Wire the OpenAI reasoning step and Polygon-backed tools from config
    pub fn from_config(config: &AdvisorConfig) -> Result<Self> {
        let tools = ToolSet::new(Arc::new(PolygonClient::from_config(config)?));
        let reasoning = OpenAiReasoningStep::new(OpenAiClient::from_config(config)?, &tools);

        Ok(Self::new(
            Box::new(reasoning),
            Executor::new(tools),
            config.max_iterations,
        ))
    }

    /// Run the loop to completion for `input` and return the final session
    pub async fn run(&self, input: &str) -> Result<SessionState> {
        let mut state = SessionState::new(input);
        let mut current = LoopState::Deciding;

        info!(
            session_id = %state.session_id,
            input = %state.input,
            "Agent: starting session"
        );

        loop {
            current = match current {
                LoopState::Done(_) => break,
                other => self.transition(&mut state, other).await?,
            };
        }

        info!(
            session_id = %state.session_id,
            tool_calls = state.intermediate_steps().len(),
            "Agent: session complete"
        );

        Ok(state)
    }

    /// Advance the machine by one transition
    pub async fn transition(&self, state: &mut SessionState, current: LoopState) -> Result<LoopState> {
        match current {
            LoopState::Deciding => {
                let decision = self.reasoning.decide(state).await?;
                state.outcome = Some(decision.clone());

                Ok(match decision {
                    Decision::CallTool(call) => {
                        debug!(
                            session_id = %state.session_id,
                            tool = %call.request.kind(),
                            "Decision: call tool"
                        );
                        LoopState::Executing(call)
                    }
                    Decision::Finish { output } => {
                        debug!(session_id = %state.session_id, "Decision: finish");
                        LoopState::Done(output)
                    }
                })
            }
            LoopState::Executing(call) => {
                if let Some(max) = self.max_iterations {
                    if state.intermediate_steps().len() >= max {
                        return Err(AdvisorError::MaxIterationsExceeded(max));
                    }
                }

                self.executor.execute(state, call).await?;
                Ok(LoopState::Deciding)
            }
            done @ LoopState::Done(_) => Ok(done),
        }
    }

    /// Answer one free-text query and report how long it took
    pub async fn respond(&self, query: &str) -> Result<AdvisorResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AdvisorError::EmptyQuery);
        }

        let start = Instant::now();
        let state = self.run(query).await?;
        let processing_time = format_processing_time(start.elapsed());

        let output = state
            .final_output()
            .ok_or_else(|| AdvisorError::LlmError("Session ended without an answer".to_string()))?
            .to_string();

        info!(
            session_id = %state.session_id,
            processing_time = %processing_time,
            "Query answered"
        );

        Ok(AdvisorResponse {
            output,
            processing_time,
            tool_calls: state.intermediate_steps().len(),
            session_id: state.session_id,
        })
    }
}
