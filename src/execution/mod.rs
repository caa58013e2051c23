//! Executor for requested tool calls
//!
//! Runs exactly the tool the decision names and records the observation.
//! No retries: a failing tool fails the request.

use crate::models::{IntermediateStep, SessionState, ToolCall};
use crate::tools::ToolSet;
use crate::Result;
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, warn};

pub struct Executor {
    tools: ToolSet,
}

impl Executor {
    pub fn new(tools: ToolSet) -> Self {
        Self { tools }
    }

    /// Invoke the tool for `call` and append (call, observation) to history
    pub async fn execute(&self, state: &mut SessionState, call: ToolCall) -> Result<()> {
        let tool = call.request.kind();
        let start = Instant::now();

        debug!(
            session_id = %state.session_id,
            tool = %tool,
            input = %call.request.arguments(),
            "Invoking tool"
        );

        let observation = self.tools.invoke(&call.request).await.map_err(|e| {
            warn!(
                session_id = %state.session_id,
                tool = %tool,
                error = %e,
                "Tool execution failed"
            );
            e
        })?;

        let execution_time_ms = start.elapsed().as_millis() as u64;

        debug!(
            session_id = %state.session_id,
            tool = %tool,
            elapsed_ms = execution_time_ms,
            observation_len = observation.len(),
            "Tool completed"
        );

        state.record_step(IntermediateStep {
            call,
            observation,
            execution_time_ms,
            recorded_at: Utc::now(),
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdvisorError;
    use crate::tools::testing::StaticMarketData;
    use crate::tools::{TickerInput, ToolRequest};
    use std::sync::Arc;

    fn executor() -> Executor {
        Executor::new(ToolSet::new(Arc::new(StaticMarketData::default())))
    }

    #[tokio::test]
    async fn test_execute_appends_step() {
        let executor = executor();
        let mut state = SessionState::new("news on MSFT");

        let call = ToolCall::new(ToolRequest::TickerNews(TickerInput {
            query: "MSFT".to_string(),
        }));
        executor.execute(&mut state, call.clone()).await.unwrap();

        let steps = state.intermediate_steps();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].call, call);
        assert!(steps[0].observation.contains("MSFT beats estimates"));
    }

    #[tokio::test]
    async fn test_failed_tool_records_nothing() {
        let executor = executor();
        let mut state = SessionState::new("financials");

        let result = executor
            .execute(
                &mut state,
                ToolCall::new(ToolRequest::Financials(TickerInput {
                    query: "FAIL".to_string(),
                })),
            )
            .await;

        assert!(matches!(result, Err(AdvisorError::ToolError(_))));
        assert!(state.intermediate_steps().is_empty());
    }
}
