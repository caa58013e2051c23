//! Core data models for the advisor agent

use crate::tools::ToolRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

//
// ================= Decision =================
//

/// A tool invocation requested by the reasoning step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Model-assigned id, echoed back with the observation
    pub id: String,
    pub request: ToolRequest,
    /// Text the model emitted alongside the call, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

impl ToolCall {
    pub fn new(request: ToolRequest) -> Self {
        Self {
            id: format!("call_{}", Uuid::new_v4().simple()),
            request,
            log: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Decision {
    CallTool(ToolCall),
    Finish { output: String },
}

impl Decision {
    pub fn finish(output: impl Into<String>) -> Self {
        Decision::Finish {
            output: output.into(),
        }
    }

    pub fn call(request: ToolRequest) -> Self {
        Decision::CallTool(ToolCall::new(request))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Decision::Finish { .. })
    }
}

//
// ================= Session =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntermediateStep {
    pub call: ToolCall,
    pub observation: String,
    pub execution_time_ms: u64,
    pub recorded_at: DateTime<Utc>,
}

/// Everything carried through one user request
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub session_id: Uuid,
    pub input: String,
    intermediate_steps: Vec<IntermediateStep>,
    pub outcome: Option<Decision>,
}

impl SessionState {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            input: input.into(),
            intermediate_steps: Vec::new(),
            outcome: None,
        }
    }

    /// Recorded (call, observation) pairs in call order
    pub fn intermediate_steps(&self) -> &[IntermediateStep] {
        &self.intermediate_steps
    }

    /// History is append-only.
    pub fn record_step(&mut self, step: IntermediateStep) {
        self.intermediate_steps.push(step);
    }

    pub fn final_output(&self) -> Option<&str> {
        match &self.outcome {
            Some(Decision::Finish { output }) => Some(output.as_str()),
            _ => None,
        }
    }
}

//
// ================= Final Result =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorResponse {
    pub output: String,
    pub processing_time: String,
    pub tool_calls: usize,
    pub session_id: Uuid,
}

/// Render a duration as `"<seconds, 2 decimals> seconds"`.
pub fn format_processing_time(elapsed: Duration) -> String {
    format!("{:.2} seconds", elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::TickerInput;

    #[test]
    fn test_processing_time_format() {
        assert_eq!(format_processing_time(Duration::ZERO), "0.00 seconds");
        assert_eq!(format_processing_time(Duration::from_millis(1500)), "1.50 seconds");
        assert_eq!(
            format_processing_time(Duration::from_micros(12_345_678)),
            "12.35 seconds"
        );
    }

    #[test]
    fn test_new_session_is_empty() {
        let state = SessionState::new("What moved the market today?");
        assert!(state.intermediate_steps().is_empty());
        assert!(state.outcome.is_none());
        assert_eq!(state.final_output(), None);
    }

    #[test]
    fn test_decision_serialization_is_tagged() {
        let decision = Decision::call(ToolRequest::LastQuote(TickerInput {
            query: "ACME".to_string(),
        }));
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["type"], "call_tool");
        assert_eq!(json["request"]["tool"], "last_quote");
        assert!(!decision.is_terminal());

        let finish = serde_json::to_value(Decision::finish("done")).unwrap();
        assert_eq!(finish, serde_json::json!({ "type": "finish", "output": "done" }));
    }
}
