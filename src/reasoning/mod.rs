//! Reasoning step trait and implementations
//!
//! The reasoning step looks at the session so far and decides what happens
//! next: call a tool, or answer.

use crate::error::AdvisorError;
use crate::models::{Decision, SessionState};
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

pub mod openai;
pub use openai::OpenAiReasoningStep;

/// Trait for the decision maker (LLM controlled)
#[async_trait]
pub trait ReasoningStep: Send + Sync {
    async fn decide(&self, state: &SessionState) -> Result<Decision>;
}

/// Replays a fixed list of decisions.
/// Keeps the loop runnable without a model behind it.
pub struct ScriptedReasoningStep {
    script: Mutex<VecDeque<Decision>>,
}

impl ScriptedReasoningStep {
    pub fn new(decisions: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            script: Mutex::new(decisions.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ReasoningStep for ScriptedReasoningStep {
    async fn decide(&self, _state: &SessionState) -> Result<Decision> {
        let mut script = self
            .script
            .lock()
            .map_err(|_| AdvisorError::LlmError("scripted reasoning step poisoned".to_string()))?;

        script
            .pop_front()
            .ok_or_else(|| AdvisorError::LlmError("scripted reasoning step exhausted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_is_replayed_in_order() {
        let step = ScriptedReasoningStep::new(vec![
            Decision::finish("first"),
            Decision::finish("second"),
        ]);
        let state = SessionState::new("anything");

        let first = tokio_test::block_on(step.decide(&state)).unwrap();
        assert_eq!(first, Decision::finish("first"));
        assert_eq!(step.remaining(), 1);

        tokio_test::block_on(step.decide(&state)).unwrap();
        let exhausted = tokio_test::block_on(step.decide(&state));
        assert!(matches!(exhausted, Err(AdvisorError::LlmError(_))));
    }
}
