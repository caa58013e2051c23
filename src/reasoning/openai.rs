//! OpenAI function-calling reasoning step
//!
//! Rebuilds the conversation on every turn: system prompt, the user's
//! question, then one assistant tool call plus its tool result per
//! recorded step (the agent scratchpad).

use crate::error::AdvisorError;
use crate::models::{Decision, SessionState, ToolCall};
use crate::openai::{ChatMessage, ChatToolCall, FunctionCall, OpenAiClient};
use crate::tools::{ToolRequest, ToolSet};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You are a helpful assistant";

pub struct OpenAiReasoningStep {
    client: OpenAiClient,
    tools: Vec<Value>,
}

impl OpenAiReasoningStep {
    /// Advertise every tool in `tools` to the model
    pub fn new(client: OpenAiClient, tools: &ToolSet) -> Self {
        Self {
            client,
            tools: tools.definitions(),
        }
    }
}

#[async_trait]
impl super::ReasoningStep for OpenAiReasoningStep {
    async fn decide(&self, state: &SessionState) -> Result<Decision> {
        let messages = build_messages(state);

        debug!(
            session_id = %state.session_id,
            model = %self.client.model(),
            steps = state.intermediate_steps().len(),
            "Asking model for next decision"
        );

        let message = self.client.chat(messages, self.tools.clone()).await?;
        parse_decision(message)
    }
}

/// Build the chat transcript for the current session
pub fn build_messages(state: &SessionState) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2 + state.intermediate_steps().len() * 2);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));
    messages.push(ChatMessage::user(state.input.clone()));

    for step in state.intermediate_steps() {
        let call = &step.call;
        messages.push(ChatMessage::assistant_tool_call(
            call.log.clone(),
            ChatToolCall {
                id: call.id.clone(),
                kind: "function".to_string(),
                function: FunctionCall {
                    name: call.request.kind().name().to_string(),
                    arguments: call.request.arguments().to_string(),
                },
            },
        ));
        messages.push(ChatMessage::tool_result(
            call.id.clone(),
            step.observation.clone(),
        ));
    }

    messages
}

/// Turn the model's reply into a decision.
///
/// Only the first tool call is honoured; the loop executes one tool per round.
pub fn parse_decision(message: ChatMessage) -> Result<Decision> {
    let content = message.content.filter(|c| !c.trim().is_empty());

    if let Some(calls) = message.tool_calls {
        if calls.len() > 1 {
            warn!(
                requested = calls.len(),
                "Model requested parallel tool calls; running the first only"
            );
        }

        if let Some(call) = calls.into_iter().next() {
            let request = ToolRequest::from_function_call(&call.function.name, &call.function.arguments)?;
            return Ok(Decision::CallTool(ToolCall {
                id: call.id,
                request,
                log: content,
            }));
        }
    }

    content
        .map(|output| Decision::Finish { output })
        .ok_or_else(|| AdvisorError::LlmError("Model returned neither content nor a tool call".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IntermediateStep;
    use crate::openai::Role;
    use crate::tools::{TickerInput, ToolKind};
    use chrono::Utc;

    fn assistant(content: Option<&str>, calls: Vec<(&str, &str, &str)>) -> ChatMessage {
        ChatMessage {
            role: Role::Assistant,
            content: content.map(str::to_string),
            tool_calls: if calls.is_empty() {
                None
            } else {
                Some(
                    calls
                        .into_iter()
                        .map(|(id, name, args)| ChatToolCall {
                            id: id.to_string(),
                            kind: "function".to_string(),
                            function: FunctionCall {
                                name: name.to_string(),
                                arguments: args.to_string(),
                            },
                        })
                        .collect(),
                )
            },
            tool_call_id: None,
        }
    }

    #[test]
    fn test_content_becomes_terminal_decision() {
        let decision = parse_decision(assistant(Some("ACME is trading at $10.00"), vec![])).unwrap();
        assert_eq!(decision, Decision::finish("ACME is trading at $10.00"));
    }

    #[test]
    fn test_tool_call_becomes_call_decision() {
        let decision = parse_decision(assistant(
            Some("Let me check."),
            vec![
                ("call_a", "polygon_last_quote", r#"{"query":"ACME"}"#),
                ("call_b", "polygon_ticker_news", r#"{"query":"ACME"}"#),
            ],
        ))
        .unwrap();

        match decision {
            Decision::CallTool(call) => {
                assert_eq!(call.id, "call_a");
                assert_eq!(call.request.kind(), ToolKind::LastQuote);
                assert_eq!(call.log.as_deref(), Some("Let me check."));
            }
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_tool_name_aborts() {
        let result = parse_decision(assistant(None, vec![("call_x", "delete_portfolio", "{}")]));
        assert!(matches!(result, Err(AdvisorError::UnknownTool(_))));
    }

    #[test]
    fn test_empty_reply_is_error() {
        let result = parse_decision(assistant(Some("   "), vec![]));
        assert!(matches!(result, Err(AdvisorError::LlmError(_))));
    }

    #[test]
    fn test_scratchpad_replays_steps() {
        let mut state = SessionState::new("What is the latest quote for ACME?");
        state.record_step(IntermediateStep {
            call: ToolCall {
                id: "call_1".to_string(),
                request: ToolRequest::LastQuote(TickerInput {
                    query: "ACME".to_string(),
                }),
                log: None,
            },
            observation: r#"{"P":10.0}"#.to_string(),
            execution_time_ms: 3,
            recorded_at: Utc::now(),
        });

        let messages = build_messages(&state);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content.as_deref(), Some("What is the latest quote for ACME?"));

        let calls = messages[2].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "polygon_last_quote");
        assert_eq!(calls[0].function.arguments, r#"{"query":"ACME"}"#);

        assert_eq!(messages[3].role, Role::Tool);
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_1"));
    }
}
