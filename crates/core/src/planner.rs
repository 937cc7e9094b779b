//! Planner port — the abstraction over the decision-making engine.
//!
//! Given a transcript and the declared tool schemas, a planner proposes the
//! next step: free text, zero or more tool calls, or both. Two variants
//! implement this port (rule-based heuristics and an LLM-backed adapter),
//! selected at construction — the loop never branches on which one it holds.
//!
//! Both operations are infallible at the boundary: internal provider errors
//! must degrade to a heuristic step, never surface as an error to the loop.

use async_trait::async_trait;
use crate::message::Message;
use crate::tool::{ToolCallRequest, ToolDefinition};

/// One proposed step: free-text content and zero or more tool calls.
#[derive(Debug, Clone, Default)]
pub struct PlannerStep {
    /// Free-text content (may be empty)
    pub content: String,

    /// Tool calls requested for this step, in request order
    pub tool_calls: Vec<ToolCallRequest>,
}

impl PlannerStep {
    /// A pure-text step with no tool calls.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// A step consisting only of tool calls.
    pub fn calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            content: String::new(),
            tool_calls,
        }
    }

    /// Whether this step is terminal (no tool calls requested).
    pub fn is_terminal(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

/// The planner port.
#[async_trait]
pub trait Planner: Send + Sync {
    /// A human-readable name for this planner (e.g., "heuristic", "openai").
    fn name(&self) -> &str;

    /// Propose the next step given the full transcript and available tools.
    async fn next_step(&self, transcript: &[Message], tools: &[ToolDefinition]) -> PlannerStep;

    /// Produce a narrative summary of the transcript after tool use.
    ///
    /// An empty string means "no summary available" — the caller falls back
    /// to its deterministic templated summary.
    async fn summarize(&self, transcript: &[Message]) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_step_is_terminal() {
        let step = PlannerStep::text("hello");
        assert!(step.is_terminal());
        assert_eq!(step.content, "hello");
    }

    #[test]
    fn call_step_is_not_terminal() {
        let step = PlannerStep::calls(vec![ToolCallRequest {
            id: "call_1".into(),
            name: "get_weather".into(),
            arguments: serde_json::Map::new(),
            raw_arguments: "{}".into(),
        }]);
        assert!(!step.is_terminal());
        assert!(step.content.is_empty());
    }
}
