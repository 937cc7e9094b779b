//! Tool contract — name-indexed dispatch with a uniform result envelope.
//!
//! Tools are the agent's external capabilities: recording expenses, fetching
//! weather, searching the web, rendering charts. The registry holds a closed
//! set of declared schemas and a mutable mapping from name to handler, and
//! the `ToolResult` envelope is the only channel through which success or
//! failure flows back into the loop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use crate::error::ToolError;

/// A declared tool schema, advertised to the planner each step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A request to execute a tool, as proposed by the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Correlation ID, unique within a step
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Parsed arguments
    pub arguments: serde_json::Map<String, serde_json::Value>,

    /// The planner's verbatim serialized arguments, echoed back unchanged
    pub raw_arguments: String,
}

/// The result of a tool execution.
///
/// Owned exclusively by the call that produced it; immutable once returned.
/// Handlers fold every internal failure into `success = false` — a
/// `ToolResult` is the only failure channel the loop understands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// Human-readable summary
    pub message: String,

    /// Structured result fields
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl ToolResult {
    /// A successful result with no structured data.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: serde_json::Map::new(),
        }
    }

    /// A failed result.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: serde_json::Map::new(),
        }
    }

    /// Attach structured data fields.
    pub fn with_data(mut self, data: serde_json::Map<String, serde_json::Value>) -> Self {
        self.data = data;
        self
    }
}

/// The core tool handler trait.
///
/// One handler per declared tool name, registered at bootstrap. Execution is
/// infallible by contract: arbitrary internal errors must be translated into
/// `ToolResult::fail` rather than propagated.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute the tool for the given user with the given arguments.
    async fn execute(
        &self,
        user_id: &str,
        arguments: &serde_json::Map<String, serde_json::Value>,
    ) -> ToolResult;
}

/// A registry of declared tool schemas and their runtime handlers.
///
/// The agent loop uses this to:
/// 1. Advertise the declared schemas to the planner each step
/// 2. Dispatch calls by name, receiving a uniform result envelope
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create a registry over a closed set of declared schemas.
    pub fn new(definitions: Vec<ToolDefinition>) -> Self {
        Self {
            definitions,
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a declared tool name.
    ///
    /// Fails if `name` is not among the declared schemas, preventing
    /// silently wiring up undeclared capabilities.
    pub fn register(
        &mut self,
        name: &str,
        handler: Arc<dyn ToolHandler>,
    ) -> std::result::Result<(), ToolError> {
        if !self.definitions.iter().any(|d| d.name == name) {
            return Err(ToolError::Undeclared(name.to_string()));
        }
        self.handlers.insert(name.to_string(), handler);
        Ok(())
    }

    /// All declared schemas, in declaration order.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Whether a handler is registered for `name`.
    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Dispatch a call by name. Never raises.
    ///
    /// "Tool not wired up" is indistinguishable from "tool failed" to the
    /// caller: both come back as a failure envelope.
    pub async fn dispatch(
        &self,
        name: &str,
        user_id: &str,
        arguments: &serde_json::Map<String, serde_json::Value>,
    ) -> ToolResult {
        match self.handlers.get(name) {
            Some(handler) => handler.execute(user_id, arguments).await,
            None => ToolResult::fail(format!("Tool handler not registered: {name}")),
        }
    }
}
