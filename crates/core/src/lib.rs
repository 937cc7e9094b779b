//! # LedgerBot Core
//!
//! Domain types, traits, and error definitions for the LedgerBot chat agent
//! runtime. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod context;
pub mod error;
pub mod memory;
pub mod message;
pub mod planner;
pub mod tool;
pub mod transport;

// Re-export key types at crate root for ergonomics
pub use context::{AgentReply, UserContext, UserProfile};
pub use error::{Error, MemoryError, PlannerError, Result, ToolError, TransportError};
pub use memory::{HistoryEntry, MemoryStore, UserMemory};
pub use message::{Message, MessageToolCall, Role};
pub use planner::{Planner, PlannerStep};
pub use tool::{ToolCallRequest, ToolDefinition, ToolHandler, ToolRegistry, ToolResult};
pub use transport::ChatTransport;
