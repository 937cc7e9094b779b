//! The LedgerBot agent: a bounded tool-calling loop and the runtime that
//! wraps it with per-user context.
//!
//! The loop runs the `PLANNING → (DIRECT_ANSWER | DISPATCHING) → PLANNING |
//! TERMINAL` state machine for one request: it asks the planner for the next
//! step, dispatches any requested tool calls through the registry,
//! suppresses exact repeats of failed calls, and composes the final reply
//! from the collected results.

pub mod loop_engine;
pub mod prompt;
pub mod runtime;
pub mod summary;

pub use loop_engine::AgentLoop;
pub use runtime::{AgentRuntime, ImageAnalysis, ImageAnalyzer};
