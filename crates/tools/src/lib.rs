//! Declared tool schemas and reference handlers for LedgerBot.
//!
//! `definitions()` is the closed, authoritative schema table the planner
//! receives verbatim each step. The expense handler here is the shipped
//! in-process implementation; the heavier capabilities (weather, web search,
//! screenshots, charts) live behind the same `ToolHandler` trait in their
//! own services and are wired in at bootstrap.

pub mod definitions;
pub mod expense;

pub use definitions::definitions;
pub use expense::ExpenseHandler;
