//! Memory collaborator — remembered facts and conversation history per user.
//!
//! The memory store is a boundary: the loop reads a user's memory once at
//! request start and writes it incrementally (once per tool result, once for
//! the final reply). Concurrent runs for the same user are prevented
//! upstream by the delivery controller, so implementations need no locking
//! beyond their own internal consistency.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::MemoryError;

/// Remembered per-user facts that survive across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMemory {
    /// Monthly budget, if the user has set one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_budget: Option<f64>,

    /// Expense categories the user records often, in first-seen order
    #[serde(default)]
    pub frequent_categories: Vec<String>,

    /// Free-form remembered facts
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub facts: serde_json::Map<String, serde_json::Value>,
}

impl UserMemory {
    /// Append a category if it is not already remembered. Returns whether
    /// the memory changed.
    pub fn remember_category(&mut self, category: &str) -> bool {
        if self.frequent_categories.iter().any(|c| c == category) {
            return false;
        }
        self.frequent_categories.push(category.to_string());
        true
    }
}

/// One prior conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// "user" or "assistant"
    pub role: String,

    /// The turn's text
    pub content: String,
}

/// The memory store boundary.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Read a user's remembered facts. Unknown users get a default memory.
    async fn get(&self, user_id: &str) -> std::result::Result<UserMemory, MemoryError>;

    /// Persist a user's remembered facts.
    async fn save(
        &self,
        user_id: &str,
        memory: &UserMemory,
    ) -> std::result::Result<(), MemoryError>;

    /// Append one turn to the user's conversation history.
    async fn append_history(
        &self,
        user_id: &str,
        role: &str,
        content: &str,
    ) -> std::result::Result<(), MemoryError>;

    /// The most recent `limit` history turns, oldest first.
    async fn get_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> std::result::Result<Vec<HistoryEntry>, MemoryError>;
}
