//! In-process memory store for LedgerBot.
//!
//! Holds per-user remembered facts and a bounded conversation history in a
//! `HashMap` behind a tokio mutex. The persistence boundary is the
//! `MemoryStore` trait in core; a durable backend would implement the same
//! trait.

use async_trait::async_trait;
use ledgerbot_core::error::MemoryError;
use ledgerbot_core::memory::{HistoryEntry, MemoryStore, UserMemory};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// History turns retained per user.
const HISTORY_CAP: usize = 50;

#[derive(Default)]
struct UserRecord {
    memory: UserMemory,
    history: Vec<HistoryEntry>,
}

/// An in-process `MemoryStore`.
#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<HashMap<String, UserRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn get(&self, user_id: &str) -> Result<UserMemory, MemoryError> {
        let users = self.users.lock().await;
        Ok(users
            .get(user_id)
            .map(|r| r.memory.clone())
            .unwrap_or_default())
    }

    async fn save(&self, user_id: &str, memory: &UserMemory) -> Result<(), MemoryError> {
        let mut users = self.users.lock().await;
        users.entry(user_id.to_string()).or_default().memory = memory.clone();
        debug!(user = %user_id, categories = memory.frequent_categories.len(), "Memory saved");
        Ok(())
    }

    async fn append_history(
        &self,
        user_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), MemoryError> {
        let mut users = self.users.lock().await;
        let record = users.entry(user_id.to_string()).or_default();
        record.history.push(HistoryEntry {
            role: role.to_string(),
            content: content.to_string(),
        });
        if record.history.len() > HISTORY_CAP {
            let excess = record.history.len() - HISTORY_CAP;
            record.history.drain(..excess);
        }
        Ok(())
    }

    async fn get_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, MemoryError> {
        let users = self.users.lock().await;
        Ok(users
            .get(user_id)
            .map(|r| {
                let start = r.history.len().saturating_sub(limit);
                r.history[start..].to_vec()
            })
            .unwrap_or_default())
    }
}
