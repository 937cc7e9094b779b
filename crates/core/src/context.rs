//! Request context and reply value objects.
//!
//! A `UserContext` is assembled once at request start from the memory store
//! and serialized into the user prompt; an `AgentReply` is produced exactly
//! once per request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::memory::{HistoryEntry, UserMemory};

/// The requesting user's profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Opaque user id (transport-prefixed, e.g. "cli_1", "tg_42")
    pub id: String,

    /// BCP-47 locale tag
    pub locale: String,

    /// IANA timezone name
    pub timezone: String,
}

/// Everything the planner gets to see about the user besides the message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub user: UserProfile,

    /// Recent conversation turns, oldest first
    pub history: Vec<HistoryEntry>,

    /// Remembered facts
    pub memory: UserMemory,

    /// Request time
    pub now: DateTime<Utc>,
}

/// The final reply for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    /// Reply text
    pub text: String,

    /// De-duplicated, order-preserving list of image/file paths surfaced by
    /// tool results this run
    #[serde(default)]
    pub image_paths: Vec<String>,
}

impl AgentReply {
    /// A text-only reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_paths: Vec::new(),
        }
    }

    /// A reply carrying image/file paths.
    pub fn with_images(text: impl Into<String>, image_paths: Vec<String>) -> Self {
        Self {
            text: text.into(),
            image_paths,
        }
    }
}
