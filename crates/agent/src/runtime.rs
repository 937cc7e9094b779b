//! The runtime wrapping the loop with per-user context and history.
//!
//! One `AgentRuntime` serves all users; each `handle_message` assembles a
//! fresh context from the memory store, runs the loop, and records both
//! turns in history. Image messages bypass the loop and go to an optional
//! `ImageAnalyzer` port.

use std::sync::Arc;

use chrono::Utc;
use ledgerbot_config::AgentSettings;
use ledgerbot_core::context::{AgentReply, UserContext, UserProfile};
use ledgerbot_core::error::PlannerError;
use ledgerbot_core::memory::MemoryStore;
use ledgerbot_core::planner::Planner;
use ledgerbot_core::tool::ToolRegistry;
use tracing::{info, warn};

use crate::loop_engine::AgentLoop;

/// What an image analyzer extracted from one image.
#[derive(Debug, Clone)]
pub struct ImageAnalysis {
    /// The analysis text shown to the user
    pub text: String,

    /// Ledger record id, when the analyzer archived an expense from the image
    pub recorded_expense_id: Option<String>,

    /// Storage location, when the image itself was archived
    pub storage_path: Option<String>,
}

/// Optional port for analyzing user-supplied images.
#[async_trait::async_trait]
pub trait ImageAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        user_id: &str,
        bytes: &[u8],
        mime: &str,
        source_id: &str,
        prompt: Option<&str>,
    ) -> Result<ImageAnalysis, PlannerError>;
}

/// The per-process agent runtime.
pub struct AgentRuntime {
    agent: AgentLoop,
    memory: Arc<dyn MemoryStore>,
    image_analyzer: Option<Arc<dyn ImageAnalyzer>>,
    history_limit: usize,
    default_locale: String,
    timezone: String,
}

impl AgentRuntime {
    pub fn new(
        planner: Arc<dyn Planner>,
        registry: Arc<ToolRegistry>,
        memory: Arc<dyn MemoryStore>,
        settings: &AgentSettings,
    ) -> Self {
        let agent = AgentLoop::new(
            planner,
            registry,
            Arc::clone(&memory),
            settings.max_steps as usize,
        );
        Self {
            agent,
            memory,
            image_analyzer: None,
            history_limit: settings.history_limit,
            default_locale: settings.default_locale.clone(),
            timezone: settings.timezone.clone(),
        }
    }

    /// Attach an image analyzer. Without one, image messages get a fixed
    /// "not enabled" reply.
    pub fn with_image_analyzer(mut self, analyzer: Arc<dyn ImageAnalyzer>) -> Self {
        self.image_analyzer = Some(analyzer);
        self
    }

    /// Assemble the context the planner gets to see for this request.
    pub async fn build_context(
        &self,
        user_id: &str,
        locale: Option<&str>,
    ) -> ledgerbot_core::Result<UserContext> {
        let memory = self.memory.get(user_id).await?;
        let history = self.memory.get_history(user_id, self.history_limit).await?;
        Ok(UserContext {
            user: UserProfile {
                id: user_id.to_string(),
                locale: locale.unwrap_or(&self.default_locale).to_string(),
                timezone: self.timezone.clone(),
            },
            history,
            memory,
            now: Utc::now(),
        })
    }

    /// Handle one text message end to end.
    pub async fn handle_message(
        &self,
        user_id: &str,
        text: &str,
        locale: Option<&str>,
    ) -> ledgerbot_core::Result<AgentReply> {
        let context = self.build_context(user_id, locale).await?;
        self.memory.append_history(user_id, "user", text).await?;

        let reply = self.agent.run(user_id, text, &context).await?;

        self.memory
            .append_history(user_id, "assistant", &reply.text)
            .await?;
        info!(user = %user_id, images = reply.image_paths.len(), "reply composed");
        Ok(reply)
    }

    /// Handle one image message through the analyzer port.
    pub async fn handle_image(
        &self,
        user_id: &str,
        bytes: &[u8],
        mime: &str,
        source_id: &str,
        caption: Option<&str>,
    ) -> ledgerbot_core::Result<AgentReply> {
        let Some(analyzer) = &self.image_analyzer else {
            return Ok(AgentReply::text("🖼️ Image analysis is not enabled."));
        };

        match analyzer
            .analyze(user_id, bytes, mime, source_id, caption)
            .await
        {
            Ok(analysis) => {
                let mut lines = vec!["🖼️ Image analysis complete".to_string(), analysis.text];
                if let Some(id) = analysis.recorded_expense_id {
                    lines.push(format!("• Recorded expense: {id}"));
                }
                if let Some(path) = analysis.storage_path {
                    lines.push(format!("• Stored at: {path}"));
                }
                let text = lines.join("\n");
                self.memory
                    .append_history(user_id, "assistant", &text)
                    .await?;
                Ok(AgentReply::text(text))
            }
            Err(error) => {
                warn!(user = %user_id, error = %error, "image analysis failed");
                Ok(AgentReply::text(format!("🖼️ Image analysis failed: {error}")))
            }
        }
    }
}
