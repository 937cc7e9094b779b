//! The bounded tool-calling loop.
//!
//! Each run alternates between asking the planner for a step and dispatching
//! the tool calls that step requests, up to a fixed step budget. Exact
//! repeats of calls that already failed are suppressed without dispatching.
//! Every outcome — terminal text, budget exhaustion, every tool failing —
//! resolves to a reply; the loop itself only errors on memory I/O.

use std::collections::HashSet;
use std::sync::Arc;

use ledgerbot_core::context::{AgentReply, UserContext};
use ledgerbot_core::memory::{MemoryStore, UserMemory};
use ledgerbot_core::message::{Message, MessageToolCall};
use ledgerbot_core::planner::Planner;
use ledgerbot_core::tool::{ToolRegistry, ToolResult};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::prompt;
use crate::summary::{collect_image_paths, fallback_summary, TrackedResult};

/// Reply for a terminal step that carries no text at all.
const PROMPT_BACK: &str = "I'm here. Tell me an expense to record, or ask me about the weather.";

/// Reply when the step budget runs out before anything was dispatched.
const TOO_MANY_STEPS: &str = "Too many steps, please simplify your request and try again.";

/// Envelope returned for a suppressed repeat of a failed call.
const SUPPRESSED: &str = "Repeated failing call suppressed";

/// Identity of a tool call: name plus canonically serialized arguments.
///
/// Argument maps serialize with sorted keys, so two calls with the same
/// fields in different order produce the same signature.
pub(crate) fn call_signature(name: &str, arguments: &serde_json::Map<String, Value>) -> String {
    format!(
        "{name}:{}",
        serde_json::to_string(arguments).unwrap_or_default()
    )
}

/// The bounded loop over planner steps and tool dispatch.
pub struct AgentLoop {
    planner: Arc<dyn Planner>,
    registry: Arc<ToolRegistry>,
    memory: Arc<dyn MemoryStore>,
    max_steps: usize,
}

impl AgentLoop {
    pub fn new(
        planner: Arc<dyn Planner>,
        registry: Arc<ToolRegistry>,
        memory: Arc<dyn MemoryStore>,
        max_steps: usize,
    ) -> Self {
        Self {
            planner,
            registry,
            memory,
            max_steps: max_steps.max(1),
        }
    }

    /// Run one request to completion.
    pub async fn run(
        &self,
        user_id: &str,
        text: &str,
        context: &UserContext,
    ) -> ledgerbot_core::Result<AgentReply> {
        let mut transcript = vec![
            Message::system(prompt::system_prompt()),
            Message::user(prompt::user_prompt(text, context)),
        ];
        let mut results: Vec<TrackedResult> = Vec::new();
        let mut failed_signatures: HashSet<String> = HashSet::new();
        let mut user_memory = context.memory.clone();

        for step_index in 0..self.max_steps {
            let step = self
                .planner
                .next_step(&transcript, self.registry.definitions())
                .await;
            debug!(
                user = %user_id,
                step = step_index,
                planner = self.planner.name(),
                calls = step.tool_calls.len(),
                "planner step"
            );

            if step.is_terminal() {
                // Once tools ran, the terminal step's own content is
                // discarded in favor of a transcript summary.
                let reply_text = if results.is_empty() {
                    if step.content.trim().is_empty() {
                        PROMPT_BACK.to_string()
                    } else {
                        step.content
                    }
                } else {
                    self.narrate(&transcript, &results).await
                };
                return Ok(AgentReply::with_images(
                    reply_text,
                    collect_image_paths(&results),
                ));
            }

            transcript.push(Message::assistant_with_calls(
                step.content.clone(),
                step.tool_calls
                    .iter()
                    .map(|call| MessageToolCall {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        raw_arguments: call.raw_arguments.clone(),
                    })
                    .collect(),
            ));

            for call in &step.tool_calls {
                let signature = call_signature(&call.name, &call.arguments);
                let result = if failed_signatures.contains(&signature) {
                    warn!(user = %user_id, tool = %call.name, "suppressing repeated failing call");
                    ToolResult::fail(SUPPRESSED)
                } else {
                    let result = self
                        .registry
                        .dispatch(&call.name, user_id, &call.arguments)
                        .await;
                    if result.success {
                        info!(user = %user_id, tool = %call.name, "tool call succeeded");
                        if absorb_categories(&mut user_memory, &call.name, &result) {
                            self.memory.save(user_id, &user_memory).await?;
                        }
                    } else {
                        warn!(user = %user_id, tool = %call.name, error = %result.message, "tool call failed");
                        failed_signatures.insert(signature);
                    }
                    result
                };

                transcript.push(Message::tool_result(
                    call.id.clone(),
                    serde_json::to_string(&result)?,
                ));
                results.push(TrackedResult {
                    tool_name: call.name.clone(),
                    result,
                });
            }
        }

        warn!(user = %user_id, max_steps = self.max_steps, "step budget exhausted");
        if results.is_empty() {
            return Ok(AgentReply::text(TOO_MANY_STEPS));
        }
        // No planner narrative here: exhaustion goes straight to the
        // deterministic template over what was collected.
        Ok(AgentReply::with_images(
            fallback_summary(&results),
            collect_image_paths(&results),
        ))
    }

    /// Ask the planner for a narrative summary, falling back to the
    /// deterministic template when it has none.
    async fn narrate(&self, transcript: &[Message], results: &[TrackedResult]) -> String {
        let narrative = self.planner.summarize(transcript).await;
        if narrative.trim().is_empty() {
            fallback_summary(results)
        } else {
            narrative
        }
    }
}

/// Fold categories from a successful recording result into user memory.
/// Returns whether the memory changed.
fn absorb_categories(memory: &mut UserMemory, tool_name: &str, result: &ToolResult) -> bool {
    let mut changed = false;
    match tool_name {
        "record_expense" => {
            if let Some(category) = result.data.get("category").and_then(Value::as_str) {
                changed |= memory.remember_category(category);
            }
        }
        "record_expenses_batch" => {
            if let Some(items) = result.data.get("items").and_then(Value::as_array) {
                for item in items {
                    if let Some(category) = item.get("category").and_then(Value::as_str) {
                        changed |= memory.remember_category(category);
                    }
                }
            }
        }
        _ => {}
    }
    changed
}
