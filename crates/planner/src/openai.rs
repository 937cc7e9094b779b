//! Model-backed planner over OpenAI-compatible chat completions.
//!
//! Works with OpenAI, DeepSeek, and any endpoint exposing a compatible
//! `/chat/completions` route. Tool calls come back with their arguments as a
//! raw JSON string; that string is preserved verbatim in `raw_arguments` so
//! the transcript echoes exactly what the model produced, and parsed into a
//! map for dispatch (unparsable arguments degrade to an empty map).
//!
//! Provider errors never cross the planner boundary: any failure logs a
//! warning and degrades to the rule-based heuristics.

use async_trait::async_trait;
use ledgerbot_config::PlannerSettings;
use ledgerbot_core::error::PlannerError;
use ledgerbot_core::message::{Message, Role};
use ledgerbot_core::planner::{Planner, PlannerStep};
use ledgerbot_core::tool::{ToolCallRequest, ToolDefinition};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::heuristic::RuleBasedPlanner;

const SUMMARY_INSTRUCTION: &str = "Based on the tool results above, write the final reply to the \
user. Be concise; state record counts and amounts explicitly.";

/// A planner backed by an OpenAI-compatible chat-completions endpoint.
pub struct ModelBackedPlanner {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
    fallback: RuleBasedPlanner,
}

impl ModelBackedPlanner {
    /// Create a planner against an explicit endpoint.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
            fallback: RuleBasedPlanner::new(),
        }
    }

    /// Create a planner from settings, resolving the provider's default
    /// endpoint when no base URL is configured.
    pub fn from_settings(provider: &str, settings: &PlannerSettings) -> Self {
        let base_url = settings.base_url.clone().unwrap_or_else(|| {
            match provider {
                "deepseek" => "https://api.deepseek.com/v1".to_string(),
                _ => "https://api.openai.com/v1".to_string(),
            }
        });
        Self::new(
            provider,
            base_url,
            settings.api_key.clone().unwrap_or_default(),
            settings.model.clone(),
        )
    }

    fn to_api_messages(transcript: &[Message]) -> Vec<ApiMessage> {
        transcript
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::System => "system".into(),
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::Tool => "tool".into(),
                },
                content: Some(m.content.clone()),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.raw_arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    async fn complete(
        &self,
        body: serde_json::Value,
    ) -> Result<ApiResponseMessage, PlannerError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PlannerError::Timeout(e.to_string())
                } else {
                    PlannerError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(PlannerError::RateLimited { retry_after_secs: 5 });
        }
        if status == 401 || status == 403 {
            return Err(PlannerError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Planner provider returned error");
            return Err(PlannerError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| PlannerError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        api_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| PlannerError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })
    }

    async fn propose(
        &self,
        transcript: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<PlannerStep, PlannerError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": Self::to_api_messages(transcript),
            "temperature": 0,
        });
        if !tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(tools));
            body["tool_choice"] = serde_json::json!("auto");
        }

        debug!(planner = %self.name, model = %self.model, "Requesting next step");
        let message = self.complete(body).await?;

        let tool_calls: Vec<ToolCallRequest> = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                let raw_arguments = tc.function.arguments;
                // Keep the raw string verbatim even when it does not parse;
                // dispatch then sees empty arguments.
                let arguments = serde_json::from_str(&raw_arguments).unwrap_or_default();
                ToolCallRequest {
                    id: tc.id,
                    name: tc.function.name,
                    arguments,
                    raw_arguments,
                }
            })
            .collect();

        let content = message.content.unwrap_or_default().trim().to_string();
        debug!(
            planner = %self.name,
            content_len = content.len(),
            tool_calls = tool_calls.len(),
            "Planner step received"
        );
        Ok(PlannerStep { content, tool_calls })
    }

    async fn narrate(&self, transcript: &[Message]) -> Result<String, PlannerError> {
        let mut messages = Self::to_api_messages(transcript);
        messages.push(ApiMessage {
            role: "system".into(),
            content: Some(SUMMARY_INSTRUCTION.into()),
            tool_calls: None,
            tool_call_id: None,
        });
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.2,
        });
        let message = self.complete(body).await?;
        Ok(message.content.unwrap_or_default().trim().to_string())
    }
}

#[async_trait]
impl Planner for ModelBackedPlanner {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_step(&self, transcript: &[Message], tools: &[ToolDefinition]) -> PlannerStep {
        match self.propose(transcript, tools).await {
            Ok(step) => step,
            Err(e) => {
                warn!(planner = %self.name, error = %e, "Planner failed, degrading to heuristics");
                self.fallback.next_step(transcript, tools).await
            }
        }
    }

    async fn summarize(&self, transcript: &[Message]) -> String {
        match self.narrate(transcript).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(planner = %self.name, error = %e, "Summarize failed, using templated fallback");
                String::new()
            }
        }
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deepseek_default_endpoint() {
        let settings = PlannerSettings {
            provider: "deepseek".into(),
            api_key: Some("sk-test".into()),
            ..Default::default()
        };
        let planner = ModelBackedPlanner::from_settings("deepseek", &settings);
        assert!(planner.base_url.contains("deepseek.com"));
    }

    #[test]
    fn explicit_base_url_wins() {
        let settings = PlannerSettings {
            provider: "openai".into(),
            api_key: Some("sk-test".into()),
            base_url: Some("http://localhost:8080/v1/".into()),
            ..Default::default()
        };
        let planner = ModelBackedPlanner::from_settings("openai", &settings);
        assert_eq!(planner.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn message_conversion_echoes_raw_arguments() {
        let raw = r#"{"amount":12.5, "category": "food"}"#;
        let msg = Message::assistant_with_calls(
            "",
            vec![ledgerbot_core::message::MessageToolCall {
                id: "call_1".into(),
                name: "record_expense".into(),
                raw_arguments: raw.into(),
            }],
        );
        let api = ModelBackedPlanner::to_api_messages(&[msg]);
        let calls = api[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.arguments, raw);
    }

    #[test]
    fn message_conversion_tool_result_role() {
        let msg = Message::tool_result("call_1", r#"{"success":true}"#);
        let api = ModelBackedPlanner::to_api_messages(&[msg]);
        assert_eq!(api[0].role, "tool");
        assert_eq!(api[0].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn tool_definition_conversion() {
        let tools = vec![ToolDefinition {
            name: "get_weather".into(),
            description: "Get the weather".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let api = ModelBackedPlanner::to_api_tools(&tools);
        assert_eq!(api[0].r#type, "function");
        assert_eq!(api[0].function.name, "get_weather");
    }

    #[test]
    fn parse_response_with_tool_calls() {
        let data = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "record_expense", "arguments": "{\"amount\": 9.5}"}
                    }]
                }
            }]
        }"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        let message = &parsed.choices[0].message;
        assert!(message.content.is_none());
        let calls = message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "record_expense");
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades_to_heuristics() {
        // Port 9 (discard) — the request fails fast and the rule-based
        // planner takes over.
        let planner = ModelBackedPlanner::new("openai", "http://127.0.0.1:9", "sk-x", "gpt-test");
        let transcript = vec![Message::user("lunch 12")];
        let step = planner.next_step(&transcript, &[]).await;
        assert_eq!(step.tool_calls.len(), 1);
        assert_eq!(step.tool_calls[0].name, "record_expense");

        let summary = planner.summarize(&transcript).await;
        assert!(summary.is_empty());
    }
}
