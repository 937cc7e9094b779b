//! Rule-based planner.
//!
//! Deterministic keyword and amount heuristics that map a user message to
//! either a direct reply or a single tool call. Serves two roles: the
//! offline planner variant, and the degrade target for every model-backed
//! provider error.

use async_trait::async_trait;
use ledgerbot_core::message::{Message, Role};
use ledgerbot_core::planner::{Planner, PlannerStep};
use ledgerbot_core::tool::{ToolCallRequest, ToolDefinition};
use regex_lite::Regex;
use serde_json::{Map, Value, json};
use std::sync::LazyLock;
use tracing::debug;

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid amount regex"));
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid url regex"));

/// Fixed reply when the heuristics find nothing actionable.
pub const DEFAULT_PROMPT_BACK: &str =
    "I'm here. Tell me an expense to record, or ask me about the weather.";

const GREETING_WORDS: &[&str] = &["hello", "hi", "hey"];
const VIZ_WORDS: &[&str] = &["visualize", "chart", "graph", "pie", "trend"];
const ANALYZE_WORDS: &[&str] = &["analyze", "analysis", "breakdown", "stats", "statistics"];
const WEATHER_WORDS: &[&str] = &["weather", "forecast"];

/// The rule-based planner variant.
#[derive(Default)]
pub struct RuleBasedPlanner;

impl RuleBasedPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Propose a step for a raw user message.
    pub fn step_for(&self, text: &str) -> PlannerStep {
        let message = text.trim();
        let lowered = message.to_lowercase();

        if contains_word(&lowered, GREETING_WORDS) {
            return PlannerStep::text(
                "Hi! I can record your expenses, check the weather, and manage your tasks.",
            );
        }

        if contains_word(&lowered, VIZ_WORDS) {
            return call(
                "heuristic-viz",
                "visualize_expenses",
                json!({"days": 30, "chart_types": ["all"]}),
            );
        }

        if contains_word(&lowered, ANALYZE_WORDS) {
            return call(
                "heuristic-analyze",
                "analyze_expenses",
                json!({"days": 30, "limit": 200}),
            );
        }

        if (lowered.contains("config") || lowered.contains("settings"))
            && (lowered.contains("list") || lowered.contains("show"))
        {
            return call("heuristic-list-config", "list_user_configs", json!({}));
        }

        if lowered.contains("http")
            && (lowered.contains("image") || lowered.contains("picture") || lowered.contains("photo"))
        {
            if let Some(url) = URL_RE.find(message) {
                return call(
                    "heuristic-image-url",
                    "analyze_image",
                    json!({"image_url": url.as_str()}),
                );
            }
        }

        let amounts: Vec<_> = AMOUNT_RE.find_iter(message).collect();
        if amounts.len() >= 2 {
            let mut items = Vec::new();
            let mut prev_end = 0;
            for (index, matched) in amounts.iter().enumerate() {
                let desc = message[prev_end..matched.start()].trim();
                let description = if desc.is_empty() {
                    format!("expense {}", index + 1)
                } else {
                    desc.to_string()
                };
                let amount: f64 = matched.as_str().parse().unwrap_or(0.0);
                items.push(json!({
                    "amount": amount,
                    "category": "other",
                    "description": description,
                }));
                prev_end = matched.end();
            }
            return call(
                "heuristic-batch",
                "record_expenses_batch",
                json!({"items": items}),
            );
        }

        if contains_word(&lowered, WEATHER_WORDS) {
            let city = strip_words(message, WEATHER_WORDS);
            let city = if city.is_empty() { "Singapore".to_string() } else { city };
            return call("heuristic-weather", "get_weather", json!({"city": city}));
        }

        if let Some(matched) = AMOUNT_RE.find(message) {
            let amount: f64 = matched.as_str().parse().unwrap_or(0.0);
            if amount > 0.0 {
                return call(
                    "heuristic-expense",
                    "record_expense",
                    json!({"amount": amount, "category": "other", "description": message}),
                );
            }
        }

        PlannerStep::text(DEFAULT_PROMPT_BACK)
    }
}

fn contains_word(lowered: &str, words: &[&str]) -> bool {
    words.iter().any(|w| lowered.contains(w))
}

fn strip_words(message: &str, words: &[&str]) -> String {
    let mut out = message.to_string();
    for word in words {
        // case-insensitive removal, keeps everything else verbatim
        let lowered = out.to_lowercase();
        if let Some(pos) = lowered.find(word) {
            out.replace_range(pos..pos + word.len(), "");
        }
    }
    out.trim().trim_matches(|c: char| c == '?' || c == ',').trim().to_string()
}

/// User prompts arrive as a JSON envelope `{"message": ..., "context": ...}`;
/// the rules only look at the message text.
fn extract_message(content: &str) -> String {
    serde_json::from_str::<Value>(content)
        .ok()
        .and_then(|v| v.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| content.to_string())
}

fn call(id: &str, name: &str, arguments: Value) -> PlannerStep {
    let arguments: Map<String, Value> = arguments.as_object().cloned().unwrap_or_default();
    let raw_arguments =
        serde_json::to_string(&arguments).unwrap_or_else(|_| "{}".to_string());
    PlannerStep::calls(vec![ToolCallRequest {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
        raw_arguments,
    }])
}

#[async_trait]
impl Planner for RuleBasedPlanner {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn next_step(&self, transcript: &[Message], _tools: &[ToolDefinition]) -> PlannerStep {
        let last_user = transcript
            .iter()
            .rposition(|m| m.role == Role::User)
            .unwrap_or(0);

        // One tool step per request: once results are in, go terminal and
        // let the loop render its templated summary.
        if transcript[last_user..].iter().any(|m| m.role == Role::Tool) {
            return PlannerStep::default();
        }

        let content = transcript
            .get(last_user)
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");
        let step = self.step_for(&extract_message(content));
        debug!(
            tool_calls = step.tool_calls.len(),
            terminal = step.is_terminal(),
            "Heuristic step"
        );
        step
    }

    async fn summarize(&self, _transcript: &[Message]) -> String {
        // No narrative capability; the loop renders its deterministic
        // templated summary instead.
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> RuleBasedPlanner {
        RuleBasedPlanner::new()
    }

    #[test]
    fn greeting_is_direct_text() {
        let step = planner().step_for("hello there");
        assert!(step.is_terminal());
        assert!(step.content.contains("record your expenses"));
    }

    #[test]
    fn visualization_keywords_call_visualize() {
        let step = planner().step_for("show me a chart of my spending");
        assert_eq!(step.tool_calls[0].name, "visualize_expenses");
        assert_eq!(step.tool_calls[0].arguments["days"], json!(30));
    }

    #[test]
    fn analysis_keywords_call_analyze() {
        let step = planner().step_for("analyze my spending please");
        assert_eq!(step.tool_calls[0].name, "analyze_expenses");
    }

    #[test]
    fn image_url_calls_analyze_image() {
        let step = planner().step_for("look at this image https://example.com/cat.png");
        assert_eq!(step.tool_calls[0].name, "analyze_image");
        assert_eq!(
            step.tool_calls[0].arguments["image_url"],
            json!("https://example.com/cat.png")
        );
    }

    #[test]
    fn multiple_amounts_become_a_batch() {
        let step = planner().step_for("coffee 4.5 lunch 12 taxi 8");
        assert_eq!(step.tool_calls[0].name, "record_expenses_batch");
        let items = step.tool_calls[0].arguments["items"].as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["amount"], json!(4.5));
        assert_eq!(items[0]["description"], json!("coffee"));
        assert_eq!(items[1]["description"], json!("lunch"));
    }

    #[test]
    fn weather_extracts_city() {
        let step = planner().step_for("weather Tokyo");
        assert_eq!(step.tool_calls[0].name, "get_weather");
        assert_eq!(step.tool_calls[0].arguments["city"], json!("Tokyo"));
    }

    #[test]
    fn weather_defaults_city() {
        let step = planner().step_for("weather?");
        assert_eq!(step.tool_calls[0].arguments["city"], json!("Singapore"));
    }

    #[test]
    fn single_amount_records_expense() {
        let step = planner().step_for("groceries 23.80");
        assert_eq!(step.tool_calls[0].name, "record_expense");
        assert_eq!(step.tool_calls[0].arguments["amount"], json!(23.8));
    }

    #[test]
    fn raw_arguments_match_parsed_arguments() {
        let step = planner().step_for("groceries 23.80");
        let reparsed: Map<String, Value> =
            serde_json::from_str(&step.tool_calls[0].raw_arguments).unwrap();
        assert_eq!(reparsed, step.tool_calls[0].arguments);
    }

    #[test]
    fn unmatched_text_prompts_back() {
        let step = planner().step_for("what is the meaning of life");
        assert!(step.is_terminal());
        assert_eq!(step.content, DEFAULT_PROMPT_BACK);
    }

    #[tokio::test]
    async fn next_step_uses_last_user_message() {
        let transcript = vec![
            Message::system("rules"),
            Message::user("hello"),
            Message::assistant("Hi!"),
            Message::user("lunch 12"),
        ];
        let step = planner().next_step(&transcript, &[]).await;
        assert_eq!(step.tool_calls[0].name, "record_expense");
    }

    #[tokio::test]
    async fn next_step_unwraps_the_prompt_envelope() {
        let transcript = vec![
            Message::system("rules"),
            Message::user(r#"{"message":"lunch 12","context":{"now":"2026-08-23T10:00:00Z"}}"#),
        ];
        let step = planner().next_step(&transcript, &[]).await;
        assert_eq!(step.tool_calls[0].name, "record_expense");
        assert_eq!(step.tool_calls[0].arguments["amount"], json!(12.0));
    }

    #[tokio::test]
    async fn next_step_goes_terminal_after_tool_results() {
        let transcript = vec![
            Message::system("rules"),
            Message::user("lunch 12"),
            Message::assistant_with_calls("", vec![]),
            Message::tool_result("heuristic-expense", r#"{"success":true}"#),
        ];
        let step = planner().next_step(&transcript, &[]).await;
        assert!(step.is_terminal());
        assert!(step.content.is_empty());
    }

    #[tokio::test]
    async fn summarize_is_empty() {
        let summary = planner().summarize(&[]).await;
        assert!(summary.is_empty());
    }
}
