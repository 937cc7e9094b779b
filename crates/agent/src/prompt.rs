//! Prompt construction for the loop's transcript seed.

use ledgerbot_core::context::UserContext;

/// The system instruction for every run.
pub fn system_prompt() -> &'static str {
    "You are LedgerBot, a personal finance chat agent. \
     First classify the user's intent, then decide whether to call tools. \
     Rules: \
     1) Plain chit-chat gets a direct reply with no tool call. \
     2) Expense recording must go through tools; when one message contains \
        several purchases, prefer record_expenses_batch. \
     3) When the user mentions a time (yesterday evening, noon today, \
        2026-02-26 12:30), fill in spent_at. \
     4) Call the task and weather tools as needed. \
     5) Call analyze_expenses when the user asks for a spending analysis. \
     6) Call visualize_expenses for chart requests; chart_types may be set. \
     7) Use set_user_config/get_user_config/list_user_configs/\
        delete_user_config for configuration requests. \
     8) Call analyze_image when the user supplies an image URL to analyze. \
     9) Call google_search for web search intent. \
     10) Call capture_website_screenshot for screenshot intent. \
     11) Fill tool arguments as completely and precisely as possible. \
     12) Keep replies clean: short paragraphs, bullet points, a few emoji."
}

/// The user message: the request text plus the serialized context.
pub fn user_prompt(message: &str, context: &UserContext) -> String {
    serde_json::json!({
        "message": message,
        "context": context,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ledgerbot_core::context::UserProfile;
    use ledgerbot_core::memory::UserMemory;

    #[test]
    fn user_prompt_embeds_message_and_context() {
        let context = UserContext {
            user: UserProfile {
                id: "cli_1".into(),
                locale: "en-US".into(),
                timezone: "Asia/Singapore".into(),
            },
            history: vec![],
            memory: UserMemory::default(),
            now: Utc::now(),
        };
        let prompt = user_prompt("lunch 12", &context);
        assert!(prompt.contains("lunch 12"));
        assert!(prompt.contains("cli_1"));
        assert!(prompt.contains("\"context\""));
    }
}
