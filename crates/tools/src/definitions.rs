//! The static tool schema table.
//!
//! This table is the contract the planner receives each step and is
//! authoritative: the registry rejects handler registration for any name not
//! listed here, and the loop never improvises tool names.

use ledgerbot_core::tool::ToolDefinition;
use serde_json::json;

fn tool(name: &str, description: &str, parameters: serde_json::Value) -> ToolDefinition {
    ToolDefinition {
        name: name.into(),
        description: description.into(),
        parameters,
    }
}

/// All declared tool schemas, in advertisement order.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            "record_expense",
            "Record a single expense for the user",
            json!({
                "type": "object",
                "properties": {
                    "amount": { "type": "number" },
                    "category": { "type": "string" },
                    "description": { "type": "string" },
                    "spent_at": { "type": "string", "description": "Spend time, ISO format or relative text" }
                },
                "required": ["amount"]
            }),
        ),
        tool(
            "record_expenses_batch",
            "Record multiple expenses at once, for messages containing several purchases",
            json!({
                "type": "object",
                "properties": {
                    "items": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "amount": { "type": "number" },
                                "category": { "type": "string" },
                                "description": { "type": "string" },
                                "spent_at": { "type": "string", "description": "Spend time, ISO format or relative text" }
                            },
                            "required": ["amount"]
                        },
                        "minItems": 1
                    }
                },
                "required": ["items"]
            }),
        ),
        tool(
            "query_expenses",
            "Query the user's recorded expenses",
            json!({
                "type": "object",
                "properties": { "limit": { "type": "integer" } },
                "required": []
            }),
        ),
        tool(
            "get_expense",
            "Fetch one expense record by id",
            json!({
                "type": "object",
                "properties": { "expense_id": { "type": "integer" } },
                "required": ["expense_id"]
            }),
        ),
        tool(
            "update_expense",
            "Update an expense record",
            json!({
                "type": "object",
                "properties": {
                    "expense_id": { "type": "integer" },
                    "amount": { "type": "number" },
                    "category": { "type": "string" },
                    "description": { "type": "string" },
                    "spent_at": { "type": "string" }
                },
                "required": ["expense_id"]
            }),
        ),
        tool(
            "delete_expense",
            "Delete an expense record",
            json!({
                "type": "object",
                "properties": { "expense_id": { "type": "integer" } },
                "required": ["expense_id"]
            }),
        ),
        tool(
            "summarize_expenses",
            "Summarize the user's expenses",
            json!({
                "type": "object",
                "properties": { "limit": { "type": "integer" } },
                "required": []
            }),
        ),
        tool(
            "analyze_expenses",
            "Analyze the user's spending patterns",
            json!({
                "type": "object",
                "properties": {
                    "limit": { "type": "integer" },
                    "days": { "type": "integer", "description": "Last N days, 0 for no limit" }
                },
                "required": []
            }),
        ),
        tool(
            "visualize_expenses",
            "Generate spending charts: category bars, pie, daily trend, top expenses",
            json!({
                "type": "object",
                "properties": {
                    "limit": { "type": "integer" },
                    "days": { "type": "integer", "description": "Last N days, 0 for no limit" },
                    "chart_types": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "One of: category_bar, category_pie, daily_trend, top_expenses, all"
                    }
                },
                "required": []
            }),
        ),
        tool(
            "set_user_config",
            "Set a user configuration entry",
            json!({
                "type": "object",
                "properties": {
                    "key": { "type": "string" },
                    "value": { "type": "string" }
                },
                "required": ["key", "value"]
            }),
        ),
        tool(
            "get_user_config",
            "Get a user configuration entry",
            json!({
                "type": "object",
                "properties": { "key": { "type": "string" } },
                "required": ["key"]
            }),
        ),
        tool(
            "list_user_configs",
            "List all configuration entries for the user",
            json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        ),
        tool(
            "delete_user_config",
            "Delete a user configuration entry",
            json!({
                "type": "object",
                "properties": { "key": { "type": "string" } },
                "required": ["key"]
            }),
        ),
        tool(
            "analyze_image",
            "Analyze the content of an image supplied by URL",
            json!({
                "type": "object",
                "properties": {
                    "image_url": { "type": "string" },
                    "prompt": { "type": "string" }
                },
                "required": ["image_url"]
            }),
        ),
        tool(
            "create_task",
            "Create a task",
            json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "due_date": { "type": "string" }
                },
                "required": ["title"]
            }),
        ),
        tool(
            "list_tasks",
            "List tasks",
            json!({
                "type": "object",
                "properties": { "limit": { "type": "integer" } },
                "required": []
            }),
        ),
        tool(
            "update_task",
            "Update a task's status",
            json!({
                "type": "object",
                "properties": {
                    "task_id": { "type": "integer" },
                    "status": { "type": "string" }
                },
                "required": ["task_id", "status"]
            }),
        ),
        tool(
            "delete_task",
            "Delete a task",
            json!({
                "type": "object",
                "properties": { "task_id": { "type": "integer" } },
                "required": ["task_id"]
            }),
        ),
        tool(
            "get_weather",
            "Get the weather for a city",
            json!({
                "type": "object",
                "properties": { "city": { "type": "string" } },
                "required": ["city"]
            }),
        ),
        tool(
            "google_search",
            "Search the web and return a result list",
            json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "limit": { "type": "integer" },
                    "language": { "type": "string", "description": "Language code, e.g. en, zh-CN" }
                },
                "required": ["query"]
            }),
        ),
        tool(
            "deep_web_search",
            "Multi-source web research returning cited sources",
            json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "limit": { "type": "integer" }
                },
                "required": ["query"]
            }),
        ),
        tool(
            "capture_website_screenshot",
            "Capture a screenshot of a web page and return the file path",
            json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string" },
                    "full_page": { "type": "boolean" },
                    "width": { "type": "integer" },
                    "height": { "type": "integer" },
                    "storage_mode": { "type": "string", "description": "none/local/database, default none" }
                },
                "required": ["url"]
            }),
        ),
    ]
}
