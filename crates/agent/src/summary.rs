//! Deterministic reply composition from tool results.
//!
//! When the planner produces no narrative summary, the loop renders a short
//! templated message from the most recent successful result, chosen by a
//! fixed tool priority: batch record → single record → visualization →
//! analysis → deep search → web search → screenshot → generic
//! acknowledgement.

use ledgerbot_core::tool::ToolResult;
use serde_json::Value;

/// A tool result tracked across the steps of one run.
#[derive(Debug, Clone)]
pub struct TrackedResult {
    pub tool_name: String,
    pub result: ToolResult,
}

/// Collect image/file paths surfaced by tool results, de-duplicated and
/// order-preserving.
pub fn collect_image_paths(results: &[TrackedResult]) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for tracked in results {
        let data = &tracked.result.data;
        match tracked.tool_name.as_str() {
            "visualize_expenses" => {
                if let Some(charts) = data.get("charts").and_then(Value::as_array) {
                    for chart in charts {
                        if let Some(path) = chart.get("path").and_then(Value::as_str) {
                            paths.push(path.to_string());
                        }
                    }
                }
            }
            "capture_website_screenshot" => {
                if let Some(path) = data.get("path").and_then(Value::as_str) {
                    paths.push(path.to_string());
                }
            }
            _ => {}
        }
    }

    let mut unique = Vec::new();
    for path in paths {
        if !unique.contains(&path) {
            unique.push(path);
        }
    }
    unique
}

/// Render the deterministic templated summary over this run's results.
pub fn fallback_summary(results: &[TrackedResult]) -> String {
    if results.is_empty() {
        return "✅ Done.".into();
    }

    let successes: Vec<&TrackedResult> =
        results.iter().filter(|r| r.result.success).collect();
    if successes.is_empty() {
        return "❌ Tool execution failed, please try again later.".into();
    }

    let last_success_of = |name: &str| -> Option<&TrackedResult> {
        successes.iter().rev().find(|r| r.tool_name == name).copied()
    };

    if let Some(batch) = last_success_of("record_expenses_batch") {
        let data = &batch.result.data;
        return format!(
            "✅ Batch recorded\n• Entries: {}\n• Total: {}",
            field(data.get("count"), "0"),
            field(data.get("total"), "0"),
        );
    }

    if let Some(single) = last_success_of("record_expense") {
        let data = &single.result.data;
        return format!(
            "✅ Expense recorded\n• Amount: {}\n• Category: {}",
            field(data.get("amount"), "?"),
            field(data.get("category"), "?"),
        );
    }

    if let Some(viz) = last_success_of("visualize_expenses") {
        let data = &viz.result.data;
        let chart_count = data
            .get("charts")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        return format!(
            "📈 Charts generated\n• Charts: {}\n• Directory: {}",
            chart_count,
            field(data.get("output_dir"), ""),
        );
    }

    if let Some(analysis) = last_success_of("analyze_expenses") {
        let data = &analysis.result.data;
        return format!(
            "📊 Spending analysis complete\n• Entries: {}\n• Total: {}",
            field(data.get("count"), "0"),
            field(data.get("total"), "0"),
        );
    }

    if let Some(deep) = last_success_of("deep_web_search") {
        let sources = deep
            .result
            .data
            .get("sources")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let mut lines = vec![format!("🧠 Deep search complete ({} sources)", sources.len())];
        push_link_lines(&mut lines, &sources);
        return lines.join("\n");
    }

    if let Some(search) = last_success_of("google_search") {
        let data = &search.result.data;
        let items = data
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if items.is_empty() {
            return format!("🔎 No results for: {}", field(data.get("query"), ""));
        }
        let mut lines = vec![format!("🔎 Search results ({})", items.len())];
        push_link_lines(&mut lines, &items);
        return lines.join("\n");
    }

    if let Some(shot) = last_success_of("capture_website_screenshot") {
        let data = &shot.result.data;
        let mut lines = vec![
            "📸 Screenshot captured".to_string(),
            format!("• Title: {}", field(data.get("title"), "")),
            format!("• URL: {}", field(data.get("url"), "")),
            format!("• Storage: {}", field(data.get("storage_mode"), "none")),
        ];
        if let Some(id) = data.get("screenshot_id") {
            lines.push(format!("• Record ID: {}", render(id)));
        }
        return lines.join("\n");
    }

    "✅ All done.".into()
}

fn push_link_lines(lines: &mut Vec<String>, items: &[Value]) {
    for (index, item) in items.iter().take(5).enumerate() {
        lines.push(format!(
            "{}. {}\n{}",
            index + 1,
            field(item.get("title"), ""),
            field(item.get("url"), ""),
        ));
    }
}

fn field(value: Option<&Value>, default: &str) -> String {
    value.map(render).unwrap_or_else(|| default.to_string())
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
