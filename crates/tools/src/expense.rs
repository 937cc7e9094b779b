//! Reference expense handler.
//!
//! An in-process ledger behind a tokio mutex, implementing the expense
//! tools against the `ToolHandler` contract. Used by the CLI demo and by
//! integration tests; a database-backed service would replace it behind the
//! same trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledgerbot_core::tool::{ToolHandler, ToolResult};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

const DEFAULT_CATEGORY: &str = "other";

#[derive(Debug, Clone)]
struct ExpenseRecord {
    id: u64,
    amount: f64,
    category: String,
    description: String,
    spent_at: DateTime<Utc>,
}

impl ExpenseRecord {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "amount": self.amount,
            "category": self.category,
            "description": self.description,
            "spent_at": self.spent_at.to_rfc3339(),
        })
    }
}

#[derive(Default)]
struct Ledger {
    next_id: u64,
    records: HashMap<String, Vec<ExpenseRecord>>,
}

impl Ledger {
    fn insert(
        &mut self,
        user_id: &str,
        amount: f64,
        category: String,
        description: String,
    ) -> ExpenseRecord {
        self.next_id += 1;
        let record = ExpenseRecord {
            id: self.next_id,
            amount,
            category,
            description,
            spent_at: Utc::now(),
        };
        self.records
            .entry(user_id.to_string())
            .or_default()
            .push(record.clone());
        record
    }
}

/// Which expense operation a handler instance serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseOp {
    Record,
    RecordBatch,
    Query,
    Analyze,
}

/// In-process expense tool handler.
///
/// One `ExpenseHandler` is registered per expense tool name; instances share
/// the ledger through an `Arc`.
pub struct ExpenseHandler {
    op: ExpenseOp,
    ledger: Arc<Mutex<Ledger>>,
}

impl ExpenseHandler {
    /// Build the full set of expense handlers over one shared ledger.
    ///
    /// Returns (tool name, handler) pairs ready for registration.
    pub fn create_all() -> Vec<(&'static str, Arc<dyn ToolHandler>)> {
        let ledger = Arc::new(Mutex::new(Ledger::default()));
        let handler = |op| -> Arc<dyn ToolHandler> {
            Arc::new(ExpenseHandler {
                op,
                ledger: Arc::clone(&ledger),
            })
        };
        vec![
            ("record_expense", handler(ExpenseOp::Record)),
            ("record_expenses_batch", handler(ExpenseOp::RecordBatch)),
            ("query_expenses", handler(ExpenseOp::Query)),
            ("analyze_expenses", handler(ExpenseOp::Analyze)),
        ]
    }

    fn parse_limit(arguments: &Map<String, Value>, default: u64) -> usize {
        arguments
            .get("limit")
            .and_then(Value::as_u64)
            .unwrap_or(default)
            .clamp(1, 1000) as usize
    }

    async fn record(&self, user_id: &str, arguments: &Map<String, Value>) -> ToolResult {
        let amount = arguments.get("amount").and_then(Value::as_f64).unwrap_or(0.0);
        if amount <= 0.0 {
            return ToolResult::fail("Amount must be greater than 0");
        }
        let category = arguments
            .get("category")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string();
        let description = arguments
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        let record = {
            let mut ledger = self.ledger.lock().await;
            ledger.insert(user_id, amount, category, description)
        };
        debug!(user = %user_id, id = record.id, amount, "Expense recorded");

        let mut data = Map::new();
        data.insert("id".into(), json!(record.id));
        data.insert("amount".into(), json!(record.amount));
        data.insert("category".into(), json!(record.category));
        data.insert("description".into(), json!(record.description));
        data.insert("spent_at".into(), json!(record.spent_at.to_rfc3339()));
        ToolResult::ok("Expense recorded").with_data(data)
    }

    async fn record_batch(&self, user_id: &str, arguments: &Map<String, Value>) -> ToolResult {
        let Some(items) = arguments.get("items").and_then(Value::as_array) else {
            return ToolResult::fail("items must be a non-empty array");
        };
        if items.is_empty() {
            return ToolResult::fail("items must be a non-empty array");
        }

        let mut recorded = Vec::new();
        let mut total = 0.0;
        {
            let mut ledger = self.ledger.lock().await;
            for (index, item) in items.iter().enumerate() {
                let amount = item.get("amount").and_then(Value::as_f64).unwrap_or(0.0);
                if amount <= 0.0 {
                    return ToolResult::fail(format!("Invalid amount in item {}", index + 1));
                }
                let category = item
                    .get("category")
                    .and_then(Value::as_str)
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or(DEFAULT_CATEGORY)
                    .to_string();
                let description = item
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| format!("expense {}", index + 1));
                let record = ledger.insert(user_id, amount, category, description);
                total += amount;
                recorded.push(record.to_json());
            }
        }

        let mut data = Map::new();
        data.insert("count".into(), json!(recorded.len()));
        data.insert("total".into(), json!((total * 100.0).round() / 100.0));
        data.insert("items".into(), Value::Array(recorded));
        ToolResult::ok("Batch recorded").with_data(data)
    }

    async fn query(&self, user_id: &str, arguments: &Map<String, Value>) -> ToolResult {
        let limit = Self::parse_limit(arguments, 10);
        let ledger = self.ledger.lock().await;
        let rows: Vec<Value> = ledger
            .records
            .get(user_id)
            .map(|records| {
                let start = records.len().saturating_sub(limit);
                records[start..].iter().map(ExpenseRecord::to_json).collect()
            })
            .unwrap_or_default();

        let count = rows.len();
        let mut data = Map::new();
        data.insert("items".into(), Value::Array(rows));
        ToolResult::ok(format!("Returned {count} records")).with_data(data)
    }

    async fn analyze(&self, user_id: &str, arguments: &Map<String, Value>) -> ToolResult {
        let limit = Self::parse_limit(arguments, 200);
        let ledger = self.ledger.lock().await;
        let records = ledger.records.get(user_id).cloned().unwrap_or_default();
        let slice = &records[records.len().saturating_sub(limit)..];

        let total: f64 = slice.iter().map(|r| r.amount).sum();
        let mut by_category: HashMap<&str, f64> = HashMap::new();
        for record in slice {
            *by_category.entry(record.category.as_str()).or_default() += record.amount;
        }
        let mut categories: Vec<Value> = by_category
            .into_iter()
            .map(|(category, amount)| json!({ "category": category, "amount": amount }))
            .collect();
        categories.sort_by(|a, b| {
            b["amount"]
                .as_f64()
                .unwrap_or(0.0)
                .total_cmp(&a["amount"].as_f64().unwrap_or(0.0))
        });

        let mut data = Map::new();
        data.insert("count".into(), json!(slice.len()));
        data.insert("total".into(), json!((total * 100.0).round() / 100.0));
        data.insert("by_category".into(), Value::Array(categories));
        ToolResult::ok("Analysis complete").with_data(data)
    }
}

#[async_trait]
impl ToolHandler for ExpenseHandler {
    async fn execute(&self, user_id: &str, arguments: &Map<String, Value>) -> ToolResult {
        match self.op {
            ExpenseOp::Record => self.record(user_id, arguments).await,
            ExpenseOp::RecordBatch => self.record_batch(user_id, arguments).await,
            ExpenseOp::Query => self.query(user_id, arguments).await,
            ExpenseOp::Analyze => self.analyze(user_id, arguments).await,
        }
    }
}
