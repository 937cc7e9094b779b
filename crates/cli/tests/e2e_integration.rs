//! End-to-end integration tests for LedgerBot.
//!
//! These exercise the full pipeline — controller admission, context
//! assembly, the planner loop, tool dispatch against the in-process expense
//! ledger, and reply composition — with the rule-based planner so no network
//! is involved.

use std::sync::Arc;

use ledgerbot_agent::AgentRuntime;
use ledgerbot_config::{AgentSettings, GatewaySettings, PlannerSettings};
use ledgerbot_core::memory::MemoryStore;
use ledgerbot_core::tool::ToolRegistry;
use ledgerbot_core::transport::ChatTransport;
use ledgerbot_gateway::{DeliveryController, InProcessTransport, MessageHandler};
use ledgerbot_memory::InMemoryStore;

fn bootstrap() -> (DeliveryController, Arc<InMemoryStore>, Arc<InProcessTransport>) {
    let planner = ledgerbot_planner::build_planner(&PlannerSettings::default());

    let mut registry = ToolRegistry::new(ledgerbot_tools::definitions());
    for (name, handler) in ledgerbot_tools::ExpenseHandler::create_all() {
        registry.register(name, handler).unwrap();
    }

    let store = Arc::new(InMemoryStore::new());
    let runtime = AgentRuntime::new(
        planner,
        Arc::new(registry),
        Arc::clone(&store) as Arc<dyn MemoryStore>,
        &AgentSettings::default(),
    );

    let transport = Arc::new(InProcessTransport::new("e2e"));
    let controller = DeliveryController::new(
        Arc::new(runtime) as Arc<dyn MessageHandler>,
        Arc::clone(&transport) as Arc<dyn ChatTransport>,
        &GatewaySettings::default(),
    );
    (controller, store, transport)
}

#[tokio::test]
async fn greeting_gets_a_direct_reply() {
    let (controller, _, transport) = bootstrap();

    let reply = controller.handle_message("cli_1", "hello", None).await;
    assert!(reply.text.contains("record your expenses"));
    assert!(transport.late_sends().await.is_empty());
}

#[tokio::test]
async fn single_expense_is_recorded_and_summarized() {
    let (controller, store, _) = bootstrap();

    let reply = controller.handle_message("cli_1", "groceries 23.80", None).await;
    assert!(reply.text.contains("Expense recorded"));
    assert!(reply.text.contains("23.8"));

    // The category flows into remembered facts.
    let memory = store.get("cli_1").await.unwrap();
    assert_eq!(memory.frequent_categories, vec!["other"]);
}

#[tokio::test]
async fn multiple_amounts_become_a_recorded_batch() {
    let (controller, _, _) = bootstrap();

    let reply = controller
        .handle_message("cli_1", "coffee 4.5 lunch 12 taxi 8", None)
        .await;
    assert!(reply.text.contains("Batch recorded"));
    assert!(reply.text.contains("Entries: 3"));
    assert!(reply.text.contains("24.5"));
}

#[tokio::test]
async fn recorded_expenses_show_up_in_analysis() {
    let (controller, _, _) = bootstrap();

    controller
        .handle_message("cli_1", "coffee 4.5 lunch 12", None)
        .await;
    let reply = controller
        .handle_message("cli_1", "analyze my spending", None)
        .await;
    assert!(reply.text.contains("Spending analysis complete"));
    assert!(reply.text.contains("16.5"));
}

#[tokio::test]
async fn unregistered_tool_resolves_to_a_failure_reply() {
    let (controller, _, _) = bootstrap();

    // get_weather is declared in the schema table but has no handler here.
    let reply = controller.handle_message("cli_1", "weather Tokyo", None).await;
    assert!(reply.text.starts_with('❌'));
}

#[tokio::test]
async fn history_accumulates_across_turns() {
    let (controller, store, _) = bootstrap();

    controller.handle_message("cli_1", "hello", None).await;
    controller.handle_message("cli_1", "groceries 23.80", None).await;

    let history = store.get_history("cli_1", 10).await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].role, "user");
    assert_eq!(history[0].content, "hello");
    assert_eq!(history[3].role, "assistant");
}

#[tokio::test]
async fn users_are_isolated() {
    let (controller, store, _) = bootstrap();

    controller.handle_message("cli_1", "groceries 23.80", None).await;
    let reply = controller
        .handle_message("cli_2", "analyze my spending", None)
        .await;
    // The second user's ledger is empty.
    assert!(reply.text.contains("Entries: 0"));

    let memory = store.get("cli_2").await.unwrap();
    assert!(memory.frequent_categories.is_empty());
}
