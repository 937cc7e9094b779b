//! `ledgerbot chat` — Interactive or single-message chat mode.

use std::sync::Arc;

use async_trait::async_trait;
use ledgerbot_agent::AgentRuntime;
use ledgerbot_config::Settings;
use ledgerbot_core::context::AgentReply;
use ledgerbot_core::error::TransportError;
use ledgerbot_core::tool::ToolRegistry;
use ledgerbot_core::transport::ChatTransport;
use ledgerbot_gateway::{DeliveryController, MessageHandler};
use ledgerbot_memory::InMemoryStore;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Local-chat user ids carry the transport prefix, like every frontend.
const CLI_USER: &str = "cli_1";

/// Prints out-of-band deliveries to the terminal.
struct CliTransport;

#[async_trait]
impl ChatTransport for CliTransport {
    fn name(&self) -> &str {
        "cli"
    }

    async fn send_now(&self, _user_id: &str, reply: &AgentReply) -> Result<(), TransportError> {
        write_reply(reply).map_err(delivery_error)
    }

    async fn send_later(&self, _user_id: &str, reply: &AgentReply) -> Result<(), TransportError> {
        use std::io::Write;
        let write_all = || -> std::io::Result<()> {
            let mut out = std::io::stdout();
            writeln!(out)?;
            writeln!(out, "  📬 Late reply:")?;
            write_reply(reply)?;
            write!(out, "  You > ")?;
            out.flush()
        };
        write_all().map_err(delivery_error)
    }
}

fn delivery_error(e: std::io::Error) -> TransportError {
    TransportError::DeliveryFailed {
        destination: "stdout".into(),
        reason: e.to_string(),
    }
}

fn write_reply(reply: &AgentReply) -> std::io::Result<()> {
    use std::io::Write;
    let mut out = std::io::stdout();
    for line in reply.text.lines() {
        writeln!(out, "  LedgerBot > {line}")?;
    }
    for path in &reply.image_paths {
        writeln!(out, "  LedgerBot > [image] {path}")?;
    }
    Ok(())
}

fn build_controller(settings: &Settings) -> Result<DeliveryController, Box<dyn std::error::Error>> {
    let planner = ledgerbot_planner::build_planner(&settings.planner);

    let mut registry = ToolRegistry::new(ledgerbot_tools::definitions());
    for (name, handler) in ledgerbot_tools::ExpenseHandler::create_all() {
        registry.register(name, handler)?;
    }

    let memory = Arc::new(InMemoryStore::new());
    let runtime = AgentRuntime::new(planner, Arc::new(registry), memory, &settings.agent);

    Ok(DeliveryController::new(
        Arc::new(runtime) as Arc<dyn MessageHandler>,
        Arc::new(CliTransport),
        &settings.gateway,
    ))
}

pub async fn run(
    config_path: &str,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings =
        Settings::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let controller = build_controller(&settings)?;

    if let Some(msg) = message {
        // Single message mode
        let reply = controller.handle_message(CLI_USER, &msg, None).await;
        write_reply(&reply)?;
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║       LedgerBot — Interactive Mode           ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Planner:   {}", settings.planner.provider);
    println!("  Max steps: {}", settings.agent.max_steps);
    println!("  Budget:    {}s", settings.gateway.response_budget_secs);
    println!("  Tools:     {} declared", ledgerbot_tools::definitions().len());
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    use std::io::Write;
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            print!("  You > ");
            std::io::stdout().flush()?;
            continue;
        }
        if text == "exit" || text == "quit" {
            break;
        }

        let reply = controller.handle_message(CLI_USER, text, None).await;
        println!();
        write_reply(&reply)?;
        println!();

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Goodbye! 👋");
    println!();

    Ok(())
}
