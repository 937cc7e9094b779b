//! `ledgerbot tools` — Show the declared tool schema table.

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let definitions = ledgerbot_tools::definitions();

    println!();
    println!("  {} declared tools:", definitions.len());
    println!();
    for definition in &definitions {
        println!("  {:32} {}", definition.name, definition.description);
    }
    println!();

    Ok(())
}
