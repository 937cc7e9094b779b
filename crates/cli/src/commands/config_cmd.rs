//! `ledgerbot config` — Show the effective configuration.
//!
//! Secrets stay redacted through the `Debug` impls in the config crate.

use ledgerbot_config::Settings;

pub fn run(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let settings =
        Settings::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    println!();
    println!("  Config file: {config_path}");
    println!("  {settings:#?}");
    println!();

    Ok(())
}
