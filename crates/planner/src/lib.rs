//! Planner port implementations for LedgerBot.
//!
//! Two variants behind the one `Planner` trait, selected at construction:
//! - [`RuleBasedPlanner`] — deterministic keyword/amount heuristics, no
//!   network. Also the degrade target when the model-backed variant fails.
//! - [`ModelBackedPlanner`] — OpenAI-compatible chat completions with tool
//!   payloads. Provider errors never cross the port boundary.

pub mod heuristic;
pub mod openai;

pub use heuristic::RuleBasedPlanner;
pub use openai::ModelBackedPlanner;

use ledgerbot_config::PlannerSettings;
use ledgerbot_core::planner::Planner;
use std::sync::Arc;
use tracing::info;

/// Build the configured planner variant.
pub fn build_planner(settings: &PlannerSettings) -> Arc<dyn Planner> {
    match settings.provider.as_str() {
        "heuristic" => {
            info!("Using rule-based planner");
            Arc::new(RuleBasedPlanner::new())
        }
        provider => {
            info!(provider, model = %settings.model, "Using model-backed planner");
            Arc::new(ModelBackedPlanner::from_settings(provider, settings))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_provider_selects_rule_based() {
        let planner = build_planner(&PlannerSettings::default());
        assert_eq!(planner.name(), "heuristic");
    }

    #[test]
    fn named_provider_selects_model_backed() {
        let settings = PlannerSettings {
            provider: "deepseek".into(),
            api_key: Some("sk-test".into()),
            ..Default::default()
        };
        let planner = build_planner(&settings);
        assert_eq!(planner.name(), "deepseek");
    }
}
