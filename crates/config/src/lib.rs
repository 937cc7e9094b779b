//! Configuration loading and validation for LedgerBot.
//!
//! Loads settings from a TOML file with environment variable overrides.
//! Validates at startup; every knob has a serde default so an empty file
//! (or no file) yields a working heuristic-planner setup.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The root settings structure. Maps directly to `ledgerbot.toml`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Planner selection and credentials
    #[serde(default)]
    pub planner: PlannerSettings,

    /// Agent loop knobs
    #[serde(default)]
    pub agent: AgentSettings,

    /// Delivery controller knobs
    #[serde(default)]
    pub gateway: GatewaySettings,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct PlannerSettings {
    /// "heuristic" or an OpenAI-compatible provider name ("openai", "deepseek")
    #[serde(default = "default_provider")]
    pub provider: String,

    /// API key for model-backed planners
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Override the provider base URL (e.g., for DeepSeek or a proxy)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Maximum planner invocations per run
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// History turns serialized into the context
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Locale used when the transport reports none
    #[serde(default = "default_locale")]
    pub default_locale: String,

    /// IANA timezone for context timestamps
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// How long a caller waits synchronously before delivery goes out-of-band
    #[serde(default = "default_response_budget_secs")]
    pub response_budget_secs: u64,
}

fn default_provider() -> String {
    "heuristic".into()
}
fn default_model() -> String {
    "gpt-4.1-mini".into()
}
fn default_max_steps() -> u32 {
    6
}
fn default_history_limit() -> usize {
    10
}
fn default_locale() -> String {
    "en-US".into()
}
fn default_timezone() -> String {
    "Asia/Singapore".into()
}
fn default_response_budget_secs() -> u64 {
    45
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            model: default_model(),
            base_url: None,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            history_limit: default_history_limit(),
            default_locale: default_locale(),
            timezone: default_timezone(),
        }
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            response_budget_secs: default_response_budget_secs(),
        }
    }
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for PlannerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlannerSettings")
            .field("provider", &self.provider)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("planner", &self.planner)
            .field("agent", &self.agent)
            .field("gateway", &self.gateway)
            .finish()
    }
}

impl Settings {
    /// Load settings from a TOML file, then apply environment overrides.
    ///
    /// A missing file is not an error — defaults apply.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut settings = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
                path: path.display().to_string(),
                source: e,
            })?;
            toml::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                source: e,
            })?
        } else {
            debug!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    /// Apply `LEDGERBOT_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(provider) = std::env::var("LEDGERBOT_PLANNER_PROVIDER") {
            self.planner.provider = provider;
        }
        if let Ok(key) = std::env::var("LEDGERBOT_API_KEY") {
            if !key.is_empty() {
                self.planner.api_key = Some(key);
            }
        }
        if let Ok(model) = std::env::var("LEDGERBOT_MODEL") {
            self.planner.model = model;
        }
        if let Ok(url) = std::env::var("LEDGERBOT_BASE_URL") {
            if !url.is_empty() {
                self.planner.base_url = Some(url);
            }
        }
        if let Ok(steps) = std::env::var("LEDGERBOT_MAX_STEPS") {
            if let Ok(parsed) = steps.parse() {
                self.agent.max_steps = parsed;
            }
        }
        if let Ok(budget) = std::env::var("LEDGERBOT_RESPONSE_BUDGET_SECS") {
            if let Ok(parsed) = budget.parse() {
                self.gateway.response_budget_secs = parsed;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_steps == 0 {
            return Err(ConfigError::Invalid("agent.max_steps must be >= 1".into()));
        }
        if self.gateway.response_budget_secs == 0 {
            return Err(ConfigError::Invalid(
                "gateway.response_budget_secs must be >= 1".into(),
            ));
        }
        if self.planner.provider != "heuristic" && self.planner.api_key.is_none() {
            return Err(ConfigError::Invalid(format!(
                "planner.api_key is required for provider '{}'",
                self.planner.provider
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.agent.max_steps, 6);
        assert_eq!(settings.gateway.response_budget_secs, 45);
        assert_eq!(settings.planner.provider, "heuristic");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let settings = Settings::load("/nonexistent/ledgerbot.toml").unwrap();
        assert_eq!(settings.agent.max_steps, 6);
    }

    #[test]
    fn load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[agent]\nmax_steps = 3\n\n[gateway]\nresponse_budget_secs = 5"
        )
        .unwrap();
        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.agent.max_steps, 3);
        assert_eq!(settings.gateway.response_budget_secs, 5);
        // untouched sections keep defaults
        assert_eq!(settings.planner.provider, "heuristic");
    }

    #[test]
    fn model_provider_requires_api_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[planner]\nprovider = \"openai\"").unwrap();
        let err = Settings::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_max_steps_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[agent]\nmax_steps = 0").unwrap();
        assert!(Settings::load(file.path()).is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let settings = Settings {
            planner: PlannerSettings {
                api_key: Some("sk-secret".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let debug = format!("{settings:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
