//! Configuration loading, validation, and management for BetterClaw.
//!
//! Loads configuration from `~/.betterclaw/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.betterclaw/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the judgment model (can come from the environment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Judgment model in `provider/model` form
    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    /// Per-day cap on events forwarded to the agent
    #[serde(default = "default_push_budget")]
    pub push_budget_per_day: u32,

    /// How far back the pattern engine reads the event journal, in days
    #[serde(default = "default_pattern_window_days")]
    pub pattern_window_days: u32,

    /// Whether the proactive trigger scanner runs
    #[serde(default = "default_true")]
    pub proactive_enabled: bool,

    /// Override for the state directory (context.json, patterns.json, events.jsonl)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Agent delivery configuration
    #[serde(default)]
    pub agent: AgentConfig,
}

fn default_llm_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_push_budget() -> u32 {
    10
}
fn default_pattern_window_days() -> u32 {
    14
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("llm_model", &self.llm_model)
            .field("push_budget_per_day", &self.push_budget_per_day)
            .field("pattern_window_days", &self.pattern_window_days)
            .field("proactive_enabled", &self.proactive_enabled)
            .field("state_dir", &self.state_dir)
            .field("gateway", &self.gateway)
            .field("agent", &self.agent)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    42710
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { port: default_port(), host: default_host() }
    }
}

/// How pushed messages reach the agent session: the host agent CLI is
/// invoked as `<command> agent --session-id <id> --deliver --channel <channel>
/// --message <text>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_command")]
    pub command: String,

    #[serde(default = "default_session_id")]
    pub session_id: String,

    #[serde(default = "default_channel")]
    pub channel: String,
}

fn default_agent_command() -> String {
    "claw".into()
}
fn default_session_id() -> String {
    "main".into()
}
fn default_channel() -> String {
    "telegram".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: default_agent_command(),
            session_id: default_session_id(),
            channel: default_channel(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.betterclaw/config.toml).
    ///
    /// Also checks environment variables for the model and API key:
    /// - `BETTERCLAW_API_KEY` (highest priority)
    /// - `OPENAI_API_KEY`
    /// - `OPENROUTER_API_KEY`
    /// - `BETTERCLAW_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        // Environment variable overrides (highest priority)
        if config.api_key.is_none() {
            config.api_key = std::env::var("BETTERCLAW_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("BETTERCLAW_MODEL") {
            config.llm_model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".betterclaw")
    }

    /// Resolve the state directory holding context.json, patterns.json and
    /// events.jsonl.
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("state"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.push_budget_per_day == 0 {
            return Err(ConfigError::ValidationError(
                "push_budget_per_day must be positive".into(),
            ));
        }

        if self.pattern_window_days == 0 {
            return Err(ConfigError::ValidationError(
                "pattern_window_days must be positive".into(),
            ));
        }

        if !self.llm_model.contains('/') {
            return Err(ConfigError::ValidationError(format!(
                "llm_model must be in provider/model form, got '{}'",
                self.llm_model
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            llm_model: default_llm_model(),
            push_budget_per_day: default_push_budget(),
            pattern_window_days: default_pattern_window_days(),
            proactive_enabled: true,
            state_dir: None,
            gateway: GatewayConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm_model, "openai/gpt-4o-mini");
        assert_eq!(config.push_budget_per_day, 10);
        assert_eq!(config.pattern_window_days, 14);
        assert!(config.proactive_enabled);
        assert_eq!(config.gateway.port, 42710);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.llm_model, config.llm_model);
        assert_eq!(parsed.agent.channel, "telegram");
    }

    #[test]
    fn zero_budget_rejected() {
        let config = AppConfig {
            push_budget_per_day: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bare_model_name_rejected() {
        let config = AppConfig {
            llm_model: "gpt-4o-mini".into(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().push_budget_per_day, 10);
    }

    #[test]
    fn state_dir_defaults_under_config_dir() {
        let config = AppConfig::default();
        assert!(config.state_dir().ends_with(".betterclaw/state"));

        let overridden = AppConfig {
            state_dir: Some(PathBuf::from("/var/lib/betterclaw")),
            ..AppConfig::default()
        };
        assert_eq!(overridden.state_dir(), PathBuf::from("/var/lib/betterclaw"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
push_budget_per_day = 5

[agent]
command = "openclaw"
"#,
        )
        .unwrap();
        assert_eq!(config.push_budget_per_day, 5);
        assert_eq!(config.agent.command, "openclaw");
        assert_eq!(config.agent.session_id, "main");
        assert_eq!(config.llm_model, "openai/gpt-4o-mini");
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o-mini"));
        assert!(toml_str.contains("42710"));
    }
}
