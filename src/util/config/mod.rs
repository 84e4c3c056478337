//! HaiGui configuration system
//!
//! Supports user-level and project-level configuration with merge semantics.
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. CLI arguments
//! 2. Project-level (haigui.toml)
//! 3. Default values
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How procedure bodies are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecMode {
    /// Walk the token stream directly
    Interpret,
    /// Compile each procedure to a cached chunk on first call
    #[default]
    Compile,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Execution settings
    #[serde(default)]
    pub exec: ExecConfig,
    /// REPL settings
    #[serde(default)]
    pub repl: ReplConfig,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Procedure execution mode
    pub mode: ExecMode,
    /// Property lists scoped to the defining class instead of one
    /// process-global table
    pub scoped_plists: bool,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            mode: ExecMode::Compile,
            scoped_plists: false,
        }
    }
}

/// REPL settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplConfig {
    /// Prompt to display
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Prompt while a bracket, bar quote or `to` block is still open
    #[serde(default = "default_continuation")]
    pub continuation_prompt: String,
    /// Maximum history size
    #[serde(default = "default_history")]
    pub history_size: usize,
}

fn default_prompt() -> String {
    "? ".into()
}

fn default_continuation() -> String {
    "~ ".into()
}

fn default_history() -> usize {
    1000
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            continuation_prompt: default_continuation(),
            history_size: default_history(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level: debug / info / warn / error
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load `haigui.toml` from the current directory, falling back to defaults
pub fn load_or_default() -> EngineConfig {
    let path = Path::new("haigui.toml");
    if path.exists() {
        match load_config(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("ignoring broken haigui.toml: {}", err);
                EngineConfig::default()
            }
        }
    } else {
        EngineConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.exec.mode, ExecMode::Compile);
        assert!(!config.exec.scoped_plists);
        assert_eq!(config.repl.prompt, "? ");
    }

    #[test]
    fn test_parse_partial_config() {
        let config: EngineConfig = toml::from_str(
            r#"
            [exec]
            mode = "interpret"
            scoped_plists = true
            "#,
        )
        .unwrap();
        assert_eq!(config.exec.mode, ExecMode::Interpret);
        assert!(config.exec.scoped_plists);
        assert_eq!(config.repl.history_size, 1000);
    }
}
