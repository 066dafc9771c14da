//! # Stager Configuration System
//!
//! Ambient settings for the dispatch core: logging output and how the
//! background thread for deferred stagers is spawned.
//!
//! ## Architecture
//!
//! - **Layered**: built-in defaults, then an optional TOML/YAML file, then
//!   `STAGER__`-prefixed environment variables
//! - **Environment Aware**: the environment name picks the default log level
//! - **Explicit Validation**: invalid values are rejected at load time
//!
//! The argument contract itself (separator token, compound name characters)
//! lives in [`crate::constants`] and is not configurable.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stager_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let thread_name = &manager.config().execution.thread_name;
//! # Ok(())
//! # }
//! ```

pub mod loader;

use crate::constants::DEFAULT_THREAD_NAME;
use crate::error::{StagerError, StagerResult};
use serde::{Deserialize, Serialize};
use std::env;

pub use loader::ConfigManager;

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagerConfig {
    /// Deployment environment (development, test, production)
    pub environment: String,

    pub logging: LoggingConfig,

    pub execution: ExecutionConfig,
}

impl Default for StagerConfig {
    fn default() -> Self {
        let environment = detect_environment();
        Self {
            logging: LoggingConfig::for_environment(&environment),
            execution: ExecutionConfig::default(),
            environment,
        }
    }
}

impl StagerConfig {
    pub fn validate(&self) -> StagerResult<()> {
        if self.environment.trim().is_empty() {
            return Err(StagerError::ConfigurationError(
                "environment must not be empty".to_string(),
            ));
        }
        self.logging.validate()?;
        self.execution.validate()
    }
}

/// Tracing subscriber settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `stager_core=debug`
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,

    pub with_thread_ids: bool,
}

impl LoggingConfig {
    pub fn for_environment(environment: &str) -> Self {
        Self {
            level: default_log_level(environment).to_string(),
            ..Self::default()
        }
    }

    fn validate(&self) -> StagerResult<()> {
        if self.level.trim().is_empty() {
            return Err(StagerError::ConfigurationError(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            with_thread_ids: true,
        }
    }
}

/// Settings for the background thread used by deferred stagers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub thread_name: String,

    /// Stack size for the background thread; platform default when unset
    pub stack_size_bytes: Option<usize>,
}

impl ExecutionConfig {
    fn validate(&self) -> StagerResult<()> {
        if self.thread_name.trim().is_empty() {
            return Err(StagerError::ConfigurationError(
                "execution.thread_name must not be empty".to_string(),
            ));
        }
        if self.thread_name.contains('\0') {
            return Err(StagerError::ConfigurationError(
                "execution.thread_name must not contain NUL bytes".to_string(),
            ));
        }
        if self.stack_size_bytes == Some(0) {
            return Err(StagerError::ConfigurationError(
                "execution.stack_size_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            stack_size_bytes: None,
        }
    }
}

/// Current environment from `STAGER_ENV`, then `APP_ENV`, else `development`
pub fn detect_environment() -> String {
    env::var("STAGER_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
        .to_lowercase()
}

fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StagerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.execution.thread_name, DEFAULT_THREAD_NAME);
        assert_eq!(config.execution.stack_size_bytes, None);
    }

    #[test]
    fn test_log_level_follows_environment() {
        assert_eq!(LoggingConfig::for_environment("production").level, "info");
        assert_eq!(LoggingConfig::for_environment("test").level, "debug");
        assert_eq!(LoggingConfig::for_environment("development").level, "debug");
    }

    #[test]
    fn test_zero_stack_size_rejected() {
        let mut config = StagerConfig::default();
        config.execution.stack_size_bytes = Some(0);
        assert!(matches!(
            config.validate(),
            Err(StagerError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_empty_thread_name_rejected() {
        let mut config = StagerConfig::default();
        config.execution.thread_name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_level_rejected() {
        let mut config = StagerConfig::default();
        config.logging.level = String::new();
        assert!(config.validate().is_err());
    }
}
