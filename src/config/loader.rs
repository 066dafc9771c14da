//! Configuration Loader
//!
//! Layered loading through the `config` crate: defaults, optional file,
//! environment overrides. Later layers win.

use super::{detect_environment, StagerConfig};
use crate::constants::ENV_PREFIX;
use crate::error::StagerResult;
use config::{Config, Environment, File};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Default file stem searched when no explicit file is given
const DEFAULT_CONFIG_STEM: &str = "config/stager";

/// Loaded, validated configuration
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: StagerConfig,
    source_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load from `config/stager.{toml,yaml,...}` (if present) and the process environment
    pub fn load() -> StagerResult<Arc<ConfigManager>> {
        let builder = Self::base_builder()?
            .add_source(File::with_name(DEFAULT_CONFIG_STEM).required(false))
            .add_source(Self::environment_source(None));
        Self::finish(builder, None)
    }

    /// Load from an explicit file plus the process environment
    pub fn load_from_file(path: impl AsRef<Path>) -> StagerResult<Arc<ConfigManager>> {
        let path = path.as_ref();
        let builder = Self::base_builder()?
            .add_source(File::from(path))
            .add_source(Self::environment_source(None));
        Self::finish(builder, Some(path.to_path_buf()))
    }

    /// Load with an explicit set of environment variables instead of the
    /// process environment. Useful for tests that must not touch global state.
    pub fn load_with_environment(
        path: Option<&Path>,
        variables: HashMap<String, String>,
    ) -> StagerResult<Arc<ConfigManager>> {
        let mut builder = Self::base_builder()?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(Self::environment_source(Some(variables)));
        Self::finish(builder, path.map(Path::to_path_buf))
    }

    pub fn config(&self) -> &StagerConfig {
        &self.config
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    /// JSON rendering of the effective configuration
    pub fn debug_config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }

    fn base_builder() -> StagerResult<config::ConfigBuilder<config::builder::DefaultState>> {
        let defaults = StagerConfig::default();
        debug!(
            environment = %detect_environment(),
            "Building stager configuration"
        );
        Ok(Config::builder().add_source(Config::try_from(&defaults)?))
    }

    fn environment_source(variables: Option<HashMap<String, String>>) -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .source(variables)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        source_file: Option<PathBuf>,
    ) -> StagerResult<Arc<ConfigManager>> {
        let config: StagerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            environment = %config.environment,
            log_level = %config.logging.level,
            thread_name = %config.execution.thread_name,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            source_file,
        }))
    }
}
