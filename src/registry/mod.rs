//! # Module Registry
//!
//! Explicit name-to-factory mapping for stagers, wrappers and stages,
//! populated at startup.
//!
//! ## Overview
//!
//! Three independent namespaces are kept:
//!
//! ```text
//! ModuleRegistry
//! ├── stagers   (plain stager handlers, e.g. "Base")
//! ├── wrappers  (handlers that wrap another stager, e.g. "Spawn")
//! └── stages    (payload modules named after the separator)
//! ```
//!
//! Stager names are resolved through [`resolver::resolve_stager`], which falls
//! back to compound `<wrapper>_<base>` names when no plain stager matches.
//!
//! ## Usage
//!
//! ```rust
//! use stager_core::handler::{StageHandler, StagerHandler, StagerInvocation};
//! use stager_core::registry::{ModuleMetadata, ModuleRegistry};
//! use stager_core::StagerResult;
//!
//! struct Bind;
//!
//! impl StagerHandler for Bind {
//!     fn needs_deferred_start(&self) -> bool {
//!         false
//!     }
//!
//!     fn execute(&self, _invocation: StagerInvocation<'_>) -> StagerResult<()> {
//!         Ok(())
//!     }
//! }
//!
//! let registry = ModuleRegistry::new();
//! registry.register_stager("Bind", ModuleMetadata::new("Bind a port"), || Box::new(Bind));
//! assert!(registry.resolve_stager("Bind").is_ok());
//! ```

pub mod resolver;

use crate::error::{StagerError, StagerResult};
use crate::handler::{StageHandler, StagerHandler, StagerModule, StagerNode, WrapperHandler};
use crate::logging::log_registry_operation;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub use resolver::{resolve_stager, CompositeName};

pub type StagerFactory = Arc<dyn Fn() -> Box<dyn StagerHandler> + Send + Sync>;
pub type WrapperFactory = Arc<dyn Fn() -> Box<dyn WrapperHandler> + Send + Sync>;
pub type StageFactory = Arc<dyn Fn() -> Arc<dyn StageHandler> + Send + Sync>;

/// Registry namespace a module lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Stager,
    Wrapper,
    Stage,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ModuleKind::Stager => "stager",
            ModuleKind::Wrapper => "wrapper",
            ModuleKind::Stage => "stage",
        };
        f.write_str(label)
    }
}

/// Descriptive and selection metadata attached to a registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    pub summary: String,
    pub description: String,
    /// Usable on the handler (controller) side
    pub handler_usable: bool,
    /// Usable on the target side
    pub target_usable: bool,
}

impl ModuleMetadata {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_usability(mut self, handler_usable: bool, target_usable: bool) -> Self {
        self.handler_usable = handler_usable;
        self.target_usable = target_usable;
        self
    }
}

impl Default for ModuleMetadata {
    fn default() -> Self {
        Self {
            summary: String::new(),
            description: String::new(),
            handler_usable: true,
            target_usable: true,
        }
    }
}

struct Registration<F> {
    factory: F,
    metadata: ModuleMetadata,
}

/// Counts per namespace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub total_stagers: usize,
    pub total_wrappers: usize,
    pub total_stages: usize,
}

/// Thread-safe registry of module factories
#[derive(Default)]
pub struct ModuleRegistry {
    stagers: DashMap<String, Registration<StagerFactory>>,
    wrappers: DashMap<String, Registration<WrapperFactory>>,
    stages: DashMap<String, Registration<StageFactory>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plain stager. Replaces any previous registration of `name`.
    pub fn register_stager<F>(&self, name: &str, metadata: ModuleMetadata, factory: F)
    where
        F: Fn() -> Box<dyn StagerHandler> + Send + Sync + 'static,
    {
        self.stagers.insert(
            name.to_string(),
            Registration {
                factory: Arc::new(factory),
                metadata,
            },
        );
        log_registry_operation("register", ModuleKind::Stager, name, "success", None);
    }

    /// Register a wrapper usable as the `<wrapper>` part of a compound name
    pub fn register_wrapper<F>(&self, name: &str, metadata: ModuleMetadata, factory: F)
    where
        F: Fn() -> Box<dyn WrapperHandler> + Send + Sync + 'static,
    {
        self.wrappers.insert(
            name.to_string(),
            Registration {
                factory: Arc::new(factory),
                metadata,
            },
        );
        log_registry_operation("register", ModuleKind::Wrapper, name, "success", None);
    }

    pub fn register_stage<F>(&self, name: &str, metadata: ModuleMetadata, factory: F)
    where
        F: Fn() -> Arc<dyn StageHandler> + Send + Sync + 'static,
    {
        self.stages.insert(
            name.to_string(),
            Registration {
                factory: Arc::new(factory),
                metadata,
            },
        );
        log_registry_operation("register", ModuleKind::Stage, name, "success", None);
    }

    pub fn contains(&self, kind: ModuleKind, name: &str) -> bool {
        match kind {
            ModuleKind::Stager => self.stagers.contains_key(name),
            ModuleKind::Wrapper => self.wrappers.contains_key(name),
            ModuleKind::Stage => self.stages.contains_key(name),
        }
    }

    pub fn metadata(&self, kind: ModuleKind, name: &str) -> Option<ModuleMetadata> {
        match kind {
            ModuleKind::Stager => self.stagers.get(name).map(|r| r.metadata.clone()),
            ModuleKind::Wrapper => self.wrappers.get(name).map(|r| r.metadata.clone()),
            ModuleKind::Stage => self.stages.get(name).map(|r| r.metadata.clone()),
        }
    }

    /// Registered names with metadata, sorted by name
    pub fn list(&self, kind: ModuleKind) -> Vec<(String, ModuleMetadata)> {
        let mut entries: Vec<(String, ModuleMetadata)> = match kind {
            ModuleKind::Stager => self
                .stagers
                .iter()
                .map(|e| (e.key().clone(), e.value().metadata.clone()))
                .collect(),
            ModuleKind::Wrapper => self
                .wrappers
                .iter()
                .map(|e| (e.key().clone(), e.value().metadata.clone()))
                .collect(),
            ModuleKind::Stage => self
                .stages
                .iter()
                .map(|e| (e.key().clone(), e.value().metadata.clone()))
                .collect(),
        };
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total_stagers: self.stagers.len(),
            total_wrappers: self.wrappers.len(),
            total_stages: self.stages.len(),
        }
    }

    /// Construct a plain stager registered under exactly `name`
    pub fn create_stager(&self, name: &str) -> StagerResult<StagerNode> {
        // Clone the factory out so no shard lock is held while user code runs
        let factory = self
            .stagers
            .get(name)
            .map(|r| Arc::clone(&r.factory))
            .ok_or_else(|| StagerError::module_not_found(ModuleKind::Stager, name))?;
        Ok(StagerNode::plain(name, factory()))
    }

    pub fn create_wrapper(&self, name: &str) -> StagerResult<Box<dyn WrapperHandler>> {
        let factory = self
            .wrappers
            .get(name)
            .map(|r| Arc::clone(&r.factory))
            .ok_or_else(|| StagerError::module_not_found(ModuleKind::Wrapper, name))?;
        Ok(factory())
    }

    pub fn create_stage(&self, name: &str) -> StagerResult<Arc<dyn StageHandler>> {
        let factory = self
            .stages
            .get(name)
            .map(|r| Arc::clone(&r.factory))
            .ok_or_else(|| StagerError::module_not_found(ModuleKind::Stage, name))?;
        debug!(stage = name, "Created stage module");
        Ok(factory())
    }

    /// Resolve a possibly compound stager name
    pub fn resolve_stager(&self, name: &str) -> StagerResult<StagerNode> {
        resolve_stager(self, name)
    }

    /// Resolve a stager and wrap it in an owned module handle.
    ///
    /// The handle carries the metadata of the outermost module.
    pub fn resolve_stager_module(&self, name: &str) -> StagerResult<StagerModule> {
        let node = self.resolve_stager(name)?;
        let kind = if node.is_composite() {
            ModuleKind::Wrapper
        } else {
            ModuleKind::Stager
        };
        let metadata = self.metadata(kind, node.name()).unwrap_or_default();
        Ok(StagerModule::new(node, metadata))
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("stats", &self.stats())
            .finish()
    }
}
