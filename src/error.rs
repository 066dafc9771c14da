//! Error types for the stager dispatch core.
//!

use crate::loader::LoaderPhase;
use crate::registry::ModuleKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StagerError {
    /// The argument vector does not describe a stager and a stage
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Neither direct nor composite resolution produced a module
    #[error("{kind} module not found: {name}")]
    ModuleNotFound { kind: ModuleKind, name: String },

    /// Raised inside the background execution; logged at the thread boundary
    #[error("Deferred execution failure: {0}")]
    DeferredExecutionFailure(String),

    #[error("Execution failed in {module}: {reason}")]
    ExecutionFailed { module: String, reason: String },

    /// Loader operation called out of order
    #[error("Cannot {operation} while loader is {phase}")]
    LifecycleViolation {
        operation: &'static str,
        phase: LoaderPhase,
    },

    #[error("Failed to spawn background thread: {0}")]
    ThreadSpawn(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl StagerError {
    pub fn module_not_found(kind: ModuleKind, name: impl Into<String>) -> Self {
        StagerError::ModuleNotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn execution_failed(module: impl Into<String>, reason: impl Into<String>) -> Self {
        StagerError::ExecutionFailed {
            module: module.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error came from a failed name lookup
    pub fn is_module_not_found(&self) -> bool {
        matches!(self, StagerError::ModuleNotFound { .. })
    }
}

impl From<config::ConfigError> for StagerError {
    fn from(error: config::ConfigError) -> Self {
        StagerError::ConfigurationError(error.to_string())
    }
}

pub type StagerResult<T> = std::result::Result<T, StagerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_not_found_display() {
        let err = StagerError::module_not_found(ModuleKind::Wrapper, "Spawn");
        assert_eq!(err.to_string(), "wrapper module not found: Spawn");
        assert!(err.is_module_not_found());
    }

    #[test]
    fn test_lifecycle_violation_display() {
        let err = StagerError::LifecycleViolation {
            operation: "run_after",
            phase: LoaderPhase::Created,
        };
        assert_eq!(err.to_string(), "Cannot run_after while loader is created");
    }
}
