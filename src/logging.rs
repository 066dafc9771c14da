//! # Structured Logging Module
//!
//! One-shot tracing subscriber installation plus fixed-shape structured
//! events for registry and loader operations.

use crate::config::LoggingConfig;
use crate::loader::LoaderPhase;
use crate::registry::ModuleKind;
use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Install the global tracing subscriber. Later calls are no-ops.
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

        let json_layer = config.json.then(|| {
            fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(config.with_thread_ids)
                .with_thread_names(true)
        });
        let text_layer = (!config.json).then(|| {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(config.with_thread_ids)
                .with_thread_names(true)
                .with_writer(std::io::stderr)
        });

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .with(text_layer);

        // Embedding applications may already own the global subscriber
        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
            return;
        }

        tracing::info!(
            level = %config.level,
            json = config.json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Log structured data for registry operations
pub fn log_registry_operation(
    operation: &str,
    kind: ModuleKind,
    name: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::debug!(
        operation = %operation,
        kind = %kind,
        name = %name,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📚 REGISTRY_OPERATION"
    );
}

/// Log structured data for loader lifecycle transitions
pub fn log_loader_operation(
    operation: &str,
    stager: &str,
    stage: &str,
    phase: LoaderPhase,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        stager = %stager,
        stage = %stage,
        phase = %phase,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🚀 LOADER_OPERATION"
    );
}
