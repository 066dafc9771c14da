#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Stager Core
//!
//! Dispatch core for two-phase staged payload delivery.
//!
//! ## Overview
//!
//! A lightweight **stager** module performs setup (for example opening a
//! transport) and then hands control to a **stage** module that does the
//! remaining work. This crate is the control-flow scaffold around concrete
//! stagers and stages: it resolves module names, composes wrapper modules,
//! and runs the prepare / before / wait-ready / after lifecycle, optionally
//! with the stager's core logic on a background thread.
//!
//! ## Argument Contract
//!
//! ```text
//! <stager> [stager options...] -- <stage> [stage options...]
//! ```
//!
//! Stager names may be compound: `Spawn_Bind` wraps the `Bind` stager in the
//! `Spawn` wrapper, `Spawn$2_Spawn_Bind` nests two of them.
//!
//! ## Module Organization
//!
//! - [`args`] - Single-pass argument vector parsing
//! - [`config`] - Layered configuration loading
//! - [`constants`] - Argument contract tokens
//! - [`diagnostics`] - Diagnostic line sinks
//! - [`error`] - Structured error handling
//! - [`handler`] - Stager/wrapper/stage contracts and the module handle
//! - [`loader`] - Lifecycle orchestration
//! - [`logging`] - Tracing subscriber setup
//! - [`readiness`] - One-shot readiness latch
//! - [`registry`] - Module registry and composite name resolution
//!
//! ## Quick Start
//!
//! ```rust
//! use stager_core::diagnostics::MemorySink;
//! use stager_core::handler::{StageHandler, StagerHandler, StagerInvocation};
//! use stager_core::loader::StagerLoader;
//! use stager_core::registry::{ModuleMetadata, ModuleRegistry};
//! use stager_core::StagerResult;
//! use std::sync::Arc;
//!
//! struct Bind;
//!
//! impl StagerHandler for Bind {
//!     fn needs_deferred_start(&self) -> bool {
//!         true
//!     }
//!
//!     fn execute(&self, invocation: StagerInvocation<'_>) -> StagerResult<()> {
//!         // open the transport, then let the controller continue
//!         invocation.signal_ready();
//!         Ok(())
//!     }
//! }
//!
//! struct Shell;
//!
//! impl StageHandler for Shell {
//!     fn name(&self) -> &str {
//!         "Shell"
//!     }
//! }
//!
//! # fn main() -> StagerResult<()> {
//! let registry = ModuleRegistry::new();
//! registry.register_stager("Bind", ModuleMetadata::new("Bind a port"), || Box::new(Bind));
//! registry.register_stage("Shell", ModuleMetadata::new("Command shell"), || Arc::new(Shell));
//!
//! let args = vec!["Bind".into(), "4444".into(), "--".into(), "Shell".into()];
//! let mut loader = StagerLoader::new(&registry, args)?;
//! let sink = Arc::new(MemorySink::new());
//!
//! loader.run_before(sink.clone(), None)?;
//! assert!(loader.stager().is_ready());
//! loader.run_after(sink, None)?;
//! # Ok(())
//! # }
//! ```

pub mod args;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod handler;
pub mod loader;
pub mod logging;
pub mod readiness;
pub mod registry;

pub use args::ParsedArgs;
pub use config::{ConfigManager, ExecutionConfig, LoggingConfig, StagerConfig};
pub use diagnostics::{DiagnosticSink, MemorySink, StderrSink, TracingSink};
pub use error::{StagerError, StagerResult};
pub use handler::{
    ContextObject, StageHandler, StagerHandler, StagerInvocation, StagerModule, StagerNode,
    WrapperHandler,
};
pub use loader::{dispatch_command_line, CommandLineOutcome, LoaderPhase, StagerLoader};
pub use readiness::ReadinessLatch;
pub use registry::{ModuleKind, ModuleMetadata, ModuleRegistry, RegistryStats};
