//! # Stager Loader
//!
//! Parses the argument vector, resolves the stage and stager modules, and
//! drives the phased lifecycle.
//!
//! ## Entry Points
//!
//! - [`StagerLoader::run`]: single phase. Prepare (reporting rewritten
//!   parameters to the diagnostic sink), then execute synchronously.
//! - [`StagerLoader::run_before`] + [`StagerLoader::run_after`]: two phases for
//!   controllers that interleave their own work between stager setup and
//!   stage completion.
//!
//! ```text
//!                 run_before                           run_after
//! deferred:   prepare -> spawn execute -> await ready | join thread
//! direct:     prepare                                 | execute
//! ```
//!
//! Across `run_before` + `run_after`, `execute` runs exactly once.
//!
//! ## Deferred Failure Mode
//!
//! An error or panic inside the background `execute` is caught at the thread
//! boundary, logged, and recorded as [`StagerError::DeferredExecutionFailure`]
//! (see [`StagerLoader::deferred_failure`]); it is never returned to the caller.
//! If the stager fails BEFORE signalling readiness, `run_before` never returns:
//! the wait has no timeout.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stager_core::diagnostics::StderrSink;
//! use stager_core::loader::StagerLoader;
//! use stager_core::registry::ModuleRegistry;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ModuleRegistry::new();
//! // ... register stagers, wrappers and stages ...
//! let args = vec!["Spawn_Bind".into(), "4444".into(), "--".into(), "Shell".into()];
//! let mut loader = StagerLoader::new(&registry, args)?;
//!
//! loader.run_before(Arc::new(StderrSink), None)?;
//! // ... controller work while the stager is set up ...
//! loader.run_after(Arc::new(StderrSink), None)?;
//! # Ok(())
//! # }
//! ```

use crate::args::ParsedArgs;
use crate::config::ExecutionConfig;
use crate::constants::USAGE;
use crate::diagnostics::{parameters_changed_line, DiagnosticSink};
use crate::error::{StagerError, StagerResult};
use crate::handler::{ContextObject, StageHandler, StagerModule};
use crate::logging::log_loader_operation;
use crate::registry::ModuleRegistry;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// Lifecycle position of a loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderPhase {
    Created,
    Prepared,
    /// Executing synchronously on the calling thread
    Direct,
    /// Executing on the background thread
    Deferred,
    Completed,
}

impl fmt::Display for LoaderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LoaderPhase::Created => "created",
            LoaderPhase::Prepared => "prepared",
            LoaderPhase::Direct => "direct",
            LoaderPhase::Deferred => "deferred",
            LoaderPhase::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// Owns one stager/stage pair and runs it through its lifecycle once
pub struct StagerLoader {
    args: Vec<String>,
    parsed: ParsedArgs,
    stage: Arc<dyn StageHandler>,
    stager: Arc<StagerModule>,
    execution: ExecutionConfig,
    phase: LoaderPhase,
    before_thread: Option<JoinHandle<StagerResult<()>>>,
    deferred_failure: Option<StagerError>,
}

impl StagerLoader {
    /// Parse `args` and resolve both modules with default execution settings
    pub fn new(registry: &ModuleRegistry, args: Vec<String>) -> StagerResult<Self> {
        Self::with_config(registry, args, ExecutionConfig::default())
    }

    /// Parse `args` and resolve both modules.
    ///
    /// Fails with `InvalidConfiguration` before any module is resolved when the
    /// vector has no usable separator.
    pub fn with_config(
        registry: &ModuleRegistry,
        args: Vec<String>,
        execution: ExecutionConfig,
    ) -> StagerResult<Self> {
        let parsed = ParsedArgs::parse(&args)?;
        let stage = registry.create_stage(parsed.stage_name())?;
        let stager = registry
            .resolve_stager_module(parsed.stager_name())?
            .with_original_parameters(args.clone());

        log_loader_operation(
            "construct",
            parsed.stager_name(),
            parsed.stage_name(),
            LoaderPhase::Created,
            None,
        );

        Ok(Self {
            args,
            parsed,
            stage,
            stager: Arc::new(stager),
            execution,
            phase: LoaderPhase::Created,
            before_thread: None,
            deferred_failure: None,
        })
    }

    /// Single-phase path: prepare, report changes, execute synchronously
    pub fn run(
        &mut self,
        diagnostics: Arc<dyn DiagnosticSink>,
        context: Option<ContextObject>,
    ) -> StagerResult<()> {
        self.expect_phase("run", LoaderPhase::Created)?;

        if self.stager.prepare(&mut self.args)? {
            diagnostics.write_line(&parameters_changed_line(&self.args));
        }
        self.transition(LoaderPhase::Prepared);

        self.execute_direct(diagnostics.as_ref(), context.as_deref())
    }

    /// First half of the two-phase path.
    ///
    /// For a deferred stager this spawns the background execution and blocks
    /// until the stager signals readiness. Otherwise only `prepare` runs.
    pub fn run_before(
        &mut self,
        diagnostics: Arc<dyn DiagnosticSink>,
        context: Option<ContextObject>,
    ) -> StagerResult<()> {
        self.expect_phase("run_before", LoaderPhase::Created)?;

        self.stager.prepare(&mut self.args)?;
        self.transition(LoaderPhase::Prepared);

        if !self.stager.needs_deferred_start() {
            debug!(
                stager = self.stager.name(),
                "Stager does not need deferred start, execution postponed to run_after"
            );
            return Ok(());
        }

        let handle = self.spawn_deferred(diagnostics, context)?;
        self.before_thread = Some(handle);
        self.transition(LoaderPhase::Deferred);

        debug!(stager = self.stager.name(), "Waiting for stager readiness");
        self.stager.await_ready();
        debug!(stager = self.stager.name(), "Stager reported ready");
        Ok(())
    }

    /// Second half of the two-phase path.
    ///
    /// Joins the background execution if one was spawned, otherwise executes
    /// the stager synchronously.
    pub fn run_after(
        &mut self,
        diagnostics: Arc<dyn DiagnosticSink>,
        context: Option<ContextObject>,
    ) -> StagerResult<()> {
        match self.phase {
            LoaderPhase::Deferred => {
                if let Some(handle) = self.before_thread.take() {
                    self.join_deferred(handle);
                }
                self.transition(LoaderPhase::Completed);
                Ok(())
            }
            LoaderPhase::Prepared => self.execute_direct(diagnostics.as_ref(), context.as_deref()),
            phase => Err(StagerError::LifecycleViolation {
                operation: "run_after",
                phase,
            }),
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn parsed(&self) -> &ParsedArgs {
        &self.parsed
    }

    pub fn stage(&self) -> &Arc<dyn StageHandler> {
        &self.stage
    }

    pub fn stager(&self) -> &StagerModule {
        &self.stager
    }

    pub fn phase(&self) -> LoaderPhase {
        self.phase
    }

    /// Whether the stager accepts a context object of the given type
    pub fn accepts_context(&self, context_type: Option<TypeId>) -> bool {
        self.stager.accepts_context(context_type)
    }

    /// Failure recorded from the background execution, if any
    pub fn deferred_failure(&self) -> Option<&StagerError> {
        self.deferred_failure.as_ref()
    }

    fn execute_direct(
        &mut self,
        diagnostics: &dyn DiagnosticSink,
        context: Option<&(dyn Any + Send + Sync)>,
    ) -> StagerResult<()> {
        self.transition(LoaderPhase::Direct);
        let result = self.stager.execute(
            self.stage.as_ref(),
            &self.args,
            &self.parsed,
            diagnostics,
            context,
            false,
        );
        self.transition(LoaderPhase::Completed);
        result
    }

    fn spawn_deferred(
        &self,
        diagnostics: Arc<dyn DiagnosticSink>,
        context: Option<ContextObject>,
    ) -> StagerResult<JoinHandle<StagerResult<()>>> {
        let stager = Arc::clone(&self.stager);
        let stage = Arc::clone(&self.stage);
        // Prepare has finished; the thread only ever reads this snapshot
        let parameters = self.args.clone();
        let parsed = self.parsed.clone();

        let mut builder = thread::Builder::new().name(self.execution.thread_name.clone());
        if let Some(stack_size) = self.execution.stack_size_bytes {
            builder = builder.stack_size(stack_size);
        }

        builder
            .spawn(move || {
                let result = stager.execute(
                    stage.as_ref(),
                    &parameters,
                    &parsed,
                    diagnostics.as_ref(),
                    context.as_deref(),
                    true,
                );
                if let Err(error) = &result {
                    error!(
                        stager = stager.name(),
                        stage = stage.name(),
                        error = %error,
                        ready = stager.is_ready(),
                        "Deferred stager execution failed"
                    );
                }
                result
            })
            .map_err(|e| StagerError::ThreadSpawn(e.to_string()))
    }

    fn join_deferred(&mut self, handle: JoinHandle<StagerResult<()>>) {
        let failure = match handle.join() {
            Ok(Ok(())) => None,
            Ok(Err(error)) => Some(error.to_string()),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    stager = self.stager.name(),
                    panic = %message,
                    "Deferred stager execution panicked"
                );
                Some(format!("panicked: {message}"))
            }
        };
        self.deferred_failure = failure.map(StagerError::DeferredExecutionFailure);
    }

    fn expect_phase(&self, operation: &'static str, expected: LoaderPhase) -> StagerResult<()> {
        if self.phase != expected {
            return Err(StagerError::LifecycleViolation {
                operation,
                phase: self.phase,
            });
        }
        Ok(())
    }

    fn transition(&mut self, next: LoaderPhase) {
        debug!(from = %self.phase, to = %next, "Loader phase transition");
        self.phase = next;
        log_loader_operation(
            "transition",
            self.parsed.stager_name(),
            self.parsed.stage_name(),
            next,
            None,
        );
    }
}

impl fmt::Debug for StagerLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagerLoader")
            .field("args", &self.args)
            .field("stager", &self.stager)
            .field("stage", &self.stage.name())
            .field("phase", &self.phase)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Result of [`dispatch_command_line`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandLineOutcome {
    /// The vector had no stage; the caller should show this usage text
    Usage(&'static str),
    Completed,
}

/// Command-line entry point: build a loader and run the single-phase path.
///
/// An invalid argument vector is reported as [`CommandLineOutcome::Usage`];
/// every other failure propagates.
pub fn dispatch_command_line(
    registry: &ModuleRegistry,
    args: Vec<String>,
    diagnostics: Arc<dyn DiagnosticSink>,
    context: Option<ContextObject>,
) -> StagerResult<CommandLineOutcome> {
    let mut loader = match StagerLoader::new(registry, args) {
        Ok(loader) => loader,
        Err(StagerError::InvalidConfiguration(reason)) => {
            debug!(reason = %reason, "Invalid command line, reporting usage");
            return Ok(CommandLineOutcome::Usage(USAGE));
        }
        Err(error) => return Err(error),
    };
    loader.run(diagnostics, context)?;
    Ok(CommandLineOutcome::Completed)
}
