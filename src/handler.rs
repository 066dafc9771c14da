//! # Handler Contract
//!
//! Behaviour every stager implements, plus the composite form produced by
//! compound module names.
//!
//! ## Lifecycle
//!
//! ```text
//! Created -> Prepared -> { Direct | Deferred } -> Completed
//! ```
//!
//! - `prepare` may rewrite parameter values in place (never the count) and
//!   reports whether anything changed. It may run twice for the same vector
//!   and must be safe to repeat.
//! - `needs_deferred_start` is fixed at construction and decides whether
//!   `execute` runs on a background thread ahead of stage dispatch.
//! - `execute` is the stager's core logic. When the invocation carries a
//!   readiness target the stager MUST eventually call
//!   [`StagerInvocation::signal_ready`], otherwise the controlling thread
//!   waits forever.
//!
//! ## Composition
//!
//! A compound name such as `Spawn_Base` produces
//! [`StagerNode::Composite`]: a [`WrapperHandler`] that owns its base
//! [`StagerNode`] and forwards every operation it does not override.

use crate::args::ParsedArgs;
use crate::diagnostics::DiagnosticSink;
use crate::error::StagerResult;
use crate::readiness::ReadinessLatch;
use crate::registry::ModuleMetadata;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Opaque caller-supplied object passed through to `execute`
pub type ContextObject = Arc<dyn Any + Send + Sync>;

/// Payload-delivery module selected by the stage name
pub trait StageHandler: Send + Sync {
    fn name(&self) -> &str;
}

/// Everything a stager sees when its core logic runs
#[derive(Clone, Copy)]
pub struct StagerInvocation<'a> {
    pub stage: &'a dyn StageHandler,
    /// Current (possibly rewritten) argument vector
    pub parameters: &'a [String],
    /// Argument vector as it was before any `prepare` call
    pub original_parameters: &'a [String],
    pub parsed: &'a ParsedArgs,
    pub diagnostics: &'a dyn DiagnosticSink,
    pub context: Option<&'a (dyn Any + Send + Sync)>,
    /// Present only for deferred execution
    pub ready: Option<&'a ReadinessLatch>,
}

impl<'a> StagerInvocation<'a> {
    /// Report that setup is complete. No-op when nobody is waiting.
    pub fn signal_ready(&self) {
        if let Some(latch) = self.ready {
            latch.signal();
        }
    }

    pub fn expects_ready_signal(&self) -> bool {
        self.ready.is_some()
    }

    pub fn stager_args(&self) -> &'a [String] {
        self.parsed.stager_args(self.parameters)
    }

    pub fn stage_args(&self) -> &'a [String] {
        self.parsed.stage_args(self.parameters)
    }

    /// Downcast the context object
    pub fn context_as<T: Any>(&self) -> Option<&'a T> {
        self.context.and_then(|context| context.downcast_ref::<T>())
    }
}

impl fmt::Debug for StagerInvocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagerInvocation")
            .field("stage", &self.stage.name())
            .field("parameters", &self.parameters)
            .field("has_context", &self.context.is_some())
            .field("expects_ready_signal", &self.ready.is_some())
            .finish()
    }
}

/// Base stager behaviour
pub trait StagerHandler: Send + Sync {
    /// Inspect and rewrite parameters in place. Returns whether anything changed.
    fn prepare(&self, parameters: &mut [String]) -> StagerResult<bool> {
        let _ = parameters;
        Ok(false)
    }

    /// Whether `execute` must run on a background thread before the stage starts
    fn needs_deferred_start(&self) -> bool;

    /// Capability check for the context object; `None` means "no context"
    fn accepts_context(&self, context_type: Option<TypeId>) -> bool {
        context_type.is_none()
    }

    fn execute(&self, invocation: StagerInvocation<'_>) -> StagerResult<()>;

    /// Arguments used when exercising this stager in a self-test
    fn test_arguments(&self) -> Option<String> {
        None
    }
}

/// Stager that wraps another stager
///
/// Every method receives the delegate and forwards to it by default, so a
/// wrapper only overrides what it changes.
pub trait WrapperHandler: Send + Sync {
    fn prepare(&self, delegate: &StagerNode, parameters: &mut [String]) -> StagerResult<bool> {
        delegate.prepare(parameters)
    }

    fn needs_deferred_start(&self, delegate: &StagerNode) -> bool {
        delegate.needs_deferred_start()
    }

    fn accepts_context(&self, delegate: &StagerNode, context_type: Option<TypeId>) -> bool {
        delegate.accepts_context(context_type)
    }

    fn execute(&self, delegate: &StagerNode, invocation: StagerInvocation<'_>) -> StagerResult<()> {
        delegate.execute(invocation)
    }

    fn test_arguments(&self, delegate: &StagerNode) -> Option<String> {
        delegate.test_arguments()
    }
}

/// A resolved stager: either a plain handler or a wrapper owning its delegate
pub enum StagerNode {
    Plain {
        name: String,
        handler: Box<dyn StagerHandler>,
    },
    Composite {
        name: String,
        wrapper: Box<dyn WrapperHandler>,
        delegate: Box<StagerNode>,
    },
}

impl StagerNode {
    pub fn plain(name: impl Into<String>, handler: Box<dyn StagerHandler>) -> Self {
        StagerNode::Plain {
            name: name.into(),
            handler,
        }
    }

    pub fn composite(
        name: impl Into<String>,
        wrapper: Box<dyn WrapperHandler>,
        delegate: StagerNode,
    ) -> Self {
        StagerNode::Composite {
            name: name.into(),
            wrapper,
            delegate: Box::new(delegate),
        }
    }

    /// Registered name of this node (the wrapper name for composites)
    pub fn name(&self) -> &str {
        match self {
            StagerNode::Plain { name, .. } | StagerNode::Composite { name, .. } => name,
        }
    }

    pub fn delegate(&self) -> Option<&StagerNode> {
        match self {
            StagerNode::Plain { .. } => None,
            StagerNode::Composite { delegate, .. } => Some(delegate),
        }
    }

    /// Innermost plain node
    pub fn base(&self) -> &StagerNode {
        let mut node = self;
        while let Some(delegate) = node.delegate() {
            node = delegate;
        }
        node
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, StagerNode::Composite { .. })
    }

    /// Node names from the outermost wrapper down to the base
    pub fn chain(&self) -> Vec<&str> {
        let mut names = vec![self.name()];
        let mut node = self;
        while let Some(delegate) = node.delegate() {
            names.push(delegate.name());
            node = delegate;
        }
        names
    }

    /// Number of wrappers around the base
    pub fn depth(&self) -> usize {
        self.chain().len() - 1
    }
}

impl StagerHandler for StagerNode {
    fn prepare(&self, parameters: &mut [String]) -> StagerResult<bool> {
        match self {
            StagerNode::Plain { handler, .. } => handler.prepare(parameters),
            StagerNode::Composite {
                wrapper, delegate, ..
            } => wrapper.prepare(delegate, parameters),
        }
    }

    fn needs_deferred_start(&self) -> bool {
        match self {
            StagerNode::Plain { handler, .. } => handler.needs_deferred_start(),
            StagerNode::Composite {
                wrapper, delegate, ..
            } => wrapper.needs_deferred_start(delegate),
        }
    }

    fn accepts_context(&self, context_type: Option<TypeId>) -> bool {
        match self {
            StagerNode::Plain { handler, .. } => handler.accepts_context(context_type),
            StagerNode::Composite {
                wrapper, delegate, ..
            } => wrapper.accepts_context(delegate, context_type),
        }
    }

    fn execute(&self, invocation: StagerInvocation<'_>) -> StagerResult<()> {
        match self {
            StagerNode::Plain { handler, .. } => handler.execute(invocation),
            StagerNode::Composite {
                wrapper, delegate, ..
            } => wrapper.execute(delegate, invocation),
        }
    }

    fn test_arguments(&self) -> Option<String> {
        match self {
            StagerNode::Plain { handler, .. } => handler.test_arguments(),
            StagerNode::Composite {
                wrapper, delegate, ..
            } => wrapper.test_arguments(delegate),
        }
    }
}

impl fmt::Debug for StagerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StagerNode::Plain { name, .. } => f.debug_tuple("Plain").field(name).finish(),
            StagerNode::Composite { name, delegate, .. } => f
                .debug_struct("Composite")
                .field("name", name)
                .field("delegate", delegate)
                .finish(),
        }
    }
}

/// Owned stager instance: resolved node plus readiness and diagnostic state
pub struct StagerModule {
    node: StagerNode,
    metadata: ModuleMetadata,
    latch: ReadinessLatch,
    original_parameters: Vec<String>,
}

impl StagerModule {
    pub fn new(node: StagerNode, metadata: ModuleMetadata) -> Self {
        Self {
            node,
            metadata,
            latch: ReadinessLatch::new(),
            original_parameters: Vec::new(),
        }
    }

    /// Record the argument vector as it was before `prepare`
    pub fn with_original_parameters(mut self, parameters: Vec<String>) -> Self {
        self.original_parameters = parameters;
        self
    }

    pub fn node(&self) -> &StagerNode {
        &self.node
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    pub fn original_parameters(&self) -> &[String] {
        &self.original_parameters
    }

    pub fn prepare(&self, parameters: &mut [String]) -> StagerResult<bool> {
        self.node.prepare(parameters)
    }

    pub fn needs_deferred_start(&self) -> bool {
        self.node.needs_deferred_start()
    }

    pub fn accepts_context(&self, context_type: Option<TypeId>) -> bool {
        self.node.accepts_context(context_type)
    }

    /// Run the stager's core logic.
    ///
    /// With `report_ready` the invocation carries this module's latch as its
    /// readiness target.
    pub fn execute(
        &self,
        stage: &dyn StageHandler,
        parameters: &[String],
        parsed: &ParsedArgs,
        diagnostics: &dyn DiagnosticSink,
        context: Option<&(dyn Any + Send + Sync)>,
        report_ready: bool,
    ) -> StagerResult<()> {
        debug!(
            stager = self.name(),
            stage = stage.name(),
            report_ready = report_ready,
            "Executing stager"
        );
        self.node.execute(StagerInvocation {
            stage,
            parameters,
            original_parameters: &self.original_parameters,
            parsed,
            diagnostics,
            context,
            ready: report_ready.then_some(&self.latch),
        })
    }

    pub fn signal_ready(&self) {
        self.latch.signal();
    }

    /// Block until the stager reports readiness. No timeout.
    pub fn await_ready(&self) {
        self.latch.wait();
    }

    pub fn is_ready(&self) -> bool {
        self.latch.is_ready()
    }

    pub fn test_argument_array(&self) -> Option<Vec<String>> {
        self.node.test_arguments().map(|args| vec![args])
    }

    /// Whether this stager can be combined with the given wrappers
    pub fn is_stager_usable_with(&self, wrappers: &[&str]) -> bool {
        let _ = wrappers;
        self.metadata.target_usable
    }
}

impl fmt::Debug for StagerModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagerModule")
            .field("node", &self.node)
            .field("ready", &self.is_ready())
            .finish()
    }
}
