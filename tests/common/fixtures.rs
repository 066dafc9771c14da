use parking_lot::Mutex;
use stager_core::handler::{
    StageHandler, StagerHandler, StagerInvocation, StagerNode, WrapperHandler,
};
use stager_core::registry::{ModuleMetadata, ModuleRegistry};
use stager_core::{StagerError, StagerResult};
use std::any::TypeId;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

/// Shared observation point for everything the fake modules do
#[derive(Debug, Default)]
pub struct Probe {
    pub constructed: AtomicUsize,
    pub prepares: AtomicUsize,
    pub executions: AtomicUsize,
    /// Incremented only after a stager's setup delay has elapsed
    pub setup_counter: AtomicUsize,
    pub finished: AtomicBool,
    pub execution_threads: Mutex<Vec<ThreadId>>,
    pub execution_thread_names: Mutex<Vec<Option<String>>>,
    pub seen_parameters: Mutex<Vec<Vec<String>>>,
    pub seen_original_parameters: Mutex<Vec<Vec<String>>>,
    pub seen_stage_args: Mutex<Vec<Vec<String>>>,
    pub seen_contexts: Mutex<Vec<Option<u32>>>,
    pub ready_targets: Mutex<Vec<bool>>,
    pub wrapper_calls: Mutex<Vec<String>>,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    pub fn prepares(&self) -> usize {
        self.prepares.load(Ordering::SeqCst)
    }
}

/// How a recording stager misbehaves, if at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    None,
    /// Signal readiness, then return an error
    ErrorAfterReady,
    /// Signal readiness, then panic
    PanicAfterReady,
    /// Return an error without signalling
    ErrorImmediately,
}

/// Configurable fake stager that records every call in a [`Probe`]
pub struct RecordingStager {
    pub deferred: bool,
    /// Rewrites `parameters[index]` to the value during `prepare`
    pub rewrite: Option<(usize, String)>,
    pub setup_delay: Option<Duration>,
    /// Work done after signalling readiness
    pub tail_delay: Option<Duration>,
    pub failure: Failure,
    pub probe: Arc<Probe>,
}

impl RecordingStager {
    pub fn new(deferred: bool, probe: Arc<Probe>) -> Self {
        Self {
            deferred,
            rewrite: None,
            setup_delay: None,
            tail_delay: None,
            failure: Failure::None,
            probe,
        }
    }
}

impl StagerHandler for RecordingStager {
    fn prepare(&self, parameters: &mut [String]) -> StagerResult<bool> {
        self.probe.prepares.fetch_add(1, Ordering::SeqCst);
        match &self.rewrite {
            Some((index, value)) if parameters.get(*index) != Some(value) => {
                parameters[*index] = value.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn needs_deferred_start(&self) -> bool {
        self.deferred
    }

    fn accepts_context(&self, context_type: Option<TypeId>) -> bool {
        context_type.is_none() || context_type == Some(TypeId::of::<u32>())
    }

    fn execute(&self, invocation: StagerInvocation<'_>) -> StagerResult<()> {
        self.probe.executions.fetch_add(1, Ordering::SeqCst);
        let current = thread::current();
        self.probe.execution_threads.lock().push(current.id());
        self.probe
            .execution_thread_names
            .lock()
            .push(current.name().map(str::to_string));
        self.probe
            .seen_parameters
            .lock()
            .push(invocation.parameters.to_vec());
        self.probe
            .seen_original_parameters
            .lock()
            .push(invocation.original_parameters.to_vec());
        self.probe
            .seen_stage_args
            .lock()
            .push(invocation.stage_args().to_vec());
        self.probe
            .seen_contexts
            .lock()
            .push(invocation.context_as::<u32>().copied());
        self.probe
            .ready_targets
            .lock()
            .push(invocation.expects_ready_signal());

        if self.failure == Failure::ErrorImmediately {
            return Err(StagerError::execution_failed("Recording", "failed before ready"));
        }

        if let Some(delay) = self.setup_delay {
            thread::sleep(delay);
        }
        self.probe.setup_counter.fetch_add(1, Ordering::SeqCst);
        invocation.signal_ready();

        if let Some(delay) = self.tail_delay {
            thread::sleep(delay);
        }

        match self.failure {
            Failure::ErrorAfterReady => {
                Err(StagerError::execution_failed("Recording", "failed after ready"))
            }
            Failure::PanicAfterReady => panic!("recording stager panicked after ready"),
            _ => {
                self.probe.finished.store(true, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    fn test_arguments(&self) -> Option<String> {
        Some("4444".to_string())
    }
}

/// Wrapper that records its calls and otherwise forwards to the delegate
pub struct RecordingWrapper {
    pub label: &'static str,
    pub probe: Arc<Probe>,
}

impl WrapperHandler for RecordingWrapper {
    fn prepare(&self, delegate: &StagerNode, parameters: &mut [String]) -> StagerResult<bool> {
        self.probe
            .wrapper_calls
            .lock()
            .push(format!("{}:prepare", self.label));
        delegate.prepare(parameters)
    }

    fn execute(&self, delegate: &StagerNode, invocation: StagerInvocation<'_>) -> StagerResult<()> {
        self.probe
            .wrapper_calls
            .lock()
            .push(format!("{}:execute", self.label));
        delegate.execute(invocation)
    }
}

pub struct NamedStage(pub &'static str);

impl StageHandler for NamedStage {
    fn name(&self) -> &str {
        self.0
    }
}

/// Builds a registry of recording modules sharing one probe
pub struct RegistryBuilder {
    probe: Arc<Probe>,
    registry: ModuleRegistry,
}

impl RegistryBuilder {
    pub fn new(probe: Arc<Probe>) -> Self {
        let registry = ModuleRegistry::new();
        let stage_probe = Arc::clone(&probe);
        registry.register_stage("Stage", ModuleMetadata::new("test stage"), move || {
            stage_probe.constructed.fetch_add(1, Ordering::SeqCst);
            Arc::new(NamedStage("Stage"))
        });
        let stage_probe = Arc::clone(&probe);
        registry.register_stage("Other", ModuleMetadata::new("other stage"), move || {
            stage_probe.constructed.fetch_add(1, Ordering::SeqCst);
            Arc::new(NamedStage("Other"))
        });
        for label in ["Wrap", "Outer"] {
            let wrapper_probe = Arc::clone(&probe);
            registry.register_wrapper(label, ModuleMetadata::new(label), move || {
                wrapper_probe.constructed.fetch_add(1, Ordering::SeqCst);
                Box::new(RecordingWrapper {
                    label,
                    probe: Arc::clone(&wrapper_probe),
                })
            });
        }
        Self { probe, registry }
    }

    /// Register a stager built fresh from `make` on every construction
    pub fn stager<F>(self, name: &str, make: F) -> Self
    where
        F: Fn(Arc<Probe>) -> RecordingStager + Send + Sync + 'static,
    {
        let probe = Arc::clone(&self.probe);
        self.registry
            .register_stager(name, ModuleMetadata::new(name), move || {
                probe.constructed.fetch_add(1, Ordering::SeqCst);
                Box::new(make(Arc::clone(&probe)))
            });
        self
    }

    pub fn build(self) -> ModuleRegistry {
        self.registry
    }
}

/// Registry with a synchronous `Base` and a deferred `Deferred` stager
pub fn standard_registry(probe: &Arc<Probe>) -> ModuleRegistry {
    RegistryBuilder::new(Arc::clone(probe))
        .stager("Base", |probe| RecordingStager::new(false, probe))
        .stager("Deferred", |probe| RecordingStager::new(true, probe))
        .build()
}

pub fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
