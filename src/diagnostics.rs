//! # Diagnostic Sinks
//!
//! Append-only text sinks handed to the loader and to stagers. The loader
//! writes one line per parameter rewrite; stagers may report their own
//! progress through the same sink.

use crate::constants::PARAMETERS_CHANGED_PREFIX;
use parking_lot::Mutex;
use std::io::Write;
use tracing::info;

/// Line-oriented diagnostic output shared across threads
pub trait DiagnosticSink: Send + Sync {
    fn write_line(&self, line: &str);
}

/// Format the line announcing a rewritten parameter vector
pub fn parameters_changed_line(parameters: &[String]) -> String {
    let mut line = String::from(PARAMETERS_CHANGED_PREFIX);
    for parameter in parameters {
        line.push(' ');
        line.push_str(parameter);
    }
    line
}

/// Writes to the process' standard error
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn write_line(&self, line: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{line}");
    }
}

/// Captures lines in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl DiagnosticSink for MemorySink {
    fn write_line(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

/// Forwards every line as a tracing event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn write_line(&self, line: &str) {
        info!(target: "stager_core::diagnostics", "{}", line);
    }
}
