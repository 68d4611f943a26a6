//! Shared diagnostic collection.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use tugmock_core::diagnostics::{Diagnostic, Severity};

/// Thread-safe, de-duplicating diagnostic collector.
///
/// The same finding is usually reached from several workers (a missing ancestor shared by many
/// types, a shadowed module hit on every qualification); it is logged once and stored once.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    entries: Mutex<BTreeSet<Diagnostic>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        DiagnosticSink::default()
    }

    pub fn record(&self, diagnostic: Diagnostic) {
        let fresh = self.entries.lock().insert(diagnostic.clone());
        if fresh {
            diagnostic.log();
        }
    }

    /// Sorted copy of everything recorded so far.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn warning_count(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}
