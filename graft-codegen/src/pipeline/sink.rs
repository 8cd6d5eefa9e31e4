//! Per-invocation diagnostic sink handed to generators.

use graft_ir::{DocumentId, GeneratorRef, Position};
use parking_lot::Mutex;

use super::{Diagnostic, DiagnosticKind, Severity};

/// Collects diagnostics for one marker invocation.
///
/// Diagnostics reported through the convenience methods are tagged
/// [`DiagnosticKind::Generator`] and scoped to the invoking marker. The sink
/// is owned by the engine, so anything reported before a generator fails
/// or panics is preserved.
#[derive(Debug)]
pub struct DiagnosticSink {
    document: DocumentId,
    position: Position,
    ordinal: usize,
    generator: GeneratorRef,
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    pub fn new(document: DocumentId, position: Position, ordinal: usize, generator: GeneratorRef) -> Self {
        Self {
            document,
            position,
            ordinal,
            generator,
            diagnostics: Mutex::new(Vec::new()),
        }
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(Severity::Error, DiagnosticKind::Generator, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(Severity::Warning, DiagnosticKind::Generator, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(Severity::Info, DiagnosticKind::Generator, message);
    }

    /// Report a fully built diagnostic. Missing location or marker scope is
    /// filled in from the invocation.
    pub fn report(&self, mut diagnostic: Diagnostic) {
        if diagnostic.location.is_none() {
            diagnostic = diagnostic.at(self.document.clone(), Some(self.position));
        }
        if diagnostic.marker.is_none() {
            diagnostic = diagnostic.for_marker(self.ordinal, self.generator.clone());
        }
        self.diagnostics.lock().push(diagnostic);
    }

    pub(crate) fn emit(&self, severity: Severity, kind: DiagnosticKind, message: impl Into<String>) {
        self.report(Diagnostic::new(severity, kind, message));
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.lock().iter().any(|d| d.severity.is_error())
    }

    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain everything reported so far, in reporting order.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock())
    }
}
