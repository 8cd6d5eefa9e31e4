//! Diagnostic types for the generation pipeline.
//!
//! Every failure below a run-wide cancellation is captured as a
//! [`Diagnostic`] scoped to the marker, document or run that produced it.

use std::fmt;

use graft_ir::{DocumentId, GeneratorRef, Position};
use serde::Serialize;

/// Severity level for a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Severity {
    /// The marker (or document) produced no usable output.
    Error,
    /// Output was produced but should be looked at.
    Warning,
    /// Informational message.
    Info,
}

impl Severity {
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Severity::Warning)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Which stage of the pipeline a diagnostic comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    /// Malformed marker, e.g. a non-literal argument.
    Discovery,
    /// Generator module or type could not be resolved.
    Resolution,
    /// Generator instantiation failed.
    Construction,
    /// The generator's transform failed or was cancelled mid-flight.
    Transformation,
    /// Reported by a generator through its diagnostic sink.
    Generator,
    /// Detected name collision in merged output.
    MergeWarning,
    /// Document-level failure outside any single marker.
    Internal,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::Discovery => "discovery",
            DiagnosticKind::Resolution => "resolution",
            DiagnosticKind::Construction => "construction",
            DiagnosticKind::Transformation => "transformation",
            DiagnosticKind::Generator => "generator",
            DiagnosticKind::MergeWarning => "merge",
            DiagnosticKind::Internal => "internal",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of a diagnostic in a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub document: DocumentId,
    pub position: Option<Position>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{}:{}", self.document, pos),
            None => write!(f, "{}", self.document),
        }
    }
}

/// The marker a diagnostic is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerScope {
    /// Discovery ordinal of the marker within its document.
    pub ordinal: usize,
    pub generator: GeneratorRef,
}

/// A diagnostic message from the pipeline or a generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: Option<Location>,
    pub marker: Option<MarkerScope>,
}

impl Diagnostic {
    pub fn new(severity: Severity, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            location: None,
            marker: None,
        }
    }

    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, kind, message)
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, kind, message)
    }

    pub fn info(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, kind, message)
    }

    /// Attach a document location.
    pub fn at(mut self, document: DocumentId, position: Option<Position>) -> Self {
        self.location = Some(Location { document, position });
        self
    }

    /// Scope this diagnostic to a marker.
    pub fn for_marker(mut self, ordinal: usize, generator: GeneratorRef) -> Self {
        self.marker = Some(MarkerScope { ordinal, generator });
        self
    }

    pub fn marker_ordinal(&self) -> Option<usize> {
        self.marker.as_ref().map(|m| m.ordinal)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.kind, self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " (at {})", loc)?;
        }
        Ok(())
    }
}
