//! Per-invocation transformation context.

use std::sync::Arc;

use graft_ir::{Declaration, DocumentId, GeneratorRef, Literal, MarkerAnnotation};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::{Compilation, CompilationView, Dependency, MarkerTarget};

/// Everything a generator sees about its target.
///
/// Built once per invocation and never mutated afterwards, apart from the
/// log of compilation reads.
#[derive(Debug, Clone)]
pub struct TransformationContext {
    document: DocumentId,
    target: Arc<Declaration>,
    path: Vec<String>,
    marker: MarkerAnnotation,
    args: Vec<Literal>,
    ordinal: usize,
    compilation: Arc<Compilation>,
    reads: Arc<Mutex<Vec<Dependency>>>,
    cancel: CancellationToken,
}

impl TransformationContext {
    /// The declaration the marker is attached to.
    pub fn target(&self) -> &Declaration {
        &self.target
    }

    pub fn document(&self) -> &DocumentId {
        &self.document
    }

    /// Enclosing declaration names, outermost first.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn marker(&self) -> &MarkerAnnotation {
        &self.marker
    }

    pub fn generator(&self) -> &GeneratorRef {
        &self.marker.generator
    }

    /// The marker's literal constructor arguments.
    pub fn args(&self) -> &[Literal] {
        &self.args
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Every document of the run. Reads are recorded, so cached output is
    /// only reused while they give the same answers.
    pub fn compilation(&self) -> CompilationView<'_> {
        CompilationView::new(&self.compilation, &self.reads)
    }

    /// Compilation reads made so far, in first-read order.
    pub fn dependencies(&self) -> Vec<Dependency> {
        self.reads.lock().clone()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Builds contexts against one compilation.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    compilation: Arc<Compilation>,
}

impl ContextBuilder {
    pub fn new(compilation: Arc<Compilation>) -> Self {
        Self { compilation }
    }

    pub fn build(&self, target: &MarkerTarget, cancel: CancellationToken) -> TransformationContext {
        TransformationContext {
            document: target.document.clone(),
            target: target.declaration.clone(),
            path: target.path.clone(),
            marker: target.marker.clone(),
            args: target.args.clone(),
            ordinal: target.ordinal,
            compilation: self.compilation.clone(),
            reads: Arc::default(),
            cancel,
        }
    }
}
