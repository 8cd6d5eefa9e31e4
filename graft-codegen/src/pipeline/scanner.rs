//! Marker discovery.

use std::sync::Arc;

use graft_ir::{Declaration, DocumentId, Literal, MarkerAnnotation, MarkerArg, SourceDocument};

use super::{Diagnostic, DiagnosticKind};

/// A marker scheduled for generation, with the declaration it targets.
#[derive(Debug, Clone)]
pub struct MarkerTarget {
    /// Discovery ordinal within the document. Skipped markers still consume
    /// an ordinal so diagnostics stay in document order.
    pub ordinal: usize,
    pub document: DocumentId,
    pub declaration: Arc<Declaration>,
    /// Names of the enclosing declarations, outermost first.
    pub path: Vec<String>,
    pub marker: MarkerAnnotation,
    pub args: Vec<Literal>,
}

/// Result of scanning one document.
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub targets: Vec<MarkerTarget>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Find every marker in a document, in document order.
///
/// Declarations are visited pre-order: a declaration's own markers come
/// before those of its members.
pub fn scan(document: &SourceDocument) -> ScanOutput {
    let mut scanner = Scanner {
        document: &document.id,
        ordinal: 0,
        path: Vec::new(),
        output: ScanOutput::default(),
    };
    for decl in &document.declarations {
        scanner.visit(decl);
    }
    scanner.output
}

struct Scanner<'a> {
    document: &'a DocumentId,
    ordinal: usize,
    path: Vec<String>,
    output: ScanOutput,
}

impl Scanner<'_> {
    fn visit(&mut self, decl: &Declaration) {
        if !decl.markers.is_empty() {
            let shared = Arc::new(decl.clone());
            for marker in &decl.markers {
                self.marker(&shared, marker);
            }
        }

        self.path.push(decl.name.clone());
        for member in &decl.members {
            self.visit(member);
        }
        self.path.pop();
    }

    fn marker(&mut self, decl: &Arc<Declaration>, marker: &MarkerAnnotation) {
        let ordinal = self.ordinal;
        self.ordinal += 1;

        let mut args = Vec::with_capacity(marker.args.len());
        let mut rejected = false;
        for (i, arg) in marker.args.iter().enumerate() {
            match arg {
                MarkerArg::Literal(lit) => args.push(lit.clone()),
                MarkerArg::Expr { expr } => {
                    rejected = true;
                    self.output.diagnostics.push(
                        Diagnostic::error(
                            DiagnosticKind::Discovery,
                            format!(
                                "argument {} of `{}` on `{}` is not a compile-time literal: `{}`",
                                i + 1,
                                marker.generator,
                                decl.name,
                                expr
                            ),
                        )
                        .at(self.document.clone(), Some(marker.position))
                        .for_marker(ordinal, marker.generator.clone()),
                    );
                }
            }
        }

        if rejected {
            tracing::trace!(document = %self.document, ordinal, "skipping malformed marker");
            return;
        }

        self.output.targets.push(MarkerTarget {
            ordinal,
            document: self.document.clone(),
            declaration: decl.clone(),
            path: self.path.clone(),
            marker: marker.clone(),
            args,
        });
    }
}
