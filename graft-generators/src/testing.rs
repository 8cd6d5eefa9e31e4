//! Helpers for driving a single generator outside the pipeline.

use std::sync::Arc;

use graft_codegen::pipeline::{
    Compilation, ContextBuilder, Diagnostic, DiagnosticSink, Generator, scan,
};
use graft_ir::{
    DeclKind, Declaration, Fingerprint, GeneratorRef, MarkerAnnotation, Position, SourceDocument,
};
use tokio_util::sync::CancellationToken;

/// Outcome of one transform call.
pub struct Outcome {
    pub result: eyre::Result<Vec<Declaration>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Outcome {
    pub fn declarations(self) -> Vec<Declaration> {
        match self.result {
            Ok(decls) => decls,
            Err(e) => panic!("transform failed: {:#}", e),
        }
    }
}

/// Run `generator` against the first marker of `target`, with `others` in
/// the same compilation.
pub async fn transform(
    generator: &dyn Generator,
    target: Declaration,
    others: Vec<Declaration>,
) -> Outcome {
    let mut declarations = vec![target];
    declarations.extend(others);
    let doc = Arc::new(SourceDocument::new("src/lib.rs", Fingerprint::new(1), declarations));
    let compilation = Arc::new(Compilation::new([doc.clone()]));

    let targets = scan(&doc).targets;
    let target = &targets[0];
    let cancel = CancellationToken::new();
    let ctx = ContextBuilder::new(compilation).build(target, cancel.clone());
    let sink = DiagnosticSink::new(
        target.document.clone(),
        target.marker.position,
        target.ordinal,
        target.marker.generator.clone(),
    );

    let result = generator.transform(&ctx, &sink, &cancel).await;
    Outcome {
        result,
        diagnostics: sink.take(),
    }
}

/// A struct carrying one marker, with `(name, type)` fields.
pub fn marked_struct(name: &str, generator: &str, fields: &[(&str, &str)]) -> Declaration {
    let mut decl = Declaration::new(DeclKind::Struct, name, Position::new(1, 1)).with_marker(
        MarkerAnnotation::new(GeneratorRef::new(crate::MODULE, generator), Vec::new())
            .at(Position::new(1, 1)),
    );
    for (i, (field, ty)) in fields.iter().enumerate() {
        decl = decl.with_member(
            Declaration::new(DeclKind::Field, *field, Position::new(i as u32 + 2, 5)).with_type(*ty),
        );
    }
    decl
}

/// A plain struct with `(name, type)` fields.
pub fn plain_struct(name: &str, fields: &[(&str, &str)]) -> Declaration {
    let mut decl = marked_struct(name, "Unused", fields);
    decl.markers.clear();
    decl
}
