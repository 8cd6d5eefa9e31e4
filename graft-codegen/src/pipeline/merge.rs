//! Merging generation results into a document's generated twin.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use graft_core::GeneratedFile;
use graft_ir::{DeclKind, Declaration, DocumentId, GeneratorRef, Import, SourceDocument};

use super::{Dependency, Diagnostic, DiagnosticKind, GenerationResult};
use crate::generation::{DocumentRenderer, ImportCollector};

/// The merged output for one source document.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDocument {
    id: DocumentId,
    source: DocumentId,
    imports: Vec<Import>,
    declarations: Vec<Declaration>,
    text: String,
}

impl GeneratedDocument {
    /// Identity of the generated twin.
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn source(&self) -> &DocumentId {
        &self.source
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    /// Rendered text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl GeneratedFile for GeneratedDocument {
    fn path(&self, base: &Path) -> PathBuf {
        base.join(self.id.as_str())
    }

    fn render(&self) -> String {
        self.text.clone()
    }
}

/// A merged document together with the diagnostics of its results.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    pub document: GeneratedDocument,
    /// Result diagnostics in discovery order, followed by merge warnings.
    pub diagnostics: Vec<Diagnostic>,
    /// Compilation reads of every result, deduplicated.
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Namespace {
    Type,
    Value,
}

fn namespace(kind: DeclKind) -> Option<Namespace> {
    match kind {
        DeclKind::Struct | DeclKind::Enum | DeclKind::Trait | DeclKind::Alias => Some(Namespace::Type),
        DeclKind::Const | DeclKind::Method => Some(Namespace::Value),
        DeclKind::Impl | DeclKind::Field | DeclKind::Variant => None,
    }
}

/// Combines results into one generated document.
#[derive(Debug, Clone)]
pub struct Merger {
    suffix: String,
    renderer: DocumentRenderer,
}

impl Merger {
    pub fn new(suffix: impl Into<String>, renderer: DocumentRenderer) -> Self {
        Self {
            suffix: suffix.into(),
            renderer,
        }
    }

    /// Generated identity for a source document.
    pub fn twin_of(&self, source: &DocumentId) -> DocumentId {
        source.generated_twin(&self.suffix)
    }

    /// Merge results in discovery order, whatever order they completed in.
    pub fn merge(&self, source: &SourceDocument, mut results: Vec<GenerationResult>) -> MergeOutput {
        results.sort_by_key(|r| r.ordinal);

        let mut declarations = Vec::new();
        let mut diagnostics = Vec::new();
        let mut imports = ImportCollector::new();
        let mut collisions = Collisions::new(source);
        let mut dependencies: Vec<Dependency> = Vec::new();

        for result in results {
            diagnostics.extend(result.diagnostics);
            for dependency in result.dependencies {
                if !dependencies.contains(&dependency) {
                    dependencies.push(dependency);
                }
            }
            for decl in result.declarations {
                for import in decl.required_imports() {
                    imports.add(import);
                }
                if let Some(message) = collisions.check(&decl, &result.generator) {
                    diagnostics.push(
                        Diagnostic::warning(DiagnosticKind::MergeWarning, message)
                            .at(source.id.clone(), Some(result.position)),
                    );
                }
                declarations.push(decl.without_markers());
            }
        }

        let imports = imports.to_imports();
        let text = self.renderer.render(&source.id, &imports, &declarations);

        MergeOutput {
            document: GeneratedDocument {
                id: self.twin_of(&source.id),
                source: source.id.clone(),
                imports,
                declarations,
                text,
            },
            diagnostics,
            dependencies,
        }
    }

    /// The output recorded for a document whose generation failed as a
    /// whole: no declarations, header only.
    pub fn empty(&self, source: &DocumentId) -> GeneratedDocument {
        GeneratedDocument {
            id: self.twin_of(source),
            source: source.clone(),
            imports: Vec::new(),
            declarations: Vec::new(),
            text: self.renderer.render(source, &[], &[]),
        }
    }
}

impl Default for Merger {
    fn default() -> Self {
        Self::new("g", DocumentRenderer::default())
    }
}

/// Best-effort detection of top-level names the compiler would reject.
struct Collisions<'a> {
    source: &'a SourceDocument,
    generated: HashMap<(Namespace, String), GeneratorRef>,
}

impl<'a> Collisions<'a> {
    fn new(source: &'a SourceDocument) -> Self {
        Self {
            source,
            generated: HashMap::new(),
        }
    }

    fn check(&mut self, decl: &Declaration, generator: &GeneratorRef) -> Option<String> {
        let ns = namespace(decl.kind)?;

        if let Some(first) = self.generated.get(&(ns, decl.name.clone())) {
            return Some(if first == generator {
                format!("`{}` is generated more than once by `{}`", decl.name, generator)
            } else {
                format!(
                    "`{}` is generated by both `{}` and `{}`",
                    decl.name, first, generator
                )
            });
        }
        self.generated.insert((ns, decl.name.clone()), generator.clone());

        let clashes_with_source = self
            .source
            .declarations
            .iter()
            .any(|d| d.name == decl.name && namespace(d.kind) == Some(ns));
        clashes_with_source.then(|| {
            format!(
                "`{}` generated by `{}` collides with a declaration in {}",
                decl.name, generator, self.source.id
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use graft_ir::{Fingerprint, Position};

    use super::*;

    fn source() -> SourceDocument {
        SourceDocument::new(
            "src/model.rs",
            Fingerprint::new(1),
            vec![Declaration::new(DeclKind::Struct, "Foo", Position::new(1, 1))],
        )
    }

    fn result(ordinal: usize, generator: &str, decls: Vec<Declaration>) -> GenerationResult {
        GenerationResult {
            ordinal,
            generator: GeneratorRef::new("m", generator),
            position: Position::new(ordinal as u32 + 1, 1),
            declarations: decls,
            diagnostics: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    fn decl(kind: DeclKind, name: &str) -> Declaration {
        Declaration::new(kind, name, Position::new(1, 1))
    }

    #[test]
    fn test_results_are_merged_in_discovery_order() {
        let merged = Merger::default().merge(
            &source(),
            vec![
                result(1, "B", vec![decl(DeclKind::Struct, "Second")]),
                result(0, "A", vec![decl(DeclKind::Struct, "First")]),
            ],
        );

        let names: Vec<&str> = merged
            .document
            .declarations()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["First", "Second"]);
        assert_eq!(merged.document.id().as_str(), "src/model.g.rs");
        assert!(merged.diagnostics.is_empty());
    }

    #[test]
    fn test_imports_are_deduplicated() {
        let fmt = Import::module("std::fmt");
        let merged = Merger::default().merge(
            &source(),
            vec![
                result(0, "A", vec![decl(DeclKind::Impl, "Foo").with_import(fmt.clone())]),
                result(1, "B", vec![decl(DeclKind::Impl, "Bar").with_import(fmt.clone())]),
            ],
        );
        assert_eq!(merged.document.imports(), &[fmt]);
        assert_eq!(merged.document.text().matches("use std::fmt;").count(), 1);
    }

    #[test]
    fn test_collisions_are_emitted_and_reported() {
        let merged = Merger::default().merge(
            &source(),
            vec![
                result(0, "A", vec![decl(DeclKind::Struct, "Twin")]),
                result(1, "B", vec![decl(DeclKind::Struct, "Twin")]),
                result(2, "C", vec![decl(DeclKind::Enum, "Foo")]),
            ],
        );

        assert_eq!(merged.document.declarations().len(), 3);
        let messages: Vec<&str> = merged.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "`Twin` is generated by both `m::A` and `m::B`",
                "`Foo` generated by `m::C` collides with a declaration in src/model.rs",
            ]
        );
        assert!(merged
            .diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::MergeWarning));
    }

    #[test]
    fn test_impls_never_collide() {
        let merged = Merger::default().merge(
            &source(),
            vec![
                result(0, "A", vec![decl(DeclKind::Impl, "Foo")]),
                result(1, "B", vec![decl(DeclKind::Impl, "Foo")]),
            ],
        );
        assert!(merged.diagnostics.is_empty());
    }

    #[test]
    fn test_empty_document_has_header_only() {
        let doc = Merger::default().empty(&DocumentId::new("src/model.rs"));
        assert!(doc.is_empty());
        assert_eq!(
            doc.text(),
            "// @generated by graft from src/model.rs. Do not edit.\n"
        );
    }
}
