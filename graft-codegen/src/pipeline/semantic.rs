//! Read-only semantic view of the documents in a run.

use std::sync::Arc;

use graft_ir::{Declaration, DocumentId, Fingerprint, SourceDocument};
use indexmap::IndexMap;
use parking_lot::Mutex;

/// The compilation a target declaration belongs to.
///
/// Holds every document submitted to a run, including ones served from the
/// cache, so generators can look up types declared elsewhere.
#[derive(Debug, Clone, Default)]
pub struct Compilation {
    documents: IndexMap<DocumentId, Arc<SourceDocument>>,
}

impl Compilation {
    /// Build a view over documents. A later document with the same id
    /// replaces an earlier one.
    pub fn new(documents: impl IntoIterator<Item = Arc<SourceDocument>>) -> Self {
        let mut map = IndexMap::new();
        for doc in documents {
            map.insert(doc.id.clone(), doc);
        }
        Self { documents: map }
    }

    pub fn document(&self, id: &DocumentId) -> Option<&Arc<SourceDocument>> {
        self.documents.get(id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Arc<SourceDocument>> {
        self.documents.values()
    }

    /// Find a top-level type declaration by name, searching documents in
    /// submission order.
    pub fn find_type(&self, name: &str) -> Option<(&DocumentId, &Declaration)> {
        self.documents.iter().find_map(|(id, doc)| {
            doc.declarations
                .iter()
                .find(|d| d.kind.is_type() && d.name == name)
                .map(|d| (id, d))
        })
    }

    /// All top-level type declarations.
    pub fn types(&self) -> impl Iterator<Item = &Declaration> {
        self.documents
            .values()
            .flat_map(|doc| doc.declarations.iter().filter(|d| d.kind.is_type()))
    }

    pub fn fingerprint(&self, id: &DocumentId) -> Option<Fingerprint> {
        self.documents.get(id).map(|doc| doc.fingerprint)
    }

    /// The document version that answers `find_type(name)`.
    fn type_source(&self, name: &str) -> Option<(DocumentId, Fingerprint)> {
        self.find_type(name)
            .and_then(|(id, _)| Some((id.clone(), self.fingerprint(id)?)))
    }

    fn versions(&self) -> Vec<(DocumentId, Fingerprint)> {
        self.documents
            .iter()
            .map(|(id, doc)| (id.clone(), doc.fingerprint))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// One read a generator made from the compilation, with the answer it got.
///
/// Output that was produced under a set of reads may only be reused while
/// every read still [`holds`](Dependency::holds).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    /// A type lookup, answered by this document version or by none.
    Type {
        name: String,
        found: Option<(DocumentId, Fingerprint)>,
    },
    /// A direct document read; `None` if it was absent.
    Document {
        id: DocumentId,
        fingerprint: Option<Fingerprint>,
    },
    /// A walk over every document.
    All(Vec<(DocumentId, Fingerprint)>),
}

impl Dependency {
    /// Whether `compilation` gives the same answer.
    pub fn holds(&self, compilation: &Compilation) -> bool {
        match self {
            Dependency::Type { name, found } => compilation.type_source(name) == *found,
            Dependency::Document { id, fingerprint } => compilation.fingerprint(id) == *fingerprint,
            Dependency::All(versions) => compilation.versions() == *versions,
        }
    }

    /// Whether a new version of document `id` may change the answer.
    ///
    /// A lookup that found nothing is not reported here; only
    /// [`holds`](Dependency::holds) can tell whether a document now answers it.
    pub fn is_outdated_by(&self, id: &DocumentId, fingerprint: Fingerprint) -> bool {
        match self {
            Dependency::Type { found: Some((read, at)), .. } => read == id && *at != fingerprint,
            Dependency::Type { found: None, .. } => false,
            Dependency::Document { id: read, fingerprint: at } => read == id && *at != Some(fingerprint),
            Dependency::All(versions) => match versions.iter().find(|(read, _)| read == id) {
                Some((_, at)) => *at != fingerprint,
                None => true,
            },
        }
    }
}

/// Access to a compilation that records each read as a [`Dependency`].
#[derive(Debug, Clone, Copy)]
pub struct CompilationView<'a> {
    compilation: &'a Compilation,
    reads: &'a Mutex<Vec<Dependency>>,
}

impl<'a> CompilationView<'a> {
    pub(crate) fn new(compilation: &'a Compilation, reads: &'a Mutex<Vec<Dependency>>) -> Self {
        Self { compilation, reads }
    }

    fn record(&self, dependency: Dependency) {
        let mut reads = self.reads.lock();
        if !reads.contains(&dependency) {
            reads.push(dependency);
        }
    }

    /// See [`Compilation::find_type`].
    pub fn find_type(&self, name: &str) -> Option<(&'a DocumentId, &'a Declaration)> {
        self.record(Dependency::Type {
            name: name.to_string(),
            found: self.compilation.type_source(name),
        });
        self.compilation.find_type(name)
    }

    pub fn document(&self, id: &DocumentId) -> Option<&'a Arc<SourceDocument>> {
        self.record(Dependency::Document {
            id: id.clone(),
            fingerprint: self.compilation.fingerprint(id),
        });
        self.compilation.document(id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &'a Arc<SourceDocument>> + use<'a> {
        self.record(Dependency::All(self.compilation.versions()));
        self.compilation.documents()
    }

    pub fn types(&self) -> impl Iterator<Item = &'a Declaration> + use<'a> {
        self.record(Dependency::All(self.compilation.versions()));
        self.compilation.types()
    }
}
