//! Source documents and their identities.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::Declaration;

/// Stable identity of a source document (a path or URI).
///
/// Cheap to clone; shared between the cache, diagnostics and outputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Arc<str>);

impl DocumentId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the identity of the generated twin of this document.
    ///
    /// The suffix is inserted before the file extension so that
    /// `src/model.rs` becomes `src/model.g.rs`. Identities without an
    /// extension get the suffix appended (`Makefile` → `Makefile.g`).
    pub fn generated_twin(&self, suffix: &str) -> DocumentId {
        let id = self.as_str();
        let file_start = id.rfind('/').map_or(0, |i| i + 1);
        match id[file_start..].find('.') {
            Some(dot) if dot > 0 => {
                let split = file_start + dot;
                DocumentId::new(format!("{}.{}{}", &id[..split], suffix, &id[split..]))
            }
            _ => DocumentId::new(format!("{}.{}", id, suffix)),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Content-derived fingerprint of a source document.
///
/// Fingerprint equality is the only test of whether cached output is still
/// valid for a document; the pipeline never compares text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// An immutable snapshot of a source document.
///
/// Superseded wholesale when the host reports an edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Stable identity (path or URI).
    pub id: DocumentId,
    /// Fingerprint of the text this snapshot was built from.
    pub fingerprint: Fingerprint,
    /// Top-level declarations in document order.
    pub declarations: Vec<Declaration>,
}

impl SourceDocument {
    pub fn new(
        id: impl Into<DocumentId>,
        fingerprint: Fingerprint,
        declarations: Vec<Declaration>,
    ) -> Self {
        Self {
            id: id.into(),
            fingerprint,
            declarations,
        }
    }

    /// Find a top-level declaration by name.
    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    /// Count the markers attached anywhere in the document.
    pub fn marker_count(&self) -> usize {
        self.declarations.iter().map(Declaration::marker_count).sum()
    }
}
