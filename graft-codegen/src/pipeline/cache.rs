//! Per-document output cache keyed by content fingerprint.
//!
//! Each document identity moves through
//!
//! ```text
//! Unseen → Fresh(fp) → Stale → Fresh(fp') …
//!              ↘ Errored(fp)
//! ```
//!
//! A slot is only ever served when its stored fingerprint equals the live
//! one and every compilation read its generators made still gives the same
//! answer. Stale slots are never served.

use std::{collections::HashMap, fmt, sync::Arc};

use graft_ir::{DocumentId, Fingerprint};
use parking_lot::RwLock;

use super::{Compilation, Dependency, Diagnostic, GeneratedDocument};

/// Output previously produced for one document version.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub source: DocumentId,
    pub fingerprint: Fingerprint,
    pub generated: Arc<GeneratedDocument>,
    pub diagnostics: Vec<Diagnostic>,
    /// Reads of other documents the output depends on.
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone)]
enum Slot {
    Fresh(Arc<CacheEntry>),
    Stale(Arc<CacheEntry>),
    /// Generation of the whole document failed for this fingerprint.
    Errored(Arc<CacheEntry>),
}

/// Observable state of a document's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Unseen,
    Fresh(Fingerprint),
    Stale(Fingerprint),
    Errored(Fingerprint),
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotState::Unseen => write!(f, "unseen"),
            SlotState::Fresh(fp) => write!(f, "fresh({})", fp),
            SlotState::Stale(fp) => write!(f, "stale({})", fp),
            SlotState::Errored(fp) => write!(f, "errored({})", fp),
        }
    }
}

/// Why a lookup missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    Unseen,
    Stale,
    FingerprintChanged,
    /// A document the output was derived from changed, appeared or went away.
    DependencyChanged,
}

/// Outcome of [`CacheTracker::lookup`].
#[derive(Debug, Clone)]
pub enum Lookup {
    Hit(Arc<CacheEntry>),
    Miss(MissReason),
}

/// A slot update recorded at the end of a successful run.
#[derive(Debug, Clone)]
pub enum Commit {
    Fresh(CacheEntry),
    Errored(CacheEntry),
}

impl Commit {
    fn source(&self) -> &DocumentId {
        match self {
            Commit::Fresh(entry) | Commit::Errored(entry) => &entry.source,
        }
    }
}

/// Tracks cached output per document identity.
#[derive(Debug, Default)]
pub struct CacheTracker {
    slots: RwLock<HashMap<DocumentId, Slot>>,
}

impl CacheTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve the entry for `id` if it is valid for `fingerprint` within
    /// `compilation`, the documents of the current run.
    pub fn lookup(&self, id: &DocumentId, fingerprint: Fingerprint, compilation: &Compilation) -> Lookup {
        match self.slots.read().get(id) {
            None => Lookup::Miss(MissReason::Unseen),
            Some(Slot::Stale(_)) => Lookup::Miss(MissReason::Stale),
            Some(Slot::Fresh(entry) | Slot::Errored(entry)) => {
                if entry.fingerprint != fingerprint {
                    Lookup::Miss(MissReason::FingerprintChanged)
                } else if !entry.dependencies.iter().all(|d| d.holds(compilation)) {
                    Lookup::Miss(MissReason::DependencyChanged)
                } else {
                    Lookup::Hit(entry.clone())
                }
            }
        }
    }

    /// Host notification that a document's content changed.
    ///
    /// A fresh or errored slot whose fingerprint differs becomes stale, and
    /// so does every slot whose output read the old version of `id`.
    pub fn notify_changed(&self, id: &DocumentId, fingerprint: Fingerprint) -> SlotState {
        let mut slots = self.slots.write();
        for (slot_id, slot) in slots.iter_mut() {
            let outdated = match slot {
                Slot::Fresh(entry) | Slot::Errored(entry) => {
                    let changed = if slot_id == id {
                        entry.fingerprint != fingerprint
                    } else {
                        entry.dependencies.iter().any(|d| d.is_outdated_by(id, fingerprint))
                    };
                    changed.then(|| entry.clone())
                }
                Slot::Stale(_) => None,
            };
            if let Some(entry) = outdated {
                tracing::debug!(document = %slot_id, changed = %id, "cache entry is stale");
                *slot = Slot::Stale(entry);
            }
        }
        slots.get(id).map_or(SlotState::Unseen, state_of)
    }

    /// Record the outcome of a completed run in one update.
    pub fn commit(&self, batch: impl IntoIterator<Item = Commit>) {
        let mut slots = self.slots.write();
        for commit in batch {
            let id = commit.source().clone();
            let slot = match commit {
                Commit::Fresh(entry) => Slot::Fresh(Arc::new(entry)),
                Commit::Errored(entry) => Slot::Errored(Arc::new(entry)),
            };
            slots.insert(id, slot);
        }
    }

    /// Evict a document, returning the entry it held.
    pub fn invalidate(&self, id: &DocumentId) -> Option<Arc<CacheEntry>> {
        self.slots.write().remove(id).map(|slot| match slot {
            Slot::Fresh(entry) | Slot::Stale(entry) | Slot::Errored(entry) => entry,
        })
    }

    pub fn state(&self, id: &DocumentId) -> SlotState {
        self.slots
            .read()
            .get(id)
            .map_or(SlotState::Unseen, state_of)
    }

    /// Every tracked slot, ordered by document id.
    pub fn snapshot(&self) -> Vec<(DocumentId, SlotState)> {
        let mut out: Vec<_> = self
            .slots
            .read()
            .iter()
            .map(|(id, slot)| (id.clone(), state_of(slot)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn state_of(slot: &Slot) -> SlotState {
    match slot {
        Slot::Fresh(entry) => SlotState::Fresh(entry.fingerprint),
        Slot::Stale(entry) => SlotState::Stale(entry.fingerprint),
        Slot::Errored(entry) => SlotState::Errored(entry.fingerprint),
    }
}
