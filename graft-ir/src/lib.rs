//! Source model for the graft generation pipeline.
//!
//! This crate provides the structured view of source code that the pipeline
//! operates on. A host hands the pipeline immutable [`SourceDocument`]
//! snapshots; generators consume and produce [`Declaration`] trees.
//!
//! # Architecture
//!
//! ```text
//! host → SourceDocument (graft-ir) → scan/resolve/invoke/merge (graft-codegen) → GeneratedDocument
//! ```
//!
//! The model is deliberately language-agnostic: declarations carry a kind,
//! a name, a position and opaque type/body text, never a concrete grammar.

mod declaration;
mod document;
mod marker;

pub use declaration::{DeclKind, Declaration, Import, Param, Position, Visibility};
pub use document::{DocumentId, Fingerprint, SourceDocument};
pub use marker::{GeneratorRef, Literal, LiteralKind, MarkerAnnotation, MarkerArg};
