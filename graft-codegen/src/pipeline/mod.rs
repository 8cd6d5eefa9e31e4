//! The generation pipeline.
//!
//! ```text
//! SourceDocument ─┬─ cache hit ──────────────────────────────────────────────┐
//!                 └─ scan → (per marker) resolve → build context → invoke ──→ merge → RunOutput
//! ```
//!
//! - [`scan`] finds markers in document order
//! - [`GeneratorRegistry`] resolves generator references, caching failures
//! - [`ContextBuilder`] assembles the read-only [`TransformationContext`]
//! - [`InvocationEngine`] runs one isolated unit per marker on a bounded pool
//! - [`Merger`] re-sorts results into discovery order and renders the twin
//! - [`CacheTracker`] gates each document on its fingerprint and the reads
//!   its generators made from other documents
//!
//! [`Pipeline`] ties them together for a host.

mod cache;
mod config;
mod context;
mod diagnostic;
mod engine;
mod generator;
mod merge;
mod registry;
mod runner;
mod scanner;
mod semantic;
mod sink;

pub use cache::{CacheEntry, CacheTracker, Commit, Lookup, MissReason, SlotState};
pub use config::PipelineConfig;
pub use context::{ContextBuilder, TransformationContext};
pub use diagnostic::{Diagnostic, DiagnosticKind, Location, MarkerScope, Severity};
pub use engine::{GenerationResult, InvocationEngine};
pub use generator::{
    Arguments, ConstructError, FnFactory, Generator, GeneratorFactory, GeneratorModule, LoadError,
    ModuleExport, ModuleLoader, ParamSpec, Signature, StaticLoader, StaticModule,
};
pub use merge::{GeneratedDocument, MergeOutput, Merger};
pub use registry::{GeneratorDescriptor, GeneratorRegistry, ResolveError};
pub use runner::{CacheStatus, DocumentOutput, Pipeline, RunError, RunOutput};
pub use scanner::{MarkerTarget, ScanOutput, scan};
pub use semantic::{Compilation, CompilationView, Dependency};
pub use sink::DiagnosticSink;
