//! Marker-driven code generation pipeline.
//!
//! This crate discovers generation markers in [`graft_ir::SourceDocument`]s,
//! runs the generators they name and merges the produced declarations into
//! one generated twin per source document.
//!
//! # Module Organization
//!
//! - [`pipeline`] - Scanner, registry, invocation engine, merge and cache (Pipeline, Generator, etc.)
//! - [`generation`] - Output assembly (DocumentRenderer, ImportCollector)
//! - [`builder`] - Code generation building blocks (CodeBuilder, CodeFragment, etc.)

pub mod builder;
pub mod generation;
pub mod pipeline;

pub use pipeline::{
    CacheStatus, Diagnostic, DiagnosticKind, DiagnosticSink, GeneratedDocument, Generator,
    GeneratorFactory, GeneratorModule, ModuleLoader, Pipeline, PipelineConfig, RunError, RunOutput,
    Severity, TransformationContext,
};
