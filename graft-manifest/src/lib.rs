//! Configuration and declaration source loading for graft.
//!
//! - [`Config`] - `graft.toml` project configuration
//! - [`parse_source`] / [`load_source`] - `*.decl.toml` declaration sources
//!
//! Errors carry their source text and spans for miette rendering.

// Miette's derive macro generates code that triggers these warnings
#![allow(unused_assignments)]

mod config;
mod error;
mod source;

pub use config::{Config, ModulesSection, OutputSection, PipelineSection, SourcesSection};
pub use error::{Error, Origin, Result};
pub use source::{load_source, parse_source};

/// Module assumed for markers that do not name one.
pub const BUILTIN_MODULE: &str = "graft.builtin";
