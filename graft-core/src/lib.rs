//! Core utilities and types for the graft generation pipeline.
//!
//! This crate provides fundamental helpers shared by the pipeline, the
//! built-in generators and the command-line host.

mod file;
mod hash;
mod utils;

// File operations
pub use file::{FileRules, GeneratedFile, Overwrite, WriteResult};
// Content fingerprints
pub use hash::{content_fingerprint, fingerprint_bytes};
// String utilities
pub use utils::is_identifier;
