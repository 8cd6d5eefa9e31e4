//! Core operations.
//!
//! This module contains the business logic for graft commands,
//! separated from CLI argument parsing and output rendering.

pub mod bake;
pub mod check;
pub mod clean;
mod project;

pub use bake::bake;
pub use check::check;
pub use clean::clean;
pub use project::{Project, SourceFile};

use graft_codegen::{Diagnostic, Severity};

use crate::reports::Diagnostics;

/// Split diagnostics by severity into printable messages.
pub(crate) fn collect_diagnostics<'a>(diagnostics: impl Iterator<Item = &'a Diagnostic>) -> Diagnostics {
    let mut out = Diagnostics::default();
    for diag in diagnostics {
        let msg = match &diag.location {
            Some(loc) => format!("{}\n  --> {}", diag.message, loc),
            None => diag.message.clone(),
        };
        match diag.severity {
            Severity::Error => out.errors.push(msg),
            Severity::Warning => out.warnings.push(msg),
            Severity::Info => out.infos.push(msg),
        }
    }
    out
}
