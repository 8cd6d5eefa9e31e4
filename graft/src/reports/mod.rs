//! Report data structures for commands.
//!
//! This module provides data structures that separate data collection from rendering.
//! Commands build reports, then render them to an Output target.

mod bake;
mod check;
mod clean;
mod diagnostics;
mod output;

pub use bake::{BakeReport, PreviewFile, TwinChange};
pub use check::CheckReport;
pub use clean::CleanReport;
pub use diagnostics::Diagnostics;
#[cfg(test)]
pub use output::RecordingOutput;
pub use output::{Output, Report, TerminalOutput};
