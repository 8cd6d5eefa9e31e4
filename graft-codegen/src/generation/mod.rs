//! Output assembly: import consolidation and declaration rendering.

mod imports;
mod render;

pub use imports::ImportCollector;
pub use render::{DeclarationView, DocumentRenderer};
