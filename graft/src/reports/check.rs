//! Check command report data structures.

use std::path::PathBuf;

use super::{
    Diagnostics,
    output::{Output, Report},
};

/// Report data from a check run.
#[derive(Debug)]
pub struct CheckReport {
    /// Path to the config file.
    pub config_path: PathBuf,
    /// Number of source documents.
    pub documents: usize,
    /// Number of markers across all documents.
    pub markers: usize,
    /// Number of declarations that would be generated.
    pub generated: usize,
    pub diagnostics: Diagnostics,
}

impl CheckReport {
    /// Whether the check passed (no errors).
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

impl Report for CheckReport {
    fn render(&self, out: &mut dyn Output) {
        self.diagnostics.render(out);

        if self.is_valid() {
            out.preformatted(&format!("✓ {} is valid", self.config_path.display()));
            out.preformatted(&format!(
                "  {} documents, {} markers, {} generated declarations",
                self.documents, self.markers, self.generated
            ));
        } else {
            out.preformatted(&format!(
                "✗ {} error(s) in {} documents",
                self.diagnostics.errors.len(),
                self.documents
            ));
        }
    }
}
