//! Bake command report data structures.

use std::path::PathBuf;

use super::{
    Diagnostics,
    output::{Output, Report},
};

/// Report data from a bake run.
#[derive(Debug, Default)]
pub struct BakeReport {
    /// Whether this was a dry run.
    pub dry_run: bool,

    /// Root the generated twins are written under.
    pub output_dir: PathBuf,

    /// Number of source documents processed.
    pub documents: usize,

    /// Number of markers across all documents.
    pub markers: usize,

    /// Documents whose generation failed as a whole.
    pub errored: usize,

    /// Diagnostics from the run.
    pub diagnostics: Diagnostics,

    /// What happened to each twin on disk.
    pub changes: Vec<TwinChange>,

    /// Twins that would be written, in dry-run mode.
    pub preview: Vec<PreviewFile>,
}

/// Effect of a bake on one generated twin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TwinChange {
    Written(String),
    Unchanged(String),
    /// The source no longer generates anything.
    Removed(String),
}

/// A twin in preview mode.
#[derive(Debug)]
pub struct PreviewFile {
    /// Twin identity.
    pub path: String,
    /// Rendered content.
    pub content: String,
}

impl BakeReport {
    pub fn has_errors(&self) -> bool {
        self.errored > 0 || self.diagnostics.has_errors()
    }

    fn unchanged(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, TwinChange::Unchanged(_)))
            .count()
    }
}

impl Report for BakeReport {
    fn render(&self, out: &mut dyn Output) {
        self.diagnostics.render(out);

        if self.dry_run {
            for file in &self.preview {
                out.divider(&file.path);
                out.preformatted(&file.content);
            }
            out.divider("Summary");
            out.preformatted(&format!("{} files would be generated", self.preview.len()));
            for change in &self.changes {
                if let TwinChange::Removed(path) = change {
                    out.removed_item(&format!("{} (would be removed)", path));
                }
            }
            return;
        }

        out.preformatted(&format!(
            "Baked {} document{} ({} marker{})",
            self.documents,
            plural(self.documents),
            self.markers,
            plural(self.markers)
        ));
        out.key_value("Output", &self.output_dir.display().to_string());

        let written: Vec<_> = self
            .changes
            .iter()
            .filter_map(|c| match c {
                TwinChange::Written(path) => Some(path),
                _ => None,
            })
            .collect();
        if !written.is_empty() {
            out.newline();
            out.section("Written");
            for path in written {
                out.added_item(path);
            }
        }

        let removed: Vec<_> = self
            .changes
            .iter()
            .filter_map(|c| match c {
                TwinChange::Removed(path) => Some(path),
                _ => None,
            })
            .collect();
        if !removed.is_empty() {
            out.newline();
            out.section("Removed");
            for path in removed {
                out.removed_item(path);
            }
        }

        let unchanged = self.unchanged();
        if unchanged > 0 {
            out.newline();
            out.preformatted(&format!("{} unchanged", unchanged));
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
