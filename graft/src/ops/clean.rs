//! Clean operation - remove generated twins.

use eyre::{Context, Result};

use super::{Project, SourceFile};
use crate::reports::CleanReport;

/// Options for the clean operation.
pub struct CleanOptions {
    /// Whether to preview without deleting.
    pub dry_run: bool,
}

/// Execute the clean operation.
///
/// Only twins of currently discovered sources are touched.
pub fn clean(project: &Project, sources: &[SourceFile], opts: CleanOptions) -> Result<CleanReport> {
    let mut deleted = Vec::new();

    for source in sources {
        let twin = project.twin_path(&source.id);
        if !twin.is_file() {
            continue;
        }
        if !opts.dry_run {
            std::fs::remove_file(&twin)
                .wrap_err_with(|| format!("Failed to remove {}", twin.display()))?;
        }
        deleted.push(twin.display().to_string());
    }

    Ok(CleanReport {
        dry_run: opts.dry_run,
        deleted,
    })
}
