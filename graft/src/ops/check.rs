//! Check operation - run generators and report diagnostics.

use std::path::Path;

use eyre::Result;
use graft_ir::SourceDocument;

use super::{Project, collect_diagnostics};
use crate::reports::CheckReport;

/// Execute the check operation.
///
/// Runs every generator exactly as bake would but writes nothing.
pub async fn check(
    project: &Project,
    documents: Vec<SourceDocument>,
    config_path: &Path,
) -> Result<CheckReport> {
    let markers = documents.iter().map(SourceDocument::marker_count).sum();
    let output = project.generate(documents).await?;

    let generated = output
        .iter()
        .map(|(_, doc)| doc.generated.declarations().len())
        .sum();

    Ok(CheckReport {
        config_path: config_path.to_path_buf(),
        documents: output.len(),
        markers,
        generated,
        diagnostics: collect_diagnostics(output.diagnostics()),
    })
}
