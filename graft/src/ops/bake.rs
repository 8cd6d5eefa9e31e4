//! Bake operation - run generators and write generated twins.

use std::path::Path;

use eyre::{Context, Result};
use graft_codegen::{CacheStatus, pipeline::DocumentOutput};
use graft_core::{GeneratedFile, WriteResult};
use graft_ir::SourceDocument;

use super::{Project, collect_diagnostics};
use crate::reports::{BakeReport, PreviewFile, TwinChange};

/// Options for the bake operation.
pub struct BakeOptions {
    /// Whether to preview without writing files.
    pub dry_run: bool,
}

/// Execute the bake operation.
///
/// Generated twins are written only when their content changed. A source
/// whose generators produced nothing has its stale twin removed; a source
/// whose generation failed as a whole keeps its last twin.
pub async fn bake(
    project: &Project,
    documents: Vec<SourceDocument>,
    opts: BakeOptions,
) -> Result<BakeReport> {
    let output_dir = project.output_dir();
    let marker_count = documents.iter().map(SourceDocument::marker_count).sum();
    let output = project.generate(documents).await?;

    let mut report = BakeReport {
        dry_run: opts.dry_run,
        output_dir: output_dir.clone(),
        documents: output.len(),
        markers: marker_count,
        errored: output.count(CacheStatus::Errored),
        diagnostics: collect_diagnostics(output.diagnostics()),
        ..Default::default()
    };

    for (_, doc) in output.iter() {
        apply(doc, &output_dir, opts.dry_run, &mut report)?;
    }

    Ok(report)
}

fn apply(doc: &DocumentOutput, output_dir: &Path, dry_run: bool, report: &mut BakeReport) -> Result<()> {
    let generated = &doc.generated;
    let path = generated.path(output_dir);
    let twin_name = generated.id().to_string();

    if doc.status == CacheStatus::Errored {
        tracing::debug!(twin = %twin_name, "generation failed, keeping existing twin");
        if path.exists() {
            report.changes.push(TwinChange::Unchanged(twin_name));
        }
        return Ok(());
    }

    if generated.is_empty() {
        if path.exists() {
            if !dry_run {
                std::fs::remove_file(&path)
                    .wrap_err_with(|| format!("Failed to remove {}", path.display()))?;
            }
            report.changes.push(TwinChange::Removed(twin_name));
        }
        return Ok(());
    }

    if dry_run {
        report.preview.push(PreviewFile {
            path: twin_name,
            content: generated.render(),
        });
        return Ok(());
    }

    match generated
        .write(output_dir)
        .wrap_err_with(|| format!("Failed to write {}", path.display()))?
    {
        WriteResult::Written => report.changes.push(TwinChange::Written(twin_name)),
        WriteResult::Unchanged => report.changes.push(TwinChange::Unchanged(twin_name)),
    }
    Ok(())
}
