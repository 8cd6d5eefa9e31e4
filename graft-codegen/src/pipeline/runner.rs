//! The host-facing pipeline: cache gate, per-document fan-out and commit.

use std::{collections::HashMap, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use graft_ir::{DocumentId, Fingerprint, SourceDocument};
use indexmap::IndexMap;
use thiserror::Error;
use tokio::{
    sync::Mutex,
    task::JoinSet,
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;

use super::{
    CacheEntry, CacheTracker, Commit, Compilation, ContextBuilder, Dependency, Diagnostic,
    DiagnosticKind,
    GeneratedDocument, GeneratorRegistry, InvocationEngine, Lookup, Merger, ModuleLoader,
    PipelineConfig, SlotState, engine::panic_message, scan,
};
use crate::generation::DocumentRenderer;

/// A run that was aborted before it could commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("generation run was cancelled")]
    Cancelled,
    #[error("generation run exceeded its deadline")]
    DeadlineExceeded,
}

/// How a document's output was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the cache without running anything.
    Hit,
    /// Scanned, invoked and merged in this run.
    Generated,
    /// Generation of the document failed as a whole.
    Errored,
}

/// Output for one document.
#[derive(Debug, Clone)]
pub struct DocumentOutput {
    pub generated: Arc<GeneratedDocument>,
    pub diagnostics: Vec<Diagnostic>,
    /// Reads of the run's documents the output was derived from.
    pub dependencies: Vec<Dependency>,
    pub status: CacheStatus,
}

impl DocumentOutput {
    fn cached(entry: &CacheEntry) -> Self {
        Self {
            generated: entry.generated.clone(),
            diagnostics: entry.diagnostics.clone(),
            dependencies: entry.dependencies.clone(),
            status: CacheStatus::Hit,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity.is_error())
    }
}

/// Outputs of a run, in document submission order.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    documents: IndexMap<DocumentId, DocumentOutput>,
}

impl RunOutput {
    pub fn get(&self, id: &DocumentId) -> Option<&DocumentOutput> {
        self.documents.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DocumentId, &DocumentOutput)> {
        self.documents.iter()
    }

    /// All diagnostics of the run, document by document.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.documents.values().flat_map(|d| d.diagnostics.iter())
    }

    pub fn has_errors(&self) -> bool {
        self.documents.values().any(DocumentOutput::has_errors)
    }

    pub fn count(&self, status: CacheStatus) -> usize {
        self.documents.values().filter(|d| d.status == status).count()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl IntoIterator for RunOutput {
    type Item = (DocumentId, DocumentOutput);
    type IntoIter = indexmap::map::IntoIter<DocumentId, DocumentOutput>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

/// The generation pipeline.
///
/// # Example
///
/// ```ignore
/// let pipeline = Pipeline::new(Arc::new(loader));
/// let output = pipeline.run([document]).await?;
/// for (id, doc) in output.iter() {
///     println!("{} -> {}", id, doc.generated.id());
/// }
/// ```
///
/// Runs on one pipeline are serialized. Registry and cache live as long as
/// the pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    engine: InvocationEngine,
    merger: Merger,
    cache: CacheTracker,
    gate: Mutex<()>,
}

impl Pipeline {
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        Self::with_config(loader, PipelineConfig::default())
    }

    pub fn with_config(loader: Arc<dyn ModuleLoader>, config: PipelineConfig) -> Self {
        let registry = Arc::new(GeneratorRegistry::new(loader));
        Self {
            engine: InvocationEngine::new(registry, config.workers),
            merger: Merger::new(
                config.output_suffix.clone(),
                DocumentRenderer::new(config.header),
            ),
            cache: CacheTracker::new(),
            gate: Mutex::new(()),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &GeneratorRegistry {
        self.engine.registry()
    }

    pub fn cache(&self) -> &CacheTracker {
        &self.cache
    }

    /// Generated identity for a source document.
    pub fn twin_of(&self, source: &DocumentId) -> DocumentId {
        self.merger.twin_of(source)
    }

    /// Run without cancellation or deadline.
    pub async fn run<I, D>(&self, documents: I) -> Result<RunOutput, RunError>
    where
        I: IntoIterator<Item = D>,
        D: Into<Arc<SourceDocument>>,
    {
        self.run_with(documents, &CancellationToken::new(), None).await
    }

    /// Run over a set of documents.
    ///
    /// Cancelling `cancel` or reaching `deadline` aborts every in-flight
    /// invocation and discards the run: the cache is left exactly as it was.
    /// When several snapshots share an identity, the last one wins.
    pub async fn run_with<I, D>(
        &self,
        documents: I,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<RunOutput, RunError>
    where
        I: IntoIterator<Item = D>,
        D: Into<Arc<SourceDocument>>,
    {
        let _gate = self.gate.lock().await;

        let compilation = Arc::new(Compilation::new(documents.into_iter().map(Into::into)));
        tracing::debug!(documents = compilation.len(), "generation run started");

        let run_cancel = cancel.child_token();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RunError::Cancelled),
            _ = elapsed(deadline) => Err(RunError::DeadlineExceeded),
            done = self.generate(&compilation, &run_cancel) => Ok(done),
        };

        match outcome {
            Ok((output, commits)) => {
                self.cache.commit(commits);
                tracing::debug!(
                    hits = output.count(CacheStatus::Hit),
                    generated = output.count(CacheStatus::Generated),
                    errored = output.count(CacheStatus::Errored),
                    "generation run finished"
                );
                Ok(output)
            }
            Err(err) => {
                run_cancel.cancel();
                tracing::debug!(error = %err, "generation run discarded");
                Err(err)
            }
        }
    }

    async fn generate(
        &self,
        compilation: &Arc<Compilation>,
        cancel: &CancellationToken,
    ) -> (RunOutput, Vec<Commit>) {
        let mut outputs: Vec<Option<DocumentOutput>> = vec![None; compilation.len()];
        let mut commits = Vec::new();
        let mut pending = JoinSet::new();
        let mut tasks = HashMap::new();

        for (index, document) in compilation.documents().enumerate() {
            match self.cache.lookup(&document.id, document.fingerprint, compilation) {
                Lookup::Hit(entry) => {
                    tracing::debug!(document = %document.id, "cache hit");
                    outputs[index] = Some(DocumentOutput::cached(&entry));
                }
                Lookup::Miss(reason) => {
                    tracing::debug!(document = %document.id, ?reason, "cache miss");
                    let task = DocumentTask {
                        engine: self.engine.clone(),
                        merger: self.merger.clone(),
                        contexts: ContextBuilder::new(compilation.clone()),
                        cancel: cancel.clone(),
                        document: document.clone(),
                    };
                    let handle = pending.spawn(task.run());
                    tasks.insert(handle.id(), (index, document.clone()));
                }
            }
        }

        // Each document task joins its own units; documents finish in any order.
        while let Some(joined) = pending.join_next_with_id().await {
            let (task_id, outcome) = match joined {
                Ok(done) => (done.0, Some(done.1)),
                Err(err) => (err.id(), None),
            };
            let Some((index, document)) = tasks.remove(&task_id) else {
                continue;
            };
            let outcome = outcome.unwrap_or_else(|| {
                errored_output(&self.merger, &document.id, "document task did not complete".to_string())
            });

            let entry = CacheEntry {
                source: document.id.clone(),
                fingerprint: document.fingerprint,
                generated: outcome.generated.clone(),
                diagnostics: outcome.diagnostics.clone(),
                dependencies: outcome.dependencies.clone(),
            };
            commits.push(match outcome.status {
                CacheStatus::Errored => Commit::Errored(entry),
                CacheStatus::Hit | CacheStatus::Generated => Commit::Fresh(entry),
            });
            outputs[index] = Some(outcome);
        }

        let documents = compilation
            .documents()
            .zip(outputs)
            .filter_map(|(doc, out)| out.map(|out| (doc.id.clone(), out)))
            .collect();
        (RunOutput { documents }, commits)
    }

    /// Host notification that a document changed.
    pub fn notify_changed(&self, id: &DocumentId, fingerprint: Fingerprint) -> SlotState {
        self.cache.notify_changed(id, fingerprint)
    }

    /// Evict a removed document. Returns the generated document it had, so
    /// the host can retract it.
    pub fn invalidate(&self, id: &DocumentId) -> Option<Arc<GeneratedDocument>> {
        let evicted = self.cache.invalidate(id)?;
        tracing::debug!(document = %id, "cache entry evicted");
        Some(evicted.generated.clone())
    }
}

fn errored_output(merger: &Merger, id: &DocumentId, message: String) -> DocumentOutput {
    DocumentOutput {
        generated: Arc::new(merger.empty(id)),
        diagnostics: vec![
            Diagnostic::error(
                DiagnosticKind::Internal,
                format!("generation of {} failed: {}", id, message),
            )
            .at(id.clone(), None),
        ],
        dependencies: Vec::new(),
        status: CacheStatus::Errored,
    }
}

async fn elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Scan, invoke and merge one document.
struct DocumentTask {
    engine: InvocationEngine,
    merger: Merger,
    contexts: ContextBuilder,
    cancel: CancellationToken,
    document: Arc<SourceDocument>,
}

impl DocumentTask {
    async fn run(self) -> DocumentOutput {
        let merger = self.merger.clone();
        let id = self.document.id.clone();
        match AssertUnwindSafe(self.generate()).catch_unwind().await {
            Ok(output) => output,
            Err(panic) => errored_output(&merger, &id, panic_message(&*panic)),
        }
    }

    async fn generate(self) -> DocumentOutput {
        let scanned = scan(&self.document);
        tracing::debug!(
            document = %self.document.id,
            markers = scanned.targets.len(),
            "scanned document"
        );

        let results = self
            .engine
            .invoke_all(scanned.targets, &self.contexts, &self.cancel)
            .await;
        let merged = self.merger.merge(&self.document, results);

        let mut diagnostics = scanned.diagnostics;
        diagnostics.extend(merged.diagnostics);
        // Marker-scoped diagnostics in discovery order; document-level ones last.
        diagnostics.sort_by_key(|d| d.marker_ordinal().unwrap_or(usize::MAX));

        DocumentOutput {
            generated: Arc::new(merged.document),
            diagnostics,
            dependencies: merged.dependencies,
            status: CacheStatus::Generated,
        }
    }
}
