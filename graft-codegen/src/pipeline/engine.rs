//! Generator invocation: resolve → construct → transform, one isolated unit
//! of work per marker.

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use graft_ir::{Declaration, GeneratorRef, Position};
use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;

use super::{
    ContextBuilder, Dependency, Diagnostic, DiagnosticKind, DiagnosticSink, GeneratorDescriptor,
    GeneratorRegistry, MarkerTarget, ResolveError, Severity, TransformationContext,
};

/// Output of one marker invocation.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Discovery ordinal of the originating marker.
    pub ordinal: usize,
    pub generator: GeneratorRef,
    pub position: Position,
    pub declarations: Vec<Declaration>,
    pub diagnostics: Vec<Diagnostic>,
    /// Compilation reads the generator made.
    pub dependencies: Vec<Dependency>,
}

impl GenerationResult {
    fn new(target: &MarkerTarget) -> Self {
        Self {
            ordinal: target.ordinal,
            generator: target.marker.generator.clone(),
            position: target.marker.position,
            declarations: Vec::new(),
            diagnostics: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    fn failed(target: &MarkerTarget, kind: DiagnosticKind, message: String) -> Self {
        let mut result = Self::new(target);
        result.diagnostics.push(scoped(target, Diagnostic::error(kind, message)));
        result
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity.is_error())
    }
}

fn scoped(target: &MarkerTarget, diagnostic: Diagnostic) -> Diagnostic {
    diagnostic
        .at(target.document.clone(), Some(target.marker.position))
        .for_marker(target.ordinal, target.marker.generator.clone())
}

/// Drives generator execution on a bounded pool of tokio tasks.
///
/// Clones share the registry and the worker permits, so one engine bounds
/// the concurrency of every document in a run.
#[derive(Debug, Clone)]
pub struct InvocationEngine {
    registry: Arc<GeneratorRegistry>,
    permits: Arc<Semaphore>,
}

impl InvocationEngine {
    pub fn new(registry: Arc<GeneratorRegistry>, workers: usize) -> Self {
        Self {
            registry,
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub fn registry(&self) -> &Arc<GeneratorRegistry> {
        &self.registry
    }

    /// Run one marker. Never fails: every problem becomes a diagnostic on
    /// the returned result.
    pub async fn invoke(&self, target: &MarkerTarget, ctx: TransformationContext) -> GenerationResult {
        let reference = &target.marker.generator;

        let descriptor = match self.resolve(reference).await {
            Ok(descriptor) => descriptor,
            Err(err) => {
                return GenerationResult::failed(
                    target,
                    DiagnosticKind::Resolution,
                    format!("cannot resolve generator `{}`: {}", reference, err),
                );
            }
        };

        let constructed = std::panic::catch_unwind(AssertUnwindSafe(|| descriptor.construct(&target.args)));
        let generator = match constructed {
            Ok(Ok(generator)) => generator,
            Ok(Err(err)) => {
                return GenerationResult::failed(
                    target,
                    DiagnosticKind::Construction,
                    format!("cannot construct `{}`: {}", reference, err),
                );
            }
            Err(panic) => {
                return GenerationResult::failed(
                    target,
                    DiagnosticKind::Construction,
                    format!("constructor of `{}` panicked: {}", reference, panic_message(&*panic)),
                );
            }
        };

        let sink = DiagnosticSink::new(
            target.document.clone(),
            target.marker.position,
            target.ordinal,
            reference.clone(),
        );
        let cancel = ctx.cancellation().clone();
        let outcome = AssertUnwindSafe(generator.transform(&ctx, &sink, &cancel))
            .catch_unwind()
            .await;

        let mut result = GenerationResult::new(target);
        result.dependencies = ctx.dependencies();
        match outcome {
            Ok(Ok(declarations)) => {
                result.declarations = declarations;
                result.diagnostics = sink.take();
            }
            Ok(Err(err)) => {
                let message = if cancel.is_cancelled() {
                    format!("`{}` was cancelled: {:#}", reference, err)
                } else {
                    format!("`{}` failed: {:#}", reference, err)
                };
                sink.emit(Severity::Error, DiagnosticKind::Transformation, message);
                result.diagnostics = sink.take();
            }
            Err(panic) => {
                sink.emit(
                    Severity::Error,
                    DiagnosticKind::Transformation,
                    format!("`{}` panicked: {}", reference, panic_message(&*panic)),
                );
                result.diagnostics = sink.take();
            }
        }

        tracing::trace!(
            document = %target.document,
            ordinal = target.ordinal,
            generator = %reference,
            declarations = result.declarations.len(),
            diagnostics = result.diagnostics.len(),
            "marker invoked"
        );
        result
    }

    /// Resolve off the async workers unless the outcome is already cached;
    /// module loaders may block.
    async fn resolve(&self, reference: &GeneratorRef) -> Result<Arc<GeneratorDescriptor>, ResolveError> {
        if let Some(cached) = self.registry.cached(reference) {
            return cached;
        }
        let registry = self.registry.clone();
        let owned = reference.clone();
        match tokio::task::spawn_blocking(move || registry.resolve(&owned)).await {
            Ok(resolved) => resolved,
            Err(err) => Err(ResolveError::ModuleLoad {
                module: reference.module.clone(),
                message: if err.is_panic() {
                    format!("loader panicked: {}", panic_message(&*err.into_panic()))
                } else {
                    err.to_string()
                },
            }),
        }
    }

    /// Invoke every target of one document concurrently and wait for all of
    /// them. Results come back in completion order.
    pub async fn invoke_all(
        &self,
        targets: Vec<MarkerTarget>,
        contexts: &ContextBuilder,
        cancel: &CancellationToken,
    ) -> Vec<GenerationResult> {
        let mut units = JoinSet::new();
        for target in targets {
            let engine = self.clone();
            let ctx = contexts.build(&target, cancel.clone());
            units.spawn(async move { engine.run_unit(target, ctx).await });
        }

        let mut results = Vec::with_capacity(units.len());
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                // Units catch their own panics, so this is an abort.
                Err(err) => tracing::debug!(error = %err, "generation unit did not complete"),
            }
        }
        results
    }

    async fn run_unit(self, target: MarkerTarget, ctx: TransformationContext) -> GenerationResult {
        let Ok(_permit) = self.permits.clone().acquire_owned().await else {
            return GenerationResult::failed(
                &target,
                DiagnosticKind::Internal,
                "worker pool is closed".to_string(),
            );
        };

        match AssertUnwindSafe(self.invoke(&target, ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => GenerationResult::failed(
                &target,
                DiagnosticKind::Internal,
                format!(
                    "generation of `{}` panicked: {}",
                    target.marker.generator,
                    panic_message(&*panic)
                ),
            ),
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use eyre::bail;
    use graft_ir::{DeclKind, Fingerprint, LiteralKind, MarkerAnnotation, SourceDocument};

    use super::*;
    use crate::pipeline::{
        scan, Compilation, ConstructError, FnFactory, Generator, GeneratorModule, LoadError,
        ModuleLoader, Signature, StaticLoader, StaticModule,
    };

    struct Rename(String);

    #[async_trait]
    impl Generator for Rename {
        async fn transform(
            &self,
            ctx: &TransformationContext,
            sink: &DiagnosticSink,
            _cancel: &CancellationToken,
        ) -> eyre::Result<Vec<Declaration>> {
            sink.info("renaming");
            let mut copy = ctx.target().without_markers();
            copy.name.push_str(&self.0);
            Ok(vec![copy])
        }
    }

    struct Fails;

    #[async_trait]
    impl Generator for Fails {
        async fn transform(
            &self,
            _ctx: &TransformationContext,
            sink: &DiagnosticSink,
            _cancel: &CancellationToken,
        ) -> eyre::Result<Vec<Declaration>> {
            sink.warning("about to fail");
            bail!("boom")
        }
    }

    struct Panics;

    #[async_trait]
    impl Generator for Panics {
        async fn transform(
            &self,
            _ctx: &TransformationContext,
            _sink: &DiagnosticSink,
            _cancel: &CancellationToken,
        ) -> eyre::Result<Vec<Declaration>> {
            panic!("generator exploded")
        }
    }

    fn engine() -> InvocationEngine {
        let module = StaticModule::new("m")
            .generator(
                "Rename",
                FnFactory::new(Signature::new().required("suffix", LiteralKind::Str), |args| {
                    let suffix = args.str("suffix").unwrap_or_default().to_string();
                    Ok(Box::new(Rename(suffix)) as Box<dyn Generator>)
                }),
            )
            .generator(
                "Refuses",
                FnFactory::new(Signature::new(), |_| {
                    Err(ConstructError::Rejected("not today".into()))
                }),
            )
            .generator(
                "Fails",
                FnFactory::new(Signature::new(), |_| Ok(Box::new(Fails) as Box<dyn Generator>)),
            )
            .generator(
                "Panics",
                FnFactory::new(Signature::new(), |_| Ok(Box::new(Panics) as Box<dyn Generator>)),
            );
        let registry = GeneratorRegistry::new(Arc::new(StaticLoader::new().module(module)));
        InvocationEngine::new(Arc::new(registry), 2)
    }

    async fn run(markers: Vec<MarkerAnnotation>) -> Vec<GenerationResult> {
        let mut decl = Declaration::new(DeclKind::Struct, "Foo", Position::new(1, 1));
        decl.markers = markers;
        let doc = Arc::new(SourceDocument::new("a.rs", Fingerprint::new(1), vec![decl]));
        let contexts = ContextBuilder::new(Arc::new(Compilation::new([doc.clone()])));

        let mut results = engine()
            .invoke_all(scan(&doc).targets, &contexts, &CancellationToken::new())
            .await;
        results.sort_by_key(|r| r.ordinal);
        results
    }

    fn marker(name: &str, args: &[&str]) -> MarkerAnnotation {
        MarkerAnnotation::new(
            GeneratorRef::new("m", name),
            args.iter().map(|a| (*a).into()).collect(),
        )
    }

    #[tokio::test]
    async fn test_successful_invocation_keeps_sink_diagnostics() {
        let results = run(vec![marker("Rename", &["A"])]).await;
        assert_eq!(results[0].declarations[0].name, "FooA");
        assert_eq!(results[0].diagnostics.len(), 1);
        assert_eq!(results[0].diagnostics[0].severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_each_stage_fails_in_isolation() {
        let results = run(vec![
            marker("Missing", &[]),
            marker("Rename", &[]),
            marker("Refuses", &[]),
            marker("Fails", &[]),
            marker("Panics", &[]),
            marker("Rename", &["B"]),
        ])
        .await;

        let kinds: Vec<Vec<DiagnosticKind>> = results
            .iter()
            .map(|r| r.diagnostics.iter().map(|d| d.kind).collect())
            .collect();
        assert_eq!(
            kinds,
            vec![
                vec![DiagnosticKind::Resolution],
                vec![DiagnosticKind::Construction],
                vec![DiagnosticKind::Construction],
                vec![DiagnosticKind::Generator, DiagnosticKind::Transformation],
                vec![DiagnosticKind::Transformation],
                vec![DiagnosticKind::Generator],
            ]
        );
        assert!(results[..5].iter().all(|r| r.declarations.is_empty()));
        assert_eq!(results[5].declarations[0].name, "FooB");
        assert!(results[3].diagnostics[1].message.contains("boom"));
        assert!(results[4].diagnostics[0].message.contains("generator exploded"));
    }

    struct PanickingLoader;

    impl ModuleLoader for PanickingLoader {
        fn load(&self, _module: &str) -> Result<Arc<dyn GeneratorModule>, LoadError> {
            panic!("loader exploded")
        }
    }

    #[tokio::test]
    async fn test_loader_panic_is_a_resolution_error() {
        let registry = GeneratorRegistry::new(Arc::new(PanickingLoader));
        let engine = InvocationEngine::new(Arc::new(registry), 1);

        let decl = Declaration::new(DeclKind::Struct, "Foo", Position::new(1, 1))
            .with_marker(marker("Rename", &["A"]));
        let doc = Arc::new(SourceDocument::new("a.rs", Fingerprint::new(1), vec![decl]));
        let contexts = ContextBuilder::new(Arc::new(Compilation::new([doc.clone()])));
        let results = engine
            .invoke_all(scan(&doc).targets, &contexts, &CancellationToken::new())
            .await;

        assert_eq!(results[0].diagnostics[0].kind, DiagnosticKind::Resolution);
        assert!(results[0].diagnostics[0].message.contains("loader exploded"));
    }
}
