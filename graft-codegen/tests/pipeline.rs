//! End-to-end behaviour of the generation pipeline: caching, ordering,
//! isolation and cancellation.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use eyre::bail;
use graft_codegen::pipeline::{
    CacheStatus, ConstructError, DiagnosticKind, DiagnosticSink, FnFactory, Generator,
    GeneratorModule, LoadError, ModuleLoader, Pipeline, PipelineConfig, RunError, Signature,
    SlotState, StaticLoader, StaticModule, TransformationContext,
};
use graft_ir::{
    DeclKind, Declaration, DocumentId, Fingerprint, GeneratorRef, LiteralKind, MarkerAnnotation,
    MarkerArg, Position, SourceDocument,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Copies the target under a suffixed name, optionally after a delay.
struct Suffix {
    suffix: String,
    delay_ms: u64,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Generator for Suffix {
    async fn transform(
        &self,
        ctx: &TransformationContext,
        _sink: &DiagnosticSink,
        _cancel: &CancellationToken,
    ) -> eyre::Result<Vec<Declaration>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        let mut copy = ctx.target().without_markers();
        copy.name.push_str(&self.suffix);
        Ok(vec![copy])
    }
}

/// Never finishes on its own.
struct Hangs;

#[async_trait]
impl Generator for Hangs {
    async fn transform(
        &self,
        _ctx: &TransformationContext,
        _sink: &DiagnosticSink,
        cancel: &CancellationToken,
    ) -> eyre::Result<Vec<Declaration>> {
        cancel.cancelled().await;
        bail!("interrupted")
    }
}

struct Panics;

#[async_trait]
impl Generator for Panics {
    async fn transform(
        &self,
        _ctx: &TransformationContext,
        sink: &DiagnosticSink,
        _cancel: &CancellationToken,
    ) -> eyre::Result<Vec<Declaration>> {
        sink.warning("partial progress");
        panic!("generator bug")
    }
}

struct CountingLoader {
    inner: StaticLoader,
    loads: Arc<AtomicUsize>,
}

impl ModuleLoader for CountingLoader {
    fn load(&self, module: &str) -> Result<Arc<dyn GeneratorModule>, LoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(module)
    }
}

struct Fixture {
    pipeline: Pipeline,
    calls: Arc<AtomicUsize>,
    loads: Arc<AtomicUsize>,
}

fn fixture() -> Fixture {
    let calls = Arc::new(AtomicUsize::new(0));
    let loads = Arc::new(AtomicUsize::new(0));

    let suffix_calls = calls.clone();
    let module = StaticModule::new("test")
        .generator(
            "Suffix",
            FnFactory::new(
                Signature::new()
                    .required("suffix", LiteralKind::Str)
                    .optional("delay_ms", 0_i64),
                move |args| {
                    Ok(Box::new(Suffix {
                        suffix: args.str("suffix").unwrap_or_default().to_string(),
                        delay_ms: args.int("delay_ms").unwrap_or_default() as u64,
                        calls: suffix_calls.clone(),
                    }) as Box<dyn Generator>)
                },
            ),
        )
        .generator(
            "Refuses",
            FnFactory::new(Signature::new(), |_| {
                Err(ConstructError::Rejected("refusing to build".into()))
            }),
        )
        .generator(
            "Hangs",
            FnFactory::new(Signature::new(), |_| Ok(Box::new(Hangs) as Box<dyn Generator>)),
        )
        .generator(
            "Panics",
            FnFactory::new(Signature::new(), |_| Ok(Box::new(Panics) as Box<dyn Generator>)),
        );

    let loader = CountingLoader {
        inner: StaticLoader::new().module(module),
        loads: loads.clone(),
    };
    let pipeline = Pipeline::with_config(Arc::new(loader), PipelineConfig::default().with_workers(4));

    Fixture {
        pipeline,
        calls,
        loads,
    }
}

fn marker(name: &str, args: Vec<MarkerArg>) -> MarkerAnnotation {
    MarkerAnnotation::new(GeneratorRef::new("test", name), args).at(Position::new(1, 1))
}

fn foo(markers: Vec<MarkerAnnotation>) -> Declaration {
    let mut decl = Declaration::new(DeclKind::Struct, "Foo", Position::new(2, 1))
        .with_member(Declaration::new(DeclKind::Field, "x", Position::new(3, 5)).with_type("i32"))
        .with_member(Declaration::new(DeclKind::Field, "name", Position::new(4, 5)).with_type("String"));
    decl.markers = markers;
    decl
}

fn doc(id: &str, fingerprint: u64, declarations: Vec<Declaration>) -> SourceDocument {
    SourceDocument::new(id, Fingerprint::new(fingerprint), declarations)
}

#[tokio::test]
async fn test_duplicate_with_suffix_scenario() {
    let fx = fixture();
    let output = fx
        .pipeline
        .run([doc("src/foo.rs", 1, vec![foo(vec![marker("Suffix", vec!["A".into()])])])])
        .await
        .unwrap();

    let out = output.get(&DocumentId::new("src/foo.rs")).unwrap();
    assert_eq!(out.status, CacheStatus::Generated);
    assert!(out.diagnostics.is_empty());
    assert_eq!(out.generated.id().as_str(), "src/foo.g.rs");

    let generated = out.generated.declaration("FooA").unwrap();
    let mut expected = foo(Vec::new());
    expected.name = "FooA".to_string();
    assert_eq!(generated, &expected);
}

#[tokio::test]
async fn test_second_run_is_a_byte_identical_cache_hit() {
    let fx = fixture();
    let source = doc("src/foo.rs", 1, vec![foo(vec![marker("Suffix", vec!["A".into()])])]);
    let id = source.id.clone();
    let source = Arc::new(source);

    let first = fx.pipeline.run([source.clone()]).await.unwrap();
    let second = fx.pipeline.run([source.clone()]).await.unwrap();

    let (first, second) = (first.get(&id).unwrap(), second.get(&id).unwrap());
    assert_eq!(first.status, CacheStatus::Generated);
    assert_eq!(second.status, CacheStatus::Hit);
    assert_eq!(first.generated.text(), second.generated.text());
    assert_eq!(first.diagnostics, second.diagnostics);
    assert_eq!(fx.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cache_path_matches_direct_path() {
    let source = Arc::new(doc(
        "src/foo.rs",
        1,
        vec![foo(vec![
            marker("Suffix", vec!["A".into()]),
            marker("Refuses", vec![]),
        ])],
    ));
    let id = source.id.clone();

    let direct = fixture().pipeline.run([source.clone()]).await.unwrap();

    let cached = fixture();
    cached.pipeline.run([source.clone()]).await.unwrap();
    let via_cache = cached.pipeline.run([source.clone()]).await.unwrap();

    let (direct, via_cache) = (direct.get(&id).unwrap(), via_cache.get(&id).unwrap());
    assert_eq!(via_cache.status, CacheStatus::Hit);
    assert_eq!(direct.generated, via_cache.generated);
    assert_eq!(direct.diagnostics, via_cache.diagnostics);
}

#[tokio::test(start_paused = true)]
async fn test_merge_order_ignores_completion_order() {
    let fx = fixture();
    let first = Declaration::new(DeclKind::Struct, "Slow", Position::new(1, 1))
        .with_marker(marker("Suffix", vec!["First".into(), MarkerArg::from(50_i64)]));
    let second = Declaration::new(DeclKind::Struct, "Fast", Position::new(5, 1))
        .with_marker(marker("Suffix", vec!["Second".into()]));

    let output = fx
        .pipeline
        .run([doc("src/order.rs", 1, vec![first, second])])
        .await
        .unwrap();

    let out = output.get(&DocumentId::new("src/order.rs")).unwrap();
    let names: Vec<&str> = out
        .generated
        .declarations()
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(names, vec!["SlowFirst", "FastSecond"]);
    assert!(
        out.generated.text().find("SlowFirst").unwrap()
            < out.generated.text().find("FastSecond").unwrap()
    );
}

#[tokio::test]
async fn test_construction_failure_is_isolated() {
    let fx = fixture();
    let bar = Declaration::new(DeclKind::Struct, "Bar", Position::new(9, 1))
        .with_marker(marker("Suffix", vec!["C".into()]));
    let output = fx
        .pipeline
        .run([doc(
            "src/foo.rs",
            1,
            vec![
                foo(vec![
                    marker("Refuses", vec![]),
                    marker("Suffix", vec!["B".into()]),
                ]),
                bar,
            ],
        )])
        .await
        .unwrap();

    let out = output.get(&DocumentId::new("src/foo.rs")).unwrap();
    assert!(out.generated.declaration("FooB").is_some());
    assert!(out.generated.declaration("BarC").is_some());

    let errors: Vec<_> = out
        .diagnostics
        .iter()
        .filter(|d| d.severity.is_error())
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, DiagnosticKind::Construction);
    assert_eq!(errors[0].marker_ordinal(), Some(0));
    assert!(errors[0].message.contains("refusing to build"));
}

#[tokio::test]
async fn test_missing_generator_type_is_one_resolution_error() {
    let fx = fixture();
    let output = fx
        .pipeline
        .run([doc("src/foo.rs", 1, vec![foo(vec![marker("Nope", vec![])])])])
        .await
        .unwrap();

    let out = output.get(&DocumentId::new("src/foo.rs")).unwrap();
    assert!(out.generated.is_empty());
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].kind, DiagnosticKind::Resolution);
    assert!(out.diagnostics[0].message.contains("`Nope`"));
}

#[tokio::test]
async fn test_failed_resolution_loads_module_once() {
    let fx = fixture();
    let missing = |i: u32| {
        Declaration::new(DeclKind::Struct, format!("T{}", i), Position::new(i, 1)).with_marker(
            MarkerAnnotation::new(GeneratorRef::new("absent", "Gen"), vec![]),
        )
    };
    let output = fx
        .pipeline
        .run([
            doc("src/a.rs", 1, vec![missing(1), missing(2)]),
            doc("src/b.rs", 1, vec![missing(3)]),
        ])
        .await
        .unwrap();

    assert_eq!(output.diagnostics().count(), 3);
    assert!(
        output
            .diagnostics()
            .all(|d| d.kind == DiagnosticKind::Resolution)
    );
    assert_eq!(fx.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fingerprint_change_forces_regeneration() {
    let fx = fixture();
    let decls = vec![foo(vec![marker("Suffix", vec!["A".into()])])];
    let id = DocumentId::new("src/foo.rs");

    fx.pipeline.run([doc("src/foo.rs", 1, decls.clone())]).await.unwrap();
    assert_eq!(
        fx.pipeline.notify_changed(&id, Fingerprint::new(2)),
        SlotState::Stale(Fingerprint::new(1))
    );

    // Same declarations, new fingerprint: nothing is reused.
    let output = fx.pipeline.run([doc("src/foo.rs", 2, decls)]).await.unwrap();
    assert_eq!(output.get(&id).unwrap().status, CacheStatus::Generated);
    assert_eq!(fx.calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        fx.pipeline.cache().state(&id),
        SlotState::Fresh(Fingerprint::new(2))
    );
}

#[tokio::test]
async fn test_unreported_edit_still_misses() {
    let fx = fixture();
    let decls = vec![foo(vec![marker("Suffix", vec!["A".into()])])];

    fx.pipeline.run([doc("src/foo.rs", 1, decls.clone())]).await.unwrap();
    let output = fx.pipeline.run([doc("src/foo.rs", 7, decls)]).await.unwrap();

    assert_eq!(output.count(CacheStatus::Generated), 1);
    assert_eq!(fx.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_leaves_cache_untouched() {
    let fx = fixture();
    let id = DocumentId::new("src/foo.rs");
    fx.pipeline
        .run([doc("src/foo.rs", 1, vec![foo(vec![marker("Suffix", vec!["A".into()])])])])
        .await
        .unwrap();
    let before = fx.pipeline.cache().snapshot();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.cancel();
    });

    let result = fx
        .pipeline
        .run_with(
            [
                doc("src/foo.rs", 2, vec![foo(vec![marker("Hangs", vec![])])]),
                doc("src/bar.rs", 1, vec![foo(vec![marker("Suffix", vec!["B".into()])])]),
            ],
            &cancel,
            None,
        )
        .await;

    assert_eq!(result.unwrap_err(), RunError::Cancelled);
    assert_eq!(fx.pipeline.cache().snapshot(), before);
    assert_eq!(
        fx.pipeline.cache().state(&id),
        SlotState::Fresh(Fingerprint::new(1))
    );
}

#[tokio::test(start_paused = true)]
async fn test_deadline_is_treated_as_cancellation() {
    let fx = fixture();
    let deadline = Instant::now() + Duration::from_millis(100);

    let result = fx
        .pipeline
        .run_with(
            [doc("src/foo.rs", 1, vec![foo(vec![marker("Hangs", vec![])])])],
            &CancellationToken::new(),
            Some(deadline),
        )
        .await;

    assert_eq!(result.unwrap_err(), RunError::DeadlineExceeded);
    assert!(fx.pipeline.cache().is_empty());
}

#[tokio::test]
async fn test_already_cancelled_run_does_nothing() {
    let fx = fixture();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = fx
        .pipeline
        .run_with(
            [doc("src/foo.rs", 1, vec![foo(vec![marker("Suffix", vec!["A".into()])])])],
            &cancel,
            None,
        )
        .await;

    assert_eq!(result.unwrap_err(), RunError::Cancelled);
    assert!(fx.pipeline.cache().is_empty());
}

#[tokio::test]
async fn test_panicking_generator_keeps_partial_diagnostics() {
    let fx = fixture();
    let output = fx
        .pipeline
        .run([doc(
            "src/foo.rs",
            1,
            vec![foo(vec![
                marker("Panics", vec![]),
                marker("Suffix", vec!["A".into()]),
            ])],
        )])
        .await
        .unwrap();

    let out = output.get(&DocumentId::new("src/foo.rs")).unwrap();
    assert!(out.generated.declaration("FooA").is_some());

    let kinds: Vec<DiagnosticKind> = out.diagnostics.iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![DiagnosticKind::Generator, DiagnosticKind::Transformation]
    );
    assert!(out.diagnostics.iter().all(|d| d.marker_ordinal() == Some(0)));
}

#[tokio::test]
async fn test_non_literal_argument_is_a_discovery_error() {
    let fx = fixture();
    let output = fx
        .pipeline
        .run([doc(
            "src/foo.rs",
            1,
            vec![foo(vec![
                marker("Suffix", vec![MarkerArg::expr("SUFFIX")]),
                marker("Suffix", vec!["A".into()]),
            ])],
        )])
        .await
        .unwrap();

    let out = output.get(&DocumentId::new("src/foo.rs")).unwrap();
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].kind, DiagnosticKind::Discovery);
    assert_eq!(out.generated.declarations().len(), 1);
    assert_eq!(fx.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalidate_evicts_generated_twin() {
    let fx = fixture();
    let id = DocumentId::new("src/foo.rs");
    fx.pipeline
        .run([doc("src/foo.rs", 1, vec![foo(vec![marker("Suffix", vec!["A".into()])])])])
        .await
        .unwrap();

    let evicted = fx.pipeline.invalidate(&id).unwrap();
    assert_eq!(evicted.id().as_str(), "src/foo.g.rs");
    assert_eq!(fx.pipeline.cache().state(&id), SlotState::Unseen);
    assert!(fx.pipeline.invalidate(&id).is_none());
}

#[tokio::test]
async fn test_documents_are_independent() {
    let fx = fixture();
    let output = fx
        .pipeline
        .run([
            doc("src/a.rs", 1, vec![foo(vec![marker("Nope", vec![])])]),
            doc("src/b.rs", 1, vec![foo(vec![marker("Suffix", vec!["B".into()])])]),
            doc("src/c.rs", 1, vec![Declaration::new(DeclKind::Struct, "Plain", Position::new(1, 1))]),
        ])
        .await
        .unwrap();

    let ids: Vec<&str> = output.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["src/a.rs", "src/b.rs", "src/c.rs"]);
    assert!(output.get(&DocumentId::new("src/a.rs")).unwrap().has_errors());
    assert!(!output.get(&DocumentId::new("src/b.rs")).unwrap().has_errors());
    assert!(
        output
            .get(&DocumentId::new("src/c.rs"))
            .unwrap()
            .generated
            .is_empty()
    );
}
