//! Generator resolution with process-wide caching.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, OnceLock},
};

use graft_ir::{GeneratorRef, Literal};
use parking_lot::RwLock;
use thiserror::Error;

use super::generator::{
    ConstructError, Generator, GeneratorFactory, GeneratorModule, LoadError, ModuleExport,
    ModuleLoader, Signature,
};

/// Why a generator reference could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("generator module `{module}` not found")]
    ModuleNotFound { module: String },

    #[error("failed to load generator module `{module}`: {message}")]
    ModuleLoad { module: String, message: String },

    #[error("generator type `{type_name}` not found in module `{module}`")]
    TypeNotFound { module: String, type_name: String },

    #[error("`{reference}` does not satisfy the generator contract: {reason}")]
    SignatureMismatch {
        reference: GeneratorRef,
        reason: String,
    },
}

/// A resolved generator: the factory plus the module that owns it.
pub struct GeneratorDescriptor {
    reference: GeneratorRef,
    factory: Arc<dyn GeneratorFactory>,
    // Held so the module outlives every descriptor handed out.
    _module: Arc<dyn GeneratorModule>,
}

impl GeneratorDescriptor {
    pub fn reference(&self) -> &GeneratorRef {
        &self.reference
    }

    pub fn signature(&self) -> &Signature {
        self.factory.signature()
    }

    /// Bind the marker's literal arguments and build an instance.
    pub fn construct(&self, args: &[Literal]) -> Result<Box<dyn Generator>, ConstructError> {
        let bound = self.factory.signature().bind(args)?;
        self.factory.construct(&bound)
    }
}

impl fmt::Debug for GeneratorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorDescriptor")
            .field("reference", &self.reference)
            .field("signature", self.signature())
            .finish()
    }
}

type Resolved<T> = Result<T, ResolveError>;

type ModuleSlot = Arc<OnceLock<Resolved<Arc<dyn GeneratorModule>>>>;

/// Resolves generator references to descriptors.
///
/// Both successful and failed resolutions are cached for the lifetime of the
/// registry, so a broken reference costs one module load at most. Loaded
/// modules are never released.
///
/// No map lock is held while a module loads. Concurrent first uses of one
/// module wait on that module's slot; lookups of anything else proceed.
pub struct GeneratorRegistry {
    loader: Arc<dyn ModuleLoader>,
    modules: RwLock<HashMap<String, ModuleSlot>>,
    descriptors: RwLock<HashMap<GeneratorRef, Resolved<Arc<GeneratorDescriptor>>>>,
}

impl GeneratorRegistry {
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            loader,
            modules: RwLock::new(HashMap::new()),
            descriptors: RwLock::new(HashMap::new()),
        }
    }

    /// The cached outcome for a reference, without loading anything.
    pub fn cached(&self, reference: &GeneratorRef) -> Option<Resolved<Arc<GeneratorDescriptor>>> {
        self.descriptors.read().get(reference).cloned()
    }

    /// Resolve a reference, loading its module on first use.
    ///
    /// May block on the module loader; async callers should go through
    /// `spawn_blocking` when [`cached`](Self::cached) misses.
    pub fn resolve(&self, reference: &GeneratorRef) -> Resolved<Arc<GeneratorDescriptor>> {
        if let Some(cached) = self.cached(reference) {
            return cached;
        }

        let resolved = self.load_descriptor(reference);
        // First insert wins, so every caller sees one descriptor per reference.
        self.descriptors
            .write()
            .entry(reference.clone())
            .or_insert_with(|| {
                match &resolved {
                    Ok(_) => tracing::debug!(generator = %reference, "resolved generator"),
                    Err(err) => tracing::debug!(generator = %reference, error = %err, "generator resolution failed"),
                }
                resolved
            })
            .clone()
    }

    fn load_descriptor(&self, reference: &GeneratorRef) -> Resolved<Arc<GeneratorDescriptor>> {
        let module = self.module(&reference.module)?;

        let export = module
            .lookup(&reference.type_name)
            .ok_or_else(|| ResolveError::TypeNotFound {
                module: reference.module.clone(),
                type_name: reference.type_name.clone(),
            })?;

        let factory = match export {
            ModuleExport::Generator(factory) => factory,
            ModuleExport::Type { kind } => {
                return Err(ResolveError::SignatureMismatch {
                    reference: reference.clone(),
                    reason: format!("`{}` is a {}, not a generator", reference.type_name, kind),
                });
            }
        };

        factory
            .signature()
            .check()
            .map_err(|reason| ResolveError::SignatureMismatch {
                reference: reference.clone(),
                reason,
            })?;

        Ok(Arc::new(GeneratorDescriptor {
            reference: reference.clone(),
            factory,
            _module: module,
        }))
    }

    fn module(&self, name: &str) -> Resolved<Arc<dyn GeneratorModule>> {
        let slot = self.module_slot(name);
        slot.get_or_init(|| {
            tracing::debug!(module = name, "loading generator module");
            self.loader.load(name).map_err(|err| match err {
                LoadError::NotFound => ResolveError::ModuleNotFound {
                    module: name.to_string(),
                },
                LoadError::Failed(message) => ResolveError::ModuleLoad {
                    module: name.to_string(),
                    message,
                },
            })
        })
        .clone()
    }

    fn module_slot(&self, name: &str) -> ModuleSlot {
        if let Some(slot) = self.modules.read().get(name) {
            return slot.clone();
        }
        self.modules
            .write()
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    /// Names of modules that loaded successfully so far.
    pub fn loaded_modules(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .modules
            .read()
            .iter()
            .filter(|(_, slot)| matches!(slot.get(), Some(Ok(_))))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Whether a resolution outcome (positive or negative) is cached.
    pub fn is_cached(&self, reference: &GeneratorRef) -> bool {
        self.cached(reference).is_some()
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("modules", &self.modules.read().len())
            .field("descriptors", &self.descriptors.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            mpsc,
        },
        thread,
        time::Duration,
    };

    use async_trait::async_trait;
    use graft_ir::{Declaration, LiteralKind};
    use parking_lot::Mutex;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::pipeline::{
        DiagnosticSink, FnFactory, StaticLoader, StaticModule, TransformationContext,
    };

    struct Noop;

    #[async_trait]
    impl Generator for Noop {
        async fn transform(
            &self,
            _ctx: &TransformationContext,
            _sink: &DiagnosticSink,
            _cancel: &CancellationToken,
        ) -> eyre::Result<Vec<Declaration>> {
            Ok(Vec::new())
        }
    }

    fn noop_factory(signature: Signature) -> impl GeneratorFactory {
        FnFactory::new(signature, |_| Ok(Box::new(Noop) as Box<dyn Generator>))
    }

    struct Counting {
        inner: StaticLoader,
        loads: AtomicUsize,
    }

    impl ModuleLoader for Counting {
        fn load(&self, module: &str) -> Result<Arc<dyn GeneratorModule>, LoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load(module)
        }
    }

    fn registry() -> (GeneratorRegistry, Arc<Counting>) {
        let module = StaticModule::new("m")
            .generator("Ok", noop_factory(Signature::new().required("a", LiteralKind::Str)))
            .generator(
                "Broken",
                noop_factory(
                    Signature::new()
                        .optional("a", "x")
                        .required("b", LiteralKind::Int),
                ),
            )
            .type_export("Plain", "struct");
        let loader = Arc::new(Counting {
            inner: StaticLoader::new().module(module),
            loads: AtomicUsize::new(0),
        });
        (GeneratorRegistry::new(loader.clone()), loader)
    }

    #[test]
    fn test_resolve_and_construct() {
        let (registry, _) = registry();
        let descriptor = registry.resolve(&GeneratorRef::new("m", "Ok")).unwrap();
        assert_eq!(descriptor.reference().type_name, "Ok");
        assert!(descriptor.construct(&[Literal::from("x")]).is_ok());
        assert!(matches!(
            descriptor.construct(&[]),
            Err(ConstructError::Arity { .. })
        ));
    }

    #[test]
    fn test_type_not_found_names_the_type() {
        let (registry, _) = registry();
        let err = registry.resolve(&GeneratorRef::new("m", "Missing")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "generator type `Missing` not found in module `m`"
        );
    }

    #[test]
    fn test_non_generator_export_is_signature_mismatch() {
        let (registry, _) = registry();
        let err = registry.resolve(&GeneratorRef::new("m", "Plain")).unwrap_err();
        assert!(matches!(err, ResolveError::SignatureMismatch { .. }));
        assert!(err.to_string().contains("is a struct, not a generator"));
    }

    #[test]
    fn test_malformed_signature_is_signature_mismatch() {
        let (registry, _) = registry();
        let err = registry.resolve(&GeneratorRef::new("m", "Broken")).unwrap_err();
        assert!(matches!(err, ResolveError::SignatureMismatch { .. }));
    }

    #[test]
    fn test_module_loaded_once() {
        let (registry, loader) = registry();
        registry.resolve(&GeneratorRef::new("m", "Ok")).unwrap();
        registry.resolve(&GeneratorRef::new("m", "Missing")).unwrap_err();
        registry.resolve(&GeneratorRef::new("m", "Ok")).unwrap();
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert_eq!(registry.loaded_modules(), vec!["m".to_string()]);
    }

    #[test]
    fn test_missing_module_is_cached() {
        let (registry, loader) = registry();
        let reference = GeneratorRef::new("absent", "G");
        for _ in 0..3 {
            let err = registry.resolve(&reference).unwrap_err();
            assert_eq!(
                err,
                ResolveError::ModuleNotFound {
                    module: "absent".into()
                }
            );
        }
        // A second type in the same missing module reuses the module failure.
        registry.resolve(&GeneratorRef::new("absent", "H")).unwrap_err();
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert!(registry.is_cached(&reference));
    }

    /// Holds the load of module `slow` until released.
    struct Gated {
        inner: StaticLoader,
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
        released: AtomicBool,
    }

    impl ModuleLoader for Gated {
        fn load(&self, module: &str) -> Result<Arc<dyn GeneratorModule>, LoadError> {
            if module == "slow" {
                let _ = self.entered.lock().send(());
                let released = self
                    .release
                    .lock()
                    .recv_timeout(Duration::from_secs(5))
                    .is_ok();
                self.released.store(released, Ordering::SeqCst);
            }
            self.inner.load(module)
        }
    }

    #[test]
    fn test_module_load_does_not_block_other_resolutions() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let loader = Arc::new(Gated {
            inner: StaticLoader::new()
                .module(StaticModule::new("fast").generator("T", noop_factory(Signature::new())))
                .module(StaticModule::new("slow").generator("G", noop_factory(Signature::new()))),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
            released: AtomicBool::new(false),
        });
        let registry = Arc::new(GeneratorRegistry::new(loader.clone()));
        registry.resolve(&GeneratorRef::new("fast", "T")).unwrap();

        let slow = thread::spawn({
            let registry = registry.clone();
            move || registry.resolve(&GeneratorRef::new("slow", "G")).is_ok()
        });
        entered_rx.recv().unwrap();

        // While `slow` is loading: a cached hit and a first lookup in a loaded module.
        assert!(registry.resolve(&GeneratorRef::new("fast", "T")).is_ok());
        assert!(matches!(
            registry.resolve(&GeneratorRef::new("fast", "Missing")),
            Err(ResolveError::TypeNotFound { .. })
        ));
        assert!(!registry.is_cached(&GeneratorRef::new("slow", "G")));
        release_tx.send(()).unwrap();

        assert!(slow.join().unwrap());
        assert!(loader.released.load(Ordering::SeqCst));
        assert_eq!(registry.loaded_modules(), vec!["fast".to_string(), "slow".to_string()]);
    }

    #[test]
    fn test_concurrent_first_use_loads_module_once() {
        let (registry, loader) = registry();
        let registry = Arc::new(registry);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || registry.resolve(&GeneratorRef::new("m", "Ok")).is_ok())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }
}
