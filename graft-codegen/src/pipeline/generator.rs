//! The generator plugin contract.
//!
//! A generator is exported by a module, constructed from a marker's literal
//! arguments and asked to transform its target declaration:
//!
//! ```text
//! ModuleLoader::load(module) → GeneratorModule::lookup(type) → GeneratorFactory
//!     → construct(args) → Generator::transform(context, sink, cancel)
//! ```
//!
//! This is the pipeline's only extension point.

use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use eyre::Result;
use graft_ir::{Declaration, Literal, LiteralKind};
use indexmap::IndexMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::{DiagnosticSink, TransformationContext};

/// A constructed generator instance.
///
/// # Example
///
/// ```ignore
/// struct Rename { suffix: String }
///
/// #[async_trait]
/// impl Generator for Rename {
///     async fn transform(
///         &self,
///         ctx: &TransformationContext,
///         _sink: &DiagnosticSink,
///         _cancel: &CancellationToken,
///     ) -> Result<Vec<Declaration>> {
///         let mut copy = ctx.target().without_markers();
///         copy.name.push_str(&self.suffix);
///         Ok(vec![copy])
///     }
/// }
/// ```
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce declarations for the context's target.
    ///
    /// Non-fatal problems go to `sink`. Returning an error discards the
    /// declarations for this marker only. Long-running generators should
    /// observe `cancel`.
    async fn transform(
        &self,
        ctx: &TransformationContext,
        sink: &DiagnosticSink,
        cancel: &CancellationToken,
    ) -> Result<Vec<Declaration>>;
}

/// Errors raised while turning marker arguments into a generator instance.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructError {
    #[error("expected {} argument(s), found {found}", arity(.min, .max))]
    Arity { min: usize, max: usize, found: usize },

    #[error("argument `{param}` expects a {expected} literal, found {found}")]
    TypeMismatch {
        param: String,
        expected: LiteralKind,
        found: LiteralKind,
    },

    #[error("{0}")]
    Rejected(String),
}

fn arity(min: &usize, max: &usize) -> String {
    if min == max {
        min.to_string()
    } else {
        format!("{} to {}", min, max)
    }
}

/// A constructor parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: LiteralKind,
    /// Default value; a parameter with a default is optional.
    pub default: Option<Literal>,
}

/// The argument shape a generator's constructor accepts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<ParamSpec>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: impl Into<String>, kind: LiteralKind) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            kind,
            default: None,
        });
        self
    }

    pub fn optional(mut self, name: impl Into<String>, default: impl Into<Literal>) -> Self {
        let default = default.into();
        self.params.push(ParamSpec {
            name: name.into(),
            kind: default.kind(),
            default: Some(default),
        });
        self
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    fn min_args(&self) -> usize {
        self.params.iter().filter(|p| p.default.is_none()).count()
    }

    /// Check the signature is well-formed: unique names and no required
    /// parameter after an optional one.
    pub fn check(&self) -> Result<(), String> {
        let mut seen_optional = false;
        for (i, param) in self.params.iter().enumerate() {
            if self.params[..i].iter().any(|p| p.name == param.name) {
                return Err(format!("parameter `{}` is declared twice", param.name));
            }
            match param.default {
                Some(_) => seen_optional = true,
                None if seen_optional => {
                    return Err(format!(
                        "required parameter `{}` follows an optional parameter",
                        param.name
                    ));
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Bind positional literal arguments to parameters, filling defaults.
    pub fn bind(&self, args: &[Literal]) -> Result<Arguments, ConstructError> {
        let (min, max) = (self.min_args(), self.params.len());
        if args.len() < min || args.len() > max {
            return Err(ConstructError::Arity {
                min,
                max,
                found: args.len(),
            });
        }

        let mut values = Vec::with_capacity(max);
        for (i, param) in self.params.iter().enumerate() {
            let value = match (args.get(i), &param.default) {
                (Some(arg), _) => coerce(param, arg)?,
                (None, Some(default)) => default.clone(),
                // Required after optional, which `check` rejects.
                (None, None) => {
                    return Err(ConstructError::Arity {
                        min: i + 1,
                        max,
                        found: args.len(),
                    });
                }
            };
            values.push((param.name.clone(), value));
        }
        Ok(Arguments { values })
    }
}

fn coerce(param: &ParamSpec, arg: &Literal) -> Result<Literal, ConstructError> {
    match (param.kind, arg) {
        (kind, lit) if lit.kind() == kind => Ok(lit.clone()),
        (LiteralKind::Float, Literal::Int(i)) => Ok(Literal::Float(*i as f64)),
        (expected, lit) => Err(ConstructError::TypeMismatch {
            param: param.name.clone(),
            expected,
            found: lit.kind(),
        }),
    }
}

/// Constructor arguments bound to parameter names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Vec<(String, Literal)>,
}

impl Arguments {
    pub fn get(&self, name: &str) -> Option<&Literal> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Literal::as_str)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Literal::as_int)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Literal::as_bool)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Creates generator instances for one exported generator type.
pub trait GeneratorFactory: Send + Sync {
    fn signature(&self) -> &Signature;

    /// Build an instance from already-bound arguments.
    fn construct(&self, args: &Arguments) -> Result<Box<dyn Generator>, ConstructError>;
}

/// A factory backed by a closure.
pub struct FnFactory<F> {
    signature: Signature,
    construct: F,
}

impl<F> FnFactory<F>
where
    F: Fn(&Arguments) -> Result<Box<dyn Generator>, ConstructError> + Send + Sync,
{
    pub fn new(signature: Signature, construct: F) -> Self {
        Self {
            signature,
            construct,
        }
    }
}

impl<F> GeneratorFactory for FnFactory<F>
where
    F: Fn(&Arguments) -> Result<Box<dyn Generator>, ConstructError> + Send + Sync,
{
    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn construct(&self, args: &Arguments) -> Result<Box<dyn Generator>, ConstructError> {
        (self.construct)(args)
    }
}

/// Something a module exports under a type name.
#[derive(Clone)]
pub enum ModuleExport {
    Generator(Arc<dyn GeneratorFactory>),
    /// A type that exists but does not implement the generator contract.
    Type { kind: String },
}

impl fmt::Debug for ModuleExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleExport::Generator(factory) => f
                .debug_tuple("Generator")
                .field(factory.signature())
                .finish(),
            ModuleExport::Type { kind } => f.debug_struct("Type").field("kind", kind).finish(),
        }
    }
}

/// A loaded, introspectable module.
pub trait GeneratorModule: Send + Sync {
    fn name(&self) -> &str;

    /// Enumerate exported type names.
    fn exports(&self) -> Vec<String>;

    fn lookup(&self, type_name: &str) -> Option<ModuleExport>;
}

/// Failure to load a module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("module not found")]
    NotFound,
    #[error("{0}")]
    Failed(String),
}

/// Host collaborator that turns a module reference into a loaded module.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, module: &str) -> Result<Arc<dyn GeneratorModule>, LoadError>;
}

/// An in-process module assembled from factories.
#[derive(Default)]
pub struct StaticModule {
    name: String,
    exports: IndexMap<String, ModuleExport>,
}

impl StaticModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exports: IndexMap::new(),
        }
    }

    /// Export a generator factory.
    pub fn generator(
        mut self,
        type_name: impl Into<String>,
        factory: impl GeneratorFactory + 'static,
    ) -> Self {
        self.exports
            .insert(type_name.into(), ModuleExport::Generator(Arc::new(factory)));
        self
    }

    /// Export a non-generator type.
    pub fn type_export(mut self, type_name: impl Into<String>, kind: impl Into<String>) -> Self {
        self.exports
            .insert(type_name.into(), ModuleExport::Type { kind: kind.into() });
        self
    }
}

impl GeneratorModule for StaticModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn exports(&self) -> Vec<String> {
        self.exports.keys().cloned().collect()
    }

    fn lookup(&self, type_name: &str) -> Option<ModuleExport> {
        self.exports.get(type_name).cloned()
    }
}

/// A loader over a fixed set of in-process modules.
#[derive(Default)]
pub struct StaticLoader {
    modules: HashMap<String, Arc<dyn GeneratorModule>>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(mut self, module: impl GeneratorModule + 'static) -> Self {
        self.modules
            .insert(module.name().to_string(), Arc::new(module));
        self
    }
}

impl ModuleLoader for StaticLoader {
    fn load(&self, module: &str) -> Result<Arc<dyn GeneratorModule>, LoadError> {
        self.modules.get(module).cloned().ok_or(LoadError::NotFound)
    }
}
