//! Built-in generators shipped as the `graft.builtin` module.
//!
//! | Generator             | Arguments                         | Produces                              |
//! |-----------------------|-----------------------------------|---------------------------------------|
//! | `DuplicateWithSuffix` | `suffix`                          | a renamed copy of the target          |
//! | `Builder`             | `suffix = "Builder"`              | a builder struct and `Target::builder` |
//! | `Getters`             | `prefix = ""`                     | one accessor per field                |
//! | `Display`             | `format`                          | `impl fmt::Display`                   |
//! | `Extend`              | `from`, `suffix = "Ext"`          | the target merged with another struct |
//!
//! [`BuiltinLoader`] exposes the module to a [`Pipeline`](graft_codegen::Pipeline),
//! optionally restricted to an allow list.

mod builder;
mod display;
mod duplicate;
mod extend;
mod getters;
mod loader;
#[cfg(test)]
mod testing;

use graft_codegen::pipeline::{
    Arguments, ConstructError, FnFactory, Generator, Signature, StaticModule,
};

pub use builder::Builder;
pub use display::Display;
pub use duplicate::DuplicateWithSuffix;
pub use extend::Extend;
pub use getters::Getters;
pub use loader::BuiltinLoader;

/// Name of the built-in module.
pub const MODULE: &str = "graft.builtin";

/// A generator type exported by the built-in module.
pub trait Builtin: Generator + Sized + 'static {
    /// Exported type name.
    const NAME: &'static str;

    fn signature() -> Signature;

    fn from_args(args: &Arguments) -> Result<Self, ConstructError>;
}

fn export<B: Builtin>(module: StaticModule) -> StaticModule {
    module.generator(
        B::NAME,
        FnFactory::new(B::signature(), |args: &Arguments| {
            Ok(Box::new(B::from_args(args)?) as Box<dyn Generator>)
        }),
    )
}

/// Assemble the `graft.builtin` module.
pub fn builtin_module() -> StaticModule {
    let module = StaticModule::new(MODULE);
    let module = export::<DuplicateWithSuffix>(module);
    let module = export::<Builder>(module);
    let module = export::<Getters>(module);
    let module = export::<Display>(module);
    export::<Extend>(module)
}

/// Read a string argument bound by the signature.
fn str_arg(args: &Arguments, name: &str) -> Result<String, ConstructError> {
    args.str(name)
        .map(str::to_string)
        .ok_or_else(|| ConstructError::Rejected(format!("missing argument `{}`", name)))
}

/// Check that `suffix` yields an identifier when appended to a type name.
fn check_suffix(param: &str, suffix: &str) -> Result<(), ConstructError> {
    if suffix.is_empty() || !graft_core::is_identifier(&format!("X{}", suffix)) {
        return Err(ConstructError::Rejected(format!(
            "`{}` must be a non-empty identifier fragment, found {:?}",
            param, suffix
        )));
    }
    Ok(())
}
