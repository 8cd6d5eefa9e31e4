//! `Builder`: a builder struct for the target.
//!
//! ```text
//! pub struct FooBuilder { x: Option<i32>, .. }
//! impl FooBuilder { new, one setter per field, build }
//! impl Foo { builder }
//! ```

use async_trait::async_trait;
use eyre::{Result, bail};
use graft_codegen::pipeline::{
    Arguments, ConstructError, DiagnosticSink, Generator, Signature, TransformationContext,
};
use graft_ir::{DeclKind, Declaration, Param, Visibility};
use tokio_util::sync::CancellationToken;

use crate::{Builtin, check_suffix, str_arg};

/// Generates `Name + suffix`, a builder with one optional slot per field.
#[derive(Debug, Clone)]
pub struct Builder {
    suffix: String,
}

impl Builder {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

impl Builtin for Builder {
    const NAME: &'static str = "Builder";

    fn signature() -> Signature {
        Signature::new().optional("suffix", "Builder")
    }

    fn from_args(args: &Arguments) -> Result<Self, ConstructError> {
        let suffix = str_arg(args, "suffix")?;
        check_suffix("suffix", &suffix)?;
        Ok(Self::new(suffix))
    }
}

#[async_trait]
impl Generator for Builder {
    async fn transform(
        &self,
        ctx: &TransformationContext,
        sink: &DiagnosticSink,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Declaration>> {
        let target = ctx.target();
        if target.kind != DeclKind::Struct {
            bail!("a builder needs a struct, `{}` is a {}", target.name, target.kind);
        }

        let mut fields = Vec::new();
        for field in target.members_of(DeclKind::Field) {
            match &field.ty {
                Some(ty) => fields.push((field.name.as_str(), ty.as_str())),
                None => sink.warning(format!(
                    "field `{}` of `{}` has no type and is left out of the builder",
                    field.name, target.name
                )),
            }
        }

        let name = format!("{}{}", target.name, self.suffix);
        let at = target.position;
        let method = |n: &str| {
            Declaration::new(DeclKind::Method, n, at).with_visibility(target.visibility)
        };

        let mut builder = Declaration::new(DeclKind::Struct, &name, at)
            .with_visibility(target.visibility)
            .with_doc(format!("Builder for [`{}`].", target.name));

        for (field, ty) in &fields {
            builder = builder.with_member(
                Declaration::new(DeclKind::Field, *field, at)
                    .with_visibility(Visibility::Private)
                    .with_type(format!("Option<{}>", ty)),
            );
        }

        let empty: Vec<String> = fields.iter().map(|(f, _)| format!("    {}: None,", f)).collect();
        builder = builder.with_member(
            method("new")
                .with_type("Self")
                .with_body(if empty.is_empty() {
                    "Self {}".to_string()
                } else {
                    format!("Self {{\n{}\n}}", empty.join("\n"))
                }),
        );

        for (field, ty) in &fields {
            builder = builder.with_member(
                method(*field)
                    .with_param(Param::new("self", "mut self"))
                    .with_param(Param::new("value", *ty))
                    .with_type("Self")
                    .with_body(format!("self.{} = Some(value);\nself", field)),
            );
        }

        let filled: Vec<String> = fields
            .iter()
            .map(|(f, _)| format!("    {f}: self.{f}.ok_or(\"missing field `{f}`\")?,"))
            .collect();
        builder = builder.with_member(
            method("build")
                .with_param(Param::new("self", "self"))
                .with_type(format!("Result<{}, String>", target.name))
                .with_body(if filled.is_empty() {
                    format!("Ok({} {{}})", target.name)
                } else {
                    format!("Ok({} {{\n{}\n}})", target.name, filled.join("\n"))
                }),
        );

        let entry = Declaration::new(DeclKind::Impl, &target.name, at).with_member(
            method("builder")
                .with_type(&name)
                .with_body(format!("{}::new()", name)),
        );

        Ok(vec![builder, entry])
    }
}
