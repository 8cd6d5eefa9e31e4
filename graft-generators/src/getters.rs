//! `Getters`: one borrowing accessor per field.

use async_trait::async_trait;
use eyre::{Result, bail};
use graft_codegen::pipeline::{
    Arguments, ConstructError, DiagnosticSink, Generator, Signature, TransformationContext,
};
use graft_ir::{DeclKind, Declaration, Param};
use tokio_util::sync::CancellationToken;

use crate::{Builtin, str_arg};

/// Generates `impl Name { fn {prefix}{field}(&self) -> &T }` for each typed field.
#[derive(Debug, Clone, Default)]
pub struct Getters {
    prefix: String,
}

impl Getters {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Builtin for Getters {
    const NAME: &'static str = "Getters";

    fn signature() -> Signature {
        Signature::new().optional("prefix", "")
    }

    fn from_args(args: &Arguments) -> Result<Self, ConstructError> {
        let prefix = str_arg(args, "prefix")?;
        if !prefix.is_empty() && !graft_core::is_identifier(&prefix) {
            return Err(ConstructError::Rejected(format!(
                "`prefix` must be an identifier fragment, found {:?}",
                prefix
            )));
        }
        Ok(Self::new(prefix))
    }
}

#[async_trait]
impl Generator for Getters {
    async fn transform(
        &self,
        ctx: &TransformationContext,
        sink: &DiagnosticSink,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Declaration>> {
        let target = ctx.target();
        if target.kind != DeclKind::Struct {
            bail!("getters need a struct, `{}` is a {}", target.name, target.kind);
        }

        let mut block = Declaration::new(DeclKind::Impl, &target.name, target.position);
        for field in target.members_of(DeclKind::Field) {
            let Some(ty) = &field.ty else {
                sink.warning(format!("field `{}` has no type; no getter generated", field.name));
                continue;
            };
            block = block.with_member(
                Declaration::new(
                    DeclKind::Method,
                    format!("{}{}", self.prefix, field.name),
                    field.position,
                )
                .with_visibility(target.visibility)
                .with_param(Param::new("self", "&self"))
                .with_type(format!("&{}", ty))
                .with_body(format!("&self.{}", field.name)),
            );
        }

        if block.members.is_empty() {
            sink.info(format!("`{}` has no fields; nothing to generate", target.name));
            return Ok(Vec::new());
        }
        Ok(vec![block])
    }
}
