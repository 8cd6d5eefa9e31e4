//! `Extend`: the target's fields merged with those of another struct.

use async_trait::async_trait;
use eyre::{Result, bail};
use graft_codegen::pipeline::{
    Arguments, ConstructError, DiagnosticSink, Generator, Signature, TransformationContext,
};
use graft_ir::{DeclKind, Declaration, LiteralKind};
use tokio_util::sync::CancellationToken;

use crate::{Builtin, check_suffix, str_arg};

/// Generates `Name + suffix` with the target's fields followed by the fields
/// of `from` that the target does not already declare.
#[derive(Debug, Clone)]
pub struct Extend {
    from: String,
    suffix: String,
}

impl Extend {
    pub fn new(from: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            suffix: suffix.into(),
        }
    }
}

impl Builtin for Extend {
    const NAME: &'static str = "Extend";

    fn signature() -> Signature {
        Signature::new()
            .required("from", LiteralKind::Str)
            .optional("suffix", "Ext")
    }

    fn from_args(args: &Arguments) -> Result<Self, ConstructError> {
        let from = str_arg(args, "from")?;
        if !graft_core::is_identifier(&from) {
            return Err(ConstructError::Rejected(format!(
                "`from` must name a type, found {:?}",
                from
            )));
        }
        let suffix = str_arg(args, "suffix")?;
        check_suffix("suffix", &suffix)?;
        Ok(Self::new(from, suffix))
    }
}

#[async_trait]
impl Generator for Extend {
    async fn transform(
        &self,
        ctx: &TransformationContext,
        sink: &DiagnosticSink,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Declaration>> {
        let target = ctx.target();
        if target.kind != DeclKind::Struct {
            bail!("only structs can be extended, `{}` is a {}", target.name, target.kind);
        }

        let mut extended = target.without_markers();
        extended.name.push_str(&self.suffix);

        match ctx.compilation().find_type(&self.from) {
            None => sink.warning(format!(
                "type `{}` not found; `{}` has only the fields of `{}`",
                self.from, extended.name, target.name
            )),
            Some((_, base)) if base.kind != DeclKind::Struct => sink.warning(format!(
                "`{}` is not a struct, only struct fields can be merged",
                self.from
            )),
            Some((document, base)) => {
                tracing::trace!(from = %self.from, %document, "extending with fields");
                for field in base.members_of(DeclKind::Field) {
                    if target.members_of(DeclKind::Field).any(|f| f.name == field.name) {
                        sink.info(format!(
                            "field `{}` of `{}` is shadowed by `{}`",
                            field.name, self.from, target.name
                        ));
                        continue;
                    }
                    extended.members.push(field.without_markers());
                }
            }
        }

        Ok(vec![extended])
    }
}
