//! `DuplicateWithSuffix`: a renamed copy of the target.

use async_trait::async_trait;
use eyre::{Result, bail};
use graft_codegen::pipeline::{
    Arguments, ConstructError, DiagnosticSink, Generator, Signature, TransformationContext,
};
use graft_ir::{Declaration, LiteralKind};
use tokio_util::sync::CancellationToken;

use crate::{Builtin, check_suffix, str_arg};

/// Copies the target type under `Name + suffix`.
#[derive(Debug, Clone)]
pub struct DuplicateWithSuffix {
    suffix: String,
}

impl DuplicateWithSuffix {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

impl Builtin for DuplicateWithSuffix {
    const NAME: &'static str = "DuplicateWithSuffix";

    fn signature() -> Signature {
        Signature::new().required("suffix", LiteralKind::Str)
    }

    fn from_args(args: &Arguments) -> Result<Self, ConstructError> {
        let suffix = str_arg(args, "suffix")?;
        check_suffix("suffix", &suffix)?;
        Ok(Self::new(suffix))
    }
}

#[async_trait]
impl Generator for DuplicateWithSuffix {
    async fn transform(
        &self,
        ctx: &TransformationContext,
        _sink: &DiagnosticSink,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Declaration>> {
        let target = ctx.target();
        if !target.kind.is_type() {
            bail!("can only duplicate a type, `{}` is a {}", target.name, target.kind);
        }

        let mut copy = target.without_markers();
        copy.name.push_str(&self.suffix);
        Ok(vec![copy])
    }
}
