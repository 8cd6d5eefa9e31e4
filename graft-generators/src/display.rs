//! `Display`: an `fmt::Display` impl from a format template.
//!
//! The template is plain text with `{field}` placeholders naming fields of
//! the target; `{{` and `}}` are literal braces.

use async_trait::async_trait;
use eyre::{Result, bail};
use graft_codegen::pipeline::{
    Arguments, ConstructError, DiagnosticSink, Generator, Signature, TransformationContext,
};
use graft_ir::{DeclKind, Declaration, Import, LiteralKind, Param};
use tokio_util::sync::CancellationToken;

use crate::{Builtin, str_arg};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String),
    Field(String),
}

fn parse_template(template: &str) -> Result<Vec<Piece>, String> {
    let mut pieces = Vec::new();
    let mut text = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push_str("{{");
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push_str("}}");
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => return Err("unclosed `{` in format".to_string()),
                    }
                }
                if !graft_core::is_identifier(&name) {
                    return Err(format!("`{{{}}}` is not a field placeholder", name));
                }
                if !text.is_empty() {
                    pieces.push(Piece::Text(std::mem::take(&mut text)));
                }
                pieces.push(Piece::Field(name));
            }
            '}' => return Err("unmatched `}` in format".to_string()),
            c => text.push(c),
        }
    }
    if !text.is_empty() {
        pieces.push(Piece::Text(text));
    }
    Ok(pieces)
}

/// Generates `impl fmt::Display for Name` writing the template.
#[derive(Debug, Clone)]
pub struct Display {
    pieces: Vec<Piece>,
}

impl Display {
    pub fn new(template: &str) -> Result<Self, ConstructError> {
        let pieces = parse_template(template).map_err(ConstructError::Rejected)?;
        Ok(Self { pieces })
    }

    fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.pieces.iter().filter_map(|p| match p {
            Piece::Field(name) => Some(name.as_str()),
            Piece::Text(_) => None,
        })
    }

    /// The `write!` invocation for this template.
    fn write_call(&self) -> String {
        let mut format = String::new();
        let mut args = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => format.push_str(text),
                Piece::Field(name) => {
                    format.push_str("{}");
                    args.push_str(&format!(", self.{}", name));
                }
            }
        }
        format!("write!(f, {:?}{})", format, args)
    }
}

impl Builtin for Display {
    const NAME: &'static str = "Display";

    fn signature() -> Signature {
        Signature::new().required("format", LiteralKind::Str)
    }

    fn from_args(args: &Arguments) -> Result<Self, ConstructError> {
        Self::new(&str_arg(args, "format")?)
    }
}

#[async_trait]
impl Generator for Display {
    async fn transform(
        &self,
        ctx: &TransformationContext,
        _sink: &DiagnosticSink,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Declaration>> {
        let target = ctx.target();
        if !matches!(target.kind, DeclKind::Struct | DeclKind::Enum) {
            bail!("Display needs a struct or enum, `{}` is a {}", target.name, target.kind);
        }

        for name in self.placeholders() {
            if !target.members_of(DeclKind::Field).any(|f| f.name == name) {
                bail!("placeholder `{{{}}}` does not name a field of `{}`", name, target.name);
            }
        }

        let fmt = Declaration::new(DeclKind::Method, "fmt", target.position)
            .with_param(Param::new("self", "&self"))
            .with_param(Param::new("f", "&mut fmt::Formatter<'_>"))
            .with_type("fmt::Result")
            .with_body(self.write_call());

        Ok(vec![
            Declaration::new(DeclKind::Impl, &target.name, target.position)
                .with_type("fmt::Display")
                .with_import(Import::module("std::fmt"))
                .with_member(fmt),
        ])
    }
}
