//! Generation markers attached to declarations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Position;

/// Reference to a generator: a type name exported by an owning module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeneratorRef {
    /// Identifier of the module that exports the generator.
    pub module: String,
    /// Name of the generator type within the module.
    #[serde(rename = "generator")]
    pub type_name: String,
}

impl GeneratorRef {
    pub fn new(module: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            type_name: type_name.into(),
        }
    }
}

impl fmt::Display for GeneratorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module, self.type_name)
    }
}

/// A compile-time literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
}

/// The shape of a literal, used to check constructor signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Bool,
    Int,
    Float,
    Str,
    List,
}

impl LiteralKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LiteralKind::Bool => "bool",
            LiteralKind::Int => "int",
            LiteralKind::Float => "float",
            LiteralKind::Str => "string",
            LiteralKind::List => "list",
        }
    }
}

impl fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Literal {
    pub fn kind(&self) -> LiteralKind {
        match self {
            Literal::Bool(_) => LiteralKind::Bool,
            Literal::Int(_) => LiteralKind::Int,
            Literal::Float(_) => LiteralKind::Float,
            Literal::Str(_) => LiteralKind::Str,
            Literal::List(_) => LiteralKind::List,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Str(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{:?}", x),
            Literal::Str(s) => write!(f, "{:?}", s),
            Literal::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A marker constructor argument as written in source.
///
/// Only literals can be passed to a generator; anything else is kept as
/// opaque expression text so discovery can report it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkerArg {
    Literal(Literal),
    Expr { expr: String },
}

impl MarkerArg {
    pub fn expr(text: impl Into<String>) -> Self {
        MarkerArg::Expr { expr: text.into() }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            MarkerArg::Literal(lit) => Some(lit),
            MarkerArg::Expr { .. } => None,
        }
    }
}

impl From<Literal> for MarkerArg {
    fn from(value: Literal) -> Self {
        MarkerArg::Literal(value)
    }
}

impl From<&str> for MarkerArg {
    fn from(value: &str) -> Self {
        MarkerArg::Literal(value.into())
    }
}

impl From<i64> for MarkerArg {
    fn from(value: i64) -> Self {
        MarkerArg::Literal(value.into())
    }
}

impl From<bool> for MarkerArg {
    fn from(value: bool) -> Self {
        MarkerArg::Literal(value.into())
    }
}

impl fmt::Display for MarkerArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerArg::Literal(lit) => write!(f, "{}", lit),
            MarkerArg::Expr { expr } => f.write_str(expr),
        }
    }
}

/// A generation marker: one request against the declaration it is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerAnnotation {
    #[serde(flatten)]
    pub generator: GeneratorRef,
    #[serde(default)]
    pub args: Vec<MarkerArg>,
    #[serde(default)]
    pub position: Position,
}

impl MarkerAnnotation {
    pub fn new(generator: GeneratorRef, args: Vec<MarkerArg>) -> Self {
        Self {
            generator,
            args,
            position: Position::default(),
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_ref_display() {
        let r = GeneratorRef::new("graft.builtin", "Builder");
        assert_eq!(r.to_string(), "graft.builtin::Builder");
    }

    #[test]
    fn test_literal_display_is_source_like() {
        assert_eq!(Literal::from("A").to_string(), "\"A\"");
        assert_eq!(Literal::Int(3).to_string(), "3");
        assert_eq!(Literal::Float(1.0).to_string(), "1.0");
        assert_eq!(
            Literal::List(vec![Literal::Int(1), Literal::Bool(false)]).to_string(),
            "[1, false]"
        );
    }

    #[test]
    fn test_marker_arg_untagged_json() {
        let args: Vec<MarkerArg> = serde_json::from_str(r#"["A", 2, {"expr": "SUFFIX"}]"#).unwrap();
        assert_eq!(args[0], MarkerArg::from("A"));
        assert_eq!(args[1], MarkerArg::Literal(Literal::Int(2)));
        assert_eq!(args[2], MarkerArg::expr("SUFFIX"));
        assert!(args[2].as_literal().is_none());
    }

    #[test]
    fn test_marker_flattens_reference() {
        let marker: MarkerAnnotation = serde_json::from_str(
            r#"{"module": "graft.builtin", "generator": "DuplicateWithSuffix", "args": ["A"]}"#,
        )
        .unwrap();
        assert_eq!(marker.generator.type_name, "DuplicateWithSuffix");
        assert_eq!(marker.args.len(), 1);
        assert_eq!(marker.position, Position::default());
    }
}
