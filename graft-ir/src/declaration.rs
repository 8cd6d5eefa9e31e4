//! Declaration tree nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::MarkerAnnotation;

/// A 1-based line/column position in a source document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Kind of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    Struct,
    Enum,
    Trait,
    Impl,
    Field,
    Method,
    Variant,
    Const,
    Alias,
}

impl DeclKind {
    /// Get the lowercase string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKind::Struct => "struct",
            DeclKind::Enum => "enum",
            DeclKind::Trait => "trait",
            DeclKind::Impl => "impl",
            DeclKind::Field => "field",
            DeclKind::Method => "method",
            DeclKind::Variant => "variant",
            DeclKind::Const => "const",
            DeclKind::Alias => "alias",
        }
    }

    /// Returns true for kinds that introduce a type name.
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            DeclKind::Struct | DeclKind::Enum | DeclKind::Trait | DeclKind::Alias
        )
    }

    /// Returns true for kinds that may contain member declarations.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            DeclKind::Struct | DeclKind::Enum | DeclKind::Trait | DeclKind::Impl
        )
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Crate,
    Private,
}

/// A method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// An import directive a declaration needs in scope (`use module::{symbols}`).
///
/// An empty symbol list imports the module itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Import {
    pub module: String,
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl Import {
    pub fn module(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            symbols: Vec::new(),
        }
    }

    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbols.push(symbol.into());
        self
    }
}

/// A node of a source document's structured tree.
///
/// Owned by its [`SourceDocument`](crate::SourceDocument); generators
/// return fresh trees of the same type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: DeclKind,
    pub name: String,
    pub position: Position,
    #[serde(default)]
    pub visibility: Visibility,
    /// Field type, method return type, alias target or impl trait.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    /// Opaque body text (method bodies, const values).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<MarkerAnnotation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Declaration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<Import>,
}

impl Declaration {
    pub fn new(kind: DeclKind, name: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            name: name.into(),
            position,
            visibility: Visibility::default(),
            ty: None,
            params: Vec::new(),
            body: None,
            doc: None,
            markers: Vec::new(),
            members: Vec::new(),
            imports: Vec::new(),
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_type(mut self, ty: impl Into<String>) -> Self {
        self.ty = Some(ty.into());
        self
    }

    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_marker(mut self, marker: MarkerAnnotation) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn with_member(mut self, member: Declaration) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_import(mut self, import: Import) -> Self {
        self.imports.push(import);
        self
    }

    /// Members of a given kind, in order.
    pub fn members_of(&self, kind: DeclKind) -> impl Iterator<Item = &Declaration> {
        self.members.iter().filter(move |m| m.kind == kind)
    }

    /// Markers on this declaration and all nested members.
    pub fn marker_count(&self) -> usize {
        self.markers.len()
            + self
                .members
                .iter()
                .map(Declaration::marker_count)
                .sum::<usize>()
    }

    /// A copy of this tree with every marker removed.
    ///
    /// Generated output is single-pass: markers copied from a source
    /// declaration must not be treated as new generation requests.
    pub fn without_markers(&self) -> Declaration {
        let mut copy = self.clone();
        copy.strip_markers();
        copy
    }

    fn strip_markers(&mut self) {
        self.markers.clear();
        for member in &mut self.members {
            member.strip_markers();
        }
    }

    /// Collect the imports required by this tree, outermost first.
    pub fn required_imports(&self) -> Vec<&Import> {
        let mut out: Vec<&Import> = self.imports.iter().collect();
        for member in &self.members {
            out.extend(member.required_imports());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeneratorRef;

    fn foo() -> Declaration {
        let marker = MarkerAnnotation::new(GeneratorRef::new("m", "G"), Vec::new());
        Declaration::new(DeclKind::Struct, "Foo", Position::new(1, 1))
            .with_marker(marker.clone())
            .with_import(Import::module("std::fmt"))
            .with_member(
                Declaration::new(DeclKind::Field, "x", Position::new(2, 5))
                    .with_type("i32")
                    .with_marker(marker)
                    .with_import(Import::module("std::collections").symbol("HashMap")),
            )
    }

    #[test]
    fn test_without_markers_strips_nested() {
        let stripped = foo().without_markers();
        assert_eq!(stripped.marker_count(), 0);
        assert_eq!(stripped.members.len(), 1);
        assert_eq!(stripped.members[0].ty.as_deref(), Some("i32"));
    }

    #[test]
    fn test_required_imports_outermost_first() {
        let decl = foo();
        let modules: Vec<_> = decl
            .required_imports()
            .iter()
            .map(|i| i.module.as_str())
            .collect();
        assert_eq!(modules, vec!["std::fmt", "std::collections"]);
    }

    #[test]
    fn test_members_of_filters_by_kind() {
        let decl = foo().with_member(Declaration::new(
            DeclKind::Method,
            "len",
            Position::new(3, 5),
        ));
        assert_eq!(decl.members_of(DeclKind::Field).count(), 1);
        assert_eq!(decl.members_of(DeclKind::Method).count(), 1);
    }

    #[test]
    fn test_decl_kind_classification() {
        assert!(DeclKind::Struct.is_type());
        assert!(!DeclKind::Impl.is_type());
        assert!(DeclKind::Impl.is_container());
        assert!(!DeclKind::Field.is_container());
        assert_eq!(DeclKind::Method.to_string(), "method");
    }

    #[test]
    fn test_decl_kind_deserializes_lowercase() {
        let kind: DeclKind = serde_json::from_str("\"struct\"").unwrap();
        assert_eq!(kind, DeclKind::Struct);
    }
}
