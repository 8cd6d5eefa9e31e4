//! Rendering of declaration trees into generated document text.
//!
//! Output is a plain Rust-flavoured surface syntax. Rendering is a pure
//! function of the declaration tree, so re-rendering the same tree is
//! byte-identical.

use graft_ir::{DeclKind, Declaration, DocumentId, Import, Visibility};

use super::imports::use_line;
use crate::builder::{CodeBuilder, CodeFragment, Indent, Renderable};

/// Where a declaration is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    TopLevel,
    Inherent,
    Trait,
    TraitImpl,
}

/// Renderable view over a declaration.
pub struct DeclarationView<'a> {
    decl: &'a Declaration,
    scope: Scope,
}

impl<'a> DeclarationView<'a> {
    pub fn new(decl: &'a Declaration) -> Self {
        Self {
            decl,
            scope: Scope::TopLevel,
        }
    }

    fn scoped(decl: &'a Declaration, scope: Scope) -> Self {
        Self { decl, scope }
    }

    fn vis(&self) -> &'static str {
        if matches!(self.scope, Scope::Trait | Scope::TraitImpl) {
            return "";
        }
        match self.decl.visibility {
            Visibility::Public => "pub ",
            Visibility::Crate => "pub(crate) ",
            Visibility::Private => "",
        }
    }

    fn ty(&self) -> &str {
        self.decl.ty.as_deref().unwrap_or("()")
    }

    fn signature(&self) -> String {
        let params: Vec<String> = self
            .decl
            .params
            .iter()
            .map(|p| {
                if p.name == "self" {
                    p.ty.clone()
                } else {
                    format!("{}: {}", p.name, p.ty)
                }
            })
            .collect();
        let mut sig = format!("{}fn {}({})", self.vis(), self.decl.name, params.join(", "));
        if let Some(ret) = &self.decl.ty {
            sig.push_str(" -> ");
            sig.push_str(ret);
        }
        sig
    }

    fn method(&self) -> CodeFragment {
        match &self.decl.body {
            Some(body) => CodeFragment::braced(
                format!("{} {{", self.signature()),
                body.lines()
                    .map(|l| match l.trim_end() {
                        "" => CodeFragment::Blank,
                        l => CodeFragment::line(l),
                    })
                    .collect(),
            ),
            None if self.scope == Scope::Trait => CodeFragment::line(format!("{};", self.signature())),
            None => CodeFragment::braced(
                format!("{} {{", self.signature()),
                vec![CodeFragment::line("todo!()")],
            ),
        }
    }

    fn constant(&self) -> CodeFragment {
        match &self.decl.body {
            Some(value) => CodeFragment::line(format!(
                "{}const {}: {} = {};",
                self.vis(),
                self.decl.name,
                self.ty(),
                value
            )),
            None => CodeFragment::line(format!("{}const {}: {};", self.vis(), self.decl.name, self.ty())),
        }
    }

    fn field(&self) -> Vec<CodeFragment> {
        let mut out = doc_fragments(self.decl);
        out.push(CodeFragment::line(format!(
            "{}{}: {},",
            self.vis(),
            self.decl.name,
            self.ty()
        )));
        out
    }

    fn variant(&self) -> Vec<CodeFragment> {
        let mut out = doc_fragments(self.decl);
        out.push(match &self.decl.ty {
            Some(ty) => CodeFragment::line(format!("{}({}),", self.decl.name, ty)),
            None => CodeFragment::line(format!("{},", self.decl.name)),
        });
        out
    }

    /// Methods and associated consts, separated by blank lines.
    fn items(&self, scope: Scope) -> Vec<CodeFragment> {
        let mut out = Vec::new();
        for member in self
            .decl
            .members
            .iter()
            .filter(|m| matches!(m.kind, DeclKind::Method | DeclKind::Const))
        {
            if !out.is_empty() {
                out.push(CodeFragment::Blank);
            }
            out.extend(DeclarationView::scoped(member, scope).to_fragments());
        }
        out
    }

    /// A type body (`struct`/`enum`) followed by an inherent impl for its items.
    fn type_with_items(&self, keyword: &str, member_kind: DeclKind) -> Vec<CodeFragment> {
        let mut out = doc_fragments(self.decl);
        let members: Vec<CodeFragment> = self
            .decl
            .members_of(member_kind)
            .flat_map(|m| {
                let view = DeclarationView::scoped(m, Scope::Inherent);
                if member_kind == DeclKind::Variant {
                    view.variant()
                } else {
                    view.field()
                }
            })
            .collect();

        let header = format!("{}{} {}", self.vis(), keyword, self.decl.name);
        if members.is_empty() && keyword == "struct" {
            out.push(CodeFragment::line(format!("{};", header)));
        } else {
            out.push(CodeFragment::braced(format!("{} {{", header), members));
        }

        let items = self.items(Scope::Inherent);
        if !items.is_empty() {
            out.push(CodeFragment::Blank);
            out.push(CodeFragment::braced(format!("impl {} {{", self.decl.name), items));
        }
        out
    }
}

impl Renderable for DeclarationView<'_> {
    fn to_fragments(&self) -> Vec<CodeFragment> {
        match self.decl.kind {
            DeclKind::Struct => self.type_with_items("struct", DeclKind::Field),
            DeclKind::Enum => self.type_with_items("enum", DeclKind::Variant),
            DeclKind::Trait => {
                let mut out = doc_fragments(self.decl);
                out.push(CodeFragment::braced(
                    format!("{}trait {} {{", self.vis(), self.decl.name),
                    self.items(Scope::Trait),
                ));
                out
            }
            DeclKind::Impl => {
                let (header, scope) = match &self.decl.ty {
                    Some(tr) => (format!("impl {} for {} {{", tr, self.decl.name), Scope::TraitImpl),
                    None => (format!("impl {} {{", self.decl.name), Scope::Inherent),
                };
                let mut out = doc_fragments(self.decl);
                out.push(CodeFragment::braced(header, self.items(scope)));
                out
            }
            DeclKind::Method => {
                let mut out = doc_fragments(self.decl);
                out.push(self.method());
                out
            }
            DeclKind::Const => {
                let mut out = doc_fragments(self.decl);
                out.push(self.constant());
                out
            }
            DeclKind::Alias => {
                let mut out = doc_fragments(self.decl);
                out.push(CodeFragment::line(format!(
                    "{}type {} = {};",
                    self.vis(),
                    self.decl.name,
                    self.ty()
                )));
                out
            }
            DeclKind::Field => self.field(),
            DeclKind::Variant => self.variant(),
        }
    }
}

fn doc_fragments(decl: &Declaration) -> Vec<CodeFragment> {
    decl.doc.iter().map(CodeFragment::doc).collect()
}

/// Renders a whole generated document.
#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    indent: Indent,
    header: bool,
}

impl DocumentRenderer {
    pub fn new(header: bool) -> Self {
        Self {
            indent: Indent::default(),
            header,
        }
    }

    pub fn with_indent(mut self, indent: Indent) -> Self {
        self.indent = indent;
        self
    }

    /// Render the header line, imports and declarations, separated by
    /// blank lines.
    pub fn render(&self, source: &DocumentId, imports: &[Import], declarations: &[Declaration]) -> String {
        let mut builder = CodeBuilder::new(self.indent);

        if self.header {
            builder.push_line(&format!("// @generated by graft from {}. Do not edit.", source));
        }

        if !imports.is_empty() {
            if !builder.is_empty() {
                builder.push_blank();
            }
            for import in imports {
                builder.push_line(&use_line(import));
            }
        }

        for decl in declarations {
            if !builder.is_empty() {
                builder.push_blank();
            }
            builder.emit(&DeclarationView::new(decl));
        }

        builder.build()
    }
}

impl Default for DocumentRenderer {
    fn default() -> Self {
        Self::new(true)
    }
}
