//! Declaration source files (`*.decl.toml`).
//!
//! ```toml
//! [[declarations]]
//! kind = "struct"
//! name = "User"
//! doc = "A registered user."
//!
//! [[declarations.markers]]
//! generator = "Builder"
//! args = ["Builder"]
//!
//! [[declarations.members]]
//! kind = "field"
//! name = "id"
//! type = "u64"
//! ```
//!
//! Marker arguments are TOML values; an inline table `{ expr = "..." }`
//! stands for a non-literal expression and is rejected at discovery.

use std::path::Path;

use graft_core::content_fingerprint;
use graft_ir::{
    DeclKind, Declaration, DocumentId, GeneratorRef, Import, MarkerAnnotation, MarkerArg, Param,
    Position, SourceDocument, Visibility,
};
use serde::Deserialize;
use toml::Spanned;

use crate::{
    Result,
    error::{Origin, read_to_string},
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSource {
    #[serde(default)]
    declarations: Vec<RawDeclaration>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDeclaration {
    kind: DeclKind,
    name: Spanned<String>,
    #[serde(default)]
    visibility: Visibility,
    #[serde(default, rename = "type")]
    ty: Option<String>,
    #[serde(default)]
    params: Vec<Param>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    doc: Option<String>,
    #[serde(default)]
    imports: Vec<Import>,
    #[serde(default)]
    markers: Vec<RawMarker>,
    #[serde(default)]
    members: Vec<RawDeclaration>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMarker {
    generator: Spanned<String>,
    #[serde(default = "default_module")]
    module: String,
    #[serde(default)]
    args: Vec<MarkerArg>,
}

fn default_module() -> String {
    crate::BUILTIN_MODULE.to_string()
}

/// Maps byte offsets to 1-based line/column positions.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(src: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    fn position(&self, src: &str, offset: usize) -> Position {
        let line = self.starts.partition_point(|&start| start <= offset) - 1;
        let column = src[self.starts[line]..offset].chars().count() + 1;
        Position::new(line as u32 + 1, column as u32)
    }
}

struct Lowering<'a> {
    origin: Origin,
    index: LineIndex,
    src: &'a str,
}

impl Lowering<'_> {
    fn declaration(&self, raw: RawDeclaration, parent: Option<DeclKind>) -> Result<Declaration> {
        let span = raw.name.span();
        let name = raw.name.into_inner();

        if !graft_core::is_identifier(&name) {
            return Err(self.origin.bad_name(name, raw.kind.as_str(), Some(span)));
        }

        match (raw.kind, parent) {
            (DeclKind::Field | DeclKind::Variant, None) => {
                return Err(self.origin.invalid(
                    format!("a {} must be declared inside a type", raw.kind),
                    Some(span.clone()),
                ));
            }
            (DeclKind::Field, Some(p)) if p != DeclKind::Struct => {
                return Err(self.origin.invalid(
                    format!("fields belong to a struct, not a {}", p),
                    Some(span.clone()),
                ));
            }
            (DeclKind::Variant, Some(p)) if p != DeclKind::Enum => {
                return Err(self.origin.invalid(
                    format!("variants belong to an enum, not a {}", p),
                    Some(span.clone()),
                ));
            }
            _ => {}
        }

        if !raw.members.is_empty() && !raw.kind.is_container() {
            return Err(self.origin.invalid(
                format!("a {} cannot have members", raw.kind),
                Some(span.clone()),
            ));
        }

        let mut decl = Declaration::new(raw.kind, name, self.index.position(self.src, span.start))
            .with_visibility(raw.visibility);
        decl.ty = raw.ty;
        decl.params = raw.params;
        decl.body = raw.body;
        decl.doc = raw.doc;
        decl.imports = raw.imports;

        for marker in raw.markers {
            decl.markers.push(self.marker(marker)?);
        }
        for member in raw.members {
            decl.members.push(self.declaration(member, Some(raw.kind))?);
        }
        Ok(decl)
    }

    fn marker(&self, raw: RawMarker) -> Result<MarkerAnnotation> {
        let generator_span = raw.generator.span();
        let position = self.index.position(self.src, generator_span.start);
        let generator = raw.generator.into_inner();

        if !graft_core::is_identifier(&generator) {
            return Err(self.origin.bad_name(generator, "generator", Some(generator_span)));
        }

        Ok(
            MarkerAnnotation::new(GeneratorRef::new(raw.module, generator), raw.args)
                .at(position),
        )
    }
}

/// Parse a declaration source from text.
///
/// The document's fingerprint is taken over `content` as given.
pub fn parse_source(id: impl Into<DocumentId>, content: &str, filename: &str) -> Result<SourceDocument> {
    let origin = Origin::new(content, filename);
    let raw: RawSource = toml::from_str(content).map_err(|e| origin.syntax(e))?;

    let lowering = Lowering {
        origin,
        index: LineIndex::new(content),
        src: content,
    };
    let declarations = raw
        .declarations
        .into_iter()
        .map(|d| lowering.declaration(d, None))
        .collect::<Result<Vec<_>>>()?;

    Ok(SourceDocument::new(
        id,
        content_fingerprint(content),
        declarations,
    ))
}

/// Read and parse a declaration source file.
pub fn load_source(id: impl Into<DocumentId>, path: impl AsRef<Path>) -> Result<SourceDocument> {
    let path = path.as_ref();
    let content = read_to_string(path)?;
    parse_source(id, &content, &path.display().to_string())
}
