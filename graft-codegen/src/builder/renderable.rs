//! Renderable trait and CodeFragment for decoupled rendering.

/// A fragment of generated text.
///
/// Fragments sit between declaration trees and the final string, so nodes
/// can be composed without touching a [`CodeBuilder`](super::CodeBuilder).
#[derive(Debug, Clone, PartialEq)]
pub enum CodeFragment {
    /// A single line (newline appended).
    Line(String),
    /// A blank line.
    Blank,
    /// A block with header, indented body and optional closing line.
    Block {
        header: String,
        body: Vec<CodeFragment>,
        close: Option<String>,
    },
    /// A doc comment line.
    Doc(String),
}

impl CodeFragment {
    pub fn line(s: impl Into<String>) -> Self {
        Self::Line(s.into())
    }

    pub fn doc(s: impl Into<String>) -> Self {
        Self::Doc(s.into())
    }

    /// A `{ ... }`-style block closed by `}`.
    pub fn braced(header: impl Into<String>, body: Vec<CodeFragment>) -> Self {
        Self::Block {
            header: header.into(),
            body,
            close: Some("}".to_string()),
        }
    }
}

/// Trait for nodes that can be rendered to code fragments.
pub trait Renderable {
    fn to_fragments(&self) -> Vec<CodeFragment>;
}

impl<T: Renderable + ?Sized> Renderable for &T {
    fn to_fragments(&self) -> Vec<CodeFragment> {
        (*self).to_fragments()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_braced_block() {
        match CodeFragment::braced("impl Foo {", vec![CodeFragment::line("fn a() {}")]) {
            CodeFragment::Block {
                header,
                body,
                close,
            } => {
                assert_eq!(header, "impl Foo {");
                assert_eq!(body.len(), 1);
                assert_eq!(close.as_deref(), Some("}"));
            }
            other => panic!("expected block, got {:?}", other),
        }
    }
}
