use std::{ops::Range, path::Path, path::PathBuf};

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Boxed so `Result<Config>` and `Result<SourceDocument>` stay small.
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// The text an error points into.
///
/// Errors built from an `Origin` carry the whole file so miette can render
/// the offending span with its surrounding lines.
#[derive(Debug, Clone)]
pub struct Origin {
    name: String,
    text: String,
}

impl Origin {
    pub fn new(text: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> NamedSource<String> {
        NamedSource::new(&self.name, self.text.clone())
    }

    /// TOML that failed to deserialize, including unknown keys and kinds.
    pub fn syntax(&self, cause: toml::de::Error) -> Box<Error> {
        Box::new(Error::Syntax {
            at: cause.span().map(SourceSpan::from),
            src: self.source(),
            cause,
        })
    }

    /// Well-formed TOML describing something graft cannot accept.
    pub fn invalid(&self, reason: impl Into<String>, at: Option<Range<usize>>) -> Box<Error> {
        Box::new(Error::Invalid {
            src: self.source(),
            at: at.map(SourceSpan::from),
            reason: reason.into(),
        })
    }

    /// A declaration, generator or module name that is not an identifier.
    pub fn bad_name(
        &self,
        name: impl Into<String>,
        what: &'static str,
        at: Option<Range<usize>>,
    ) -> Box<Error> {
        Box::new(Error::BadName {
            src: self.source(),
            at: at.map(SourceSpan::from),
            name: name.into(),
            what,
        })
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("cannot read {}", .path.display())]
    #[diagnostic(code(graft::read))]
    Read {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    #[error("{} is not valid graft TOML", .src.name())]
    #[diagnostic(code(graft::syntax))]
    Syntax {
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        at: Option<SourceSpan>,
        #[source]
        cause: toml::de::Error,
    },

    #[error("{reason}")]
    #[diagnostic(code(graft::invalid))]
    Invalid {
        #[source_code]
        src: NamedSource<String>,
        #[label("{reason}")]
        at: Option<SourceSpan>,
        reason: String,
    },

    #[error("`{name}` is not a valid {what} name")]
    #[diagnostic(
        code(graft::bad_name),
        help("names start with a letter or `_` and continue with letters, digits or `_`")
    )]
    BadName {
        #[source_code]
        src: NamedSource<String>,
        #[label("not an identifier")]
        at: Option<SourceSpan>,
        name: String,
        what: &'static str,
    },
}

/// Read a file to a string, attributing failures to `path`.
pub(crate) fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|cause| {
        Box::new(Error::Read {
            path: path.to_path_buf(),
            cause,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_carries_label_span() {
        let origin = Origin::new("[output]\nsuffix = \"\"\n", "graft.toml");
        let err = origin.invalid("empty suffix", Some(9..20));
        match *err {
            Error::Invalid { at, ref reason, .. } => {
                assert_eq!(reason, "empty suffix");
                assert_eq!(at, Some(SourceSpan::from(9..20)));
            }
            ref other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bad_name_message() {
        let err = Origin::new("", "a.decl.toml").bad_name("my type", "struct", None);
        assert_eq!(err.to_string(), "`my type` is not a valid struct name");
    }

    #[test]
    fn test_read_error_names_path() {
        let err = read_to_string(Path::new("/no/such/graft.toml")).unwrap_err();
        assert!(err.to_string().contains("/no/such/graft.toml"));
    }
}
