//! Import deduplication across a generated document.

use std::collections::BTreeSet;

use graft_ir::Import;
use indexmap::IndexMap;

/// Tracks import directives and deduplicates them.
///
/// Modules keep first-seen order; symbols within a module are sorted so the
/// rendered `use` lines are deterministic.
///
/// # Example
///
/// ```
/// use graft_codegen::generation::ImportCollector;
/// use graft_ir::Import;
///
/// let mut imports = ImportCollector::new();
/// imports.add(&Import::module("std::fmt"));
/// imports.add(&Import::module("std::collections").symbol("HashMap"));
/// imports.add(&Import::module("std::fmt"));
///
/// assert_eq!(imports.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ImportCollector {
    imports: IndexMap<String, ModuleImports>,
}

#[derive(Debug, Clone, Default)]
struct ModuleImports {
    /// The module itself is imported (`use std::fmt;`).
    whole: bool,
    symbols: BTreeSet<String>,
}

impl ModuleImports {
    fn absorb(&mut self, whole: bool, symbols: impl IntoIterator<Item = String>) {
        self.whole |= whole;
        self.symbols.extend(symbols);
    }
}

impl ImportCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an import directive.
    pub fn add(&mut self, import: &Import) {
        self.imports
            .entry(import.module.clone())
            .or_default()
            .absorb(import.symbols.is_empty(), import.symbols.iter().cloned());
    }

    pub fn has_symbol(&self, module: &str, symbol: &str) -> bool {
        self.imports
            .get(module)
            .is_some_and(|m| m.symbols.contains(symbol))
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }

    /// Number of distinct modules.
    pub fn len(&self) -> usize {
        self.imports.len()
    }

    /// The consolidated directives: a module import (if requested) followed
    /// by one directive carrying all of the module's symbols.
    pub fn to_imports(&self) -> Vec<Import> {
        let mut out = Vec::new();
        for (module, imports) in &self.imports {
            if imports.whole {
                out.push(Import::module(module.clone()));
            }
            if !imports.symbols.is_empty() {
                out.push(Import {
                    module: module.clone(),
                    symbols: imports.symbols.iter().cloned().collect(),
                });
            }
        }
        out
    }
}

/// Format a directive as a `use` line.
pub(crate) fn use_line(import: &Import) -> String {
    match import.symbols.as_slice() {
        [] => format!("use {};", import.module),
        [one] => format!("use {}::{};", import.module, one),
        many => format!("use {}::{{{}}};", import.module, many.join(", ")),
    }
}
