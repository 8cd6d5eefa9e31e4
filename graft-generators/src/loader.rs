use std::sync::Arc;

use graft_codegen::pipeline::{GeneratorModule, LoadError, ModuleLoader};

use crate::{MODULE, builtin_module};

/// Loads `graft.builtin`, subject to an allow list.
///
/// Modules outside the allow list fail to load even if they exist; allowed
/// modules other than the built-in one are not found.
pub struct BuiltinLoader {
    allow: Vec<String>,
    builtin: Arc<dyn GeneratorModule>,
}

impl BuiltinLoader {
    /// A loader that allows only the built-in module.
    pub fn new() -> Self {
        Self::with_allowed([MODULE])
    }

    pub fn with_allowed<I, S>(allow: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allow: allow.into_iter().map(Into::into).collect(),
            builtin: Arc::new(builtin_module()),
        }
    }

    pub fn allowed(&self) -> &[String] {
        &self.allow
    }
}

impl Default for BuiltinLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleLoader for BuiltinLoader {
    fn load(&self, module: &str) -> Result<Arc<dyn GeneratorModule>, LoadError> {
        if !self.allow.iter().any(|m| m == module) {
            return Err(LoadError::Failed(format!(
                "module `{}` is not listed in [modules] allow",
                module
            )));
        }
        if module == MODULE {
            Ok(self.builtin.clone())
        } else {
            Err(LoadError::NotFound)
        }
    }
}
