//! Writing generated files to disk.

use std::path::{Path, PathBuf};

use eyre::{Context, Result};

/// Something that renders to a file below an output directory.
pub trait GeneratedFile {
    /// Location of the file below `base`.
    fn path(&self, base: &Path) -> PathBuf;

    fn rules(&self) -> FileRules {
        FileRules::default()
    }

    fn render(&self) -> String;

    /// Render and write the file, honouring its [`FileRules`].
    fn write(&self, base: &Path) -> Result<WriteResult> {
        let path = self.path(base);
        let content = self.render();
        let rules = self.rules();

        if rules.overwrite == Overwrite::IfChanged
            && std::fs::read_to_string(&path).is_ok_and(|existing| existing == content)
        {
            return Ok(WriteResult::Unchanged);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, content)
            .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        Ok(WriteResult::Written)
    }
}

/// Outcome of [`GeneratedFile::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult {
    Written,
    /// Existing content was identical; the file was not touched.
    Unchanged,
}

#[derive(Debug, Clone, Default)]
pub struct FileRules {
    pub overwrite: Overwrite,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Overwrite {
    Always,
    /// Leave the file alone when its content is already current, so
    /// watchers do not see a spurious change.
    #[default]
    IfChanged,
}
