//! `graft.toml` project configuration.

use std::{path::PathBuf, str::FromStr, time::Duration};

use serde::Deserialize;

use crate::{
    Error, Result,
    error::{Origin, read_to_string},
};

/// Root of `graft.toml`. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub sources: SourcesSection,
    #[serde(default)]
    pub modules: ModulesSection,
}

/// `[pipeline]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSection {
    /// Concurrent marker invocations; defaults to the number of CPUs.
    pub workers: Option<usize>,
    /// Abort a run that takes longer than this.
    pub deadline_ms: Option<u64>,
}

/// `[output]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    #[serde(default = "default_suffix")]
    pub suffix: String,
    /// Root for generated files; alongside the sources when unset.
    pub dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub header: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            dir: None,
            header: true,
        }
    }
}

/// `[sources]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesSection {
    #[serde(default = "default_source_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for SourcesSection {
    fn default() -> Self {
        Self {
            dir: default_source_dir(),
            extension: default_extension(),
        }
    }
}

/// `[modules]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModulesSection {
    /// Generator modules the host may load.
    #[serde(default = "default_modules")]
    pub allow: Vec<String>,
}

impl Default for ModulesSection {
    fn default() -> Self {
        Self {
            allow: default_modules(),
        }
    }
}

fn default_suffix() -> String {
    "g".to_string()
}

fn default_true() -> bool {
    true
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("src")
}

fn default_extension() -> String {
    "decl.toml".to_string()
}

fn default_modules() -> Vec<String> {
    vec![crate::BUILTIN_MODULE.to_string()]
}

impl Config {
    /// Parse a graft.toml file from the given path.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_to_string(path)?;
        Self::from_str_with_filename(&content, &path.display().to_string())
    }

    /// Parse with a custom filename for error reporting.
    pub fn from_str_with_filename(content: &str, filename: &str) -> Result<Self> {
        let origin = Origin::new(content, filename);
        let config: Config = toml::from_str(content).map_err(|e| origin.syntax(e))?;
        config.validate(&origin)?;
        Ok(config)
    }

    fn validate(&self, origin: &Origin) -> Result<()> {
        if self.pipeline.workers == Some(0) {
            return Err(origin.invalid("pipeline.workers must be at least 1", None));
        }
        if self.pipeline.deadline_ms == Some(0) {
            return Err(origin.invalid("pipeline.deadline_ms must be positive", None));
        }

        let suffix = &self.output.suffix;
        if suffix.is_empty() || suffix.contains(['.', '/', '\\']) {
            return Err(origin.invalid(
                format!(
                    "output.suffix '{}' must be a non-empty file name fragment without dots or separators",
                    suffix
                ),
                None,
            ));
        }

        if self.sources.extension.is_empty() || self.sources.extension.starts_with('.') {
            return Err(origin.invalid(
                "sources.extension must be non-empty and given without a leading dot",
                None,
            ));
        }

        for module in &self.modules.allow {
            if module.is_empty() || !module.split('.').all(graft_core::is_identifier) {
                return Err(origin.bad_name(module, "module", None));
            }
        }
        Ok(())
    }

    /// Run deadline, if configured.
    pub fn deadline(&self) -> Option<Duration> {
        self.pipeline.deadline_ms.map(Duration::from_millis)
    }
}

impl FromStr for Config {
    type Err = Box<Error>;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_str_with_filename(s, "graft.toml")
    }
}
