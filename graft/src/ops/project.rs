//! A graft project on disk: configuration, sources and the pipeline.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use eyre::{Context, Result};
use graft_codegen::{Pipeline, PipelineConfig, RunOutput};
use graft_generators::BuiltinLoader;
use graft_ir::{DocumentId, SourceDocument};
use graft_manifest::Config;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

/// A declaration source found under the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub id: DocumentId,
}

/// Configuration plus the directory it was loaded from.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Load `graft.toml`; a missing file means defaults rooted at its directory.
    pub fn open(config_path: &Path) -> graft_manifest::Result<Self> {
        let root = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let config = if config_path.exists() {
            Config::from_file(config_path)?
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Config::default()
        };
        Ok(Self::new(root, config))
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join(&self.config.sources.dir)
    }

    /// Base directory generated twins are written under.
    pub fn output_dir(&self) -> PathBuf {
        match &self.config.output.dir {
            Some(dir) => self.root.join(dir),
            None => self.root.clone(),
        }
    }

    /// Identity of a source file: its path relative to the project root,
    /// with the source extension replaced by `.rs`.
    pub fn document_id(&self, path: &Path) -> DocumentId {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let mut id = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let extension = format!(".{}", self.config.sources.extension);
        if let Some(stem) = id.strip_suffix(&extension) {
            id = format!("{}.rs", stem);
        }
        DocumentId::new(id)
    }

    /// Path a generated twin is written to.
    pub fn twin_path(&self, source: &DocumentId) -> PathBuf {
        self.output_dir()
            .join(source.generated_twin(&self.config.output.suffix).as_str())
    }

    /// Every source file under the source directory, in path order.
    pub fn discover(&self) -> Result<Vec<SourceFile>> {
        let dir = self.source_dir();
        let extension = format!(".{}", self.config.sources.extension);

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).sort_by_file_name() {
            let entry =
                entry.wrap_err_with(|| format!("Failed to walk {}", dir.display()))?;
            let is_source = entry.file_type().is_file()
                && entry.file_name().to_string_lossy().ends_with(&extension);
            if is_source {
                let path = entry.into_path();
                files.push(SourceFile {
                    id: self.document_id(&path),
                    path,
                });
            }
        }
        tracing::debug!(dir = %dir.display(), count = files.len(), "discovered sources");
        Ok(files)
    }

    /// Parse every source file.
    pub fn load(&self, files: &[SourceFile]) -> graft_manifest::Result<Vec<SourceDocument>> {
        files
            .iter()
            .map(|file| graft_manifest::load_source(file.id.clone(), &file.path))
            .collect()
    }

    pub fn pipeline(&self) -> Pipeline {
        let mut config = PipelineConfig::default()
            .with_output_suffix(self.config.output.suffix.clone())
            .with_header(self.config.output.header);
        if let Some(workers) = self.config.pipeline.workers {
            config = config.with_workers(workers);
        }
        let loader = BuiltinLoader::with_allowed(self.config.modules.allow.iter().cloned());
        Pipeline::with_config(Arc::new(loader), config)
    }

    /// Run the pipeline once over `documents`, honouring the configured
    /// deadline and Ctrl-C.
    pub async fn generate(&self, documents: Vec<SourceDocument>) -> Result<RunOutput> {
        let pipeline = self.pipeline();
        let deadline = self.config.deadline().map(|d| Instant::now() + d);

        let cancel = CancellationToken::new();
        let interrupt = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });

        let output = pipeline.run_with(documents, &cancel, deadline).await;
        interrupt.abort();
        output.wrap_err("Generation run aborted")
    }
}
