/// Settings for a [`Pipeline`](super::Pipeline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum number of marker invocations in flight at once.
    pub workers: usize,
    /// Inserted before the extension of a source identity to name its
    /// generated twin.
    pub output_suffix: String,
    /// Emit the `@generated` header line.
    pub header: bool,
}

impl PipelineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.output_suffix = suffix.into();
        self
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            output_suffix: "g".to_string(),
            header: true,
        }
    }
}
