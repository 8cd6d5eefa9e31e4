use std::path::PathBuf;

use clap::Args;
use eyre::Result;

use super::UnwrapOrExit;
use crate::{
    ops::{self, Project},
    reports::{Report, TerminalOutput},
};

#[derive(Args)]
pub struct CheckCommand {
    /// Path to graft.toml (defaults to ./graft.toml)
    #[arg(short, long, default_value = "graft.toml")]
    pub config: PathBuf,
}

impl CheckCommand {
    /// Run the check command
    pub async fn run(&self) -> Result<()> {
        let project = Project::open(&self.config).unwrap_or_exit();
        let sources = project.discover()?;
        let documents = project.load(&sources).unwrap_or_exit();

        let report = ops::check(&project, documents, &self.config).await?;
        report.render(&mut TerminalOutput::new());

        if !report.is_valid() {
            std::process::exit(1);
        }
        Ok(())
    }
}
