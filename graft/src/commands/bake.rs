use std::path::PathBuf;

use clap::Args;
use eyre::Result;

use super::UnwrapOrExit;
use crate::{
    ops::{self, Project},
    reports::{Report, TerminalOutput},
};

#[derive(Args)]
pub struct BakeCommand {
    /// Path to graft.toml (defaults to ./graft.toml)
    #[arg(short, long, default_value = "graft.toml")]
    pub config: PathBuf,

    /// Preview generated code without writing to disk
    #[arg(long)]
    pub dry_run: bool,
}

impl BakeCommand {
    /// Run the bake command
    pub async fn run(&self) -> Result<()> {
        let project = Project::open(&self.config).unwrap_or_exit();
        let sources = project.discover()?;
        let documents = project.load(&sources).unwrap_or_exit();

        let report = ops::bake(
            &project,
            documents,
            ops::bake::BakeOptions {
                dry_run: self.dry_run,
            },
        )
        .await?;

        report.render(&mut TerminalOutput::new());

        if report.has_errors() {
            std::process::exit(1);
        }
        Ok(())
    }
}
