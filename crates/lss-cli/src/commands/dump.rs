//! Dump command - disassembly or JSON view of a container.

use anyhow::{Context, Result};
use clap::Args;
use osi_bytecode::OsiFile;
use std::path::PathBuf;

use crate::config::Config;

#[derive(Args)]
pub struct DumpCommand {
    /// Container to show
    pub input: PathBuf,

    /// Print the container as JSON instead of disassembly
    #[arg(long)]
    pub json: bool,
}

impl DumpCommand {
    pub fn run(&self, _config: &Config) -> Result<()> {
        let bytes = std::fs::read(&self.input)
            .with_context(|| format!("Failed to read {}", self.input.display()))?;
        let file = OsiFile::from_bytes(&bytes)?;
        if self.json {
            println!("{}", file.to_json()?);
        } else {
            print!("{}", file.disassemble());
        }
        Ok(())
    }
}
