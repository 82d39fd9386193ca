//! Check command - report diagnostics without writing output.

use anyhow::{Result, bail};
use clap::Args;
use lss_compiler::compile_files;
use std::path::PathBuf;

use super::report;
use crate::config::Config;

#[derive(Args)]
pub struct CheckCommand {
    /// Source files, checked together as one program
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

impl CheckCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        let compilation = compile_files(&self.inputs, config.compiler.clone());
        let errors = report(&compilation.diagnostics);
        if errors > 0 || compilation.file.is_none() {
            bail!("{errors} error(s)");
        }
        println!("{} file(s) OK", self.inputs.len());
        Ok(())
    }
}
