//! Compile command - LSS sources to an OSI container.

use anyhow::{Context, Result, bail};
use clap::Args;
use lss_compiler::compile_files;
use std::path::PathBuf;
use tracing::info;

use super::report;
use crate::config::Config;

#[derive(Args)]
pub struct CompileCommand {
    /// Source files, compiled together as one program
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output container path
    #[arg(long, short = 'o', default_value = "out.osi")]
    pub output: PathBuf,

    /// Emit line-number markers
    #[arg(long)]
    pub line_numbers: bool,
}

impl CompileCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        let mut settings = config.compiler.clone();
        if self.line_numbers {
            settings.emit_line_numbers = true;
        }

        let compilation = compile_files(&self.inputs, settings);
        let errors = report(&compilation.diagnostics);
        let Some(file) = compilation.file else {
            bail!("compilation failed with {errors} error(s)");
        };

        let bytes = file.to_bytes()?;
        std::fs::write(&self.output, &bytes)
            .with_context(|| format!("Failed to write {}", self.output.display()))?;
        info!(
            output = %self.output.display(),
            functions = file.functions.len(),
            classes = file.classes.len(),
            bytes = bytes.len(),
            "Wrote container"
        );
        Ok(())
    }
}
