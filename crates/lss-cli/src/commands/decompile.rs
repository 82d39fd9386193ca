//! Decompile command - OSI container back to LSS source.

use anyhow::{Result, bail};
use clap::Args;
use lss_decompiler::{decompile_path, project};
use lss_syntax::PrettyPrinter;
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;

#[derive(Args)]
pub struct DecompileCommand {
    /// Container to decompile
    pub input: PathBuf,

    /// Write one file per function and class under this directory
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Spaces per indentation level
    #[arg(long)]
    pub indent: Option<usize>,
}

impl DecompileCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        let decompilation = decompile_path(&self.input)?;
        let printer = PrettyPrinter::new(self.indent.unwrap_or(config.decompiler.indent));

        match self.out_dir.as_ref().or(config.decompiler.out_dir.as_ref()) {
            Some(dir) => {
                let written = project(&decompilation, dir, &printer)?;
                info!(dir = %dir.display(), files = written.len(), "Projected sources");
            }
            None => print!("{}", printer.print_unit(&decompilation.unit)),
        }

        for failure in &decompilation.failures {
            match &failure.class {
                Some(class) => eprintln!("{class}.{}: {}", failure.subroutine, failure.error),
                None => eprintln!("{}: {}", failure.subroutine, failure.error),
            }
        }
        if !decompilation.is_complete() {
            bail!("{} subroutine(s) could not be decompiled", decompilation.failures.len());
        }
        Ok(())
    }
}
