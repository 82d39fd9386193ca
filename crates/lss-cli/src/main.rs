use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;

mod commands;
mod config;

use commands::{CheckCommand, CompileCommand, DecompileCommand, DumpCommand};

#[derive(Parser)]
#[command(name = "lss", version, about = "LSS compiler and OSI decompiler")]
struct Cli {
    /// Configuration file (defaults to the nearest lss.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile LSS sources into an OSI container
    Compile(CompileCommand),
    /// Decompile an OSI container back to LSS
    Decompile(DecompileCommand),
    /// Show the contents of an OSI container
    Dump(DumpCommand),
    /// Parse and compile without writing output
    Check(CheckCommand),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Compile(cmd) => cmd.run(&config),
        Commands::Decompile(cmd) => cmd.run(&config),
        Commands::Dump(cmd) => cmd.run(&config),
        Commands::Check(cmd) => cmd.run(&config),
    }
}
