//! Configuration file parsing for lss.toml.

use lss_compiler::CompilerSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Compiler settings
    #[serde(default)]
    pub compiler: CompilerSettings,

    /// Decompiler output settings
    #[serde(default)]
    pub decompiler: DecompilerConfig,
}

/// Decompiler output configuration.
#[derive(Debug, Deserialize)]
pub struct DecompilerConfig {
    /// Spaces per indentation level in printed source
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Directory for projected sources when `--out-dir` is not given
    pub out_dir: Option<PathBuf>,
}

impl Default for DecompilerConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            out_dir: None,
        }
    }
}

fn default_indent() -> usize {
    4
}

/// Load configuration from a file or search for default config files.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config_path = path.map(PathBuf::from).or_else(find_config_file);

    match config_path {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            tracing::debug!(path = %path.display(), "Loaded configuration");
            Ok(config)
        }
        _ => Ok(Config::default()),
    }
}

/// Search for a configuration file in the current directory and parent directories.
fn find_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_ancestors(&cwd)
}

fn find_config_in_ancestors(start: &Path) -> Option<PathBuf> {
    const CONFIG_NAMES: &[&str] = &["lss.toml", ".lssrc.toml"];

    let mut dir = Some(start);
    while let Some(current) = dir {
        for name in CONFIG_NAMES {
            let path = current.join(name);
            if path.exists() {
                return Some(path);
            }
        }
        dir = current.parent();
    }

    None
}
