//! Compiler settings

use osi_bytecode::{DEFAULT_VERSION_MAJOR, DEFAULT_VERSION_MINOR};
use serde::{Deserialize, Serialize};

/// Options for one compile session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Major version stamped into the container
    pub version_major: u16,
    /// Minor version stamped into the container
    pub version_minor: u16,
    /// Emit a `LineNumber` marker before every source statement
    pub emit_line_numbers: bool,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            version_major: DEFAULT_VERSION_MAJOR,
            version_minor: DEFAULT_VERSION_MINOR,
            emit_line_numbers: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings: CompilerSettings = toml::from_str("emit_line_numbers = true").unwrap();
        assert!(settings.emit_line_numbers);
        assert_eq!(settings.version_major, DEFAULT_VERSION_MAJOR);
        assert_eq!(settings.version_minor, DEFAULT_VERSION_MINOR);
    }
}
