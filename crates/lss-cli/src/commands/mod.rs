//! CLI command implementations.

pub mod check;
pub mod compile;
pub mod decompile;
pub mod dump;

pub use check::CheckCommand;
pub use compile::CompileCommand;
pub use decompile::DecompileCommand;
pub use dump::DumpCommand;

use lss_syntax::Diagnostic;

/// Print diagnostics to stderr and return the number of errors among them
pub fn report(diagnostics: &[Diagnostic]) -> usize {
    for diagnostic in diagnostics {
        eprintln!("{diagnostic}");
    }
    diagnostics.iter().filter(|d| d.is_error()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_compile_then_decompile_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("main.lss");
        std::fs::write(&source, "function twice(x) { return x * 2; }\nclass Unit { property hp; }\n").unwrap();
        let output = dir.path().join("main.osi");

        let config = Config::default();
        CompileCommand {
            inputs: vec![source.clone()],
            output: output.clone(),
            line_numbers: false,
        }
        .run(&config)
        .unwrap();

        let out_dir = dir.path().join("decompiled");
        DecompileCommand {
            input: output,
            out_dir: Some(out_dir.clone()),
            indent: Some(2),
        }
        .run(&config)
        .unwrap();

        let twice = std::fs::read_to_string(out_dir.join("functions/twice.lss")).unwrap();
        assert_eq!(twice, "function twice(param1) {\n  return param1 * 2;\n}\n");
        assert!(out_dir.join("classes/Unit.lss").is_file());

        CheckCommand { inputs: vec![source] }.run(&config).unwrap();
    }

    #[test]
    fn test_compile_errors_fail_the_command() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("bad.lss");
        std::fs::write(&source, "function f() { return nope; }").unwrap();
        let result = CompileCommand {
            inputs: vec![source],
            output: dir.path().join("bad.osi"),
            line_numbers: false,
        }
        .run(&Config::default());
        assert!(result.is_err());
        assert!(!dir.path().join("bad.osi").exists());
    }
}
