//! Directory projection of a decompiled container
//!
//! ```text
//! <dir>/globals.lss
//! <dir>/functions/<name>.lss
//! <dir>/classes/<root>/<..>/<Name>.lss
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use lss_syntax::{ClassDecl, ParsedUnit, PrettyPrinter};
use tracing::debug;

use crate::decompiler::Decompilation;
use crate::error::DecompileResult;

/// Extension of projected source files
pub const SOURCE_EXTENSION: &str = "lss";

/// Base class names of `class`, root first
fn ancestors<'u>(unit: &'u ParsedUnit, class: &ClassDecl) -> Vec<&'u str> {
    let mut chain = Vec::new();
    let mut current = class.superclass.as_ref();
    while let Some(name) = current {
        let Some(base) = unit.class(&name.text) else {
            break;
        };
        if chain.len() >= unit.classes.len() {
            break;
        }
        chain.push(base.name.text.as_str());
        current = base.superclass.as_ref();
    }
    chain.reverse();
    chain
}

fn write(path: PathBuf, text: &str, written: &mut Vec<PathBuf>) -> DecompileResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, text)?;
    debug!(path = %path.display(), "Wrote source file");
    written.push(path);
    Ok(())
}

/// Write one source file per function and class under `dir`
///
/// Returns the written paths in order.
pub fn project(decompilation: &Decompilation, dir: &Path, printer: &PrettyPrinter) -> DecompileResult<Vec<PathBuf>> {
    let unit = &decompilation.unit;
    let mut written = Vec::new();

    if !unit.globals.is_empty() {
        let globals = ParsedUnit {
            globals: unit.globals.clone(),
            ..Default::default()
        };
        write(
            dir.join(format!("globals.{SOURCE_EXTENSION}")),
            &printer.print_unit(&globals),
            &mut written,
        )?;
    }

    for function in &unit.functions {
        let single = ParsedUnit {
            functions: vec![function.clone()],
            ..Default::default()
        };
        let path = dir
            .join("functions")
            .join(format!("{}.{SOURCE_EXTENSION}", function.name.text));
        write(path, &printer.print_unit(&single), &mut written)?;
    }

    for class in &unit.classes {
        let mut path = dir.join("classes");
        for base in ancestors(unit, class) {
            path.push(base);
        }
        path.push(format!("{}.{SOURCE_EXTENSION}", class.name.text));
        let single = ParsedUnit {
            classes: vec![class.clone()],
            ..Default::default()
        };
        write(path, &printer.print_unit(&single), &mut written)?;
    }

    Ok(written)
}
