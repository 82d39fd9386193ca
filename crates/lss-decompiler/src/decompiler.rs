//! Whole-container decompilation

use std::path::Path;

use lss_syntax::{Block, ClassDecl, ParsedUnit, Subroutine, Token};
use osi_bytecode::{Instruction, OsiFile};
use tracing::{debug, warn};

use crate::control_flow::{BodyDecoder, SlotNames};
use crate::error::{DecompileError, DecompileResult};
use crate::inherit::infer_hierarchy;
use crate::passes::tidy;

/// A subroutine that could not be decompiled
#[derive(Debug)]
pub struct DecompileFailure {
    /// Owning class, `None` for a top-level function
    pub class: Option<String>,
    /// Function or method name
    pub subroutine: String,
    /// Why it failed
    pub error: DecompileError,
}

/// Result of decompiling a container
#[derive(Debug)]
pub struct Decompilation {
    /// Reconstructed declarations; failed subroutines are missing
    pub unit: ParsedUnit,
    /// Per-subroutine failures
    pub failures: Vec<DecompileFailure>,
}

impl Decompilation {
    /// Was every subroutine reconstructed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Strip `CheckArgumentCount` and `AllocateLocals`
fn body(code: &[Instruction]) -> &[Instruction] {
    let start = code
        .iter()
        .position(|i| !matches!(i, Instruction::CheckArgumentCount(_) | Instruction::AllocateLocals(_)))
        .unwrap_or(code.len());
    &code[start..]
}

fn subroutine(file: &OsiFile, name: &str, code: &[Instruction], names: SlotNames) -> DecompileResult<Subroutine> {
    let decoder = BodyDecoder::new(file, body(code), names)?;
    let statements = tidy(decoder.decode()?);
    let first = names.is_method as u16;
    let parameters = (0..names.param_count as u16)
        .map(|p| names.token(first + p))
        .collect();
    Ok(Subroutine {
        name: Token::identifier(name),
        parameters,
        body: Block::new(statements),
    })
}

/// Decompile one top-level function
pub fn decompile_function(file: &OsiFile, index: usize) -> DecompileResult<Subroutine> {
    let function = file
        .functions
        .get(index)
        .ok_or(DecompileError::MissingEntry { table: "function", index })?;
    let names = SlotNames {
        is_method: false,
        param_count: function.parameter_count,
    };
    subroutine(file, &function.name, &function.instructions, names)
}

/// Decompile one method of a class
pub fn decompile_method(file: &OsiFile, class: usize, method: usize) -> DecompileResult<Subroutine> {
    let method = file
        .classes
        .get(class)
        .ok_or(DecompileError::MissingEntry { table: "class", index: class })?
        .methods
        .get(method)
        .ok_or(DecompileError::MissingEntry { table: "method", index: method })?;
    let name = file.symbol(method.name_symbol)?;
    let names = SlotNames {
        is_method: true,
        param_count: method.parameter_count(),
    };
    subroutine(file, name, &method.instructions, names)
}

/// Decompile a whole container
///
/// A subroutine that cannot be reconstructed is logged, recorded in
/// [`Decompilation::failures`] and left out of the unit.
pub fn decompile(file: &OsiFile) -> Decompilation {
    let mut unit = ParsedUnit {
        globals: file.globals.iter().map(Token::identifier).collect(),
        ..Default::default()
    };
    let mut failures = Vec::new();

    for (index, function) in file.functions.iter().enumerate() {
        match decompile_function(file, index) {
            Ok(sub) => {
                debug!(function = %function.name, "Decompiled function");
                unit.functions.push(sub);
            }
            Err(error) => {
                warn!(function = %function.name, %error, "Failed to decompile function");
                failures.push(DecompileFailure {
                    class: None,
                    subroutine: function.name.clone(),
                    error,
                });
            }
        }
    }

    let shapes = infer_hierarchy(file);
    for (index, (class, shape)) in file.classes.iter().zip(&shapes).enumerate() {
        let mut decl = ClassDecl {
            name: Token::identifier(class.name.as_str()),
            superclass: shape
                .superclass
                .map(|base| Token::identifier(file.classes[base].name.as_str())),
            properties: Vec::with_capacity(shape.properties.len()),
            methods: Vec::with_capacity(shape.methods.len()),
        };

        for &symbol in &shape.properties {
            match file.symbol(symbol) {
                Ok(name) => decl.properties.push(Token::identifier(name)),
                Err(error) => {
                    warn!(class = %class.name, %error, "Unresolvable property");
                    failures.push(DecompileFailure {
                        class: Some(class.name.clone()),
                        subroutine: format!("property #{}", symbol.0),
                        error: error.into(),
                    });
                }
            }
        }

        for &method in &shape.methods {
            match decompile_method(file, index, method) {
                Ok(sub) => {
                    debug!(class = %class.name, method = %sub.name.text, "Decompiled method");
                    decl.methods.push(sub);
                }
                Err(error) => {
                    let name = file
                        .symbol(class.methods[method].name_symbol)
                        .map(str::to_string)
                        .unwrap_or_else(|_| format!("method #{method}"));
                    warn!(class = %class.name, method = %name, %error, "Failed to decompile method");
                    failures.push(DecompileFailure {
                        class: Some(class.name.clone()),
                        subroutine: name,
                        error,
                    });
                }
            }
        }
        unit.classes.push(decl);
    }

    Decompilation { unit, failures }
}

/// Read a serialized container and decompile it
pub fn decompile_path(path: &Path) -> DecompileResult<Decompilation> {
    let bytes = std::fs::read(path)?;
    let file = OsiFile::from_bytes(&bytes)?;
    let mut decompilation = decompile(&file);
    decompilation.unit.file = Some(path.display().to_string());
    Ok(decompilation)
}
