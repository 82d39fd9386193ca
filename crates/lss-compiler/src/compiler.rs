//! Session driver: registration, class ordering, bodies, linking

use std::path::Path;

use lss_syntax::{ClassDecl, Diagnostic, ParsedUnit, Subroutine, parse_source};
use osi_bytecode::{ClassInfo, FunctionInfo, MethodInfo, OsiFile, SymbolIndex};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::hierarchy::{ClassLayout, order_classes};
use crate::link::link;
use crate::settings::CompilerSettings;
use crate::subroutine::{Declarations, FunctionSignature, SubroutineCompiler};

/// Result of a compile session
#[derive(Debug)]
pub struct Compilation {
    /// The container, or `None` when a semantic error occurred
    pub file: Option<OsiFile>,
    /// Lexical, syntax and compile diagnostics in the order found
    pub diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    /// Did any error-level diagnostic occur
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Compiles parsed units into an OSI container
pub struct Compiler {
    file: OsiFile,
    settings: CompilerSettings,
    errors: Vec<CompileError>,
    warnings: Vec<Diagnostic>,
}

impl Compiler {
    /// Create a compiler producing a fresh container
    pub fn new(settings: CompilerSettings) -> Self {
        Self {
            file: OsiFile::new(settings.version_major, settings.version_minor),
            settings,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Create a compiler that accumulates into an existing container
    ///
    /// Its tables keep their indices; new names are appended. Functions and
    /// classes already present count as declared.
    pub fn with_file(file: OsiFile, settings: CompilerSettings) -> Self {
        Self {
            file,
            settings,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Compile all units as one program
    pub fn compile(mut self, units: &[ParsedUnit]) -> Compilation {
        let (signatures, bodies) = self.register_functions(units);
        self.register_globals(units);
        let classes = self.register_classes(units);

        let (order, errors) = order_classes(&classes, &self.file);
        self.errors.extend(errors);
        let layouts = self.build_layouts(&classes, &order);

        for (index, subroutine) in bodies {
            match self.compile_subroutine(subroutine, None, &signatures, &layouts) {
                Ok(code) => self.file.functions[index].instructions = code,
                Err(err) => self.errors.push(err),
            }
        }

        for idx in order {
            let decl = classes[idx];
            let info = self.compile_class(decl, &signatures, &layouts);
            self.file.classes.push(info);
        }

        if self.errors.is_empty() {
            if let Err(err) = link(&mut self.file) {
                self.errors.push(err);
            }
        }

        let mut diagnostics: Vec<Diagnostic> = self.errors.iter().map(CompileError::to_diagnostic).collect();
        diagnostics.append(&mut self.warnings);
        Compilation {
            file: self.errors.is_empty().then_some(self.file),
            diagnostics,
        }
    }

    fn register_globals(&mut self, units: &[ParsedUnit]) {
        // redeclaring a global silently reuses its slot
        for global in units.iter().flat_map(|u| &u.globals) {
            if let Err(err) = self.file.globals.intern(&global.text) {
                self.errors.push(err.into());
            }
        }
    }

    fn register_functions<'u>(
        &mut self,
        units: &'u [ParsedUnit],
    ) -> (FxHashMap<String, FunctionSignature>, Vec<(usize, &'u Subroutine)>) {
        let mut signatures: FxHashMap<String, FunctionSignature> = self
            .file
            .functions
            .iter()
            .enumerate()
            .map(|(index, f)| {
                let signature = FunctionSignature {
                    parameter_count: f.parameter_count,
                    index,
                };
                (f.name.clone(), signature)
            })
            .collect();

        let mut bodies = Vec::new();
        for function in units.iter().flat_map(|u| &u.functions) {
            let name = &function.name.text;
            if signatures.contains_key(name) {
                self.errors.push(CompileError::DuplicateFunction {
                    name: name.clone(),
                    span: function.name.span.clone(),
                });
                continue;
            }
            let parameter_count = function.parameters.len().min(u8::MAX as usize) as u8;
            let index = self.file.functions.len();
            // placeholder keeps the table in declaration order
            self.file
                .functions
                .push(FunctionInfo::new(name.clone(), parameter_count, Vec::new()));
            signatures.insert(name.clone(), FunctionSignature { parameter_count, index });
            bodies.push((index, function));
        }
        (signatures, bodies)
    }

    fn register_classes<'u>(&mut self, units: &'u [ParsedUnit]) -> Vec<&'u ClassDecl> {
        let mut classes: Vec<&ClassDecl> = Vec::new();
        for class in units.iter().flat_map(|u| &u.classes) {
            let name = &class.name.text;
            let taken = self.file.find_class(name).is_some() || classes.iter().any(|c| &c.name.text == name);
            if taken {
                self.errors.push(CompileError::DuplicateClass {
                    name: name.clone(),
                    span: class.name.span.clone(),
                });
                continue;
            }
            classes.push(class);
        }
        classes
    }

    fn build_layouts(&self, classes: &[&ClassDecl], order: &[usize]) -> FxHashMap<String, ClassLayout> {
        let mut layouts: FxHashMap<String, ClassLayout> = self
            .file
            .classes
            .iter()
            .map(|info| (info.name.clone(), ClassLayout::from_info(info, &self.file)))
            .collect();
        for &idx in order {
            let decl = classes[idx];
            let base = decl.superclass.as_ref().and_then(|b| layouts.get(&b.text));
            let layout = ClassLayout::derive(decl, base);
            layouts.insert(layout.name.clone(), layout);
        }
        layouts
    }

    fn compile_subroutine(
        &mut self,
        subroutine: &Subroutine,
        class: Option<&ClassLayout>,
        signatures: &FxHashMap<String, FunctionSignature>,
        layouts: &FxHashMap<String, ClassLayout>,
    ) -> CompileResult<Vec<osi_bytecode::Instruction>> {
        let declarations = Declarations {
            globals: &self.file.globals,
            functions: signatures,
            classes: layouts,
            settings: &self.settings,
        };
        let compiler = SubroutineCompiler::new(
            &mut self.file.strings,
            &mut self.file.symbols,
            declarations,
            class,
            subroutine,
        )?;
        let body = compiler.compile(subroutine)?;
        self.warnings.extend(body.warnings);
        let code = body.instructions;
        debug!(
            name = %subroutine.name.text,
            class = class.map(|c| c.name.as_str()),
            instructions = code.len(),
            "Compiled subroutine"
        );
        Ok(code)
    }

    /// Compile a class on top of its (already compiled) base
    fn compile_class(
        &mut self,
        decl: &ClassDecl,
        signatures: &FxHashMap<String, FunctionSignature>,
        layouts: &FxHashMap<String, ClassLayout>,
    ) -> ClassInfo {
        let mut info = decl
            .superclass
            .as_ref()
            .and_then(|base| self.file.find_class(&base.text))
            .map(|idx| self.file.classes[idx].clone())
            .unwrap_or_else(|| ClassInfo::new(""));
        info.name = decl.name.text.clone();

        for property in &decl.properties {
            match self.file.symbols.intern(&property.text) {
                Ok(symbol) => {
                    let symbol = SymbolIndex(symbol);
                    if !info.has_property(symbol) {
                        info.property_symbols.push(symbol);
                    }
                }
                Err(err) => self.errors.push(err.into()),
            }
        }

        let layout = layouts.get(&decl.name.text);
        let mut seen: Vec<&str> = Vec::with_capacity(decl.methods.len());
        for method in &decl.methods {
            if seen.contains(&method.name.text.as_str()) {
                self.errors.push(CompileError::DuplicateFunction {
                    name: method.name.text.clone(),
                    span: method.name.span.clone(),
                });
                continue;
            }
            seen.push(&method.name.text);

            let symbol = match self.file.symbols.intern(&method.name.text) {
                Ok(symbol) => SymbolIndex(symbol),
                Err(err) => {
                    self.errors.push(err.into());
                    continue;
                }
            };
            let code = match self.compile_subroutine(method, layout, signatures, layouts) {
                Ok(code) => code,
                Err(err) => {
                    self.errors.push(err);
                    continue;
                }
            };
            match info.methods.iter_mut().find(|m| m.name_symbol == symbol) {
                Some(inherited) => inherited.instructions = code,
                None => info.methods.push(MethodInfo::new(symbol, code)),
            }
        }
        info
    }
}

/// Compile parsed units with the given settings
pub fn compile(units: &[ParsedUnit], settings: CompilerSettings) -> Compilation {
    Compiler::new(settings).compile(units)
}

/// Compile parsed units with default settings
pub fn compile_units(units: &[ParsedUnit]) -> Compilation {
    compile(units, CompilerSettings::default())
}

/// Parse and compile one source text
///
/// Lexical and syntax diagnostics are reported ahead of compile diagnostics;
/// on their own they do not suppress the container.
pub fn compile_source(source: &str, filename: Option<&str>) -> Compilation {
    compile_source_with(source, filename, CompilerSettings::default())
}

/// Parse and compile one source text with the given settings
pub fn compile_source_with(source: &str, filename: Option<&str>, settings: CompilerSettings) -> Compilation {
    let (unit, mut diagnostics) = parse_source(source, filename);
    let mut compilation = compile(std::slice::from_ref(&unit), settings);
    diagnostics.append(&mut compilation.diagnostics);
    compilation.diagnostics = diagnostics;
    compilation
}

/// Read, parse and compile a list of files as one program
pub fn compile_files<P: AsRef<Path>>(paths: &[P], settings: CompilerSettings) -> Compilation {
    let mut units = Vec::with_capacity(paths.len());
    let mut diagnostics = Vec::new();
    let mut unreadable = false;

    for path in paths {
        let path = path.as_ref();
        let display = path.display().to_string();
        match std::fs::read_to_string(path) {
            Ok(source) => {
                let (unit, found) = parse_source(&source, Some(&display));
                diagnostics.extend(found);
                units.push(unit);
            }
            Err(source) => {
                let err = CompileError::Io {
                    path: display,
                    source,
                };
                diagnostics.push(err.to_diagnostic());
                unreadable = true;
            }
        }
    }

    let mut compilation = compile(&units, settings);
    diagnostics.append(&mut compilation.diagnostics);
    if unreadable {
        compilation.file = None;
    }
    compilation.diagnostics = diagnostics;
    compilation
}

#[cfg(test)]
mod tests {
    use super::*;
    use osi_bytecode::Instruction;

    #[test]
    fn test_duplicate_function_across_units() {
        let (a, _) = parse_source("function f() {}", Some("a.lss"));
        let (b, _) = parse_source("function f() {}", Some("b.lss"));
        let compilation = compile_units(&[a, b]);
        assert!(compilation.file.is_none());
        assert_eq!(compilation.diagnostics[0].code, "C005");
    }

    #[test]
    fn test_forward_reference_across_units() {
        let (a, _) = parse_source("function main() { return helper(1); }", None);
        let (b, _) = parse_source("function helper(x) { return x; }", None);
        let file = compile_units(&[a, b]).file.unwrap();
        assert_eq!(
            file.functions[0].instructions[1],
            Instruction::CallFunction {
                target: osi_bytecode::CodeOffset(9),
                argc: 1
            }
        );
    }

    #[test]
    fn test_with_file_accumulates() {
        let first = compile_source("global g; function f() { return \"x\"; }", None).file.unwrap();
        let (unit, _) = parse_source("function h() { g = \"x\"; return f(); }", None);
        let compilation = Compiler::with_file(first, CompilerSettings::default()).compile(&[unit]);
        let file = compilation.file.unwrap();
        assert_eq!(file.functions.len(), 2);
        assert_eq!(file.strings.len(), 1);
        assert_eq!(
            file.functions[1].instructions[1],
            Instruction::SetVariable(osi_bytecode::Slot::global(0))
        );
    }

    #[test]
    fn test_with_file_rejects_redefinition() {
        let first = compile_source("function f() {}", None).file.unwrap();
        let (unit, _) = parse_source("function f() {}", None);
        let compilation = Compiler::with_file(first, CompilerSettings::default()).compile(&[unit]);
        assert!(compilation.file.is_none());
    }

    #[test]
    fn test_unreadable_file() {
        let compilation = compile_files(&["/nonexistent/dir/missing.lss"], CompilerSettings::default());
        assert!(compilation.file.is_none());
        assert_eq!(compilation.diagnostics[0].code, "C017");
    }
}
