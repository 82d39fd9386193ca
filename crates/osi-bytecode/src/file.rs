//! OSI container format

use std::fmt::Write as _;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{BytecodeError, Result};
use crate::function::{ClassInfo, FunctionInfo, MethodInfo};
use crate::instruction::Instruction;
use crate::operand::SymbolIndex;
use crate::table::NameTable;
use crate::{DEFAULT_VERSION_MAJOR, DEFAULT_VERSION_MINOR, OSI_MAGIC};

/// A compiled OSI bytecode container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsiFile {
    /// Format major version
    pub version_major: u16,
    /// Format minor version
    pub version_minor: u16,
    /// String literal table
    pub strings: NameTable,
    /// Symbol table (member, method, class and namespace names)
    pub symbols: NameTable,
    /// Global variable names
    pub globals: NameTable,
    /// Top-level functions
    pub functions: Vec<FunctionInfo>,
    /// Classes
    pub classes: Vec<ClassInfo>,
}

impl Default for OsiFile {
    fn default() -> Self {
        Self::new(DEFAULT_VERSION_MAJOR, DEFAULT_VERSION_MINOR)
    }
}

impl OsiFile {
    /// Create an empty container
    pub fn new(version_major: u16, version_minor: u16) -> Self {
        Self {
            version_major,
            version_minor,
            strings: NameTable::new(),
            symbols: NameTable::new(),
            globals: NameTable::new(),
            functions: Vec::new(),
            classes: Vec::new(),
        }
    }

    /// Find a function index by name
    pub fn find_function(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name == name)
    }

    /// Find a class index by name
    pub fn find_class(&self, name: &str) -> Option<usize> {
        self.classes.iter().position(|c| c.name == name)
    }

    /// Resolve a symbol to its name
    pub fn symbol(&self, symbol: SymbolIndex) -> Result<&str> {
        self.symbols.resolve("symbol", symbol.0)
    }

    /// Absolute start offset of every function body in the code segment
    ///
    /// Functions come first in table order, followed by all method bodies.
    pub fn function_offsets(&self) -> Vec<u32> {
        let mut offsets = Vec::with_capacity(self.functions.len());
        let mut offset = 0u32;
        for function in &self.functions {
            offsets.push(offset);
            offset += function.code_size() as u32;
        }
        offsets
    }

    /// Absolute start offset of every method body, grouped by class
    pub fn method_offsets(&self) -> Vec<Vec<u32>> {
        let mut offset: u32 = self.functions.iter().map(|f| f.code_size() as u32).sum();
        self.classes
            .iter()
            .map(|class| {
                class
                    .methods
                    .iter()
                    .map(|m| {
                        let start = offset;
                        offset += m.code_size() as u32;
                        start
                    })
                    .collect()
            })
            .collect()
    }

    /// Index of the function whose body starts at `offset`
    pub fn function_at_offset(&self, offset: u32) -> Option<usize> {
        self.function_offsets().iter().position(|&o| o == offset)
    }

    /// Serialize to the binary container layout
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(&OSI_MAGIC);
        out.extend_from_slice(&self.version_major.to_le_bytes());
        out.extend_from_slice(&self.version_minor.to_le_bytes());

        for (table, label) in [
            (&self.strings, "string table"),
            (&self.symbols, "symbol table"),
            (&self.globals, "global table"),
        ] {
            write_count(&mut out, table.len(), label)?;
            for name in table.iter() {
                write_name(&mut out, name)?;
            }
        }

        write_count(&mut out, self.functions.len(), "function table")?;
        for function in &self.functions {
            write_name(&mut out, &function.name)?;
            out.push(function.parameter_count);
            write_code(&mut out, &function.instructions)?;
        }

        write_count(&mut out, self.classes.len(), "class table")?;
        for class in &self.classes {
            write_name(&mut out, &class.name)?;
            write_count(&mut out, class.property_symbols.len(), "property list")?;
            for symbol in &class.property_symbols {
                out.extend_from_slice(&symbol.0.to_le_bytes());
            }
            write_count(&mut out, class.methods.len(), "method list")?;
            for method in &class.methods {
                out.extend_from_slice(&method.name_symbol.0.to_le_bytes());
                write_code(&mut out, &method.instructions)?;
            }
        }

        Ok(out)
    }

    /// Deserialize from the binary container layout
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        if reader.take(4)? != OSI_MAGIC {
            return Err(BytecodeError::InvalidMagic);
        }

        let mut file = Self::new(reader.u16()?, reader.u16()?);

        let mut tables = [NameTable::new(), NameTable::new(), NameTable::new()];
        for table in &mut tables {
            let count = reader.u16()?;
            let mut entries = Vec::with_capacity(count as usize);
            for _ in 0..count {
                entries.push(reader.name()?);
            }
            *table = NameTable::from(entries);
        }
        let [strings, symbols, globals] = tables;
        file.strings = strings;
        file.symbols = symbols;
        file.globals = globals;

        let function_count = reader.u16()?;
        for _ in 0..function_count {
            let name = reader.name()?;
            let parameter_count = reader.u8()?;
            let instructions = reader.code()?;
            file.functions.push(FunctionInfo::new(name, parameter_count, instructions));
        }

        let class_count = reader.u16()?;
        for _ in 0..class_count {
            let mut class = ClassInfo::new(reader.name()?);
            let property_count = reader.u16()?;
            for _ in 0..property_count {
                class.property_symbols.push(SymbolIndex(reader.u16()?));
            }
            let method_count = reader.u16()?;
            for _ in 0..method_count {
                let symbol = SymbolIndex(reader.u16()?);
                class.methods.push(MethodInfo::new(symbol, reader.code()?));
            }
            file.classes.push(class);
        }

        Ok(file)
    }

    /// Write container to a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let bytes = self.to_bytes()?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Read container from a reader
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Pretty JSON view of the container
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Human readable listing with resolved names and absolute offsets
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "; OSI {}.{}", self.version_major, self.version_minor);
        for (label, table) in [
            ("strings", &self.strings),
            ("symbols", &self.symbols),
            ("globals", &self.globals),
        ] {
            let _ = writeln!(out, "; {label}");
            for (i, name) in table.iter().enumerate() {
                let _ = writeln!(out, ";   {i:>4} {name:?}");
            }
        }

        for (function, start) in self.functions.iter().zip(self.function_offsets()) {
            let _ = writeln!(out, "\nfunction {}/{}:", function.name, function.parameter_count);
            disassemble_body(&mut out, &function.instructions, start);
        }

        for (class, starts) in self.classes.iter().zip(self.method_offsets()) {
            let _ = writeln!(out, "\nclass {}:", class.name);
            for symbol in &class.property_symbols {
                let name = self.symbols.get(symbol.0).unwrap_or("?");
                let _ = writeln!(out, "  property {name}");
            }
            for (method, start) in class.methods.iter().zip(starts) {
                let name = self.symbols.get(method.name_symbol.0).unwrap_or("?");
                let _ = writeln!(out, "  method {name}:");
                disassemble_body(&mut out, &method.instructions, start);
            }
        }
        out
    }
}

fn disassemble_body(out: &mut String, instructions: &[Instruction], start: u32) {
    let mut offset = start as usize;
    for instruction in instructions {
        let _ = writeln!(out, "    {offset:06}  {instruction}");
        offset += instruction.size();
    }
}

fn write_count(out: &mut Vec<u8>, count: usize, what: &'static str) -> Result<()> {
    let count = u16::try_from(count).map_err(|_| BytecodeError::TooLarge(what))?;
    out.extend_from_slice(&count.to_le_bytes());
    Ok(())
}

fn write_name(out: &mut Vec<u8>, name: &str) -> Result<()> {
    write_count(out, name.len(), "name")?;
    out.extend_from_slice(name.as_bytes());
    Ok(())
}

fn write_code(out: &mut Vec<u8>, instructions: &[Instruction]) -> Result<()> {
    let code = Instruction::encode_all(instructions)?;
    let len = u32::try_from(code.len()).map_err(|_| BytecodeError::TooLarge("code"))?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&code);
    Ok(())
}

/// Cursor over a serialized container
struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let slice = self
            .bytes
            .get(self.pos..self.pos + n)
            .ok_or(BytecodeError::UnexpectedEnd(self.pos))?;
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn name(&mut self) -> Result<String> {
        let len = self.u16()? as usize;
        let at = self.pos;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| BytecodeError::InvalidUtf8(at))
    }

    fn code(&mut self) -> Result<Vec<Instruction>> {
        let len = self.u32()? as usize;
        let at = self.pos;
        let code = self.take(len)?;
        Instruction::decode_all(code).map_err(|e| match e {
            BytecodeError::InvalidOpcode { opcode, offset } => BytecodeError::InvalidOpcode {
                opcode,
                offset: at + offset,
            },
            BytecodeError::UnexpectedEnd(offset) => BytecodeError::UnexpectedEnd(at + offset),
            other => other,
        })
    }
}
