//! Function, class and method records of an OSI container

use serde::{Deserialize, Serialize};

use crate::instruction::{Instruction, code_size};
use crate::operand::SymbolIndex;

/// A top-level script function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInfo {
    /// Function name
    pub name: String,
    /// Number of declared parameters
    pub parameter_count: u8,
    /// Instruction stream
    pub instructions: Vec<Instruction>,
}

impl FunctionInfo {
    /// Create a function record
    pub fn new(name: impl Into<String>, parameter_count: u8, instructions: Vec<Instruction>) -> Self {
        Self {
            name: name.into(),
            parameter_count,
            instructions,
        }
    }

    /// Encoded size of the body in bytes
    pub fn code_size(&self) -> usize {
        code_size(&self.instructions)
    }
}

/// A method of a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodInfo {
    /// Method name in the symbol table
    pub name_symbol: SymbolIndex,
    /// Instruction stream
    pub instructions: Vec<Instruction>,
}

impl MethodInfo {
    /// Create a method record
    pub fn new(name_symbol: SymbolIndex, instructions: Vec<Instruction>) -> Self {
        Self {
            name_symbol,
            instructions,
        }
    }

    /// Encoded size of the body in bytes
    pub fn code_size(&self) -> usize {
        code_size(&self.instructions)
    }

    /// Declared parameter count, read from the `CheckArgumentCount` prologue
    pub fn parameter_count(&self) -> u8 {
        self.instructions
            .iter()
            .take_while(|i| {
                matches!(
                    i,
                    Instruction::CheckArgumentCount(_) | Instruction::AllocateLocals(_)
                )
            })
            .find_map(|i| match i {
                Instruction::CheckArgumentCount(n) => Some(*n),
                _ => None,
            })
            .unwrap_or(0)
    }
}

/// A class declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    /// Class name
    pub name: String,
    /// Property names in declaration order (inherited first)
    pub property_symbols: Vec<SymbolIndex>,
    /// Methods in declaration order (inherited first)
    pub methods: Vec<MethodInfo>,
}

impl ClassInfo {
    /// Create an empty class record
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property_symbols: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Find a method by its name symbol
    pub fn method(&self, symbol: SymbolIndex) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.name_symbol == symbol)
    }

    /// Does the class declare (or inherit) this property
    pub fn has_property(&self, symbol: SymbolIndex) -> bool {
        self.property_symbols.contains(&symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parameter_count() {
        let method = MethodInfo::new(
            SymbolIndex(0),
            vec![
                Instruction::CheckArgumentCount(2),
                Instruction::AllocateLocals(1),
                Instruction::PushNothing,
                Instruction::Return,
            ],
        );
        assert_eq!(method.parameter_count(), 2);

        let bare = MethodInfo::new(SymbolIndex(0), vec![Instruction::PushNothing, Instruction::Return]);
        assert_eq!(bare.parameter_count(), 0);
    }

    #[test]
    fn test_function_code_size() {
        let func = FunctionInfo::new(
            "f",
            0,
            vec![Instruction::PushInt16(1000), Instruction::Return],
        );
        assert_eq!(func.code_size(), 4);
    }
}
