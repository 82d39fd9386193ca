//! Bytecode instructions (opcodes)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BytecodeError, Result};
use crate::operand::{BranchOffset, CodeOffset, Slot, StringIndex, SymbolIndex};

/// Bytecode opcodes
///
/// Stack-based instruction set. Operand widths are fixed per opcode, see
/// [`Opcode::operand_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    // ==================== Literals ====================
    /// Push the `nothing` value
    PushNothing = 0x01,
    /// Push `true`
    PushTrue = 0x02,
    /// Push `false`
    PushFalse = 0x03,
    /// Push integer zero
    PushZero = 0x04,
    /// Push 8-bit signed immediate
    PushInt8 = 0x05,
    /// Push 16-bit signed immediate
    PushInt16 = 0x06,
    /// Push 32-bit signed immediate
    PushInt32 = 0x07,
    /// Push 32-bit float immediate
    PushFloat = 0x08,
    /// Push strings\[idx\]
    PushString = 0x09,

    // ==================== Variables & members ====================
    /// Push slot value (local, or global with the flag bit)
    GetVariable = 0x10,
    /// Pop into slot
    SetVariable = 0x11,
    /// obj -> obj.symbol
    GetMember = 0x12,
    /// obj value -> (obj.symbol = value)
    SetMember = 0x13,
    /// -> this.symbol
    GetThisMember = 0x14,
    /// value -> (this.symbol = value)
    SetThisMember = 0x15,
    /// obj name -> obj.$name
    GetDynamicMember = 0x16,
    /// obj name value -> (obj.$name = value)
    SetDynamicMember = 0x17,
    /// -> namespace::name
    GetGameVariable = 0x18,
    /// value -> (namespace::name = value)
    SetGameVariable = 0x19,
    /// name -> namespace::$name
    GetDynamicGameVariable = 0x1A,
    /// array index -> array\[index\]
    GetElement = 0x1B,
    /// array index value -> (array\[index\] = value)
    SetElement = 0x1C,
    /// e1..en -> \[e1..en\]
    CreateArray = 0x1D,

    // ==================== Arithmetic ====================
    /// lhs + rhs
    Add = 0x20,
    /// lhs - rhs
    Sub = 0x21,
    /// lhs * rhs
    Mul = 0x22,
    /// lhs / rhs
    Div = 0x23,
    /// lhs % rhs
    Mod = 0x24,
    /// lhs ** rhs
    Pow = 0x25,
    /// lhs & rhs
    BitAnd = 0x26,
    /// lhs | rhs
    BitOr = 0x27,
    /// lhs ^ rhs
    BitXor = 0x28,
    /// lhs << rhs
    ShiftLeft = 0x29,
    /// lhs >> rhs
    ShiftRight = 0x2A,

    // ==================== Comparison & logic ====================
    /// lhs == rhs
    Equal = 0x30,
    /// lhs != rhs
    NotEqual = 0x31,
    /// lhs < rhs
    Less = 0x32,
    /// lhs <= rhs
    LessEqual = 0x33,
    /// lhs > rhs
    Greater = 0x34,
    /// lhs >= rhs
    GreaterEqual = 0x35,
    /// lhs && rhs
    LogicalAnd = 0x36,
    /// lhs || rhs
    LogicalOr = 0x37,

    // ==================== Unary ====================
    /// -src
    Negate = 0x40,
    /// !src
    Not = 0x41,
    /// ~src
    BitNot = 0x42,

    // ==================== Builtin properties ====================
    /// Array or string length
    Length = 0x50,
    /// Red channel of a color
    Red = 0x51,
    /// Green channel of a color
    Green = 0x52,
    /// Blue channel of a color
    Blue = 0x53,
    /// Alpha channel of a color
    Alpha = 0x54,
    /// Type test: integer
    IsInt = 0x55,
    /// Type test: float
    IsFloat = 0x56,
    /// Type test: string
    IsString = 0x57,
    /// Type test: object
    IsObject = 0x58,
    /// Type test: array
    IsArray = 0x59,
    /// Class identifier of an object
    ClassId = 0x5A,

    // ==================== Array builtins ====================
    /// array value -> array (value appended)
    ArrayAppend = 0x60,
    /// array index -> array (element removed)
    ArrayRemoveAt = 0x61,
    /// array index value -> array (value inserted)
    ArrayInsertAt = 0x62,

    // ==================== Calls & objects ====================
    /// Call a script function by code offset
    CallFunction = 0x70,
    /// Call a game function namespace::name
    CallGameFunction = 0x71,
    /// Call a game function namespace::$name
    CallDynamicGameFunction = 0x72,
    /// Call a method on a duplicated receiver
    CallMethod = 0x73,
    /// Call a method on `this`
    CallThisMethod = 0x74,
    /// Call a method chosen by a runtime name
    CallDynamicMethod = 0x75,
    /// Instantiate a class
    CreateObject = 0x76,
    /// Push a method reference resolved by symbol
    LookupMethod = 0x77,
    /// Call a method reference
    CallIndirect = 0x78,

    // ==================== Control Flow ====================
    /// Unconditional relative branch
    Branch = 0x80,
    /// Pop condition, branch if false
    BranchIfFalse = 0x81,
    /// Pop condition, branch if true
    BranchIfTrue = 0x82,

    // ==================== Misc ====================
    /// Pop value and return it
    Return = 0x90,
    /// Pop value (discard)
    Pop = 0x91,
    /// Duplicate top value
    Dup = 0x92,
    /// Reserve local slots beyond the parameters
    AllocateLocals = 0x93,
    /// Verify the argument count of an instance method call
    CheckArgumentCount = 0x94,
    /// Source line marker
    LineNumber = 0x95,
}

impl Opcode {
    /// Convert from raw byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::PushNothing),
            0x02 => Some(Self::PushTrue),
            0x03 => Some(Self::PushFalse),
            0x04 => Some(Self::PushZero),
            0x05 => Some(Self::PushInt8),
            0x06 => Some(Self::PushInt16),
            0x07 => Some(Self::PushInt32),
            0x08 => Some(Self::PushFloat),
            0x09 => Some(Self::PushString),

            0x10 => Some(Self::GetVariable),
            0x11 => Some(Self::SetVariable),
            0x12 => Some(Self::GetMember),
            0x13 => Some(Self::SetMember),
            0x14 => Some(Self::GetThisMember),
            0x15 => Some(Self::SetThisMember),
            0x16 => Some(Self::GetDynamicMember),
            0x17 => Some(Self::SetDynamicMember),
            0x18 => Some(Self::GetGameVariable),
            0x19 => Some(Self::SetGameVariable),
            0x1A => Some(Self::GetDynamicGameVariable),
            0x1B => Some(Self::GetElement),
            0x1C => Some(Self::SetElement),
            0x1D => Some(Self::CreateArray),

            0x20 => Some(Self::Add),
            0x21 => Some(Self::Sub),
            0x22 => Some(Self::Mul),
            0x23 => Some(Self::Div),
            0x24 => Some(Self::Mod),
            0x25 => Some(Self::Pow),
            0x26 => Some(Self::BitAnd),
            0x27 => Some(Self::BitOr),
            0x28 => Some(Self::BitXor),
            0x29 => Some(Self::ShiftLeft),
            0x2A => Some(Self::ShiftRight),

            0x30 => Some(Self::Equal),
            0x31 => Some(Self::NotEqual),
            0x32 => Some(Self::Less),
            0x33 => Some(Self::LessEqual),
            0x34 => Some(Self::Greater),
            0x35 => Some(Self::GreaterEqual),
            0x36 => Some(Self::LogicalAnd),
            0x37 => Some(Self::LogicalOr),

            0x40 => Some(Self::Negate),
            0x41 => Some(Self::Not),
            0x42 => Some(Self::BitNot),

            0x50 => Some(Self::Length),
            0x51 => Some(Self::Red),
            0x52 => Some(Self::Green),
            0x53 => Some(Self::Blue),
            0x54 => Some(Self::Alpha),
            0x55 => Some(Self::IsInt),
            0x56 => Some(Self::IsFloat),
            0x57 => Some(Self::IsString),
            0x58 => Some(Self::IsObject),
            0x59 => Some(Self::IsArray),
            0x5A => Some(Self::ClassId),

            0x60 => Some(Self::ArrayAppend),
            0x61 => Some(Self::ArrayRemoveAt),
            0x62 => Some(Self::ArrayInsertAt),

            0x70 => Some(Self::CallFunction),
            0x71 => Some(Self::CallGameFunction),
            0x72 => Some(Self::CallDynamicGameFunction),
            0x73 => Some(Self::CallMethod),
            0x74 => Some(Self::CallThisMethod),
            0x75 => Some(Self::CallDynamicMethod),
            0x76 => Some(Self::CreateObject),
            0x77 => Some(Self::LookupMethod),
            0x78 => Some(Self::CallIndirect),

            0x80 => Some(Self::Branch),
            0x81 => Some(Self::BranchIfFalse),
            0x82 => Some(Self::BranchIfTrue),

            0x90 => Some(Self::Return),
            0x91 => Some(Self::Pop),
            0x92 => Some(Self::Dup),
            0x93 => Some(Self::AllocateLocals),
            0x94 => Some(Self::CheckArgumentCount),
            0x95 => Some(Self::LineNumber),

            _ => None,
        }
    }

    /// Convert to raw byte
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Number of operand bytes following the opcode byte
    pub const fn operand_size(self) -> usize {
        match self {
            Self::PushInt8 | Self::CheckArgumentCount | Self::CallIndirect | Self::CallDynamicMethod => 1,
            Self::PushInt16
            | Self::PushString
            | Self::GetVariable
            | Self::SetVariable
            | Self::GetMember
            | Self::SetMember
            | Self::GetThisMember
            | Self::SetThisMember
            | Self::GetDynamicGameVariable
            | Self::CreateArray
            | Self::CreateObject
            | Self::LookupMethod
            | Self::Branch
            | Self::BranchIfFalse
            | Self::BranchIfTrue
            | Self::AllocateLocals
            | Self::LineNumber => 2,
            Self::CallMethod | Self::CallThisMethod | Self::CallDynamicGameFunction => 3,
            Self::PushInt32
            | Self::PushFloat
            | Self::GetGameVariable
            | Self::SetGameVariable => 4,
            Self::CallFunction | Self::CallGameFunction => 5,
            _ => 0,
        }
    }

    /// Get the name of this opcode
    pub const fn name(self) -> &'static str {
        match self {
            Self::PushNothing => "PushNothing",
            Self::PushTrue => "PushTrue",
            Self::PushFalse => "PushFalse",
            Self::PushZero => "PushZero",
            Self::PushInt8 => "PushInt8",
            Self::PushInt16 => "PushInt16",
            Self::PushInt32 => "PushInt32",
            Self::PushFloat => "PushFloat",
            Self::PushString => "PushString",
            Self::GetVariable => "GetVariable",
            Self::SetVariable => "SetVariable",
            Self::GetMember => "GetMember",
            Self::SetMember => "SetMember",
            Self::GetThisMember => "GetThisMember",
            Self::SetThisMember => "SetThisMember",
            Self::GetDynamicMember => "GetDynamicMember",
            Self::SetDynamicMember => "SetDynamicMember",
            Self::GetGameVariable => "GetGameVariable",
            Self::SetGameVariable => "SetGameVariable",
            Self::GetDynamicGameVariable => "GetDynamicGameVariable",
            Self::GetElement => "GetElement",
            Self::SetElement => "SetElement",
            Self::CreateArray => "CreateArray",
            Self::Add => "Add",
            Self::Sub => "Sub",
            Self::Mul => "Mul",
            Self::Div => "Div",
            Self::Mod => "Mod",
            Self::Pow => "Pow",
            Self::BitAnd => "BitAnd",
            Self::BitOr => "BitOr",
            Self::BitXor => "BitXor",
            Self::ShiftLeft => "ShiftLeft",
            Self::ShiftRight => "ShiftRight",
            Self::Equal => "Equal",
            Self::NotEqual => "NotEqual",
            Self::Less => "Less",
            Self::LessEqual => "LessEqual",
            Self::Greater => "Greater",
            Self::GreaterEqual => "GreaterEqual",
            Self::LogicalAnd => "LogicalAnd",
            Self::LogicalOr => "LogicalOr",
            Self::Negate => "Negate",
            Self::Not => "Not",
            Self::BitNot => "BitNot",
            Self::Length => "Length",
            Self::Red => "Red",
            Self::Green => "Green",
            Self::Blue => "Blue",
            Self::Alpha => "Alpha",
            Self::IsInt => "IsInt",
            Self::IsFloat => "IsFloat",
            Self::IsString => "IsString",
            Self::IsObject => "IsObject",
            Self::IsArray => "IsArray",
            Self::ClassId => "ClassId",
            Self::ArrayAppend => "ArrayAppend",
            Self::ArrayRemoveAt => "ArrayRemoveAt",
            Self::ArrayInsertAt => "ArrayInsertAt",
            Self::CallFunction => "CallFunction",
            Self::CallGameFunction => "CallGameFunction",
            Self::CallDynamicGameFunction => "CallDynamicGameFunction",
            Self::CallMethod => "CallMethod",
            Self::CallThisMethod => "CallThisMethod",
            Self::CallDynamicMethod => "CallDynamicMethod",
            Self::CreateObject => "CreateObject",
            Self::LookupMethod => "LookupMethod",
            Self::CallIndirect => "CallIndirect",
            Self::Branch => "Branch",
            Self::BranchIfFalse => "BranchIfFalse",
            Self::BranchIfTrue => "BranchIfTrue",
            Self::Return => "Return",
            Self::Pop => "Pop",
            Self::Dup => "Dup",
            Self::AllocateLocals => "AllocateLocals",
            Self::CheckArgumentCount => "CheckArgumentCount",
            Self::LineNumber => "LineNumber",
        }
    }
}

/// A decoded instruction with its operands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Instruction {
    // Literals
    PushNothing,
    PushTrue,
    PushFalse,
    PushZero,
    PushInt8(i8),
    PushInt16(i16),
    PushInt32(i32),
    PushFloat(f32),
    PushString(StringIndex),

    // Variables & members
    GetVariable(Slot),
    SetVariable(Slot),
    GetMember(SymbolIndex),
    SetMember(SymbolIndex),
    GetThisMember(SymbolIndex),
    SetThisMember(SymbolIndex),
    GetDynamicMember,
    SetDynamicMember,
    GetGameVariable {
        namespace: SymbolIndex,
        name: SymbolIndex,
    },
    SetGameVariable {
        namespace: SymbolIndex,
        name: SymbolIndex,
    },
    GetDynamicGameVariable {
        namespace: SymbolIndex,
    },
    GetElement,
    SetElement,
    CreateArray {
        count: u16,
    },

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,

    // Comparison & logic
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LogicalAnd,
    LogicalOr,

    // Unary
    Negate,
    Not,
    BitNot,

    // Builtin properties
    Length,
    Red,
    Green,
    Blue,
    Alpha,
    IsInt,
    IsFloat,
    IsString,
    IsObject,
    IsArray,
    ClassId,

    // Array builtins
    ArrayAppend,
    ArrayRemoveAt,
    ArrayInsertAt,

    // Calls & objects
    CallFunction {
        target: CodeOffset,
        argc: u8,
    },
    CallGameFunction {
        namespace: SymbolIndex,
        name: SymbolIndex,
        argc: u8,
    },
    CallDynamicGameFunction {
        namespace: SymbolIndex,
        argc: u8,
    },
    /// Stack: `receiver receiver args..`. The method runs on the top receiver
    /// copy and its result replaces the original receiver slot.
    CallMethod {
        method: SymbolIndex,
        argc: u8,
    },
    CallThisMethod {
        method: SymbolIndex,
        argc: u8,
    },
    /// Stack: `receiver receiver name args..`
    CallDynamicMethod {
        argc: u8,
    },
    CreateObject(SymbolIndex),
    LookupMethod(SymbolIndex),
    /// Stack: `receiver args.. method`. Pops all of them, pushes the result.
    CallIndirect {
        argc: u8,
    },

    // Control flow
    Branch(BranchOffset),
    BranchIfFalse(BranchOffset),
    BranchIfTrue(BranchOffset),

    // Misc
    Return,
    Pop,
    Dup,
    AllocateLocals(u16),
    CheckArgumentCount(u8),
    LineNumber(u16),

    /// Static call whose target offset is not known yet. Occupies the same
    /// number of bytes as [`Instruction::CallFunction`].
    UnresolvedCall {
        function: String,
        argc: u8,
    },
}

impl Instruction {
    /// Build an operand-less instruction from its opcode
    pub fn simple(opcode: Opcode) -> Option<Self> {
        use Opcode as Op;
        Some(match opcode {
            Op::PushNothing => Self::PushNothing,
            Op::PushTrue => Self::PushTrue,
            Op::PushFalse => Self::PushFalse,
            Op::PushZero => Self::PushZero,
            Op::GetDynamicMember => Self::GetDynamicMember,
            Op::SetDynamicMember => Self::SetDynamicMember,
            Op::GetElement => Self::GetElement,
            Op::SetElement => Self::SetElement,
            Op::Add => Self::Add,
            Op::Sub => Self::Sub,
            Op::Mul => Self::Mul,
            Op::Div => Self::Div,
            Op::Mod => Self::Mod,
            Op::Pow => Self::Pow,
            Op::BitAnd => Self::BitAnd,
            Op::BitOr => Self::BitOr,
            Op::BitXor => Self::BitXor,
            Op::ShiftLeft => Self::ShiftLeft,
            Op::ShiftRight => Self::ShiftRight,
            Op::Equal => Self::Equal,
            Op::NotEqual => Self::NotEqual,
            Op::Less => Self::Less,
            Op::LessEqual => Self::LessEqual,
            Op::Greater => Self::Greater,
            Op::GreaterEqual => Self::GreaterEqual,
            Op::LogicalAnd => Self::LogicalAnd,
            Op::LogicalOr => Self::LogicalOr,
            Op::Negate => Self::Negate,
            Op::Not => Self::Not,
            Op::BitNot => Self::BitNot,
            Op::Length => Self::Length,
            Op::Red => Self::Red,
            Op::Green => Self::Green,
            Op::Blue => Self::Blue,
            Op::Alpha => Self::Alpha,
            Op::IsInt => Self::IsInt,
            Op::IsFloat => Self::IsFloat,
            Op::IsString => Self::IsString,
            Op::IsObject => Self::IsObject,
            Op::IsArray => Self::IsArray,
            Op::ClassId => Self::ClassId,
            Op::ArrayAppend => Self::ArrayAppend,
            Op::ArrayRemoveAt => Self::ArrayRemoveAt,
            Op::ArrayInsertAt => Self::ArrayInsertAt,
            Op::Return => Self::Return,
            Op::Pop => Self::Pop,
            Op::Dup => Self::Dup,
            _ => return None,
        })
    }

    /// Opcode of this instruction. Unresolved calls report `CallFunction`.
    pub fn opcode(&self) -> Opcode {
        use Opcode as Op;
        match self {
            Self::PushNothing => Op::PushNothing,
            Self::PushTrue => Op::PushTrue,
            Self::PushFalse => Op::PushFalse,
            Self::PushZero => Op::PushZero,
            Self::PushInt8(_) => Op::PushInt8,
            Self::PushInt16(_) => Op::PushInt16,
            Self::PushInt32(_) => Op::PushInt32,
            Self::PushFloat(_) => Op::PushFloat,
            Self::PushString(_) => Op::PushString,
            Self::GetVariable(_) => Op::GetVariable,
            Self::SetVariable(_) => Op::SetVariable,
            Self::GetMember(_) => Op::GetMember,
            Self::SetMember(_) => Op::SetMember,
            Self::GetThisMember(_) => Op::GetThisMember,
            Self::SetThisMember(_) => Op::SetThisMember,
            Self::GetDynamicMember => Op::GetDynamicMember,
            Self::SetDynamicMember => Op::SetDynamicMember,
            Self::GetGameVariable { .. } => Op::GetGameVariable,
            Self::SetGameVariable { .. } => Op::SetGameVariable,
            Self::GetDynamicGameVariable { .. } => Op::GetDynamicGameVariable,
            Self::GetElement => Op::GetElement,
            Self::SetElement => Op::SetElement,
            Self::CreateArray { .. } => Op::CreateArray,
            Self::Add => Op::Add,
            Self::Sub => Op::Sub,
            Self::Mul => Op::Mul,
            Self::Div => Op::Div,
            Self::Mod => Op::Mod,
            Self::Pow => Op::Pow,
            Self::BitAnd => Op::BitAnd,
            Self::BitOr => Op::BitOr,
            Self::BitXor => Op::BitXor,
            Self::ShiftLeft => Op::ShiftLeft,
            Self::ShiftRight => Op::ShiftRight,
            Self::Equal => Op::Equal,
            Self::NotEqual => Op::NotEqual,
            Self::Less => Op::Less,
            Self::LessEqual => Op::LessEqual,
            Self::Greater => Op::Greater,
            Self::GreaterEqual => Op::GreaterEqual,
            Self::LogicalAnd => Op::LogicalAnd,
            Self::LogicalOr => Op::LogicalOr,
            Self::Negate => Op::Negate,
            Self::Not => Op::Not,
            Self::BitNot => Op::BitNot,
            Self::Length => Op::Length,
            Self::Red => Op::Red,
            Self::Green => Op::Green,
            Self::Blue => Op::Blue,
            Self::Alpha => Op::Alpha,
            Self::IsInt => Op::IsInt,
            Self::IsFloat => Op::IsFloat,
            Self::IsString => Op::IsString,
            Self::IsObject => Op::IsObject,
            Self::IsArray => Op::IsArray,
            Self::ClassId => Op::ClassId,
            Self::ArrayAppend => Op::ArrayAppend,
            Self::ArrayRemoveAt => Op::ArrayRemoveAt,
            Self::ArrayInsertAt => Op::ArrayInsertAt,
            Self::CallFunction { .. } | Self::UnresolvedCall { .. } => Op::CallFunction,
            Self::CallGameFunction { .. } => Op::CallGameFunction,
            Self::CallDynamicGameFunction { .. } => Op::CallDynamicGameFunction,
            Self::CallMethod { .. } => Op::CallMethod,
            Self::CallThisMethod { .. } => Op::CallThisMethod,
            Self::CallDynamicMethod { .. } => Op::CallDynamicMethod,
            Self::CreateObject(_) => Op::CreateObject,
            Self::LookupMethod(_) => Op::LookupMethod,
            Self::CallIndirect { .. } => Op::CallIndirect,
            Self::Branch(_) => Op::Branch,
            Self::BranchIfFalse(_) => Op::BranchIfFalse,
            Self::BranchIfTrue(_) => Op::BranchIfTrue,
            Self::Return => Op::Return,
            Self::Pop => Op::Pop,
            Self::Dup => Op::Dup,
            Self::AllocateLocals(_) => Op::AllocateLocals,
            Self::CheckArgumentCount(_) => Op::CheckArgumentCount,
            Self::LineNumber(_) => Op::LineNumber,
        }
    }

    /// Encoded size in bytes
    #[inline]
    pub fn size(&self) -> usize {
        1 + self.opcode().operand_size()
    }

    /// Relative offset if this is a branch
    pub fn branch_offset(&self) -> Option<BranchOffset> {
        match self {
            Self::Branch(o) | Self::BranchIfFalse(o) | Self::BranchIfTrue(o) => Some(*o),
            _ => None,
        }
    }

    /// Does control never fall through to the next instruction
    pub fn ends_flow(&self) -> bool {
        matches!(self, Self::Branch(_) | Self::Return)
    }

    /// Append the encoded form of this instruction
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        if let Self::UnresolvedCall { function, .. } = self {
            return Err(BytecodeError::UnresolvedCall(function.clone()));
        }
        out.push(self.opcode().to_byte());
        match self {
            Self::PushInt8(v) => out.push(*v as u8),
            Self::PushInt16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::PushInt32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::PushFloat(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::PushString(idx) => out.extend_from_slice(&idx.0.to_le_bytes()),
            Self::GetVariable(slot) | Self::SetVariable(slot) => {
                out.extend_from_slice(&slot.0.to_le_bytes())
            }
            Self::GetMember(sym)
            | Self::SetMember(sym)
            | Self::GetThisMember(sym)
            | Self::SetThisMember(sym)
            | Self::CreateObject(sym)
            | Self::LookupMethod(sym) => out.extend_from_slice(&sym.0.to_le_bytes()),
            Self::GetGameVariable { namespace, name } | Self::SetGameVariable { namespace, name } => {
                out.extend_from_slice(&namespace.0.to_le_bytes());
                out.extend_from_slice(&name.0.to_le_bytes());
            }
            Self::GetDynamicGameVariable { namespace } => {
                out.extend_from_slice(&namespace.0.to_le_bytes())
            }
            Self::CreateArray { count } => out.extend_from_slice(&count.to_le_bytes()),
            Self::CallFunction { target, argc } => {
                out.extend_from_slice(&target.0.to_le_bytes());
                out.push(*argc);
            }
            Self::CallGameFunction { namespace, name, argc } => {
                out.extend_from_slice(&namespace.0.to_le_bytes());
                out.extend_from_slice(&name.0.to_le_bytes());
                out.push(*argc);
            }
            Self::CallDynamicGameFunction { namespace, argc } => {
                out.extend_from_slice(&namespace.0.to_le_bytes());
                out.push(*argc);
            }
            Self::CallMethod { method, argc } | Self::CallThisMethod { method, argc } => {
                out.extend_from_slice(&method.0.to_le_bytes());
                out.push(*argc);
            }
            Self::CallDynamicMethod { argc } | Self::CallIndirect { argc } => out.push(*argc),
            Self::Branch(o) | Self::BranchIfFalse(o) | Self::BranchIfTrue(o) => {
                out.extend_from_slice(&o.0.to_le_bytes())
            }
            Self::AllocateLocals(n) | Self::LineNumber(n) => out.extend_from_slice(&n.to_le_bytes()),
            Self::CheckArgumentCount(n) => out.push(*n),
            _ => {}
        }
        Ok(())
    }

    /// Decode one instruction at `offset`, returning it with its size
    pub fn decode(bytes: &[u8], offset: usize) -> Result<(Self, usize)> {
        let byte = *bytes.get(offset).ok_or(BytecodeError::UnexpectedEnd(offset))?;
        let opcode = Opcode::from_byte(byte).ok_or(BytecodeError::InvalidOpcode { opcode: byte, offset })?;
        let size = 1 + opcode.operand_size();
        let operands = bytes
            .get(offset + 1..offset + size)
            .ok_or(BytecodeError::UnexpectedEnd(offset))?;
        let u16_at = |i: usize| u16::from_le_bytes([operands[i], operands[i + 1]]);
        let sym_at = |i: usize| SymbolIndex(u16_at(i));

        use Opcode as Op;
        let instruction = match opcode {
            Op::PushInt8 => Self::PushInt8(operands[0] as i8),
            Op::PushInt16 => Self::PushInt16(i16::from_le_bytes([operands[0], operands[1]])),
            Op::PushInt32 => Self::PushInt32(i32::from_le_bytes([
                operands[0],
                operands[1],
                operands[2],
                operands[3],
            ])),
            Op::PushFloat => Self::PushFloat(f32::from_le_bytes([
                operands[0],
                operands[1],
                operands[2],
                operands[3],
            ])),
            Op::PushString => Self::PushString(StringIndex(u16_at(0))),
            Op::GetVariable => Self::GetVariable(Slot(u16_at(0))),
            Op::SetVariable => Self::SetVariable(Slot(u16_at(0))),
            Op::GetMember => Self::GetMember(sym_at(0)),
            Op::SetMember => Self::SetMember(sym_at(0)),
            Op::GetThisMember => Self::GetThisMember(sym_at(0)),
            Op::SetThisMember => Self::SetThisMember(sym_at(0)),
            Op::GetGameVariable => Self::GetGameVariable {
                namespace: sym_at(0),
                name: sym_at(2),
            },
            Op::SetGameVariable => Self::SetGameVariable {
                namespace: sym_at(0),
                name: sym_at(2),
            },
            Op::GetDynamicGameVariable => Self::GetDynamicGameVariable { namespace: sym_at(0) },
            Op::CreateArray => Self::CreateArray { count: u16_at(0) },
            Op::CallFunction => Self::CallFunction {
                target: CodeOffset(u32::from_le_bytes([
                    operands[0],
                    operands[1],
                    operands[2],
                    operands[3],
                ])),
                argc: operands[4],
            },
            Op::CallGameFunction => Self::CallGameFunction {
                namespace: sym_at(0),
                name: sym_at(2),
                argc: operands[4],
            },
            Op::CallDynamicGameFunction => Self::CallDynamicGameFunction {
                namespace: sym_at(0),
                argc: operands[2],
            },
            Op::CallMethod => Self::CallMethod {
                method: sym_at(0),
                argc: operands[2],
            },
            Op::CallThisMethod => Self::CallThisMethod {
                method: sym_at(0),
                argc: operands[2],
            },
            Op::CallDynamicMethod => Self::CallDynamicMethod { argc: operands[0] },
            Op::CreateObject => Self::CreateObject(sym_at(0)),
            Op::LookupMethod => Self::LookupMethod(sym_at(0)),
            Op::CallIndirect => Self::CallIndirect { argc: operands[0] },
            Op::Branch => Self::Branch(BranchOffset(u16_at(0) as i16)),
            Op::BranchIfFalse => Self::BranchIfFalse(BranchOffset(u16_at(0) as i16)),
            Op::BranchIfTrue => Self::BranchIfTrue(BranchOffset(u16_at(0) as i16)),
            Op::AllocateLocals => Self::AllocateLocals(u16_at(0)),
            Op::CheckArgumentCount => Self::CheckArgumentCount(operands[0]),
            Op::LineNumber => Self::LineNumber(u16_at(0)),
            other => Self::simple(other).ok_or(BytecodeError::InvalidOpcode { opcode: byte, offset })?,
        };
        Ok((instruction, size))
    }

    /// Encode a whole instruction stream
    pub fn encode_all(instructions: &[Self]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(code_size(instructions));
        for instruction in instructions {
            instruction.encode(&mut out)?;
        }
        Ok(out)
    }

    /// Decode a whole instruction stream
    pub fn decode_all(bytes: &[u8]) -> Result<Vec<Self>> {
        let mut instructions = Vec::new();
        let mut offset = 0;
        while offset < bytes.len() {
            let (instruction, size) = Self::decode(bytes, offset)?;
            instructions.push(instruction);
            offset += size;
        }
        Ok(instructions)
    }
}

/// Total encoded size of an instruction stream
pub fn code_size(instructions: &[Instruction]) -> usize {
    instructions.iter().map(Instruction::size).sum()
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.opcode().name();
        match self {
            Self::PushInt8(v) => write!(f, "{name} {v}"),
            Self::PushInt16(v) => write!(f, "{name} {v}"),
            Self::PushInt32(v) => write!(f, "{name} {v}"),
            Self::PushFloat(v) => write!(f, "{name} {v:?}"),
            Self::PushString(idx) => write!(f, "{name} str#{}", idx.0),
            Self::GetVariable(slot) | Self::SetVariable(slot) => write!(f, "{name} {slot}"),
            Self::GetMember(sym)
            | Self::SetMember(sym)
            | Self::GetThisMember(sym)
            | Self::SetThisMember(sym)
            | Self::CreateObject(sym)
            | Self::LookupMethod(sym) => write!(f, "{name} sym#{}", sym.0),
            Self::GetGameVariable { namespace, name: n } | Self::SetGameVariable { namespace, name: n } => {
                write!(f, "{name} sym#{}::sym#{}", namespace.0, n.0)
            }
            Self::GetDynamicGameVariable { namespace } => write!(f, "{name} sym#{}", namespace.0),
            Self::CreateArray { count } => write!(f, "{name} {count}"),
            Self::CallFunction { target, argc } => write!(f, "{name} @{} argc={argc}", target.0),
            Self::CallGameFunction { namespace, name: n, argc } => {
                write!(f, "{name} sym#{}::sym#{} argc={argc}", namespace.0, n.0)
            }
            Self::CallDynamicGameFunction { namespace, argc } => {
                write!(f, "{name} sym#{} argc={argc}", namespace.0)
            }
            Self::CallMethod { method, argc } | Self::CallThisMethod { method, argc } => {
                write!(f, "{name} sym#{} argc={argc}", method.0)
            }
            Self::CallDynamicMethod { argc } | Self::CallIndirect { argc } => write!(f, "{name} argc={argc}"),
            Self::Branch(o) | Self::BranchIfFalse(o) | Self::BranchIfTrue(o) => write!(f, "{name} {:+}", o.0),
            Self::AllocateLocals(n) | Self::LineNumber(n) => write!(f, "{name} {n}"),
            Self::CheckArgumentCount(n) => write!(f, "{name} {n}"),
            Self::UnresolvedCall { function, argc } => write!(f, "{name} <{function}> argc={argc}"),
            _ => f.write_str(name),
        }
    }
}
