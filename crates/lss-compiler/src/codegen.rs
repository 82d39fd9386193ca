//! Per-subroutine code generation state

use lss_syntax::SourceSpan;
use osi_bytecode::instruction::code_size;
use osi_bytecode::{BranchOffset, Instruction};

use crate::error::{CompileError, CompileResult};
use crate::scope::ScopeChain;

/// Highest slot count a subroutine may use
pub const MAX_LOCALS: u32 = 0x7FFF;

/// Kind of branch to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    /// Unconditional
    Always,
    /// Pop condition, branch if false
    IfFalse,
    /// Pop condition, branch if true
    IfTrue,
}

impl BranchKind {
    fn instruction(self, offset: i16) -> Instruction {
        let offset = BranchOffset(offset);
        match self {
            Self::Always => Instruction::Branch(offset),
            Self::IfFalse => Instruction::BranchIfFalse(offset),
            Self::IfTrue => Instruction::BranchIfTrue(offset),
        }
    }
}

/// Subroutine being compiled
#[derive(Debug)]
pub struct FunctionContext {
    /// Subroutine name
    pub name: String,
    /// Instructions emitted so far (no prologue yet)
    pub instructions: Vec<Instruction>,
    /// Scope chain
    pub scopes: ScopeChain,
    /// Number of declared parameters
    pub param_count: u8,
    /// Instance method (slot 0 holds `this`)
    pub is_method: bool,
}

impl FunctionContext {
    /// Create a context and seed its scope with `this` and the parameters
    ///
    /// Returns `DuplicateVariable` if two parameters share a name.
    pub fn new(name: impl Into<String>, parameters: &[lss_syntax::Token], is_method: bool) -> CompileResult<Self> {
        let name = name.into();
        if parameters.len() > u8::MAX as usize {
            return Err(CompileError::TooManyArguments {
                span: parameters[0].span.clone(),
            });
        }

        let mut scopes = ScopeChain::new();
        if is_method {
            // `this` is not a spellable name in the scope; it is compiled specially
            scopes.declare_hidden("this");
        }
        for param in parameters {
            if scopes.declare(&param.text).is_none() {
                return Err(CompileError::DuplicateVariable {
                    name: param.text.clone(),
                    span: param.span.clone(),
                });
            }
        }

        Ok(Self {
            name,
            instructions: Vec::new(),
            scopes,
            param_count: parameters.len() as u8,
            is_method,
        })
    }

    /// Emit an instruction
    #[inline]
    pub fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Get current instruction index (for patching branches)
    #[inline]
    pub fn current_index(&self) -> usize {
        self.instructions.len()
    }

    /// Emit a placeholder forward branch (returns index for patching)
    pub fn emit_branch(&mut self, kind: BranchKind) -> usize {
        let idx = self.current_index();
        self.emit(kind.instruction(0));
        idx
    }

    /// Point the placeholder at `index` to the current end of the code
    pub fn patch_branch(&mut self, index: usize, span: &SourceSpan) -> CompileResult<()> {
        let distance = code_size(&self.instructions[index + 1..]);
        let offset = i16::try_from(distance).map_err(|_| CompileError::BranchTooFar { span: span.clone() })?;
        match &mut self.instructions[index] {
            Instruction::Branch(o) | Instruction::BranchIfFalse(o) | Instruction::BranchIfTrue(o) => {
                *o = BranchOffset(offset);
                Ok(())
            }
            other => Err(CompileError::internal(format!("cannot patch non-branch {other}"))),
        }
    }

    /// Emit a branch back to the instruction at `target`
    pub fn emit_back_branch(&mut self, kind: BranchKind, target: usize, span: &SourceSpan) -> CompileResult<()> {
        // the offset is relative to the end of the branch itself
        let distance = code_size(&self.instructions[target..]) + kind.instruction(0).size();
        let offset = i16::try_from(distance)
            .ok()
            .and_then(|d| d.checked_neg())
            .ok_or_else(|| CompileError::BranchTooFar { span: span.clone() })?;
        self.emit(kind.instruction(offset));
        Ok(())
    }

    /// Number of slots beyond `this` and the parameters
    pub fn extra_locals(&self) -> u32 {
        let fixed = self.param_count as u32 + self.is_method as u32;
        self.scopes.slot_count().saturating_sub(fixed)
    }

    /// Prepend the prologue and append the implicit return
    ///
    /// `ends_in_return` tells whether the last statement of the body was a
    /// `return`; in that case no implicit `return nothing` is added.
    pub fn finish(self, ends_in_return: bool, span: &SourceSpan) -> CompileResult<Vec<Instruction>> {
        if self.scopes.slot_count() > MAX_LOCALS {
            return Err(CompileError::TooManyLocals {
                name: self.name,
                span: span.clone(),
            });
        }

        let extra = self.extra_locals();
        let mut code = Vec::with_capacity(self.instructions.len() + 4);
        if self.is_method && self.param_count > 0 {
            code.push(Instruction::CheckArgumentCount(self.param_count));
        }
        if extra > 0 {
            code.push(Instruction::AllocateLocals(extra as u16));
        }
        code.extend(self.instructions);
        if !ends_in_return {
            code.push(Instruction::PushNothing);
            code.push(Instruction::Return);
        }
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lss_syntax::Token;

    fn params(names: &[&str]) -> Vec<Token> {
        names.iter().map(|n| Token::identifier(*n)).collect()
    }

    #[test]
    fn test_forward_branch_covers_region() {
        let mut ctx = FunctionContext::new("f", &[], false).unwrap();
        let branch = ctx.emit_branch(BranchKind::IfFalse);
        ctx.emit(Instruction::PushInt16(300));
        ctx.emit(Instruction::Pop);
        ctx.patch_branch(branch, &SourceSpan::default()).unwrap();
        assert_eq!(ctx.instructions[0], Instruction::BranchIfFalse(BranchOffset(4)));
    }

    #[test]
    fn test_back_branch_reaches_start() {
        let mut ctx = FunctionContext::new("f", &[], false).unwrap();
        ctx.emit(Instruction::PushTrue);
        let start = ctx.current_index();
        ctx.emit(Instruction::PushZero);
        ctx.emit(Instruction::Pop);
        ctx.emit_back_branch(BranchKind::Always, start, &SourceSpan::default()).unwrap();
        // 2 bytes of body plus the 3-byte branch
        assert_eq!(ctx.instructions[3], Instruction::Branch(BranchOffset(-5)));
    }

    #[test]
    fn test_branch_too_far() {
        let mut ctx = FunctionContext::new("f", &[], false).unwrap();
        let branch = ctx.emit_branch(BranchKind::Always);
        for _ in 0..7000 {
            ctx.emit(Instruction::PushInt32(1));
        }
        let err = ctx.patch_branch(branch, &SourceSpan::default()).unwrap_err();
        assert!(matches!(err, CompileError::BranchTooFar { .. }));
    }

    #[test]
    fn test_method_prologue() {
        let mut ctx = FunctionContext::new("m", &params(&["a", "b"]), true).unwrap();
        ctx.scopes.declare("local");
        ctx.emit(Instruction::PushNothing);
        ctx.emit(Instruction::Return);
        let code = ctx.finish(true, &SourceSpan::default()).unwrap();
        assert_eq!(code[0], Instruction::CheckArgumentCount(2));
        assert_eq!(code[1], Instruction::AllocateLocals(1));
        assert_eq!(code.len(), 4);
    }

    #[test]
    fn test_function_without_locals_has_no_prologue() {
        let ctx = FunctionContext::new("f", &params(&["a"]), false).unwrap();
        let code = ctx.finish(false, &SourceSpan::default()).unwrap();
        assert_eq!(code, vec![Instruction::PushNothing, Instruction::Return]);
    }

    #[test]
    fn test_duplicate_parameter() {
        let err = FunctionContext::new("f", &params(&["a", "a"]), false).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateVariable { .. }));
    }
}
