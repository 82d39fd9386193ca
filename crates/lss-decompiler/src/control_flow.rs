//! Control-flow structuring
//!
//! Branch targets are resolved to instruction indices, and each backward
//! branch marks a loop head. A region `[start, end)` is then decoded left to
//! right: a loop head with an empty stack opens the loop whose back branch is
//! furthest away, a `BranchIfFalse` opens an `if` (with an `else` when the
//! guarded region ends in a forward `Branch`), and everything else is handed
//! to the stack simulator. Any other branch shape is rejected.

use lss_syntax::{Block, Statement, Token};
use osi_bytecode::{Instruction, OsiFile};
use rustc_hash::FxHashMap;

use crate::error::{DecompileError, DecompileResult};
use crate::stack::OperandStack;

/// How local slots are named while decoding
#[derive(Debug, Clone, Copy)]
pub struct SlotNames {
    /// Slot 0 holds `this`
    pub is_method: bool,
    /// Declared parameter count
    pub param_count: u8,
}

impl SlotNames {
    /// Source name for a local slot; plain locals get a placeholder that the
    /// renaming pass replaces
    pub fn token(&self, slot: u16) -> Token {
        let first = self.is_method as u16;
        if self.is_method && slot == 0 {
            Token::of(lss_syntax::TokenKind::This)
        } else if slot >= first && slot < first + self.param_count as u16 {
            Token::identifier(format!("param{}", slot - first + 1))
        } else {
            Token::identifier(format!("${slot}"))
        }
    }
}

/// Decodes one subroutine body (prologue already stripped)
pub struct BodyDecoder<'f> {
    pub(crate) file: &'f OsiFile,
    pub(crate) code: &'f [Instruction],
    pub(crate) names: SlotNames,
    offsets: Vec<usize>,
    by_offset: FxHashMap<usize, usize>,
    back_edges: FxHashMap<usize, Vec<usize>>,
}

impl<'f> BodyDecoder<'f> {
    /// Prepare a decoder: lay out byte offsets and find loop heads
    pub fn new(file: &'f OsiFile, code: &'f [Instruction], names: SlotNames) -> DecompileResult<Self> {
        let mut offsets = Vec::with_capacity(code.len() + 1);
        let mut offset = 0;
        for instruction in code {
            offsets.push(offset);
            offset += instruction.size();
        }
        offsets.push(offset);
        let by_offset = offsets.iter().enumerate().map(|(i, &o)| (o, i)).collect();

        let mut decoder = Self {
            file,
            code,
            names,
            offsets,
            by_offset,
            back_edges: FxHashMap::default(),
        };
        for (i, instruction) in code.iter().enumerate() {
            if matches!(instruction, Instruction::Branch(_) | Instruction::BranchIfTrue(_)) {
                let target = decoder.target(i)?;
                if target <= i {
                    decoder.back_edges.entry(target).or_default().push(i);
                }
            }
        }
        Ok(decoder)
    }

    /// Instruction index a branch at `index` lands on
    fn target(&self, index: usize) -> DecompileResult<usize> {
        let invalid = DecompileError::InvalidBranchTarget { index };
        let relative = self.code[index].branch_offset().ok_or_else(|| DecompileError::unexpected(&self.code[index], index))?;
        let end = self.offsets[index + 1] as i64;
        let landing = usize::try_from(end + relative.0 as i64).map_err(|_| invalid)?;
        self.by_offset
            .get(&landing)
            .copied()
            .ok_or(DecompileError::InvalidBranchTarget { index })
    }

    /// Decode the whole body
    pub fn decode(&self) -> DecompileResult<Vec<Statement>> {
        let (statements, stack) = self.region(0, self.code.len())?;
        if !stack.is_empty() {
            return Err(DecompileError::DanglingValue { index: self.code.len() });
        }
        Ok(statements)
    }

    /// Decode `[start, end)`, returning its statements and whatever values
    /// are left on the stack
    fn region(&self, start: usize, end: usize) -> DecompileResult<(Vec<Statement>, OperandStack)> {
        let mut statements = Vec::new();
        let mut stack = OperandStack::new();
        let mut i = start;

        while i < end {
            if stack.is_empty() {
                if let Some(back) = self.loop_closing(i, end) {
                    self.decode_loop(i, back, &mut statements)?;
                    i = back + 1;
                    continue;
                }
            }

            match &self.code[i] {
                Instruction::BranchIfFalse(_) => {
                    i = self.decode_if(i, end, &mut stack, &mut statements)?;
                }
                // an empty `else` arm
                Instruction::Branch(offset) if offset.0 == 0 => i += 1,
                Instruction::Branch(_) | Instruction::BranchIfTrue(_) => {
                    return Err(DecompileError::UnstructuredControlFlow { index: i });
                }
                instruction => {
                    self.step(instruction, i, &mut stack, &mut statements)?;
                    i += 1;
                }
            }
        }
        Ok((statements, stack))
    }

    /// Outermost back branch to `head` inside the region
    fn loop_closing(&self, head: usize, end: usize) -> Option<usize> {
        self.back_edges.get(&head)?.iter().copied().filter(|&j| j < end).max()
    }

    fn decode_loop(&self, head: usize, back: usize, statements: &mut Vec<Statement>) -> DecompileResult<()> {
        match &self.code[back] {
            Instruction::BranchIfTrue(_) => {
                let (body, mut stack) = self.region(head, back)?;
                if stack.len() != 1 {
                    return Err(DecompileError::UnstructuredControlFlow { index: back });
                }
                let condition = stack.pop(back)?;
                statements.push(Statement::DoWhile {
                    body: Box::new(Statement::Block(Block::new(body))),
                    condition,
                });
            }
            _ => {
                let exit = (head..back)
                    .find(|&k| {
                        matches!(self.code[k], Instruction::BranchIfFalse(_))
                            && self.target(k).is_ok_and(|t| t == back + 1)
                    })
                    .ok_or(DecompileError::UnstructuredControlFlow { index: back })?;

                let (prefix, mut stack) = self.region(head, exit)?;
                if !prefix.is_empty() || stack.len() != 1 {
                    return Err(DecompileError::UnstructuredControlFlow { index: exit });
                }
                let condition = stack.pop(exit)?;
                let body = self.block(exit + 1, back)?;
                statements.push(Statement::While {
                    condition,
                    body: Box::new(body),
                });
            }
        }
        Ok(())
    }

    fn decode_if(
        &self,
        index: usize,
        end: usize,
        stack: &mut OperandStack,
        statements: &mut Vec<Statement>,
    ) -> DecompileResult<usize> {
        let target = self.target(index)?;
        if target <= index || target > end {
            return Err(DecompileError::UnstructuredControlFlow { index });
        }
        let condition = stack.pop(index)?;
        if !stack.is_empty() {
            return Err(DecompileError::DanglingValue { index });
        }

        let last = target - 1;
        if last > index {
            if let Instruction::Branch(offset) = &self.code[last] {
                if offset.0 > 0 {
                    let join = self.target(last)?;
                    if join > end {
                        return Err(DecompileError::UnstructuredControlFlow { index: last });
                    }
                    let body = self.block(index + 1, last)?;
                    let else_body = self.else_body(target, join)?;
                    statements.push(Statement::If {
                        condition: Some(condition),
                        body: Box::new(body),
                        else_branch: Some(Box::new(Statement::else_arm(else_body))),
                        span: Default::default(),
                    });
                    return Ok(join);
                }
            }
        }

        let body = self.block(index + 1, target)?;
        statements.push(Statement::if_then(condition, body));
        Ok(target)
    }

    /// A region that must leave the stack empty, as a block statement
    fn block(&self, start: usize, end: usize) -> DecompileResult<Statement> {
        Ok(Statement::Block(Block::new(self.statements(start, end)?)))
    }

    /// `else` arm body; a lone `if` stays bare so it prints as `else if`
    fn else_body(&self, start: usize, end: usize) -> DecompileResult<Statement> {
        let mut statements = self.statements(start, end)?;
        if statements.len() == 1 && matches!(statements[0], Statement::If { .. }) {
            if let Some(only) = statements.pop() {
                return Ok(only);
            }
        }
        Ok(Statement::Block(Block::new(statements)))
    }

    fn statements(&self, start: usize, end: usize) -> DecompileResult<Vec<Statement>> {
        let (statements, stack) = self.region(start, end)?;
        if !stack.is_empty() {
            return Err(DecompileError::DanglingValue { index: end });
        }
        Ok(statements)
    }
}
