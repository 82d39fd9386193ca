//! Lowering of one function or method body
//!
//! Expressions push exactly one value; statements leave the operand stack
//! depth unchanged. The expression half lives in `expression.rs`.

use lss_syntax::{Block, Diagnostic, Expression, SourceSpan, Statement, Subroutine, Token};
use osi_bytecode::{Instruction, NameTable, Slot, StringIndex, SymbolIndex};
use rustc_hash::FxHashMap;

use crate::codegen::{BranchKind, FunctionContext};
use crate::error::{CompileError, CompileResult};
use crate::hierarchy::ClassLayout;
use crate::scope::Variable;
use crate::settings::CompilerSettings;

/// Registered top-level function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSignature {
    /// Declared parameter count
    pub parameter_count: u8,
    /// Position in the function table
    pub index: usize,
}

/// Read-only view of everything declared in the session
#[derive(Debug, Clone, Copy)]
pub struct Declarations<'a> {
    /// Global variable names
    pub globals: &'a NameTable,
    /// Top-level functions by name
    pub functions: &'a FxHashMap<String, FunctionSignature>,
    /// Class layouts by name
    pub classes: &'a FxHashMap<String, ClassLayout>,
    /// Session settings
    pub settings: &'a CompilerSettings,
}

/// Compiles a single subroutine body into an instruction stream
pub struct SubroutineCompiler<'a> {
    pub(crate) strings: &'a mut NameTable,
    pub(crate) symbols: &'a mut NameTable,
    pub(crate) declarations: Declarations<'a>,
    /// Enclosing class when compiling a method
    pub(crate) class: Option<&'a ClassLayout>,
    pub(crate) ctx: FunctionContext,
    /// Accepted but suspicious constructs
    pub(crate) warnings: Vec<Diagnostic>,
}

/// A compiled body and the warnings raised while compiling it
#[derive(Debug)]
pub struct CompiledBody {
    /// Finished instruction stream, prologue included
    pub instructions: Vec<Instruction>,
    /// Warning diagnostics
    pub warnings: Vec<Diagnostic>,
}

impl<'a> SubroutineCompiler<'a> {
    /// Create a compiler for `subroutine`; `class` is set for methods
    pub fn new(
        strings: &'a mut NameTable,
        symbols: &'a mut NameTable,
        declarations: Declarations<'a>,
        class: Option<&'a ClassLayout>,
        subroutine: &Subroutine,
    ) -> CompileResult<Self> {
        let ctx = FunctionContext::new(&subroutine.name.text, &subroutine.parameters, class.is_some())?;
        Ok(Self {
            strings,
            symbols,
            declarations,
            class,
            ctx,
            warnings: Vec::new(),
        })
    }

    /// Compile the body and return the finished instruction stream
    pub fn compile(mut self, subroutine: &Subroutine) -> CompileResult<CompiledBody> {
        // the body shares the parameters' frame
        for stmt in &subroutine.body.statements {
            self.statement(stmt)?;
        }
        let ends_in_return = subroutine
            .body
            .statements
            .last()
            .is_some_and(Statement::is_return);
        let span = subroutine.name.span.clone();
        Ok(CompiledBody {
            instructions: self.ctx.finish(ends_in_return, &span)?,
            warnings: self.warnings,
        })
    }

    // ==================== Interning ====================

    pub(crate) fn symbol(&mut self, name: &str) -> CompileResult<SymbolIndex> {
        Ok(SymbolIndex(self.symbols.intern(name)?))
    }

    pub(crate) fn string(&mut self, value: &str) -> CompileResult<StringIndex> {
        Ok(StringIndex(self.strings.intern(value)?))
    }

    // ==================== Statements ====================

    /// Compile a statement
    pub fn statement(&mut self, stmt: &Statement) -> CompileResult<()> {
        if self.declarations.settings.emit_line_numbers && !matches!(stmt, Statement::Block(_)) {
            let span = stmt.span();
            if !span.is_synthetic() {
                let line = u16::try_from(span.start_line).unwrap_or(u16::MAX);
                self.ctx.emit(Instruction::LineNumber(line));
            }
        }

        match stmt {
            Statement::Block(block) => self.block(block),
            Statement::Expression(expr) => {
                self.expression(expr)?;
                self.ctx.emit(Instruction::Pop);
                Ok(())
            }
            Statement::VariableDeclaration { name, initializer } => self.var_declaration(name, initializer.as_ref()),
            Statement::Assignment { target, value } => self.assignment(target, value),
            Statement::Return { value, .. } => {
                match value {
                    Some(value) => self.expression(value)?,
                    None => self.ctx.emit(Instruction::PushNothing),
                }
                self.ctx.emit(Instruction::Return);
                Ok(())
            }
            Statement::If {
                condition,
                body,
                else_branch,
                span,
            } => self.if_statement(condition.as_ref(), body, else_branch.as_deref(), span),
            Statement::While { condition, body } => self.while_statement(condition, body),
            Statement::DoWhile { body, condition } => self.do_while_statement(body, condition),
            Statement::ForEach {
                element,
                collection,
                body,
            } => self.foreach_statement(element, collection, body),
            Statement::Class(_) | Statement::Property(_) | Statement::Subroutine(_) | Statement::Global(_) => {
                Err(CompileError::internal("declaration inside a subroutine body"))
            }
        }
    }

    fn block(&mut self, block: &Block) -> CompileResult<()> {
        self.ctx.scopes.enter();
        let result = block.statements.iter().try_for_each(|s| self.statement(s));
        self.ctx.scopes.exit();
        result
    }

    fn var_declaration(&mut self, name: &Token, initializer: Option<&Expression>) -> CompileResult<()> {
        // the initializer cannot see the variable it initializes
        match initializer {
            Some(init) => self.expression(init)?,
            None => self.ctx.emit(Instruction::PushNothing),
        }
        let slot = self
            .ctx
            .scopes
            .declare(&name.text)
            .ok_or_else(|| CompileError::DuplicateVariable {
                name: name.text.clone(),
                span: name.span.clone(),
            })?;
        self.ctx.emit(Instruction::SetVariable(Slot::local(slot)));
        Ok(())
    }

    fn assignment(&mut self, target: &Expression, value: &Expression) -> CompileResult<()> {
        let not_assignable = || CompileError::NotAssignable { span: target.span() };
        match target {
            Expression::Variable(token) if token.kind == lss_syntax::TokenKind::Identifier => {
                let slot = match self.resolve(token)? {
                    Resolved::Slot(slot) => slot,
                    Resolved::Iteration { .. } => return Err(not_assignable()),
                };
                self.expression(value)?;
                self.ctx.emit(Instruction::SetVariable(slot));
            }
            Expression::Binary { left, operator, right } => {
                use lss_syntax::TokenKind as K;
                match operator.kind {
                    K::Dot => {
                        let Expression::Variable(member) = right.as_ref() else {
                            return Err(not_assignable());
                        };
                        if member.kind != K::Identifier {
                            return Err(not_assignable());
                        }
                        let symbol = self.symbol(&member.text)?;
                        if self.is_this(left) {
                            self.require_method(left)?;
                            self.expression(value)?;
                            self.ctx.emit(Instruction::SetThisMember(symbol));
                        } else {
                            self.expression(left)?;
                            self.expression(value)?;
                            self.ctx.emit(Instruction::SetMember(symbol));
                        }
                    }
                    K::DotDollar => {
                        self.expression(left)?;
                        self.expression(right)?;
                        self.expression(value)?;
                        self.ctx.emit(Instruction::SetDynamicMember);
                    }
                    K::ColonColon => {
                        let namespace = self.namespace(left)?;
                        let name = self.member_symbol(right)?;
                        self.expression(value)?;
                        self.ctx.emit(Instruction::SetGameVariable { namespace, name });
                    }
                    _ => return Err(not_assignable()),
                }
            }
            Expression::ArrayAccess { array, index, .. } => {
                self.expression(array)?;
                self.expression(index)?;
                self.expression(value)?;
                self.ctx.emit(Instruction::SetElement);
            }
            _ => return Err(not_assignable()),
        }
        Ok(())
    }

    fn if_statement(
        &mut self,
        condition: Option<&Expression>,
        body: &Statement,
        else_branch: Option<&Statement>,
        span: &SourceSpan,
    ) -> CompileResult<()> {
        let Some(condition) = condition else {
            // condition-less arm: the `else` body itself
            return self.statement(body);
        };

        self.expression(condition)?;
        let skip_then = self.ctx.emit_branch(BranchKind::IfFalse);
        self.statement(body)?;

        match else_branch {
            Some(else_branch) => {
                let skip_else = self.ctx.emit_branch(BranchKind::Always);
                self.ctx.patch_branch(skip_then, span)?;
                self.statement(else_branch)?;
                self.ctx.patch_branch(skip_else, span)
            }
            None => self.ctx.patch_branch(skip_then, span),
        }
    }

    fn while_statement(&mut self, condition: &Expression, body: &Statement) -> CompileResult<()> {
        let span = condition.span();
        let start = self.ctx.current_index();
        self.expression(condition)?;
        let exit = self.ctx.emit_branch(BranchKind::IfFalse);
        self.statement(body)?;
        self.ctx.emit_back_branch(BranchKind::Always, start, &span)?;
        self.ctx.patch_branch(exit, &span)
    }

    fn do_while_statement(&mut self, body: &Statement, condition: &Expression) -> CompileResult<()> {
        let start = self.ctx.current_index();
        self.statement(body)?;
        self.expression(condition)?;
        self.ctx.emit_back_branch(BranchKind::IfTrue, start, &condition.span())
    }

    /// `foreach (x in c) body` runs as
    ///
    /// ```text
    /// index = 0; max = c.length - 1;
    /// while (max >= index) { body; index = index + 1; }
    /// ```
    ///
    /// with every read of `x` compiled as `c[index]`. The names in `c` are
    /// resolved as they were at the `foreach`, so body declarations cannot
    /// capture them.
    fn foreach_statement(&mut self, element: &Token, collection: &Expression, body: &Statement) -> CompileResult<()> {
        let span = element.span.clone() + collection.span();
        self.ctx.scopes.enter();
        let result = self.foreach_body(element, collection, body, &span);
        self.ctx.scopes.exit();
        result
    }

    fn foreach_body(
        &mut self,
        element: &Token,
        collection: &Expression,
        body: &Statement,
        span: &SourceSpan,
    ) -> CompileResult<()> {
        let index = Slot::local(self.ctx.scopes.declare_hidden("index"));
        let max = Slot::local(self.ctx.scopes.declare_hidden("max"));

        self.ctx.emit(Instruction::PushZero);
        self.ctx.emit(Instruction::SetVariable(index));
        self.expression(collection)?;
        self.ctx.emit(Instruction::Length);
        self.ctx.emit(Instruction::PushInt8(1));
        self.ctx.emit(Instruction::Sub);
        self.ctx.emit(Instruction::SetVariable(max));

        let start = self.ctx.current_index();
        self.ctx.emit(Instruction::GetVariable(max));
        self.ctx.emit(Instruction::GetVariable(index));
        self.ctx.emit(Instruction::GreaterEqual);
        let exit = self.ctx.emit_branch(BranchKind::IfFalse);

        let frame = self
            .ctx
            .scopes
            .enclosing()
            .ok_or_else(|| CompileError::internal("foreach outside a subroutine frame"))?;
        let bound = self.ctx.scopes.bind(
            &element.text,
            Variable::Iteration {
                collection: collection.clone(),
                index_slot: index.index(),
                frame,
            },
        );
        if !bound {
            return Err(CompileError::DuplicateVariable {
                name: element.text.clone(),
                span: element.span.clone(),
            });
        }
        self.statement(body)?;

        self.ctx.emit(Instruction::GetVariable(index));
        self.ctx.emit(Instruction::PushInt8(1));
        self.ctx.emit(Instruction::Add);
        self.ctx.emit(Instruction::SetVariable(index));
        self.ctx.emit_back_branch(BranchKind::Always, start, span)?;
        self.ctx.patch_branch(exit, span)
    }

    // ==================== Names ====================

    /// Resolve an identifier: scopes first, then the global table
    pub(crate) fn resolve(&self, token: &Token) -> CompileResult<Resolved> {
        match self.ctx.scopes.resolve(&token.text) {
            Some(Variable::Slot(slot)) => Ok(Resolved::Slot(Slot::local(*slot))),
            Some(Variable::Iteration {
                collection,
                index_slot,
                frame,
            }) => Ok(Resolved::Iteration {
                collection: collection.clone(),
                index_slot: *index_slot,
                frame: *frame,
            }),
            None => match self.declarations.globals.find(&token.text) {
                Some(index) => Ok(Resolved::Slot(Slot::global(index))),
                None => Err(CompileError::undefined_variable(&token.text, token.span.clone())),
            },
        }
    }

    pub(crate) fn is_this(&self, expr: &Expression) -> bool {
        matches!(expr, Expression::Variable(t) if t.kind == lss_syntax::TokenKind::This)
    }

    /// Fail with `InvalidThis` outside an instance method
    pub(crate) fn require_method(&self, this: &Expression) -> CompileResult<&'a ClassLayout> {
        self.class.ok_or_else(|| CompileError::InvalidThis { span: this.span() })
    }

    /// Symbol for the left side of `::`
    pub(crate) fn namespace(&mut self, expr: &Expression) -> CompileResult<SymbolIndex> {
        match expr {
            Expression::Variable(token) if token.kind == lss_syntax::TokenKind::Identifier => self.symbol(&token.text),
            other => Err(CompileError::InvalidNamespace { span: other.span() }),
        }
    }

    /// Symbol for a member name on the right of `.` or `::`
    pub(crate) fn member_symbol(&mut self, expr: &Expression) -> CompileResult<SymbolIndex> {
        match expr {
            Expression::Variable(token) if token.kind == lss_syntax::TokenKind::Identifier => self.symbol(&token.text),
            other => Err(CompileError::internal(format!("malformed member name at {}", other.span()))),
        }
    }
}

/// Result of resolving an identifier
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Resolved {
    Slot(Slot),
    Iteration {
        collection: Expression,
        index_slot: u16,
        frame: usize,
    },
}
