//! Expression lowering

use lss_syntax::diagnostic::codes;
use lss_syntax::{Diagnostic, Expression, SourceSpan, Token, TokenKind};
use osi_bytecode::{Instruction, Slot};

use crate::error::{CompileError, CompileResult};
use crate::subroutine::{Resolved, SubroutineCompiler};

/// Narrowest push instruction for an integer literal
///
/// Returns `None` when the text does not fit a signed 32-bit value.
pub fn integer_instruction(text: &str) -> Option<Instruction> {
    let value: i64 = text.parse().ok()?;
    Some(if value == 0 {
        Instruction::PushZero
    } else if let Ok(v) = i8::try_from(value) {
        Instruction::PushInt8(v)
    } else if let Ok(v) = i16::try_from(value) {
        Instruction::PushInt16(v)
    } else {
        Instruction::PushInt32(i32::try_from(value).ok()?)
    })
}

/// Instruction for a binary operator token
pub fn binary_instruction(kind: TokenKind) -> Option<Instruction> {
    Some(match kind {
        TokenKind::Plus => Instruction::Add,
        TokenKind::Minus => Instruction::Sub,
        TokenKind::Star => Instruction::Mul,
        TokenKind::Slash => Instruction::Div,
        TokenKind::Percent => Instruction::Mod,
        TokenKind::StarStar => Instruction::Pow,
        TokenKind::Ampersand => Instruction::BitAnd,
        TokenKind::Pipe => Instruction::BitOr,
        TokenKind::Caret => Instruction::BitXor,
        TokenKind::ShiftLeft => Instruction::ShiftLeft,
        TokenKind::ShiftRight => Instruction::ShiftRight,
        TokenKind::EqualEqual => Instruction::Equal,
        TokenKind::BangEqual => Instruction::NotEqual,
        TokenKind::Less => Instruction::Less,
        TokenKind::LessEqual => Instruction::LessEqual,
        TokenKind::Greater => Instruction::Greater,
        TokenKind::GreaterEqual => Instruction::GreaterEqual,
        TokenKind::AmpAmp => Instruction::LogicalAnd,
        TokenKind::PipePipe => Instruction::LogicalOr,
        _ => return None,
    })
}

/// Instruction for a builtin property keyword (`x.length` and friends)
pub fn builtin_instruction(kind: TokenKind) -> Option<Instruction> {
    Some(match kind {
        TokenKind::Length => Instruction::Length,
        TokenKind::Red => Instruction::Red,
        TokenKind::Green => Instruction::Green,
        TokenKind::Blue => Instruction::Blue,
        TokenKind::Alpha => Instruction::Alpha,
        TokenKind::IsInt => Instruction::IsInt,
        TokenKind::IsFloat => Instruction::IsFloat,
        TokenKind::IsString => Instruction::IsString,
        TokenKind::IsObject => Instruction::IsObject,
        TokenKind::IsArray => Instruction::IsArray,
        TokenKind::ClassId => Instruction::ClassId,
        _ => return None,
    })
}

/// Array builtin methods with their fixed arity
pub fn array_builtin(name: &str) -> Option<(Instruction, usize)> {
    match name {
        "append" => Some((Instruction::ArrayAppend, 1)),
        "removeat" => Some((Instruction::ArrayRemoveAt, 1)),
        "insertat" => Some((Instruction::ArrayInsertAt, 2)),
        _ => None,
    }
}

impl SubroutineCompiler<'_> {
    /// Compile an expression, pushing exactly one value
    pub fn expression(&mut self, expr: &Expression) -> CompileResult<()> {
        match expr {
            Expression::Literal(token) => self.literal(token),
            Expression::Variable(token) => self.variable(token, expr),
            Expression::Grouping(inner) => self.expression(inner),
            Expression::Unary { operator, operand, .. } => {
                self.expression(operand)?;
                let instruction = match operator.kind {
                    TokenKind::Minus => Instruction::Negate,
                    TokenKind::Bang => Instruction::Not,
                    TokenKind::Tilde => Instruction::BitNot,
                    other => return Err(CompileError::internal(format!("unknown unary operator {other}"))),
                };
                self.ctx.emit(instruction);
                Ok(())
            }
            Expression::Binary { left, operator, right } => self.binary(left, operator, right),
            Expression::ArrayAccess { array, index, .. } => {
                self.expression(array)?;
                self.expression(index)?;
                self.ctx.emit(Instruction::GetElement);
                Ok(())
            }
            Expression::ArrayLiteral { elements, span } => {
                let count = u16::try_from(elements.len()).map_err(|_| CompileError::TooManyArguments { span: span.clone() })?;
                for element in elements {
                    self.expression(element)?;
                }
                self.ctx.emit(Instruction::CreateArray { count });
                Ok(())
            }
            Expression::Call { target, arguments, span } => self.call(target, arguments, span),
            Expression::Constructor {
                type_name,
                arguments,
                span,
            } => self.constructor(type_name, arguments.as_deref(), span),
            Expression::ConstructorPending(_) => Err(CompileError::internal("pending constructor in source tree")),
        }
    }

    fn literal(&mut self, token: &Token) -> CompileResult<()> {
        let out_of_range = || CompileError::LiteralOutOfRange {
            text: token.text.clone(),
            span: token.span.clone(),
        };
        let instruction = match token.kind {
            TokenKind::Integer => integer_instruction(&token.text).ok_or_else(out_of_range)?,
            TokenKind::Float => {
                let value: f32 = token.text.parse().map_err(|_| out_of_range())?;
                if !value.is_finite() {
                    return Err(out_of_range());
                }
                Instruction::PushFloat(value)
            }
            TokenKind::String => Instruction::PushString(self.string(&token.string_value())?),
            TokenKind::True => Instruction::PushTrue,
            TokenKind::False => Instruction::PushFalse,
            TokenKind::Nothing => Instruction::PushNothing,
            other => return Err(CompileError::internal(format!("unexpected literal {other}"))),
        };
        self.ctx.emit(instruction);
        Ok(())
    }

    fn variable(&mut self, token: &Token, expr: &Expression) -> CompileResult<()> {
        match token.kind {
            TokenKind::This => {
                self.require_method(expr)?;
                self.ctx.emit(Instruction::GetVariable(Slot::local(0)));
            }
            TokenKind::Identifier => match self.resolve(token)? {
                Resolved::Slot(slot) => self.ctx.emit(Instruction::GetVariable(slot)),
                Resolved::Iteration {
                    collection,
                    index_slot,
                    frame,
                } => {
                    let previous = self.ctx.scopes.switch_to(Some(frame));
                    let result = self.expression(&collection);
                    self.ctx.scopes.switch_to(previous);
                    result?;
                    self.ctx.emit(Instruction::GetVariable(Slot::local(index_slot)));
                    self.ctx.emit(Instruction::GetElement);
                }
            },
            other => return Err(CompileError::internal(format!("{other} used as a variable"))),
        }
        Ok(())
    }

    fn binary(&mut self, left: &Expression, operator: &Token, right: &Expression) -> CompileResult<()> {
        match operator.kind {
            TokenKind::Dot => {
                let Expression::Variable(member) = right else {
                    return Err(CompileError::internal("malformed member access"));
                };
                if let Some(instruction) = builtin_instruction(member.kind) {
                    self.expression(left)?;
                    self.ctx.emit(instruction);
                } else if self.is_this(left) {
                    self.require_method(left)?;
                    let symbol = self.member_symbol(right)?;
                    self.ctx.emit(Instruction::GetThisMember(symbol));
                } else {
                    let symbol = self.member_symbol(right)?;
                    self.expression(left)?;
                    self.ctx.emit(Instruction::GetMember(symbol));
                }
            }
            TokenKind::DotDollar => {
                self.expression(left)?;
                self.expression(right)?;
                self.ctx.emit(Instruction::GetDynamicMember);
            }
            TokenKind::ColonColon => {
                let namespace = self.namespace(left)?;
                let name = self.member_symbol(right)?;
                self.ctx.emit(Instruction::GetGameVariable { namespace, name });
            }
            TokenKind::ColonColonDollar => {
                let namespace = self.namespace(left)?;
                self.expression(right)?;
                self.ctx.emit(Instruction::GetDynamicGameVariable { namespace });
            }
            kind => {
                let instruction = binary_instruction(kind)
                    .ok_or_else(|| CompileError::internal(format!("unknown binary operator {kind}")))?;
                self.expression(left)?;
                self.expression(right)?;
                self.ctx.emit(instruction);
            }
        }
        Ok(())
    }

    fn arguments(&mut self, arguments: &[Expression]) -> CompileResult<()> {
        arguments.iter().try_for_each(|a| self.expression(a))
    }

    fn call(&mut self, target: &Expression, arguments: &[Expression], span: &SourceSpan) -> CompileResult<()> {
        let argc = u8::try_from(arguments.len()).map_err(|_| CompileError::TooManyArguments { span: span.clone() })?;
        let invalid = || CompileError::InvalidCallTarget { span: target.span() };

        match target {
            Expression::Variable(name) if name.kind == TokenKind::Identifier => {
                let signature = self
                    .declarations
                    .functions
                    .get(&name.text)
                    .ok_or_else(|| CompileError::undefined_function(&name.text, name.span.clone()))?;
                check_arity(&name.text, signature.parameter_count as usize, arguments.len(), span)?;
                self.arguments(arguments)?;
                self.ctx.emit(Instruction::UnresolvedCall {
                    function: name.text.clone(),
                    argc,
                });
            }
            Expression::Binary { left, operator, right } => match operator.kind {
                TokenKind::Dot => {
                    let Expression::Variable(member) = right.as_ref() else {
                        return Err(invalid());
                    };
                    if member.kind != TokenKind::Identifier {
                        return Err(invalid());
                    }
                    if self.is_this(left) {
                        let class = self.require_method(left)?;
                        let arity = class
                            .method_arity(&member.text)
                            .ok_or_else(|| CompileError::undefined_function(&member.text, member.span.clone()))?;
                        check_arity(&member.text, arity as usize, arguments.len(), span)?;
                        let method = self.symbol(&member.text)?;
                        self.arguments(arguments)?;
                        self.ctx.emit(Instruction::CallThisMethod { method, argc });
                    } else if let Some((instruction, arity)) = array_builtin(&member.text) {
                        check_arity(&member.text, arity, arguments.len(), span)?;
                        self.expression(left)?;
                        self.arguments(arguments)?;
                        self.ctx.emit(instruction);
                    } else {
                        let method = self.symbol(&member.text)?;
                        self.expression(left)?;
                        self.ctx.emit(Instruction::Dup);
                        self.arguments(arguments)?;
                        self.ctx.emit(Instruction::CallMethod { method, argc });
                    }
                }
                TokenKind::DotDollar => {
                    self.expression(left)?;
                    self.ctx.emit(Instruction::Dup);
                    self.expression(right)?;
                    self.arguments(arguments)?;
                    self.ctx.emit(Instruction::CallDynamicMethod { argc });
                }
                TokenKind::ColonColon => {
                    let namespace = self.namespace(left)?;
                    let name = self.member_symbol(right)?;
                    self.arguments(arguments)?;
                    self.ctx.emit(Instruction::CallGameFunction { namespace, name, argc });
                }
                TokenKind::ColonColonDollar => {
                    let namespace = self.namespace(left)?;
                    self.expression(right)?;
                    self.arguments(arguments)?;
                    self.ctx.emit(Instruction::CallDynamicGameFunction { namespace, argc });
                }
                _ => return Err(invalid()),
            },
            _ => return Err(invalid()),
        }
        Ok(())
    }

    fn constructor(&mut self, type_name: &Token, arguments: Option<&[Expression]>, span: &SourceSpan) -> CompileResult<()> {
        let layout = self
            .declarations
            .classes
            .get(&type_name.text)
            .ok_or_else(|| CompileError::undefined_class(&type_name.text, type_name.span.clone()))?;
        let constructor = layout.constructor_arity();
        let class = self.symbol(&type_name.text)?;

        let (Some(arguments), Some(arity)) = (arguments, constructor) else {
            // `new T`, or `new T()` on a class without a constructor
            let found = arguments.map_or(0, <[Expression]>::len);
            if found > 0 {
                return Err(CompileError::wrong_argument_count(&type_name.text, 0, found, span.clone()));
            }
            if arguments.is_none() && constructor.is_some() {
                self.warnings.push(Diagnostic::warning(
                    codes::CONSTRUCTOR_NOT_CALLED,
                    format!("`new {0}` does not run the constructor of {0}; write `new {0}(...)`", type_name.text),
                    span.clone(),
                ));
            }
            self.ctx.emit(Instruction::CreateObject(class));
            return Ok(());
        };

        check_arity(&type_name.text, arity as usize, arguments.len(), span)?;
        let argc = u8::try_from(arguments.len()).map_err(|_| CompileError::TooManyArguments { span: span.clone() })?;
        self.ctx.emit(Instruction::CreateObject(class));
        self.ctx.emit(Instruction::Dup);
        self.arguments(arguments)?;
        self.ctx.emit(Instruction::LookupMethod(class));
        self.ctx.emit(Instruction::CallIndirect { argc });
        self.ctx.emit(Instruction::Pop);
        Ok(())
    }
}

fn check_arity(name: &str, expected: usize, found: usize, span: &SourceSpan) -> CompileResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(CompileError::wrong_argument_count(name, expected, found, span.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widths() {
        assert_eq!(integer_instruction("0"), Some(Instruction::PushZero));
        assert_eq!(integer_instruction("-128"), Some(Instruction::PushInt8(-128)));
        assert_eq!(integer_instruction("128"), Some(Instruction::PushInt16(128)));
        assert_eq!(integer_instruction("-32769"), Some(Instruction::PushInt32(-32769)));
        assert_eq!(integer_instruction("2147483648"), None);
        assert_eq!(integer_instruction("99999999999999999999"), None);
    }

    #[test]
    fn test_operator_tables() {
        assert_eq!(binary_instruction(TokenKind::StarStar), Some(Instruction::Pow));
        assert_eq!(binary_instruction(TokenKind::Dot), None);
        assert_eq!(builtin_instruction(TokenKind::ClassId), Some(Instruction::ClassId));
        assert_eq!(array_builtin("insertat"), Some((Instruction::ArrayInsertAt, 2)));
        assert_eq!(array_builtin("push"), None);
    }
}
