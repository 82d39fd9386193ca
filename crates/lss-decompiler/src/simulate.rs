//! One stack rule per straight-line instruction

use lss_syntax::{Expression, Statement, Token, TokenKind};
use osi_bytecode::{Instruction, Slot, SymbolIndex};

use crate::control_flow::BodyDecoder;
use crate::error::{DecompileError, DecompileResult};
use crate::stack::{self, OperandStack, StackValue};

/// Operator token for a binary instruction
pub fn binary_operator(instruction: &Instruction) -> Option<TokenKind> {
    Some(match instruction {
        Instruction::Add => TokenKind::Plus,
        Instruction::Sub => TokenKind::Minus,
        Instruction::Mul => TokenKind::Star,
        Instruction::Div => TokenKind::Slash,
        Instruction::Mod => TokenKind::Percent,
        Instruction::Pow => TokenKind::StarStar,
        Instruction::BitAnd => TokenKind::Ampersand,
        Instruction::BitOr => TokenKind::Pipe,
        Instruction::BitXor => TokenKind::Caret,
        Instruction::ShiftLeft => TokenKind::ShiftLeft,
        Instruction::ShiftRight => TokenKind::ShiftRight,
        Instruction::Equal => TokenKind::EqualEqual,
        Instruction::NotEqual => TokenKind::BangEqual,
        Instruction::Less => TokenKind::Less,
        Instruction::LessEqual => TokenKind::LessEqual,
        Instruction::Greater => TokenKind::Greater,
        Instruction::GreaterEqual => TokenKind::GreaterEqual,
        Instruction::LogicalAnd => TokenKind::AmpAmp,
        Instruction::LogicalOr => TokenKind::PipePipe,
        _ => return None,
    })
}

/// Keyword for a builtin property instruction
pub fn builtin_keyword(instruction: &Instruction) -> Option<TokenKind> {
    Some(match instruction {
        Instruction::Length => TokenKind::Length,
        Instruction::Red => TokenKind::Red,
        Instruction::Green => TokenKind::Green,
        Instruction::Blue => TokenKind::Blue,
        Instruction::Alpha => TokenKind::Alpha,
        Instruction::IsInt => TokenKind::IsInt,
        Instruction::IsFloat => TokenKind::IsFloat,
        Instruction::IsString => TokenKind::IsString,
        Instruction::IsObject => TokenKind::IsObject,
        Instruction::IsArray => TokenKind::IsArray,
        Instruction::ClassId => TokenKind::ClassId,
        _ => return None,
    })
}

fn array_builtin_name(instruction: &Instruction) -> Option<(&'static str, usize)> {
    match instruction {
        Instruction::ArrayAppend => Some(("append", 1)),
        Instruction::ArrayRemoveAt => Some(("removeat", 1)),
        Instruction::ArrayInsertAt => Some(("insertat", 2)),
        _ => None,
    }
}

fn call(target: Expression, arguments: Vec<Expression>) -> Expression {
    Expression::Call {
        target: Box::new(target),
        arguments,
        span: Default::default(),
    }
}

fn assign(target: Expression, value: Expression) -> Statement {
    Statement::Assignment { target, value }
}

fn this() -> Expression {
    Expression::Variable(Token::of(TokenKind::This))
}

impl BodyDecoder<'_> {
    fn symbol_name(&self, symbol: SymbolIndex) -> DecompileResult<&str> {
        Ok(self.file.symbol(symbol)?)
    }

    fn slot(&self, slot: Slot) -> DecompileResult<Expression> {
        if slot.is_global() {
            let name = self.file.globals.resolve("global", slot.index())?;
            Ok(Expression::variable(name))
        } else {
            Ok(Expression::Variable(self.names.token(slot.index())))
        }
    }

    fn namespaced(&self, namespace: SymbolIndex, operator: TokenKind, right: Expression) -> DecompileResult<Expression> {
        let namespace = Expression::variable(self.symbol_name(namespace)?);
        Ok(stack::access(namespace, operator, right))
    }

    /// Apply one non-branch instruction to the stack
    pub(crate) fn step(
        &self,
        instruction: &Instruction,
        index: usize,
        stack: &mut OperandStack,
        statements: &mut Vec<Statement>,
    ) -> DecompileResult<()> {
        if let Some(operator) = binary_operator(instruction) {
            let right = stack.pop(index)?;
            let left = stack.pop(index)?;
            stack.push(stack::binary(left, operator, right));
            return Ok(());
        }
        if let Some(keyword) = builtin_keyword(instruction) {
            let operand = stack.pop(index)?;
            stack.push(stack::access(operand, TokenKind::Dot, Expression::Variable(Token::of(keyword))));
            return Ok(());
        }
        if let Some((name, arity)) = array_builtin_name(instruction) {
            let arguments = stack.pop_n(arity, index)?;
            let receiver = stack.pop(index)?;
            stack.push(call(stack::member(receiver, name), arguments));
            return Ok(());
        }

        match instruction {
            Instruction::PushNothing => stack.push(Expression::Literal(Token::of(TokenKind::Nothing))),
            Instruction::PushTrue => stack.push(Expression::Literal(Token::of(TokenKind::True))),
            Instruction::PushFalse => stack.push(Expression::Literal(Token::of(TokenKind::False))),
            Instruction::PushZero => stack.push(Expression::Literal(Token::integer(0))),
            Instruction::PushInt8(v) => stack.push(Expression::Literal(Token::integer(*v as i64))),
            Instruction::PushInt16(v) => stack.push(Expression::Literal(Token::integer(*v as i64))),
            Instruction::PushInt32(v) => stack.push(Expression::Literal(Token::integer(*v as i64))),
            Instruction::PushFloat(v) => stack.push(Expression::Literal(Token::float(*v))),
            Instruction::PushString(s) => {
                let value = self.file.strings.resolve("string", s.index())?;
                stack.push(Expression::Literal(Token::string(value)));
            }

            Instruction::GetVariable(slot) => stack.push(self.slot(*slot)?),
            Instruction::SetVariable(slot) => {
                let value = stack.pop(index)?;
                statements.push(assign(self.slot(*slot)?, value));
            }
            Instruction::GetMember(symbol) => {
                let receiver = stack.pop(index)?;
                stack.push(stack::member(receiver, self.symbol_name(*symbol)?));
            }
            Instruction::SetMember(symbol) => {
                let value = stack.pop(index)?;
                let receiver = stack.pop(index)?;
                statements.push(assign(stack::member(receiver, self.symbol_name(*symbol)?), value));
            }
            Instruction::GetThisMember(symbol) => stack.push(stack::member(this(), self.symbol_name(*symbol)?)),
            Instruction::SetThisMember(symbol) => {
                let value = stack.pop(index)?;
                statements.push(assign(stack::member(this(), self.symbol_name(*symbol)?), value));
            }
            Instruction::GetDynamicMember => {
                let name = stack.pop(index)?;
                let receiver = stack.pop(index)?;
                stack.push(stack::access(receiver, TokenKind::DotDollar, name));
            }
            Instruction::SetDynamicMember => {
                let value = stack.pop(index)?;
                let name = stack.pop(index)?;
                let receiver = stack.pop(index)?;
                statements.push(assign(stack::access(receiver, TokenKind::DotDollar, name), value));
            }
            Instruction::GetGameVariable { namespace, name } => {
                let name = Expression::variable(self.symbol_name(*name)?);
                stack.push(self.namespaced(*namespace, TokenKind::ColonColon, name)?);
            }
            Instruction::SetGameVariable { namespace, name } => {
                let value = stack.pop(index)?;
                let name = Expression::variable(self.symbol_name(*name)?);
                statements.push(assign(self.namespaced(*namespace, TokenKind::ColonColon, name)?, value));
            }
            Instruction::GetDynamicGameVariable { namespace } => {
                let name = stack.pop(index)?;
                stack.push(self.namespaced(*namespace, TokenKind::ColonColonDollar, name)?);
            }
            Instruction::GetElement => {
                let element = stack.pop(index)?;
                let array = stack.pop(index)?;
                stack.push(Expression::ArrayAccess {
                    array: Box::new(stack::postfix_operand(array)),
                    index: Box::new(element),
                    span: Default::default(),
                });
            }
            Instruction::SetElement => {
                let value = stack.pop(index)?;
                let element = stack.pop(index)?;
                let array = stack.pop(index)?;
                let target = Expression::ArrayAccess {
                    array: Box::new(stack::postfix_operand(array)),
                    index: Box::new(element),
                    span: Default::default(),
                };
                statements.push(assign(target, value));
            }
            Instruction::CreateArray { count } => {
                let elements = stack.pop_n(*count as usize, index)?;
                stack.push(Expression::ArrayLiteral {
                    elements,
                    span: Default::default(),
                });
            }

            Instruction::Negate | Instruction::Not | Instruction::BitNot => {
                let operand = stack.pop(index)?;
                let operator = match instruction {
                    Instruction::Negate => TokenKind::Minus,
                    Instruction::Not => TokenKind::Bang,
                    _ => TokenKind::Tilde,
                };
                stack.push(stack::unary(operator, operand));
            }

            Instruction::CallFunction { target, argc } => {
                let function = self
                    .file
                    .function_at_offset(target.0)
                    .ok_or(DecompileError::UnknownCallTarget(target.0))?;
                let arguments = stack.pop_n(*argc as usize, index)?;
                let name = Expression::variable(self.file.functions[function].name.clone());
                stack.push(call(name, arguments));
            }
            Instruction::CallGameFunction { namespace, name, argc } => {
                let arguments = stack.pop_n(*argc as usize, index)?;
                let name = Expression::variable(self.symbol_name(*name)?);
                stack.push(call(self.namespaced(*namespace, TokenKind::ColonColon, name)?, arguments));
            }
            Instruction::CallDynamicGameFunction { namespace, argc } => {
                let arguments = stack.pop_n(*argc as usize, index)?;
                let name = stack.pop(index)?;
                stack.push(call(self.namespaced(*namespace, TokenKind::ColonColonDollar, name)?, arguments));
            }
            Instruction::CallMethod { method, argc } => {
                let arguments = stack.pop_n(*argc as usize, index)?;
                // receiver copy, then the receiver itself
                stack.pop(index)?;
                let receiver = stack.pop(index)?;
                stack.push(call(stack::member(receiver, self.symbol_name(*method)?), arguments));
            }
            Instruction::CallThisMethod { method, argc } => {
                let arguments = stack.pop_n(*argc as usize, index)?;
                stack.push(call(stack::member(this(), self.symbol_name(*method)?), arguments));
            }
            Instruction::CallDynamicMethod { argc } => {
                let arguments = stack.pop_n(*argc as usize, index)?;
                let name = stack.pop(index)?;
                stack.pop(index)?;
                let receiver = stack.pop(index)?;
                stack.push(call(stack::access(receiver, TokenKind::DotDollar, name), arguments));
            }
            Instruction::CreateObject(class) => {
                let type_name = Token::identifier(self.symbol_name(*class)?);
                stack.push(Expression::ConstructorPending(type_name));
            }
            Instruction::LookupMethod(method) => {
                stack.push_value(StackValue::Method(Token::identifier(self.symbol_name(*method)?)));
            }
            Instruction::CallIndirect { argc } => {
                let StackValue::Method(method) = stack.pop_value(index)? else {
                    return Err(DecompileError::unexpected(instruction, index));
                };
                let arguments = stack.pop_n(*argc as usize, index)?;
                match stack.pop_value(index)? {
                    StackValue::Expr(Expression::ConstructorPending(type_name)) if type_name.text == method.text => {
                        stack.push_value(StackValue::Constructed { type_name, arguments });
                    }
                    _ => return Err(DecompileError::unexpected(instruction, index)),
                }
            }

            Instruction::Pop => match stack.pop_value(index)? {
                StackValue::Constructed { type_name, arguments } => {
                    let Some(StackValue::Expr(pending @ Expression::ConstructorPending(_))) = stack.top_mut() else {
                        return Err(DecompileError::unexpected(instruction, index));
                    };
                    *pending = Expression::Constructor {
                        type_name,
                        arguments: Some(arguments),
                        span: Default::default(),
                    };
                }
                StackValue::Expr(Expression::ConstructorPending(type_name)) => {
                    statements.push(Statement::Expression(Expression::Constructor {
                        type_name,
                        arguments: None,
                        span: Default::default(),
                    }));
                }
                StackValue::Expr(expr) => statements.push(Statement::Expression(expr)),
                StackValue::Method(_) => return Err(DecompileError::DanglingValue { index }),
            },
            Instruction::Dup => stack.dup(index)?,
            Instruction::Return => {
                let value = stack.pop(index)?;
                let value = match value {
                    Expression::Literal(ref t) if t.kind == TokenKind::Nothing => None,
                    other => Some(other),
                };
                statements.push(Statement::Return {
                    value,
                    span: Default::default(),
                });
            }
            Instruction::LineNumber(_) => {}

            _ => return Err(DecompileError::unexpected(instruction, index)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_flow::SlotNames;
    use lss_syntax::PrettyPrinter;
    use osi_bytecode::{OsiFile, StringIndex};

    fn run(file: &OsiFile, code: &[Instruction]) -> Vec<String> {
        let names = SlotNames {
            is_method: false,
            param_count: 2,
        };
        let decoder = BodyDecoder::new(file, code, names).unwrap();
        let printer = PrettyPrinter::default();
        decoder
            .decode()
            .unwrap()
            .iter()
            .map(|s| printer.print_statement(s).trim_end().to_string())
            .collect()
    }

    #[test]
    fn test_constructor_collapse() {
        let mut file = OsiFile::default();
        let point = SymbolIndex(file.symbols.intern("Point").unwrap());
        let code = [
            Instruction::CreateObject(point),
            Instruction::Dup,
            Instruction::PushInt8(1),
            Instruction::LookupMethod(point),
            Instruction::CallIndirect { argc: 1 },
            Instruction::Pop,
            Instruction::Return,
        ];
        assert_eq!(run(&file, &code), vec!["return new Point(1);"]);
    }

    #[test]
    fn test_builtin_call_statement() {
        let file = OsiFile::default();
        let code = [
            Instruction::GetVariable(Slot::local(0)),
            Instruction::GetVariable(Slot::local(1)),
            Instruction::PushInt8(2),
            Instruction::ArrayInsertAt,
            Instruction::Pop,
        ];
        assert_eq!(run(&file, &code), vec!["param1.insertat(param2, 2);"]);
    }

    #[test]
    fn test_literals() {
        let mut file = OsiFile::default();
        file.strings.intern("a \"b\"").unwrap();
        let code = [
            Instruction::PushString(StringIndex(0)),
            Instruction::PushFloat(2.0),
            Instruction::PushInt16(-300),
            Instruction::CreateArray { count: 3 },
            Instruction::Return,
        ];
        assert_eq!(run(&file, &code), vec![r#"return ["a \"b\"", 2.0, -300];"#]);
    }

    #[test]
    fn test_method_call_consumes_receiver_copy() {
        let mut file = OsiFile::default();
        let go = SymbolIndex(file.symbols.intern("go").unwrap());
        let code = [
            Instruction::GetVariable(Slot::local(0)),
            Instruction::Dup,
            Instruction::CallMethod { method: go, argc: 0 },
            Instruction::Return,
        ];
        assert_eq!(run(&file, &code), vec!["return param1.go();"]);
    }

    #[test]
    fn test_underflow() {
        let file = OsiFile::default();
        let decoder = BodyDecoder::new(
            &file,
            &[Instruction::Add],
            SlotNames {
                is_method: false,
                param_count: 0,
            },
        )
        .unwrap();
        assert!(matches!(decoder.decode(), Err(DecompileError::StackUnderflow { index: 0 })));
    }
}
