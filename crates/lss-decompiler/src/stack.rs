//! Abstract operand stack and expression rebuilding
//!
//! Every value on the stack is the source expression that computed it. The
//! builders below add [`Expression::Grouping`] wherever the printed text would
//! otherwise parse with a different shape.

use lss_syntax::{Expression, Token, TokenKind};

use crate::error::{DecompileError, DecompileResult};

/// A simulated stack entry
#[derive(Debug, Clone, PartialEq)]
pub enum StackValue {
    /// An ordinary value
    Expr(Expression),
    /// Method reference pushed by `LookupMethod`
    Method(Token),
    /// Result of running a constructor on a pending object; the `Pop` that
    /// follows fuses it with the object below
    Constructed {
        /// Class name
        type_name: Token,
        /// Constructor arguments
        arguments: Vec<Expression>,
    },
}

/// Operand stack of one straight-line region
#[derive(Debug, Default, Clone)]
pub struct OperandStack {
    values: Vec<StackValue>,
}

impl OperandStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an expression
    pub fn push(&mut self, expr: Expression) {
        self.values.push(StackValue::Expr(expr));
    }

    /// Push any stack value
    pub fn push_value(&mut self, value: StackValue) {
        self.values.push(value);
    }

    /// Pop any stack value
    pub fn pop_value(&mut self, index: usize) -> DecompileResult<StackValue> {
        self.values.pop().ok_or(DecompileError::StackUnderflow { index })
    }

    /// Pop an expression; a pending object that is used as a value becomes
    /// `new T` without arguments
    pub fn pop(&mut self, index: usize) -> DecompileResult<Expression> {
        match self.pop_value(index)? {
            StackValue::Expr(Expression::ConstructorPending(type_name)) => Ok(Expression::Constructor {
                type_name,
                arguments: None,
                span: Default::default(),
            }),
            StackValue::Expr(expr) => Ok(expr),
            StackValue::Method(_) | StackValue::Constructed { .. } => {
                Err(DecompileError::DanglingValue { index })
            }
        }
    }

    /// Pop `count` expressions, returned in push order
    pub fn pop_n(&mut self, count: usize, index: usize) -> DecompileResult<Vec<Expression>> {
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.pop(index)?);
        }
        items.reverse();
        Ok(items)
    }

    /// Duplicate the top value
    pub fn dup(&mut self, index: usize) -> DecompileResult<()> {
        let top = self.values.last().cloned().ok_or(DecompileError::StackUnderflow { index })?;
        self.values.push(top);
        Ok(())
    }

    /// Mutable access to the top value
    pub fn top_mut(&mut self) -> Option<&mut StackValue> {
        self.values.last_mut()
    }

    /// Number of values on the stack
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Is the stack empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Binding power of an expression as an operand, `None` for primaries
fn precedence(expr: &Expression) -> Option<u8> {
    match expr {
        Expression::Binary { operator, .. } => operator.kind.binary_precedence(),
        _ => None,
    }
}

/// `left op right` with the groupings precedence requires
pub fn binary(left: Expression, operator: TokenKind, right: Expression) -> Expression {
    let Some(p) = operator.binary_precedence() else {
        return Expression::binary(left, operator, right);
    };
    let right_assoc = operator.is_right_associative();

    let left = match precedence(&left) {
        Some(pl) if pl < p || (pl == p && right_assoc) => group(left),
        _ => left,
    };
    let right = match precedence(&right) {
        Some(pr) if pr < p || (pr == p && !right_assoc) => group(right),
        _ => right,
    };
    Expression::binary(left, operator, right)
}

/// Prefix unary operator application
pub fn unary(operator: TokenKind, operand: Expression) -> Expression {
    let operand = if precedence(&operand).is_some() {
        group(operand)
    } else {
        operand
    };
    Expression::Unary {
        operator: Token::of(operator),
        operand: Box::new(operand),
        prefix: true,
    }
}

/// Operand on the left of `.`, `[ ]` or `( )`
pub fn postfix_operand(expr: Expression) -> Expression {
    let needs_group = match &expr {
        Expression::Binary { operator, .. } => !operator.kind.is_access(),
        Expression::Unary { .. } => true,
        other => is_prefixed(other),
    };
    if needs_group { group(expr) } else { expr }
}

/// Operand on the right of `.$` and `::$`, which only takes a primary
pub fn primary_operand(expr: Expression) -> Expression {
    match &expr {
        Expression::Literal(_) if !is_prefixed(&expr) => expr,
        Expression::Variable(_) | Expression::Grouping(_) | Expression::ArrayLiteral { .. } => expr,
        _ => group(expr),
    }
}

/// Access expression `left op right`
pub fn access(left: Expression, operator: TokenKind, right: Expression) -> Expression {
    let right = match operator {
        TokenKind::DotDollar | TokenKind::ColonColonDollar => primary_operand(right),
        _ => right,
    };
    Expression::binary(postfix_operand(left), operator, right)
}

/// `receiver.name` with `name` a plain identifier
pub fn member(receiver: Expression, name: &str) -> Expression {
    access(receiver, TokenKind::Dot, Expression::variable(name))
}

/// Negative numeric literal, which prints with a leading `-`
fn is_prefixed(expr: &Expression) -> bool {
    matches!(expr, Expression::Literal(t) if t.text.starts_with('-'))
}

fn group(expr: Expression) -> Expression {
    Expression::Grouping(Box::new(expr))
}
