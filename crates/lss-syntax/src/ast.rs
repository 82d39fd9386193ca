//! Syntax tree
//!
//! Expressions push exactly one value when compiled; statements leave the
//! operand stack unchanged.

use serde::Serialize;

use crate::span::SourceSpan;
use crate::token::{Token, TokenKind};

/// An expression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expression {
    /// Integer, float, string, boolean or `nothing` literal
    Literal(Token),
    /// Identifier, builtin property keyword (right of `.`) or `this`
    Variable(Token),
    /// Parenthesized expression
    Grouping(Box<Expression>),
    /// Unary operator application
    Unary {
        /// Operator token
        operator: Token,
        /// Operand
        operand: Box<Expression>,
        /// Prefix (`-x`) rather than postfix
        prefix: bool,
    },
    /// Binary operator application, including the access operators
    Binary {
        /// Left operand
        left: Box<Expression>,
        /// Operator token
        operator: Token,
        /// Right operand
        right: Box<Expression>,
    },
    /// `array[index]`
    ArrayAccess {
        /// Indexed expression
        array: Box<Expression>,
        /// Index expression
        index: Box<Expression>,
        /// Source span
        span: SourceSpan,
    },
    /// `[a, b, c]`
    ArrayLiteral {
        /// Elements in order
        elements: Vec<Expression>,
        /// Source span
        span: SourceSpan,
    },
    /// `target(arguments)`
    Call {
        /// Called expression
        target: Box<Expression>,
        /// Arguments in order
        arguments: Vec<Expression>,
        /// Source span
        span: SourceSpan,
    },
    /// `new T(args)`, or `new T` when `arguments` is `None`
    Constructor {
        /// Class name
        type_name: Token,
        /// Constructor arguments
        arguments: Option<Vec<Expression>>,
        /// Source span
        span: SourceSpan,
    },
    /// Object created but not yet constructed; only exists while decompiling
    ConstructorPending(Token),
}

impl Expression {
    /// Source span covering the whole expression
    pub fn span(&self) -> SourceSpan {
        match self {
            Self::Literal(token) | Self::Variable(token) | Self::ConstructorPending(token) => token.span.clone(),
            Self::Grouping(inner) => inner.span(),
            Self::Unary {
                operator, operand, ..
            } => operator.span.clone() + operand.span(),
            Self::Binary {
                left,
                operator,
                right,
            } => left.span() + operator.span.clone() + right.span(),
            Self::ArrayAccess { span, .. }
            | Self::ArrayLiteral { span, .. }
            | Self::Call { span, .. }
            | Self::Constructor { span, .. } => span.clone(),
        }
    }

    /// Binary expression with a synthetic operator token
    pub fn binary(left: Expression, operator: TokenKind, right: Expression) -> Self {
        Self::Binary {
            left: Box::new(left),
            operator: Token::of(operator),
            right: Box::new(right),
        }
    }

    /// Variable reference by name
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(Token::identifier(name))
    }

    /// Is this a plain identifier named `name`
    pub fn is_identifier(&self, name: &str) -> bool {
        matches!(self, Self::Variable(t) if t.kind == TokenKind::Identifier && t.text == name)
    }

    /// Strip any number of enclosing groupings
    pub fn ungrouped(&self) -> &Expression {
        let mut expr = self;
        while let Self::Grouping(inner) = expr {
            expr = inner;
        }
        expr
    }
}

/// A `{ ... }` block with its own lexical scope
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Block {
    /// Statements in order
    pub statements: Vec<Statement>,
    /// Source span
    pub span: SourceSpan,
}

impl Block {
    /// Create a synthetic block
    pub fn new(statements: Vec<Statement>) -> Self {
        Self {
            statements,
            span: SourceSpan::default(),
        }
    }
}

/// A function or method
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subroutine {
    /// Name
    pub name: Token,
    /// Parameter names in order
    pub parameters: Vec<Token>,
    /// Body
    pub body: Block,
}

/// A class declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassDecl {
    /// Class name
    pub name: Token,
    /// Base class name
    pub superclass: Option<Token>,
    /// Property names in order
    pub properties: Vec<Token>,
    /// Methods in order
    pub methods: Vec<Subroutine>,
}

/// A statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Statement {
    /// Nested block
    Block(Block),
    /// Class declaration
    Class(ClassDecl),
    /// `property name;`
    Property(Token),
    /// Function or method declaration
    Subroutine(Subroutine),
    /// `global name;`
    Global(Token),
    /// Expression evaluated for its effect
    Expression(Expression),
    /// `return value;`
    Return {
        /// Returned value
        value: Option<Expression>,
        /// Source span
        span: SourceSpan,
    },
    /// `if (condition) body else ...`; a condition-less `If` is an `else` arm
    If {
        /// Condition, `None` for an `else` arm
        condition: Option<Expression>,
        /// Guarded statement
        body: Box<Statement>,
        /// `else` arm, always a condition-less `If`
        else_branch: Option<Box<Statement>>,
        /// Source span
        span: SourceSpan,
    },
    /// `while (condition) body`
    While {
        /// Loop condition
        condition: Expression,
        /// Loop body
        body: Box<Statement>,
    },
    /// `do body while (condition);`
    DoWhile {
        /// Loop body
        body: Box<Statement>,
        /// Loop condition
        condition: Expression,
    },
    /// `foreach (element in collection) body`
    ForEach {
        /// Element variable
        element: Token,
        /// Iterated array
        collection: Expression,
        /// Loop body
        body: Box<Statement>,
    },
    /// `target = value;`
    Assignment {
        /// Assigned place
        target: Expression,
        /// Assigned value
        value: Expression,
    },
    /// `var name = initializer;`
    VariableDeclaration {
        /// Declared name
        name: Token,
        /// Initial value
        initializer: Option<Expression>,
    },
}

impl Statement {
    /// Source span covering the statement
    pub fn span(&self) -> SourceSpan {
        match self {
            Self::Block(block) => block.span.clone(),
            Self::Class(class) => class.name.span.clone(),
            Self::Property(name) | Self::Global(name) => name.span.clone(),
            Self::Subroutine(sub) => sub.name.span.clone() + sub.body.span.clone(),
            Self::Expression(expr) => expr.span(),
            Self::Return { span, .. } | Self::If { span, .. } => span.clone(),
            Self::While { condition, body } | Self::DoWhile { body, condition } => {
                condition.span() + body.span()
            }
            Self::ForEach {
                element,
                collection,
                body,
            } => element.span.clone() + collection.span() + body.span(),
            Self::Assignment { target, value } => target.span() + value.span(),
            Self::VariableDeclaration { name, initializer } => match initializer {
                Some(init) => name.span.clone() + init.span(),
                None => name.span.clone(),
            },
        }
    }

    /// Synthetic `if` without an `else` arm
    pub fn if_then(condition: Expression, body: Statement) -> Self {
        Self::If {
            condition: Some(condition),
            body: Box::new(body),
            else_branch: None,
            span: SourceSpan::default(),
        }
    }

    /// Synthetic condition-less `If` used as an `else` arm
    pub fn else_arm(body: Statement) -> Self {
        Self::If {
            condition: None,
            body: Box::new(body),
            else_branch: None,
            span: SourceSpan::default(),
        }
    }

    /// Does control leave the subroutine at the end of this statement
    pub fn is_return(&self) -> bool {
        matches!(self, Self::Return { .. })
    }
}

/// Declarations of one source file (or one decompiled container)
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParsedUnit {
    /// Source file name
    pub file: Option<String>,
    /// Global variable names
    pub globals: Vec<Token>,
    /// Top-level functions
    pub functions: Vec<Subroutine>,
    /// Classes
    pub classes: Vec<ClassDecl>,
}

impl ParsedUnit {
    /// Find a function by name
    pub fn function(&self, name: &str) -> Option<&Subroutine> {
        self.functions.iter().find(|f| f.name.text == name)
    }

    /// Find a class by name
    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.iter().find(|c| c.name.text == name)
    }
}
