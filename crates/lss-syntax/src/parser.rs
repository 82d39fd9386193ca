//! Recursive-descent parser with panic-mode recovery
//!
//! ```text
//! unit        → ( "global" IDENT ";" | function | class )* EOF
//! function    → "function" IDENT "(" ( IDENT ( "," IDENT )* )? ")" block
//! class       → "class" IDENT ( ":" IDENT )? "{" ( "property" IDENT ";" | function )* "}"
//! statement   → block | var | if | while | do | foreach | return | expr ( "=" expr )? ";"
//! expression  → binary operators by precedence, `**` grouping to the right
//! unary       → ( "-" | "!" | "~" ) unary | postfix
//! postfix     → primary ( "." NAME | ".$" primary | "::" IDENT | "::$" primary
//!                       | "[" expression "]" | "(" arguments ")" )*
//! primary     → literal | IDENT | "this" | "(" expression ")" | "[" elements "]"
//!             | "new" IDENT ( "(" arguments ")" )?
//! ```
//!
//! A malformed statement raises [`Panic`], which is caught at the nearest
//! statement or declaration boundary. [`Parser::synchronize`] then skips to a
//! point where parsing can resume.

use tracing::trace;

use crate::ast::{Block, ClassDecl, Expression, ParsedUnit, Statement, Subroutine};
use crate::diagnostic::{Diagnostic, codes};
use crate::span::SourceSpan;
use crate::token::{Token, TokenKind};

/// Most parameters or arguments one call can encode
const MAX_ARGUMENTS: usize = u8::MAX as usize;

/// Recovery signal; the diagnostic has already been recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Panic;

type ParseResult<T> = Result<T, Panic>;

/// Parse a token stream into a unit
///
/// Never fails: syntax errors become diagnostics and the affected
/// statement or declaration is skipped.
pub fn parse(tokens: Vec<Token>) -> (ParsedUnit, Vec<Diagnostic>) {
    Parser::new(tokens).parse_unit()
}

/// Parser state over one token stream
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    /// Create a parser; trivia tokens are dropped
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut tokens: Vec<Token> = tokens.into_iter().filter(|t| !t.kind.is_trivia()).collect();
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let span = tokens.last().map(|t| t.span.clone()).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", span));
        }
        Self {
            tokens,
            current: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Parse top-level declarations until end of input
    pub fn parse_unit(mut self) -> (ParsedUnit, Vec<Diagnostic>) {
        let mut unit = ParsedUnit {
            file: self.peek().span.file.as_deref().map(str::to_string),
            ..ParsedUnit::default()
        };

        while !self.is_at_end() {
            let before = self.current;
            let result = match self.peek_kind() {
                TokenKind::Global => self.global_declaration().map(|name| unit.globals.push(name)),
                TokenKind::Function => self.subroutine().map(|sub| unit.functions.push(sub)),
                TokenKind::Class => self.class_declaration().map(|class| unit.classes.push(class)),
                _ => Err(self.error_at_current(
                    codes::EXPECTED_DECLARATION,
                    "Expected 'function', 'class' or 'global'",
                )),
            };
            if result.is_err() {
                self.recover(before);
            }
        }

        (unit, self.diagnostics)
    }

    // ==================== Declarations ====================

    fn global_declaration(&mut self) -> ParseResult<Token> {
        self.advance();
        let name = self.consume_identifier("after 'global'")?;
        self.consume(TokenKind::Semicolon, "after global declaration")?;
        Ok(name)
    }

    fn subroutine(&mut self) -> ParseResult<Subroutine> {
        self.consume(TokenKind::Function, "")?;
        let name = self.consume_identifier("for function name")?;
        self.consume(TokenKind::LeftParen, "after function name")?;

        let mut parameters = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                parameters.push(self.consume_identifier("for parameter name")?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        let close = self.consume(TokenKind::RightParen, "after parameters")?;
        if parameters.len() > MAX_ARGUMENTS {
            self.diagnostics.push(Diagnostic::error(
                codes::TOO_MANY_ITEMS,
                format!("Function '{}' has more than {MAX_ARGUMENTS} parameters", name.text),
                close.span,
            ));
        }

        let body = self.block()?;
        Ok(Subroutine {
            name,
            parameters,
            body,
        })
    }

    fn class_declaration(&mut self) -> ParseResult<ClassDecl> {
        self.advance();
        let name = self.consume_identifier("for class name")?;
        let superclass = if self.match_kind(TokenKind::Colon) {
            Some(self.consume_identifier("for base class name")?)
        } else {
            None
        };
        self.consume(TokenKind::LeftBrace, "before class body")?;

        let mut class = ClassDecl {
            name,
            superclass,
            properties: Vec::new(),
            methods: Vec::new(),
        };

        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            let before = self.current;
            let result = match self.peek_kind() {
                TokenKind::Property => self.property().map(|p| class.properties.push(p)),
                TokenKind::Function => self.subroutine().map(|m| class.methods.push(m)),
                _ => Err(self.error_at_current(
                    codes::EXPECTED_DECLARATION,
                    "Expected 'property' or 'function' in class body",
                )),
            };
            if result.is_err() {
                self.recover(before);
            }
        }
        self.close_brace("after class body");
        Ok(class)
    }

    fn property(&mut self) -> ParseResult<Token> {
        self.advance();
        let name = self.consume_identifier("for property name")?;
        self.consume(TokenKind::Semicolon, "after property declaration")?;
        Ok(name)
    }

    // ==================== Statements ====================

    fn block(&mut self) -> ParseResult<Block> {
        let open = self.consume(TokenKind::LeftBrace, "to open a block")?;
        let mut statements = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            let before = self.current;
            match self.statement() {
                Ok(statement) => statements.push(statement),
                Err(Panic) => self.recover(before),
            }
        }

        let close = self.close_brace("to close the block");
        Ok(Block {
            statements,
            span: open.span + close,
        })
    }

    fn statement(&mut self) -> ParseResult<Statement> {
        match self.peek_kind() {
            TokenKind::LeftBrace => Ok(Statement::Block(self.block()?)),
            TokenKind::Var => self.var_declaration(),
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::Do => self.do_statement(),
            TokenKind::Foreach => self.foreach_statement(),
            TokenKind::Return => self.return_statement(),
            TokenKind::Function | TokenKind::Class | TokenKind::Property | TokenKind::Global => {
                let keyword = self.advance();
                self.diagnostics.push(Diagnostic::error(
                    codes::MISPLACED_DECLARATION,
                    format!("{} declarations are not allowed inside a function body", keyword.kind),
                    keyword.span,
                ));
                Err(Panic)
            }
            _ => self.expression_statement(),
        }
    }

    fn var_declaration(&mut self) -> ParseResult<Statement> {
        self.advance();
        let name = self.consume_identifier("after 'var'")?;
        let initializer = if self.match_kind(TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "after variable declaration")?;
        Ok(Statement::VariableDeclaration { name, initializer })
    }

    fn if_statement(&mut self) -> ParseResult<Statement> {
        let keyword = self.advance();
        self.consume(TokenKind::LeftParen, "after 'if'")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "after if condition")?;
        let body = self.statement()?;
        let mut span = keyword.span + body.span();

        let else_branch = if self.check(TokenKind::Else) {
            let else_keyword = self.advance();
            let else_body = self.statement()?;
            let else_span = else_keyword.span + else_body.span();
            span = span + else_span.clone();
            Some(Box::new(Statement::If {
                condition: None,
                body: Box::new(else_body),
                else_branch: None,
                span: else_span,
            }))
        } else {
            None
        };

        Ok(Statement::If {
            condition: Some(condition),
            body: Box::new(body),
            else_branch,
            span,
        })
    }

    fn while_statement(&mut self) -> ParseResult<Statement> {
        self.advance();
        self.consume(TokenKind::LeftParen, "after 'while'")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "after loop condition")?;
        let body = Box::new(self.statement()?);
        Ok(Statement::While { condition, body })
    }

    fn do_statement(&mut self) -> ParseResult<Statement> {
        self.advance();
        let body = Box::new(self.statement()?);
        self.consume(TokenKind::While, "after 'do' body")?;
        self.consume(TokenKind::LeftParen, "after 'while'")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "after loop condition")?;
        self.consume(TokenKind::Semicolon, "after 'do ... while'")?;
        Ok(Statement::DoWhile { body, condition })
    }

    fn foreach_statement(&mut self) -> ParseResult<Statement> {
        self.advance();
        self.consume(TokenKind::LeftParen, "after 'foreach'")?;
        let element = self.consume_identifier("for loop variable")?;
        self.consume(TokenKind::In, "after loop variable")?;
        let collection = self.expression()?;
        self.consume(TokenKind::RightParen, "after collection")?;
        let body = Box::new(self.statement()?);
        Ok(Statement::ForEach {
            element,
            collection,
            body,
        })
    }

    fn return_statement(&mut self) -> ParseResult<Statement> {
        let keyword = self.advance();
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        let semicolon = self.consume(TokenKind::Semicolon, "after return value")?;
        Ok(Statement::Return {
            value,
            span: keyword.span + semicolon.span,
        })
    }

    fn expression_statement(&mut self) -> ParseResult<Statement> {
        let expr = self.expression()?;
        if self.match_kind(TokenKind::Equal) {
            let value = self.expression()?;
            self.consume(TokenKind::Semicolon, "after assignment")?;
            return Ok(Statement::Assignment {
                target: expr,
                value,
            });
        }
        self.consume(TokenKind::Semicolon, "after expression")?;
        Ok(Statement::Expression(expr))
    }

    // ==================== Expressions ====================

    /// Parse a full expression
    pub fn expression(&mut self) -> ParseResult<Expression> {
        self.binary(1)
    }

    /// Precedence climbing over the binary operator table
    fn binary(&mut self, min_precedence: u8) -> ParseResult<Expression> {
        let mut left = self.unary()?;
        while let Some(precedence) = self.peek_kind().binary_precedence() {
            if precedence < min_precedence {
                break;
            }
            let operator = self.advance();
            let next = if operator.kind.is_right_associative() {
                precedence
            } else {
                precedence + 1
            };
            let right = self.binary(next)?;
            left = Expression::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> ParseResult<Expression> {
        if !matches!(
            self.peek_kind(),
            TokenKind::Minus | TokenKind::Bang | TokenKind::Tilde
        ) {
            return self.postfix();
        }

        let operator = self.advance();
        let operand = self.unary()?;
        if operator.kind == TokenKind::Minus {
            if let Expression::Literal(literal) = &operand {
                if matches!(literal.kind, TokenKind::Integer | TokenKind::Float) {
                    let text = match literal.text.strip_prefix('-') {
                        Some(positive) => positive.to_string(),
                        None => format!("-{}", literal.text),
                    };
                    let span = operator.span + literal.span.clone();
                    return Ok(Expression::Literal(Token::new(literal.kind, text, span)));
                }
            }
        }
        Ok(Expression::Unary {
            operator,
            operand: Box::new(operand),
            prefix: true,
        })
    }

    fn postfix(&mut self) -> ParseResult<Expression> {
        let mut expr = self.primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    let operator = self.advance();
                    let member = self.peek().clone();
                    if member.kind != TokenKind::Identifier && !member.kind.is_builtin_property() {
                        return Err(self.error_at_current(
                            codes::EXPECTED_IDENTIFIER,
                            "Expected member name after '.'",
                        ));
                    }
                    self.advance();
                    expr = access(expr, operator, Expression::Variable(member));
                }
                TokenKind::ColonColon => {
                    let operator = self.advance();
                    let name = self.consume_identifier("after '::'")?;
                    expr = access(expr, operator, Expression::Variable(name));
                }
                TokenKind::DotDollar | TokenKind::ColonColonDollar => {
                    let operator = self.advance();
                    let name = self.primary()?;
                    expr = access(expr, operator, name);
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.expression()?;
                    let close = self.consume(TokenKind::RightBracket, "after index")?;
                    let span = expr.span() + close.span;
                    expr = Expression::ArrayAccess {
                        array: Box::new(expr),
                        index: Box::new(index),
                        span,
                    };
                }
                TokenKind::LeftParen => {
                    self.advance();
                    let arguments = self.arguments(TokenKind::RightParen)?;
                    let close = self.consume(TokenKind::RightParen, "after arguments")?;
                    let span = expr.span() + close.span;
                    expr = Expression::Call {
                        target: Box::new(expr),
                        arguments,
                        span,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn primary(&mut self) -> ParseResult<Expression> {
        match self.peek_kind() {
            TokenKind::Integer
            | TokenKind::Float
            | TokenKind::String
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Nothing => Ok(Expression::Literal(self.advance())),
            TokenKind::Identifier | TokenKind::This => Ok(Expression::Variable(self.advance())),
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(TokenKind::RightParen, "after expression")?;
                Ok(Expression::Grouping(Box::new(inner)))
            }
            TokenKind::LeftBracket => {
                let open = self.advance();
                let elements = self.arguments(TokenKind::RightBracket)?;
                let close = self.consume(TokenKind::RightBracket, "after array elements")?;
                Ok(Expression::ArrayLiteral {
                    elements,
                    span: open.span + close.span,
                })
            }
            TokenKind::New => {
                let keyword = self.advance();
                let type_name = self.consume_identifier("after 'new'")?;
                let mut span = keyword.span + type_name.span.clone();
                let arguments = if self.match_kind(TokenKind::LeftParen) {
                    let arguments = self.arguments(TokenKind::RightParen)?;
                    let close = self.consume(TokenKind::RightParen, "after constructor arguments")?;
                    span = span + close.span;
                    Some(arguments)
                } else {
                    None
                };
                Ok(Expression::Constructor {
                    type_name,
                    arguments,
                    span,
                })
            }
            _ => Err(self.error_at_current(codes::EXPECTED_EXPRESSION, "Expected expression")),
        }
    }

    /// Comma separated expressions up to (not including) `close`
    fn arguments(&mut self, close: TokenKind) -> ParseResult<Vec<Expression>> {
        let mut arguments = Vec::new();
        if self.check(close) {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.expression()?);
            if !self.match_kind(TokenKind::Comma) {
                break;
            }
        }
        if close == TokenKind::RightParen && arguments.len() > MAX_ARGUMENTS {
            let span = self.peek().span.clone();
            self.diagnostics.push(Diagnostic::error(
                codes::TOO_MANY_ITEMS,
                format!("More than {MAX_ARGUMENTS} arguments"),
                span,
            ));
        }
        Ok(arguments)
    }

    // ==================== Recovery ====================

    /// Skip tokens until parsing can resume
    ///
    /// Stops before a statement keyword or a `}` closing the current scope,
    /// and after a `;` or the `}` closing a block opened while skipping.
    pub fn synchronize(&mut self) {
        let mut depth = 0usize;
        trace!(line = self.peek().span.start_line, "synchronizing after parse error");

        while !self.is_at_end() {
            match self.peek_kind() {
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => match depth {
                    0 => return,
                    1 => {
                        self.advance();
                        return;
                    }
                    _ => depth -= 1,
                },
                kind if depth == 0 && kind.begins_statement() => return,
                _ => {}
            }
            self.advance();
        }
    }

    /// Synchronize, and make sure the failed construct consumed something
    fn recover(&mut self, before: usize) {
        self.synchronize();
        if self.current == before && !self.is_at_end() {
            self.advance();
        }
    }

    // ==================== Token helpers ====================

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn is_at_end(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, context: &str) -> ParseResult<Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let message = if context.is_empty() {
            format!("Expected {kind}, found {}", self.describe_current())
        } else {
            format!("Expected {kind} {context}, found {}", self.describe_current())
        };
        Err(self.error_at_current(codes::EXPECTED_TOKEN, message))
    }

    fn consume_identifier(&mut self, context: &str) -> ParseResult<Token> {
        if self.check(TokenKind::Identifier) {
            return Ok(self.advance());
        }
        let message = format!("Expected identifier {context}, found {}", self.describe_current());
        Err(self.error_at_current(codes::EXPECTED_IDENTIFIER, message))
    }

    /// Consume a closing brace; a missing one is reported without panicking
    fn close_brace(&mut self, context: &str) -> SourceSpan {
        if self.check(TokenKind::RightBrace) {
            return self.advance().span;
        }
        let message = format!("Expected '}}' {context}, found {}", self.describe_current());
        let _ = self.error_at_current(codes::EXPECTED_TOKEN, message);
        self.peek().span.clone()
    }

    fn describe_current(&self) -> String {
        let token = self.peek();
        match token.kind {
            TokenKind::Eof => "end of file".to_string(),
            _ => format!("'{}'", token.text),
        }
    }

    fn error_at_current(&mut self, code: &'static str, message: impl Into<String>) -> Panic {
        let span = self.peek().span.clone();
        self.diagnostics.push(Diagnostic::error(code, message, span));
        Panic
    }
}

fn access(left: Expression, operator: Token, right: Expression) -> Expression {
    Expression::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;

    fn parse_str(source: &str) -> (ParsedUnit, Vec<Diagnostic>) {
        let (tokens, lex) = scan(source, None, false);
        assert!(lex.is_empty(), "lexical errors: {lex:?}");
        parse(tokens)
    }

    fn parse_expr(source: &str) -> Expression {
        let (tokens, _) = scan(source, None, false);
        let mut parser = Parser::new(tokens);
        parser.expression().unwrap()
    }

    fn body(unit: &ParsedUnit, function: &str) -> Vec<Statement> {
        unit.function(function).unwrap().body.statements.clone()
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expr("1 + 2 * 3");
        let Expression::Binary { operator, right, .. } = expr else {
            panic!("expected binary");
        };
        assert_eq!(operator.kind, TokenKind::Plus);
        assert!(matches!(*right, Expression::Binary { ref operator, .. } if operator.kind == TokenKind::Star));
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = parse_expr("a ** b ** c");
        let Expression::Binary { left, right, .. } = expr else {
            panic!("expected binary");
        };
        assert!(left.is_identifier("a"));
        assert!(matches!(*right, Expression::Binary { .. }));
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        let expr = parse_expr("a - b - c");
        let Expression::Binary { left, right, .. } = expr else {
            panic!("expected binary");
        };
        assert!(matches!(*left, Expression::Binary { .. }));
        assert!(right.is_identifier("c"));
    }

    #[test]
    fn test_unary_minus_folds_into_literal() {
        let expr = parse_expr("-42");
        assert!(matches!(expr, Expression::Literal(ref t) if t.text == "-42" && t.kind == TokenKind::Integer));

        let expr = parse_expr("- -1.5");
        assert!(matches!(expr, Expression::Literal(ref t) if t.text == "1.5"));

        let expr = parse_expr("-x");
        assert!(matches!(expr, Expression::Unary { prefix: true, .. }));
    }

    #[test]
    fn test_postfix_chain() {
        let expr = parse_expr("player.items[0].length");
        let Expression::Binary { left, operator, right } = expr else {
            panic!("expected access");
        };
        assert_eq!(operator.kind, TokenKind::Dot);
        assert!(matches!(*right, Expression::Variable(ref t) if t.kind == TokenKind::Length));
        assert!(matches!(*left, Expression::ArrayAccess { .. }));
    }

    #[test]
    fn test_dynamic_access_and_calls() {
        let expr = parse_expr("obj.$name(1, 2)");
        let Expression::Call { target, arguments, .. } = expr else {
            panic!("expected call");
        };
        assert_eq!(arguments.len(), 2);
        assert!(matches!(*target, Expression::Binary { ref operator, .. } if operator.kind == TokenKind::DotDollar));

        let expr = parse_expr("game::spawn(x)");
        assert!(matches!(expr, Expression::Call { .. }));
    }

    #[test]
    fn test_constructor_forms() {
        let expr = parse_expr("new Point(1, 2)");
        assert!(matches!(expr, Expression::Constructor { arguments: Some(ref a), .. } if a.len() == 2));
        let expr = parse_expr("new Point");
        assert!(matches!(expr, Expression::Constructor { arguments: None, .. }));
    }

    #[test]
    fn test_unit_declarations() {
        let (unit, diagnostics) = parse_str(
            "global score;\n\
             function main() { return 1; }\n\
             class Dog : Animal { property name; function bark(times) { } }",
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(unit.globals[0].text, "score");
        assert_eq!(unit.functions.len(), 1);
        let class = &unit.classes[0];
        assert_eq!(class.name.text, "Dog");
        assert_eq!(class.superclass.as_ref().map(|t| t.text.as_str()), Some("Animal"));
        assert_eq!(class.properties[0].text, "name");
        assert_eq!(class.methods[0].parameters.len(), 1);
    }

    #[test]
    fn test_else_is_conditionless_if() {
        let (unit, diagnostics) = parse_str("function f() { if (a) b(); else if (c) d(); else e(); }");
        assert!(diagnostics.is_empty());
        let statements = body(&unit, "f");
        let Statement::If { else_branch: Some(else_arm), .. } = &statements[0] else {
            panic!("expected if/else");
        };
        let Statement::If { condition: None, body, .. } = else_arm.as_ref() else {
            panic!("expected else arm");
        };
        assert!(matches!(body.as_ref(), Statement::If { condition: Some(_), else_branch: Some(_), .. }));
    }

    #[test]
    fn test_loops() {
        let (unit, diagnostics) = parse_str(
            "function f(list) { while (x) { x = x - 1; } do { y(); } while (z); foreach (item in list) item.go(); }",
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let statements = body(&unit, "f");
        assert!(matches!(statements[0], Statement::While { .. }));
        assert!(matches!(statements[1], Statement::DoWhile { .. }));
        assert!(matches!(statements[2], Statement::ForEach { ref element, .. } if element.text == "item"));
    }

    #[test]
    fn test_recovery_skips_bad_statement() {
        let (unit, diagnostics) = parse_str("function f() { a = ; b(); if (x +) { c(); } d(); }");
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.code == codes::EXPECTED_EXPRESSION));
        let statements = body(&unit, "f");
        assert_eq!(statements.len(), 2);
        assert!(matches!(&statements[1], Statement::Expression(Expression::Call { target, .. }) if target.is_identifier("d")));
    }

    #[test]
    fn test_error_in_one_method_keeps_others() {
        let (unit, diagnostics) = parse_str(
            "class A { function broken() { x = = 1; } function fine() { return 2; } }\n\
             class B { function header(a b) { } property p; }\n\
             function after() { }",
        );
        assert_eq!(diagnostics.len(), 2);
        let a = unit.class("A").unwrap();
        assert_eq!(a.methods.len(), 2);
        assert_eq!(a.methods[1].body.statements.len(), 1);
        let b = unit.class("B").unwrap();
        assert!(b.methods.is_empty());
        assert_eq!(b.properties.len(), 1);
        assert!(unit.function("after").is_some());
    }

    #[test]
    fn test_declaration_inside_body_is_reported() {
        let (unit, diagnostics) = parse_str("function f() { global g; x(); }");
        assert_eq!(diagnostics[0].code, codes::MISPLACED_DECLARATION);
        assert_eq!(body(&unit, "f").len(), 1);
    }

    #[test]
    fn test_missing_closing_brace_keeps_function() {
        let (unit, diagnostics) = parse_str("function f() { x();");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(body(&unit, "f").len(), 1);
    }
}
