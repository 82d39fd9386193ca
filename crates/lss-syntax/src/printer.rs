//! Pretty printer: syntax tree back to LSS text

use crate::ast::{Block, ClassDecl, Expression, ParsedUnit, Statement, Subroutine};

/// Renders syntax trees as source text
///
/// Purely structural: parentheses appear only where the tree holds a
/// [`Expression::Grouping`].
#[derive(Debug, Clone)]
pub struct PrettyPrinter {
    indent: String,
}

impl Default for PrettyPrinter {
    fn default() -> Self {
        Self::new(4)
    }
}

impl PrettyPrinter {
    /// Printer indenting nested blocks by `indent` spaces
    pub fn new(indent: usize) -> Self {
        Self {
            indent: " ".repeat(indent),
        }
    }

    /// Render a whole unit: globals, then functions, then classes
    pub fn print_unit(&self, unit: &ParsedUnit) -> String {
        let mut w = Writer::new(&self.indent);
        for global in &unit.globals {
            w.push("global ");
            w.push(&global.text);
            w.push(";\n");
        }

        let mut first = unit.globals.is_empty();
        for function in &unit.functions {
            if !first {
                w.push("\n");
            }
            first = false;
            w.subroutine(function);
            w.push("\n");
        }
        for class in &unit.classes {
            if !first {
                w.push("\n");
            }
            first = false;
            w.class(class);
            w.push("\n");
        }
        w.out
    }

    /// Render one statement, terminated by a newline
    pub fn print_statement(&self, statement: &Statement) -> String {
        let mut w = Writer::new(&self.indent);
        w.statement(statement);
        w.out
    }

    /// Render one expression
    pub fn print_expression(&self, expression: &Expression) -> String {
        let mut w = Writer::new(&self.indent);
        w.expression(expression);
        w.out
    }
}

struct Writer<'a> {
    out: String,
    level: usize,
    unit: &'a str,
}

impl<'a> Writer<'a> {
    fn new(unit: &'a str) -> Self {
        Self {
            out: String::new(),
            level: 0,
            unit,
        }
    }

    fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn indent(&mut self) {
        for _ in 0..self.level {
            self.out.push_str(self.unit);
        }
    }

    /// Indented statement followed by a newline
    fn statement(&mut self, statement: &Statement) {
        self.indent();
        self.statement_inline(statement);
        self.push("\n");
    }

    /// Statement text without leading indentation or trailing newline
    fn statement_inline(&mut self, statement: &Statement) {
        match statement {
            Statement::Block(block) => self.block(block),
            Statement::Class(class) => self.class(class),
            Statement::Property(name) => {
                self.push("property ");
                self.push(&name.text);
                self.push(";");
            }
            Statement::Subroutine(sub) => self.subroutine(sub),
            Statement::Global(name) => {
                self.push("global ");
                self.push(&name.text);
                self.push(";");
            }
            Statement::Expression(expr) => {
                self.expression(expr);
                self.push(";");
            }
            Statement::Return { value, .. } => {
                self.push("return");
                if let Some(value) = value {
                    self.push(" ");
                    self.expression(value);
                }
                self.push(";");
            }
            Statement::If {
                condition: Some(condition),
                body,
                else_branch,
                ..
            } => {
                self.push("if (");
                self.expression(condition);
                self.push(")");
                self.body(body);
                if let Some(else_arm) = else_branch {
                    self.else_arm(body, else_arm);
                }
            }
            Statement::If {
                condition: None,
                body,
                ..
            } => {
                self.push("else");
                self.body(body);
            }
            Statement::While { condition, body } => {
                self.push("while (");
                self.expression(condition);
                self.push(")");
                self.body(body);
            }
            Statement::DoWhile { body, condition } => {
                self.push("do");
                self.body(body);
                self.continue_after(body);
                self.push("while (");
                self.expression(condition);
                self.push(");");
            }
            Statement::ForEach {
                element,
                collection,
                body,
            } => {
                self.push("foreach (");
                self.push(&element.text);
                self.push(" in ");
                self.expression(collection);
                self.push(")");
                self.body(body);
            }
            Statement::Assignment { target, value } => {
                self.expression(target);
                self.push(" = ");
                self.expression(value);
                self.push(";");
            }
            Statement::VariableDeclaration { name, initializer } => {
                self.push("var ");
                self.push(&name.text);
                if let Some(init) = initializer {
                    self.push(" = ");
                    self.expression(init);
                }
                self.push(";");
            }
        }
    }

    fn else_arm(&mut self, then_body: &Statement, else_arm: &Statement) {
        self.continue_after(then_body);
        self.push("else");
        let inner = match else_arm {
            Statement::If {
                condition: None,
                body,
                ..
            } => body.as_ref(),
            other => other,
        };
        if matches!(inner, Statement::If { condition: Some(_), .. }) {
            self.push(" ");
            self.statement_inline(inner);
        } else {
            self.body(inner);
        }
    }

    /// Separator before a keyword that follows a loop or branch body
    fn continue_after(&mut self, body: &Statement) {
        if matches!(body, Statement::Block(_)) {
            self.push(" ");
        } else {
            self.push("\n");
            self.indent();
        }
    }

    /// Body of a control statement: braces stay on the same line
    fn body(&mut self, body: &Statement) {
        match body {
            Statement::Block(block) => {
                self.push(" ");
                self.block(block);
            }
            other => {
                self.push("\n");
                self.level += 1;
                self.indent();
                self.statement_inline(other);
                self.level -= 1;
            }
        }
    }

    fn block(&mut self, block: &Block) {
        self.push("{\n");
        self.level += 1;
        for statement in &block.statements {
            self.statement(statement);
        }
        self.level -= 1;
        self.indent();
        self.push("}");
    }

    fn subroutine(&mut self, sub: &Subroutine) {
        self.push("function ");
        self.push(&sub.name.text);
        self.push("(");
        for (i, param) in sub.parameters.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push(&param.text);
        }
        self.push(") ");
        self.block(&sub.body);
    }

    fn class(&mut self, class: &ClassDecl) {
        self.push("class ");
        self.push(&class.name.text);
        if let Some(base) = &class.superclass {
            self.push(" : ");
            self.push(&base.text);
        }
        self.push(" {\n");
        self.level += 1;
        for property in &class.properties {
            self.indent();
            self.push("property ");
            self.push(&property.text);
            self.push(";\n");
        }
        for (i, method) in class.methods.iter().enumerate() {
            if i > 0 || !class.properties.is_empty() {
                self.push("\n");
            }
            self.indent();
            self.subroutine(method);
            self.push("\n");
        }
        self.level -= 1;
        self.indent();
        self.push("}");
    }

    fn expression(&mut self, expr: &Expression) {
        match expr {
            Expression::Literal(token) | Expression::Variable(token) => self.push(&token.text),
            Expression::Grouping(inner) => {
                self.push("(");
                self.expression(inner);
                self.push(")");
            }
            Expression::Unary {
                operator,
                operand,
                prefix,
            } => {
                if *prefix {
                    self.push(&operator.text);
                    self.expression(operand);
                } else {
                    self.expression(operand);
                    self.push(&operator.text);
                }
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                self.expression(left);
                if operator.kind.is_access() {
                    self.push(&operator.text);
                } else {
                    self.push(" ");
                    self.push(&operator.text);
                    self.push(" ");
                }
                self.expression(right);
            }
            Expression::ArrayAccess { array, index, .. } => {
                self.expression(array);
                self.push("[");
                self.expression(index);
                self.push("]");
            }
            Expression::ArrayLiteral { elements, .. } => {
                self.push("[");
                self.list(elements);
                self.push("]");
            }
            Expression::Call {
                target, arguments, ..
            } => {
                self.expression(target);
                self.push("(");
                self.list(arguments);
                self.push(")");
            }
            Expression::Constructor {
                type_name,
                arguments,
                ..
            } => {
                self.push("new ");
                self.push(&type_name.text);
                if let Some(arguments) = arguments {
                    self.push("(");
                    self.list(arguments);
                    self.push(")");
                }
            }
            Expression::ConstructorPending(type_name) => {
                self.push("new ");
                self.push(&type_name.text);
            }
        }
    }

    fn list(&mut self, items: &[Expression]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.expression(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_source;

    fn roundtrip(source: &str) -> String {
        let (unit, diagnostics) = parse_source(source, None);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        PrettyPrinter::new(4).print_unit(&unit)
    }

    #[test]
    fn test_print_function() {
        let text = roundtrip("function add(a,b){return a+b;}");
        assert_eq!(text, "function add(a, b) {\n    return a + b;\n}\n");
    }

    #[test]
    fn test_access_operators_have_no_spaces() {
        let text = roundtrip("function f(o) { o.$name = game::x; o.items[0].length; }");
        assert!(text.contains("o.$name = game::x;"));
        assert!(text.contains("o.items[0].length;"));
    }

    #[test]
    fn test_print_if_else_chain() {
        let text = roundtrip("function f() { if (a) { b(); } else if (c) d(); else { e(); } }");
        let expected = "\
function f() {
    if (a) {
        b();
    } else if (c)
        d();
    else {
        e();
    }
}
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_print_loops_and_class() {
        let text = roundtrip(
            "global g; class A : B { property x; function m(v) { do { v = v - 1; } while (v > 0); foreach (i in v) i.go(); } }",
        );
        let expected = "\
global g;

class A : B {
    property x;

    function m(v) {
        do {
            v = v - 1;
        } while (v > 0);
        foreach (i in v)
            i.go();
    }
}
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_print_expression_forms() {
        let printer = PrettyPrinter::default();
        let (unit, _) = parse_source("function f() { x = new P(1, [2, 3]) * -(4 + y); z = new Q; }", None);
        let statements = &unit.functions[0].body.statements;
        assert_eq!(printer.print_statement(&statements[0]), "x = new P(1, [2, 3]) * -(4 + y);\n");
        assert_eq!(printer.print_statement(&statements[1]), "z = new Q;\n");
    }

    #[test]
    fn test_reparse_is_stable() {
        let source = "function f(a) { while (a < 10) { a = a + 1; } return a ** 2 ** 3; }";
        let once = roundtrip(source);
        let twice = roundtrip(&once);
        assert_eq!(once, twice);
    }
}
