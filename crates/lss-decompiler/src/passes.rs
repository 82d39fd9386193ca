//! Source-level clean-up of a decoded body
//!
//! The structurer yields plain loops over placeholder locals (`$N`). These
//! passes fold the compiler's `foreach` lowering back into a `foreach`, turn
//! first assignments into `var` declarations, drop the implicit trailing
//! `return;` and give the placeholders readable names.

use lss_syntax::{Expression, Statement, Token, TokenKind};
use rustc_hash::{FxHashMap, FxHashSet};

/// Run every pass over a decoded body
pub fn tidy(mut body: Vec<Statement>) -> Vec<Statement> {
    let mut items = 0;
    fold_loops(&mut body, &mut items);
    if matches!(body.last(), Some(Statement::Return { value: None, .. })) {
        body.pop();
    }
    declare_locals(&mut body);
    rename_locals(&mut body);
    body
}

/// Name of a placeholder local
fn placeholder(expr: &Expression) -> Option<&str> {
    match expr.ungrouped() {
        Expression::Variable(t) if t.kind == TokenKind::Identifier && t.text.starts_with('$') => Some(&t.text),
        _ => None,
    }
}

fn is_integer(expr: &Expression, value: i64) -> bool {
    matches!(expr.ungrouped(), Expression::Literal(t) if t.kind == TokenKind::Integer && t.text == value.to_string())
}

fn is_nothing(expr: &Expression) -> bool {
    matches!(expr, Expression::Literal(t) if t.kind == TokenKind::Nothing)
}

fn operator(expr: &Expression, kind: TokenKind) -> Option<(&Expression, &Expression)> {
    match expr.ungrouped() {
        Expression::Binary {
            left,
            operator,
            right,
        } if operator.kind == kind => Some((left, right)),
        _ => None,
    }
}

fn subexpressions(expr: &Expression) -> Vec<&Expression> {
    match expr {
        Expression::Grouping(inner) => vec![inner.as_ref()],
        Expression::Unary { operand, .. } => vec![operand.as_ref()],
        Expression::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
        Expression::ArrayAccess { array, index, .. } => vec![array.as_ref(), index.as_ref()],
        Expression::ArrayLiteral { elements, .. } => elements.iter().collect(),
        Expression::Call {
            target, arguments, ..
        } => std::iter::once(target.as_ref()).chain(arguments).collect(),
        Expression::Constructor {
            arguments: Some(arguments),
            ..
        } => arguments.iter().collect(),
        _ => Vec::new(),
    }
}

fn mentions(expr: &Expression, name: &str) -> bool {
    placeholder(expr) == Some(name) || subexpressions(expr).into_iter().any(|e| mentions(e, name))
}

/// Visit every expression, parents before children
fn walk_expression(expr: &mut Expression, f: &mut dyn FnMut(&mut Expression)) {
    f(expr);
    match expr {
        Expression::Grouping(inner) => walk_expression(inner, f),
        Expression::Unary { operand, .. } => walk_expression(operand, f),
        Expression::Binary { left, right, .. } => {
            walk_expression(left, f);
            walk_expression(right, f);
        }
        Expression::ArrayAccess { array, index, .. } => {
            walk_expression(array, f);
            walk_expression(index, f);
        }
        Expression::ArrayLiteral { elements, .. } => {
            for element in elements {
                walk_expression(element, f);
            }
        }
        Expression::Call {
            target, arguments, ..
        } => {
            walk_expression(target, f);
            for argument in arguments {
                walk_expression(argument, f);
            }
        }
        Expression::Constructor {
            arguments: Some(arguments),
            ..
        } => {
            for argument in arguments {
                walk_expression(argument, f);
            }
        }
        _ => {}
    }
}

/// Visit every expression of a statement in source order
fn walk_statement(statement: &mut Statement, f: &mut dyn FnMut(&mut Expression)) {
    match statement {
        Statement::Block(block) => {
            for statement in &mut block.statements {
                walk_statement(statement, f);
            }
        }
        Statement::Expression(expr) => walk_expression(expr, f),
        Statement::Return { value: Some(value), .. } => walk_expression(value, f),
        Statement::If {
            condition,
            body,
            else_branch,
            ..
        } => {
            if let Some(condition) = condition {
                walk_expression(condition, f);
            }
            walk_statement(body, f);
            if let Some(else_branch) = else_branch {
                walk_statement(else_branch, f);
            }
        }
        Statement::While { condition, body } => {
            walk_expression(condition, f);
            walk_statement(body, f);
        }
        Statement::DoWhile { body, condition } => {
            walk_statement(body, f);
            walk_expression(condition, f);
        }
        Statement::ForEach {
            collection, body, ..
        } => {
            walk_expression(collection, f);
            walk_statement(body, f);
        }
        Statement::Assignment { target, value } => {
            walk_expression(target, f);
            walk_expression(value, f);
        }
        Statement::VariableDeclaration {
            initializer: Some(init),
            ..
        } => walk_expression(init, f),
        _ => {}
    }
}

/// Statement lists nested directly inside `statement`
fn nested(statement: &mut Statement, f: &mut dyn FnMut(&mut Vec<Statement>)) {
    match statement {
        Statement::Block(block) => f(&mut block.statements),
        Statement::If {
            body, else_branch, ..
        } => {
            nested(body, f);
            if let Some(else_branch) = else_branch {
                nested(else_branch, f);
            }
        }
        Statement::While { body, .. } | Statement::DoWhile { body, .. } | Statement::ForEach { body, .. } => {
            nested(body, f)
        }
        _ => {}
    }
}

fn assigns_to(statements: &[Statement], matches_target: &dyn Fn(&Expression) -> bool) -> bool {
    statements.iter().any(|statement| match statement {
        Statement::Assignment { target, .. } => matches_target(target),
        Statement::Block(block) => assigns_to(&block.statements, matches_target),
        Statement::If {
            body, else_branch, ..
        } => {
            assigns_to(std::slice::from_ref(body.as_ref()), matches_target)
                || else_branch
                    .as_deref()
                    .is_some_and(|e| assigns_to(std::slice::from_ref(e), matches_target))
        }
        Statement::While { body, .. } | Statement::DoWhile { body, .. } | Statement::ForEach { body, .. } => {
            assigns_to(std::slice::from_ref(body.as_ref()), matches_target)
        }
        _ => false,
    })
}

/// Fold `$i = 0; $m = C.length - 1; while ($m >= $i) { ..; $i = $i + 1; }`
fn fold_loops(statements: &mut Vec<Statement>, items: &mut u32) {
    let mut i = 0;
    while i < statements.len() {
        if i + 2 < statements.len() {
            let element = Token::identifier(format!("item{}", *items + 1));
            if let Some(folded) = fold_foreach(&statements[i], &statements[i + 1], &statements[i + 2], element) {
                *items += 1;
                statements.splice(i..i + 3, [folded]);
            }
        }
        nested(&mut statements[i], &mut |list| fold_loops(list, items));
        i += 1;
    }
}

fn fold_foreach(first: &Statement, second: &Statement, third: &Statement, element: Token) -> Option<Statement> {
    let Statement::Assignment { target, value } = first else {
        return None;
    };
    let index = placeholder(target)?;
    if !is_integer(value, 0) {
        return None;
    }

    let Statement::Assignment { target, value } = second else {
        return None;
    };
    let max = placeholder(target)?;
    let (length, one) = operator(value, TokenKind::Minus)?;
    if !is_integer(one, 1) {
        return None;
    }
    let (collection, property) = operator(length, TokenKind::Dot)?;
    if !matches!(property, Expression::Variable(t) if t.kind == TokenKind::Length) {
        return None;
    }
    let collection = collection.ungrouped().clone();

    let Statement::While { condition, body } = third else {
        return None;
    };
    let (left, right) = operator(condition, TokenKind::GreaterEqual)?;
    if placeholder(left) != Some(max) || placeholder(right) != Some(index) {
        return None;
    }
    let Statement::Block(block) = body.as_ref() else {
        return None;
    };
    let (step, body) = block.statements.split_last()?;
    let Statement::Assignment { target, value } = step else {
        return None;
    };
    let (counter, one) = operator(value, TokenKind::Plus)?;
    if placeholder(target) != Some(index) || placeholder(counter) != Some(index) || !is_integer(one, 1) {
        return None;
    }

    let is_element = |expr: &Expression| {
        matches!(expr.ungrouped(), Expression::ArrayAccess { array, index: i, .. }
            if array.ungrouped() == &collection && placeholder(i) == Some(index))
    };
    // the iteration variable is read-only
    if assigns_to(body, &is_element) {
        return None;
    }

    let mut body = body.to_vec();
    let mut leftover = false;
    for statement in &mut body {
        walk_statement(statement, &mut |expr| {
            if is_element(expr) {
                *expr = Expression::Variable(element.clone());
            } else if let Some(name) = placeholder(expr) {
                leftover |= name == index || name == max;
            }
        });
    }
    if leftover {
        return None;
    }

    Some(Statement::ForEach {
        element,
        collection,
        body: Box::new(Statement::Block(lss_syntax::Block::new(body))),
    })
}

/// Turn the first top-level assignment of each local into its declaration
/// and hoist the rest to the top of the body
fn declare_locals(body: &mut Vec<Statement>) {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut hoisted: Vec<String> = Vec::new();

    for statement in body.iter_mut() {
        let declared = match &*statement {
            Statement::Assignment { target, value } => placeholder(target)
                .filter(|name| !seen.contains(*name) && !mentions(value, name))
                .map(str::to_string),
            _ => None,
        };
        if let Some(name) = declared {
            let taken = std::mem::replace(statement, Statement::Block(Default::default()));
            if let Statement::Assignment { value, .. } = taken {
                *statement = Statement::VariableDeclaration {
                    name: Token::identifier(name.clone()),
                    initializer: if is_nothing(&value) { None } else { Some(value) },
                };
            }
            seen.insert(name);
        }

        walk_statement(statement, &mut |expr| {
            if let Some(name) = placeholder(expr) {
                if seen.insert(name.to_string()) {
                    hoisted.push(name.to_string());
                }
            }
        });
    }

    let declarations = hoisted.into_iter().map(|name| Statement::VariableDeclaration {
        name: Token::identifier(name),
        initializer: None,
    });
    body.splice(0..0, declarations);
}

/// `$N` becomes `var1`, `var2`, .. in declaration order
fn rename_locals(body: &mut [Statement]) {
    let mut names = FxHashMap::default();
    for statement in body.iter_mut() {
        if let Statement::VariableDeclaration { name, .. } = statement {
            if name.text.starts_with('$') {
                let renamed = format!("var{}", names.len() + 1);
                names.insert(std::mem::replace(&mut name.text, renamed.clone()), renamed);
            }
        }
    }
    if names.is_empty() {
        return;
    }
    for statement in body.iter_mut() {
        walk_statement(statement, &mut |expr| {
            if let Expression::Variable(token) = expr {
                if let Some(renamed) = names.get(&token.text) {
                    token.text = renamed.clone();
                }
            }
        });
    }
}
