//! Front-end tests over whole source files

use lss_syntax::{Expression, PrettyPrinter, Statement, TokenKind, parse_source};
use proptest::prelude::*;

const SAMPLE: &str = r#"
global highscore;

// Keeps track of a player.
function reset(player) {
    player.score = 0;
    player.items = [];
    highscore = nothing;
}

class Player : Actor {
    property score;
    property items;

    function Player(name) {
        this.name = name;
        this.items = ["sword", "shield"];
    }

    /* multi
       line */
    function total() {
        var sum = 0;
        foreach (item in this.items) {
            sum = sum + item.weight;
        }
        return sum;
    }
}
"#;

#[test]
fn test_sample_parses_cleanly() {
    let (unit, diagnostics) = parse_source(SAMPLE, Some("player.lss"));
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(unit.file.as_deref(), Some("player.lss"));
    assert_eq!(unit.globals.len(), 1);
    assert_eq!(unit.functions[0].body.statements.len(), 3);

    let class = unit.class("Player").unwrap();
    assert_eq!(class.methods.len(), 2);
    let total = &class.methods[1];
    assert!(matches!(total.body.statements[1], Statement::ForEach { .. }));
    assert_eq!(total.name.span.start_line, 22);
}

#[test]
fn test_printed_sample_reparses_to_same_tree_shape() {
    let (unit, _) = parse_source(SAMPLE, None);
    let printed = PrettyPrinter::new(2).print_unit(&unit);
    let (again, diagnostics) = parse_source(&printed, None);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(PrettyPrinter::new(2).print_unit(&again), printed);
}

#[test]
fn test_diagnostics_serialize() {
    let (_, diagnostics) = parse_source("function f() { x = ; }", Some("bad.lss"));
    let json = serde_json::to_value(&diagnostics).unwrap();
    assert_eq!(json[0]["code"], "P001");
    assert_eq!(json[0]["severity"], "error");
    assert_eq!(json[0]["span"]["file"], "bad.lss");
}

#[test]
fn test_lexical_and_syntax_errors_both_reported() {
    let (unit, diagnostics) = parse_source("function f() { x = \"open\n; y(); }", None);
    let codes: Vec<_> = diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec!["S001"]);
    // the best-effort string token still lets `x = "open` parse up to the `;`
    assert_eq!(unit.functions[0].body.statements.len(), 2);
}

proptest! {
    #[test]
    fn test_integer_literal_text_survives(value in any::<i32>()) {
        let source = format!("function f() {{ return {value}; }}");
        let (unit, diagnostics) = parse_source(&source, None);
        prop_assert!(diagnostics.is_empty());
        let Statement::Return { value: Some(Expression::Literal(token)), .. } = &unit.functions[0].body.statements[0] else {
            panic!("expected literal return");
        };
        prop_assert_eq!(token.kind, TokenKind::Integer);
        prop_assert_eq!(token.text.clone(), value.to_string());
    }
}
