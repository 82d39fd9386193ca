//! Compile source, decompile the container, compare the printed text

use lss_compiler::compile_source;
use lss_decompiler::{DecompileError, decompile, decompile_function, decompile_method, project};
use lss_syntax::PrettyPrinter;
use osi_bytecode::{BranchOffset, FunctionInfo, Instruction, OsiFile};
use proptest::prelude::*;

fn compile_ok(source: &str) -> OsiFile {
    let compilation = compile_source(source, Some("test.lss"));
    match compilation.file {
        Some(file) => file,
        None => panic!("compile failed: {:?}", compilation.diagnostics),
    }
}

fn function_text(file: &OsiFile, name: &str) -> String {
    let index = file.find_function(name).unwrap();
    let function = decompile_function(file, index).unwrap();
    let unit = lss_syntax::ParsedUnit {
        functions: vec![function],
        ..Default::default()
    };
    PrettyPrinter::default().print_unit(&unit)
}

fn roundtrip_text(source: &str) -> String {
    let decompilation = decompile(&compile_ok(source));
    assert!(decompilation.is_complete(), "{:?}", decompilation.failures);
    PrettyPrinter::default().print_unit(&decompilation.unit)
}

#[test]
fn test_add_example() {
    let file = compile_ok("function add(a, b) { return a + b; }");
    assert_eq!(
        function_text(&file, "add"),
        "function add(param1, param2) {\n    return param1 + param2;\n}\n"
    );
}

#[test]
fn test_if_else() {
    let file = compile_ok("function A() {} function B() {} function main() { if (false) { A(); } else { B(); } }");
    assert_eq!(function_text(&file, "A"), "function A() {\n}\n");
    assert_eq!(
        function_text(&file, "main"),
        "function main() {\n    if (false) {\n        A();\n    } else {\n        B();\n    }\n}\n"
    );
}

#[test]
fn test_else_if_chain() {
    let file = compile_ok(
        "function clamp(v, lo, hi) { if (v < lo) { return lo; } else if (v > hi) { return hi; } return v; }",
    );
    let text = function_text(&file, "clamp");
    assert!(text.contains("} else if (param1 > param3) {"), "{text}");
    assert!(text.ends_with("    return param1;\n}\n"), "{text}");
}

#[test]
fn test_while_stays_while() {
    let file = compile_ok("function f(n) { while (n > 0) { n = n - 1; } return n; }");
    assert_eq!(
        function_text(&file, "f"),
        "function f(param1) {\n    while (param1 > 0) {\n        param1 = param1 - 1;\n    }\n    return param1;\n}\n"
    );
}

#[test]
fn test_do_while() {
    let file = compile_ok("function f(n) { var i = 0; do { i = i + 1; } while (i < n); return i; }");
    assert_eq!(
        function_text(&file, "f"),
        "function f(param1) {\n    var var1 = 0;\n    do {\n        var1 = var1 + 1;\n    } while (var1 < param1);\n    return var1;\n}\n"
    );
}

#[test]
fn test_foreach_folded() {
    let file = compile_ok("function f(a) { foreach (x in a) { a.append(x); } }");
    assert_eq!(
        function_text(&file, "f"),
        "function f(param1) {\n    foreach (item1 in param1) {\n        param1.append(item1);\n    }\n}\n"
    );
}

#[test]
fn test_nested_foreach_over_element() {
    let file = compile_ok("function f(rows) { var n = 0; foreach (row in rows) { foreach (c in row) { n = n + c; } } return n; }");
    let text = function_text(&file, "f");
    assert!(text.contains("foreach (item1 in param1) {"), "{text}");
    assert!(text.contains("foreach (item2 in item1) {"), "{text}");
    assert!(text.contains("var1 = var1 + item2;"), "{text}");
}

#[test]
fn test_constructor_and_members() {
    let source = r#"
function make() { return new Point(1, 2); }
function bare() { return new Point; }
function grow(p) { p.x = p.x * 2; p.$"y" = [p.length, -3]; return game::$"k"; }
class Point {
    property x;
    property y;
    function Point(x, y) { this.x = x; this.y = y; }
}
"#;
    let file = compile_ok(source);
    assert_eq!(function_text(&file, "make"), "function make() {\n    return new Point(1, 2);\n}\n");
    assert_eq!(function_text(&file, "bare"), "function bare() {\n    return new Point;\n}\n");

    let grow = function_text(&file, "grow");
    assert!(grow.contains("param1.x = param1.x * 2;"), "{grow}");
    assert!(grow.contains("param1.$\"y\" = [param1.length, -3];"), "{grow}");

    let decompilation = decompile(&file);
    let point = decompilation.unit.class("Point").unwrap();
    assert_eq!(point.methods.len(), 1);
    let text = PrettyPrinter::default().print_unit(&lss_syntax::ParsedUnit {
        classes: vec![point.clone()],
        ..Default::default()
    });
    assert!(text.contains("function Point(param1, param2) {"), "{text}");
    assert!(text.contains("this.x = param1;"), "{text}");
}

#[test]
fn test_method_calls_and_statements() {
    let source = r#"
function f(o, n) {
    o.go(1);
    o.$n(2);
    o.items.removeat(0);
    ui::show(n);
    return o.size();
}
"#;
    let file = compile_ok(source);
    let text = function_text(&file, "f");
    assert!(text.contains("    param1.go(1);\n"), "{text}");
    assert!(text.contains("    param1.$param2(2);\n"), "{text}");
    assert!(text.contains("    param1.items.removeat(0);\n"), "{text}");
    assert!(text.contains("    ui::show(param2);\n"), "{text}");
    assert!(text.contains("    return param1.size();\n"), "{text}");
}

#[test]
fn test_precedence_groupings_survive() {
    let file = compile_ok("function f(a, b, c) { return (a + b) * c - (a - (b - c)) + 2 ** 3 ** a; }");
    assert_eq!(
        function_text(&file, "f"),
        "function f(param1, param2, param3) {\n    return (param1 + param2) * param3 - (param1 - (param2 - param3)) + 2 ** 3 ** param1;\n}\n"
    );
}

#[test]
fn test_inheritance_inferred() {
    let source = r#"
class Hero : Base {
    property xp;
    function name() { return "hero"; }
    function boost() { this.heal(5); }
}
class Base {
    property hp;
    function heal(n) { this.hp = this.hp + n; }
    function name() { return "base"; }
}
"#;
    let decompilation = decompile(&compile_ok(source));
    let base = decompilation.unit.class("Base").unwrap();
    assert!(base.superclass.is_none());
    assert_eq!(base.methods.len(), 2);

    let hero = decompilation.unit.class("Hero").unwrap();
    assert_eq!(hero.superclass.as_ref().unwrap().text, "Base");
    let properties: Vec<_> = hero.properties.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(properties, vec!["xp"]);
    let mut methods: Vec<_> = hero.methods.iter().map(|m| m.name.text.as_str()).collect();
    methods.sort_unstable();
    assert_eq!(methods, vec!["boost", "name"]);
}

#[test]
fn test_foreach_body_shadowing_collection_round_trips() {
    let source = r#"
function shadow(list) { foreach (x in list) { var list = 3; x.go(); } }
function nested(x) { foreach (x in x) { foreach (x in x) { x.go(); } } }
function outer(list) { var x = 7; foreach (x in list) { x.go(); } return x; }
"#;
    let first = roundtrip_text(source);
    assert!(first.contains("foreach (item1 in param1) {"), "{first}");
    assert!(!first.contains("var1["), "{first}");
    assert!(first.contains("foreach (item2 in item1) {"), "{first}");
    let second = roundtrip_text(&first);
    assert_eq!(first, second);
}

#[test]
fn test_recompile_reaches_fixpoint() {
    let source = r#"
global score;
function clamp(v, lo, hi) {
    if (v < lo) { return lo; } else if (v > hi) { return hi; }
    return v;
}
function total(list) {
    var sum = 0;
    foreach (x in list) { sum = sum + x; }
    score = sum;
    return sum;
}
function spin(n) {
    var i = 0;
    do { i = i + 1; } while (i < n && !(i == 7));
    if (n) { var late = i; i = late * 2; }
    return (i + 1) * 2 ** 3;
}
class Counter {
    property count;
    function bump(by) { this.count = this.count + by; return this.count; }
}
"#;
    let first = roundtrip_text(source);
    assert!(first.starts_with("global score;\n"), "{first}");
    let second = roundtrip_text(&first);
    assert_eq!(first, second);
}

#[test]
fn test_unstructured_flow_fails_one_function() {
    let mut file = compile_ok("function good() { return 1; }");
    file.functions.push(FunctionInfo::new(
        "bad",
        0,
        vec![
            Instruction::PushTrue,
            Instruction::BranchIfTrue(BranchOffset(1)),
            Instruction::PushNothing,
            Instruction::Return,
        ],
    ));

    let decompilation = decompile(&file);
    assert_eq!(decompilation.unit.functions.len(), 1);
    assert_eq!(decompilation.failures.len(), 1);
    let failure = &decompilation.failures[0];
    assert_eq!(failure.subroutine, "bad");
    assert!(failure.class.is_none());
    assert!(matches!(failure.error, DecompileError::UnstructuredControlFlow { index: 1 }));
}

#[test]
fn test_unknown_call_target() {
    let mut file = OsiFile::default();
    file.functions.push(FunctionInfo::new(
        "f",
        0,
        vec![
            Instruction::CallFunction {
                target: osi_bytecode::CodeOffset(99),
                argc: 0,
            },
            Instruction::Return,
        ],
    ));
    assert!(matches!(decompile_function(&file, 0), Err(DecompileError::UnknownCallTarget(99))));
}

#[test]
fn test_out_of_range_indices_are_errors() {
    let file = compile_ok("function f() {} class C { function m() {} }");
    assert!(matches!(
        decompile_function(&file, 1),
        Err(DecompileError::MissingEntry { table: "function", index: 1 })
    ));
    assert!(matches!(
        decompile_method(&file, 3, 0),
        Err(DecompileError::MissingEntry { table: "class", index: 3 })
    ));
    assert!(matches!(
        decompile_method(&file, 0, 5),
        Err(DecompileError::MissingEntry { table: "method", index: 5 })
    ));
    assert!(decompile_method(&file, 0, 0).is_ok());
}

#[test]
fn test_projection_layout() {
    let source = r#"
global g;
function helper() { return g; }
class Base { property hp; }
class Hero : Base { property xp; }
"#;
    let decompilation = decompile(&compile_ok(source));
    let dir = tempfile::tempdir().unwrap();
    let written = project(&decompilation, dir.path(), &PrettyPrinter::default()).unwrap();
    assert_eq!(written.len(), 4);

    let root = dir.path();
    assert_eq!(std::fs::read_to_string(root.join("globals.lss")).unwrap(), "global g;\n");
    assert_eq!(
        std::fs::read_to_string(root.join("functions/helper.lss")).unwrap(),
        "function helper() {\n    return g;\n}\n"
    );
    assert!(root.join("classes/Base.lss").is_file());
    let hero = std::fs::read_to_string(root.join("classes/Base/Hero.lss")).unwrap();
    assert!(hero.starts_with("class Hero : Base {"), "{hero}");
    assert!(hero.contains("property xp;"), "{hero}");
    assert!(!hero.contains("property hp;"), "{hero}");
}

proptest! {
    #[test]
    fn test_integer_literals_survive(value in any::<i32>()) {
        let file = compile_ok(&format!("function f() {{ return {value}; }}"));
        prop_assert_eq!(
            function_text(&file, "f"),
            format!("function f() {{\n    return {value};\n}}\n")
        );
    }
}
