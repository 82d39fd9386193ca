//! End-to-end compiler tests over source text

use lss_compiler::{CompilerSettings, compile_source, compile_source_with};
use osi_bytecode::{BranchOffset, Instruction, OsiFile, Slot, StringIndex, SymbolIndex};
use proptest::prelude::*;

fn compile_ok(source: &str) -> OsiFile {
    let compilation = compile_source(source, Some("test.lss"));
    match compilation.file {
        Some(file) => file,
        None => panic!("compile failed: {:?}", compilation.diagnostics),
    }
}

fn error_codes(source: &str) -> Vec<&'static str> {
    let compilation = compile_source(source, None);
    assert!(compilation.file.is_none(), "expected a failed compile");
    compilation.diagnostics.iter().map(|d| d.code).collect()
}

fn body(file: &OsiFile, name: &str) -> Vec<Instruction> {
    let idx = file.find_function(name).unwrap();
    file.functions[idx].instructions.clone()
}

fn symbol(file: &OsiFile, name: &str) -> SymbolIndex {
    SymbolIndex(file.symbols.find(name).unwrap())
}

#[test]
fn test_add_example() {
    let file = compile_ok("function add(a, b) { return a + b; }");
    assert_eq!(file.functions[0].name, "add");
    assert_eq!(file.functions[0].parameter_count, 2);
    assert_eq!(
        body(&file, "add"),
        vec![
            Instruction::GetVariable(Slot::local(0)),
            Instruction::GetVariable(Slot::local(1)),
            Instruction::Add,
            Instruction::Return,
        ]
    );
}

#[test]
fn test_if_else_branch_sizes() {
    let file = compile_ok(
        "function A() {} function B() {} function main() { if (false) { A(); } else { B(); } }",
    );
    let code = body(&file, "main");
    assert_eq!(code[0], Instruction::PushFalse);
    // call (6) + pop (1) + the skip-else branch (3)
    assert_eq!(code[1], Instruction::BranchIfFalse(BranchOffset(10)));
    assert!(matches!(code[2], Instruction::CallFunction { argc: 0, .. }));
    assert_eq!(code[4], Instruction::Branch(BranchOffset(7)));
    assert!(matches!(code[5], Instruction::CallFunction { argc: 0, .. }));
    assert_eq!(&code[7..], &[Instruction::PushNothing, Instruction::Return]);
}

#[test]
fn test_while_loop_shape() {
    let file = compile_ok("function f(n) { while (n) { n = n - 1; } }");
    assert_eq!(
        body(&file, "f"),
        vec![
            Instruction::GetVariable(Slot::local(0)),
            Instruction::BranchIfFalse(BranchOffset(12)),
            Instruction::GetVariable(Slot::local(0)),
            Instruction::PushInt8(1),
            Instruction::Sub,
            Instruction::SetVariable(Slot::local(0)),
            Instruction::Branch(BranchOffset(-18)),
            Instruction::PushNothing,
            Instruction::Return,
        ]
    );
}

#[test]
fn test_do_while_branches_back_on_true() {
    let file = compile_ok("function f(n) { do { n = n - 1; } while (n); return n; }");
    let code = body(&file, "f");
    // 9 bytes of body, 3 of condition, 3 of the branch itself
    assert_eq!(code[5], Instruction::BranchIfTrue(BranchOffset(-15)));
}

#[test]
fn test_foreach_lowering() {
    let file = compile_ok("function f(a) { foreach (x in a) { a.append(x); } }");
    let index = Slot::local(1);
    let max = Slot::local(2);
    assert_eq!(
        body(&file, "f"),
        vec![
            Instruction::AllocateLocals(2),
            Instruction::PushZero,
            Instruction::SetVariable(index),
            Instruction::GetVariable(Slot::local(0)),
            Instruction::Length,
            Instruction::PushInt8(1),
            Instruction::Sub,
            Instruction::SetVariable(max),
            Instruction::GetVariable(max),
            Instruction::GetVariable(index),
            Instruction::GreaterEqual,
            Instruction::BranchIfFalse(BranchOffset(24)),
            Instruction::GetVariable(Slot::local(0)),
            Instruction::GetVariable(Slot::local(0)),
            Instruction::GetVariable(index),
            Instruction::GetElement,
            Instruction::ArrayAppend,
            Instruction::Pop,
            Instruction::GetVariable(index),
            Instruction::PushInt8(1),
            Instruction::Add,
            Instruction::SetVariable(index),
            Instruction::Branch(BranchOffset(-34)),
            Instruction::PushNothing,
            Instruction::Return,
        ]
    );
}

#[test]
fn test_foreach_element_not_assignable() {
    assert_eq!(error_codes("function f(a) { foreach (x in a) { x = 1; } }"), vec!["C009"]);
}

/// Every `collection[index]` read of a foreach element, as `(collection, index)` slots
fn element_reads(code: &[Instruction]) -> Vec<(Slot, Slot)> {
    code.windows(3)
        .filter_map(|w| match w {
            [Instruction::GetVariable(c), Instruction::GetVariable(i), Instruction::GetElement] => Some((*c, *i)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_foreach_collection_not_captured_by_body_declaration() {
    let file = compile_ok("function f(list) { foreach (x in list) { var list = 3; x.go(); } }");
    let code = body(&file, "f");
    // list = 0, index = 1, max = 2, body list = 3
    assert!(code.contains(&Instruction::SetVariable(Slot::local(3))));
    let reads = element_reads(&code);
    assert!(!reads.is_empty());
    assert!(reads.iter().all(|read| *read == (Slot::local(0), Slot::local(1))), "{reads:?}");
}

#[test]
fn test_nested_foreach_over_same_name() {
    let file = compile_ok("function f(x) { foreach (x in x) { foreach (x in x) { x.go(); } } }");
    let code = body(&file, "f");
    // outer index = 1, inner index = 3
    let inner_read = [
        Instruction::GetVariable(Slot::local(0)),
        Instruction::GetVariable(Slot::local(1)),
        Instruction::GetElement,
        Instruction::GetVariable(Slot::local(3)),
        Instruction::GetElement,
    ];
    assert!(code.windows(inner_read.len()).any(|w| w == inner_read));
}

#[test]
fn test_foreach_element_shadows_outer_local() {
    let file = compile_ok("function f(list) { var x = 7; foreach (x in list) { x.go(); } return x; }");
    let code = body(&file, "f");
    assert_eq!(element_reads(&code)[0], (Slot::local(0), Slot::local(2)));
    let tail = [Instruction::GetVariable(Slot::local(1)), Instruction::Return];
    assert!(code.windows(2).any(|w| w == tail));
    compile_ok("function f(list) { foreach (x in list) { var x = 1; } }");
}

#[test]
fn test_string_literal_interned_once() {
    let file = compile_ok("function f() { var a = \"hi\"; var b = \"hi\"; return a + b; }");
    assert_eq!(file.strings.len(), 1);
    let pushes = body(&file, "f")
        .into_iter()
        .filter(|i| *i == Instruction::PushString(StringIndex(0)))
        .count();
    assert_eq!(pushes, 2);
}

#[test]
fn test_nested_scopes_may_shadow() {
    compile_ok("function f() { var x = 1; { var x = 2; } return x; }");
    assert_eq!(error_codes("function f() { var x = 1; var x = 2; }"), vec!["C004"]);
}

#[test]
fn test_locals_shadow_globals() {
    let file = compile_ok("global x; function f() { var x = 1; return x; } function g() { return x; }");
    assert_eq!(
        body(&file, "f"),
        vec![
            Instruction::AllocateLocals(1),
            Instruction::PushInt8(1),
            Instruction::SetVariable(Slot::local(0)),
            Instruction::GetVariable(Slot::local(0)),
            Instruction::Return,
        ]
    );
    assert_eq!(body(&file, "g")[0], Instruction::GetVariable(Slot::global(0)));
}

#[test]
fn test_semantic_errors() {
    assert_eq!(error_codes("function f() { return y; }"), vec!["C001"]);
    assert_eq!(error_codes("function f() { g(); }"), vec!["C002"]);
    assert_eq!(error_codes("function f() { return new Missing(); }"), vec!["C003"]);
    assert_eq!(error_codes("function g(a) {} function f() { g(); }"), vec!["C007"]);
    assert_eq!(error_codes("function f() { return 3000000000; }"), vec!["C008"]);
    assert_eq!(error_codes("function f() { this = 1; }"), vec!["C009"]);
    assert_eq!(error_codes("function f() { return this; }"), vec!["C010"]);
    assert_eq!(error_codes("function f() { (1)(); }"), vec!["C011"]);
    assert_eq!(error_codes("function f(a) { a.append(); }"), vec!["C007"]);
}

#[test]
fn test_errors_in_one_function_do_not_stop_others() {
    let compilation = compile_source("function f() { return y; } function g() { return z; }", None);
    let codes: Vec<_> = compilation.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec!["C001", "C001"]);
}

#[test]
fn test_parse_error_isolated_to_one_method() {
    let source = r#"
class C {
    function broken() { x = ; }
    function ok() { return 1; }
}
function g() { return 2; }
"#;
    let compilation = compile_source(source, None);
    assert_eq!(compilation.diagnostics.len(), 1);
    assert_eq!(compilation.diagnostics[0].code, "P001");
    let file = compilation.file.unwrap();
    assert_eq!(file.classes[0].methods.len(), 2);
    let ok = file.classes[0].method(symbol(&file, "ok")).unwrap();
    assert_eq!(ok.instructions, vec![Instruction::PushInt8(1), Instruction::Return]);
    assert!(file.find_function("g").is_some());
}

#[test]
fn test_members_and_builtins() {
    let file = compile_ok("function f(a) { a.append(1); a.count = a.length; return a.red; }");
    let count = symbol(&file, "count");
    assert_eq!(
        body(&file, "f"),
        vec![
            Instruction::GetVariable(Slot::local(0)),
            Instruction::PushInt8(1),
            Instruction::ArrayAppend,
            Instruction::Pop,
            Instruction::GetVariable(Slot::local(0)),
            Instruction::GetVariable(Slot::local(0)),
            Instruction::Length,
            Instruction::SetMember(count),
            Instruction::GetVariable(Slot::local(0)),
            Instruction::Red,
            Instruction::Return,
        ]
    );
}

#[test]
fn test_method_call_duplicates_receiver() {
    let file = compile_ok("function f(o) { return o.move(1, 2); }");
    let method = symbol(&file, "move");
    assert_eq!(
        body(&file, "f"),
        vec![
            Instruction::GetVariable(Slot::local(0)),
            Instruction::Dup,
            Instruction::PushInt8(1),
            Instruction::PushInt8(2),
            Instruction::CallMethod { method, argc: 2 },
            Instruction::Return,
        ]
    );
}

#[test]
fn test_game_and_dynamic_access() {
    let file = compile_ok(
        "function f(o, n) { o.$n(1); game::spawn(2); return game::score + o.$n; }",
    );
    let code = body(&file, "f");
    assert!(code.contains(&Instruction::CallDynamicMethod { argc: 1 }));
    let game = symbol(&file, "game");
    let spawn = symbol(&file, "spawn");
    assert!(code.contains(&Instruction::CallGameFunction {
        namespace: game,
        name: spawn,
        argc: 1
    }));
    assert!(code.contains(&Instruction::GetDynamicMember));
}

#[test]
fn test_dynamic_game_variable_is_read_only() {
    assert_eq!(error_codes("function f(n) { game::$n = 3; }"), vec!["C009"]);
}

#[test]
fn test_namespace_must_be_a_name() {
    assert_eq!(error_codes("function f(o) { return o.a::b; }"), vec!["C012"]);
}

#[test]
fn test_constructor_skeleton() {
    let source = r#"
function make() { return new Point(1, 2); }
function bare() { return new Point; }
class Point {
    property x;
    property y;
    function Point(x, y) { this.x = x; this.y = y; }
}
"#;
    let file = compile_ok(source);
    let point = symbol(&file, "Point");
    assert_eq!(
        body(&file, "make"),
        vec![
            Instruction::CreateObject(point),
            Instruction::Dup,
            Instruction::PushInt8(1),
            Instruction::PushInt8(2),
            Instruction::LookupMethod(point),
            Instruction::CallIndirect { argc: 2 },
            Instruction::Pop,
            Instruction::Return,
        ]
    );
    assert_eq!(body(&file, "bare"), vec![Instruction::CreateObject(point), Instruction::Return]);

    let ctor = file.classes[0].method(point).unwrap();
    assert_eq!(ctor.instructions[0], Instruction::CheckArgumentCount(2));
    // parameters follow `this` in slot 0
    assert_eq!(ctor.instructions[1], Instruction::GetVariable(Slot::local(1)));
    assert_eq!(ctor.parameter_count(), 2);
}

#[test]
fn test_bare_new_warns_when_constructor_skipped() {
    let source = "class P { function P(a) {} } class Q {} function f() { var p = new P; return new Q; }";
    let compilation = compile_source(source, None);
    assert!(compilation.file.is_some());
    assert!(!compilation.has_errors());
    let codes: Vec<_> = compilation.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec!["W001"]);
    assert!(compilation.diagnostics[0].to_string().contains("warning[W001]"));
}

#[test]
fn test_constructor_arity() {
    let codes = error_codes("class P { function P(a) {} } function f() { return new P(); }");
    assert_eq!(codes, vec!["C007"]);
    let codes = error_codes("class Q {} function f() { return new Q(1); }");
    assert_eq!(codes, vec!["C007"]);
}

#[test]
fn test_inheritance_copies_base_members() {
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
    let file = compile_ok(source);
    assert_eq!(file.classes[0].name, "Base");
    let hero = &file.classes[file.find_class("Hero").unwrap()];
    let base = &file.classes[file.find_class("Base").unwrap()];

    assert_eq!(hero.property_symbols, vec![symbol(&file, "hp"), symbol(&file, "xp")]);
    assert_eq!(hero.methods.len(), 3);
    let heal = symbol(&file, "heal");
    assert_eq!(hero.method(heal), base.method(heal));
    let name = symbol(&file, "name");
    assert_ne!(hero.method(name), base.method(name));
}

#[test]
fn test_this_method_arity_checked_through_base() {
    let codes = error_codes("class A { function m(x) {} } class B : A { function n() { this.m(); } }");
    assert_eq!(codes, vec!["C007"]);
    let codes = error_codes("class A { function n() { this.nope(); } }");
    assert_eq!(codes, vec!["C002"]);
}

#[test]
fn test_class_errors() {
    assert_eq!(error_codes("class A : B {} class B : A {}"), vec!["C013"]);
    assert_eq!(error_codes("class A : Nowhere {}"), vec!["C003"]);
    assert_eq!(error_codes("class A {} class A {}"), vec!["C006"]);
}

#[test]
fn test_line_numbers() {
    let settings = CompilerSettings {
        emit_line_numbers: true,
        ..CompilerSettings::default()
    };
    let compilation = compile_source_with("function f() {\n    return 1;\n}", None, settings);
    let file = compilation.file.unwrap();
    assert_eq!(
        file.functions[0].instructions,
        vec![Instruction::LineNumber(2), Instruction::PushInt8(1), Instruction::Return]
    );
}

#[test]
fn test_container_roundtrips_through_bytes() {
    let file = compile_ok("global g; function f(a) { g = [a, 1.5, \"s\"]; return g; }");
    let bytes = file.to_bytes().unwrap();
    assert_eq!(OsiFile::from_bytes(&bytes).unwrap(), file);
}

proptest! {
    #[test]
    fn test_narrowest_literal_width(value in any::<i32>()) {
        let file = compile_ok(&format!("function f() {{ return {value}; }}"));
        let expected = if value == 0 {
            Instruction::PushZero
        } else if let Ok(v) = i8::try_from(value) {
            Instruction::PushInt8(v)
        } else if let Ok(v) = i16::try_from(value) {
            Instruction::PushInt16(v)
        } else {
            Instruction::PushInt32(value)
        };
        prop_assert_eq!(&file.functions[0].instructions[0], &expected);
    }
}
