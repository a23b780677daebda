use crate::runner::ds::error::JErrorType;
use crate::runner::ds::realm::CodeRealm;
use crate::runner::ds::value::{JsNumberType, JsValue};

fn run(script: &str) -> JsValue {
    CodeRealm::new().evaluate(script).unwrap()
}

fn run_err(script: &str) -> JErrorType {
    CodeRealm::new().evaluate(script).unwrap_err()
}

#[test]
fn test_completion_value_is_last_expression() {
    assert_eq!(run("1; 2; let x = 3;"), JsValue::Number(JsNumberType::Integer(2)));
    assert_eq!(run(""), JsValue::Undefined);
}

#[test]
fn test_arithmetic_and_concatenation() {
    assert_eq!(run("1 + 2 - 4"), JsValue::Number(JsNumberType::Integer(-1)));
    assert_eq!(run("'a' + 1 + true"), JsValue::from("a1true"));
    assert_eq!(run("0.5 + 0.25"), JsValue::Number(JsNumberType::Float(0.75)));
    assert_eq!(run("-'3'"), JsValue::Number(JsNumberType::Integer(-3)));
}

#[test]
fn test_comparisons() {
    assert_eq!(run("1 < 2 && 'b' > 'a' && 2 >= 2"), JsValue::Boolean(true));
    assert_eq!(run("NaN < 1 || NaN >= 1"), JsValue::Boolean(false));
    assert_eq!(run("null == undefined && 1 == '1' && 1 !== '1'"), JsValue::Boolean(true));
}

#[test]
fn test_logical_operators_return_operands() {
    assert_eq!(run("0 || 'x'"), JsValue::from("x"));
    assert_eq!(run("'' && 'x'"), JsValue::from(""));
}

#[test]
fn test_bindings_persist_across_scripts() {
    let realm = CodeRealm::new();
    realm.evaluate("var a = 1; let b = 2; const c = 3;").unwrap();
    assert_eq!(
        realm.evaluate("a + b + c").unwrap(),
        JsValue::Number(JsNumberType::Integer(6))
    );
    assert_eq!(realm.evaluate("globalThis.a").unwrap(), JsValue::from(1));
    assert_eq!(realm.evaluate("globalThis.b").unwrap(), JsValue::Undefined);
}

#[test]
fn test_const_assignment_throws() {
    let realm = CodeRealm::new();
    realm.evaluate("const c = 1;").unwrap();
    assert!(matches!(realm.evaluate("c = 2"), Err(JErrorType::TypeError(_))));
}

#[test]
fn test_lexical_redeclaration_is_rejected() {
    let realm = CodeRealm::new();
    realm.evaluate("let x = 1;").unwrap();
    assert!(matches!(realm.evaluate("let x = 2;"), Err(JErrorType::SyntaxError(_))));
    assert!(matches!(realm.evaluate("var x;"), Err(JErrorType::SyntaxError(_))));
    assert!(matches!(run_err("const y;"), JErrorType::SyntaxError(_)));
}

#[test]
fn test_temporal_dead_zone() {
    assert!(matches!(
        run_err("x; let x = 1;"),
        JErrorType::ReferenceError(_)
    ));
}

#[test]
fn test_unresolvable_reference() {
    assert!(matches!(run_err("nope"), JErrorType::ReferenceError(_)));
    assert_eq!(run("typeof nope"), JsValue::from("undefined"));
    assert!(matches!(
        run_err("'use strict'; implicit = 1"),
        JErrorType::ReferenceError(_)
    ));
    assert_eq!(run("implicit = 1; globalThis.implicit"), JsValue::from(1));
}

#[test]
fn test_strict_mode_failed_writes_throw() {
    let script = "const o = Object.freeze({ a: 1 }); o.a = 2; o.a";
    assert_eq!(run(script), JsValue::from(1));
    assert!(matches!(
        run_err(&format!("'use strict'; {}", script)),
        JErrorType::TypeError(_)
    ));
    assert!(matches!(
        CodeRealm::new().evaluate_strict(script),
        Err(JErrorType::TypeError(_))
    ));
}

#[test]
fn test_strict_mode_failed_delete_throws() {
    let script = "const o = {}; Object.defineProperty(o, 'k', { value: 1 }); delete o.k";
    assert_eq!(run(script), JsValue::Boolean(false));
    assert!(matches!(
        run_err(&format!("'use strict'; {}", script)),
        JErrorType::TypeError(_)
    ));
}

#[test]
fn test_arrow_functions_close_over_scope() {
    assert_eq!(
        run("const add = (a, b) => a + b; const inc = x => add(x, 1); inc(41)"),
        JsValue::from(42)
    );
    assert_eq!(run("const f = () => 1; f.name"), JsValue::from("f"));
    assert_eq!(run("((a, b) => b)(1)"), JsValue::Undefined);
    assert_eq!(run("(() => this)() === globalThis"), JsValue::Boolean(true));
}

#[test]
fn test_arrow_functions_are_not_constructors() {
    assert!(matches!(run_err("const f = () => 1; new f()"), JErrorType::TypeError(_)));
}

#[test]
fn test_method_call_binds_this() {
    assert_eq!(
        run("const o = { v: 7 }; o.f = Reflect.get; o.f(o, 'v')"),
        JsValue::from(7)
    );
    assert_eq!(run("({}).hasOwnProperty('x')"), JsValue::Boolean(false));
}

#[test]
fn test_calling_a_non_function() {
    match run_err("const o = {}; o.missing()") {
        JErrorType::TypeError(m) => assert_eq!(m, "o.missing is not a function"),
        e => panic!("unexpected error {:?}", e),
    }
}

#[test]
fn test_throw_carries_the_value() {
    match run_err("throw new TypeError('bad')") {
        JErrorType::Thrown(JsValue::Object(o)) => {
            assert_eq!(o.borrow().class_name(), "[object Error]");
        }
        e => panic!("unexpected error {:?}", e),
    }
    assert!(matches!(run_err("throw 1"), JErrorType::Thrown(JsValue::Number(_))));
}

#[test]
fn test_instanceof_and_in() {
    assert_eq!(run("new TypeError('x') instanceof Error"), JsValue::Boolean(true));
    assert_eq!(run("[] instanceof Array"), JsValue::Boolean(true));
    assert_eq!(run("'a' in { a: 1 }"), JsValue::Boolean(true));
    assert_eq!(run("0 in [5]"), JsValue::Boolean(true));
    assert!(matches!(run_err("'a' in 1"), JErrorType::TypeError(_)));
}

#[test]
fn test_array_and_object_literals() {
    assert_eq!(run("[1, 2, 3].length"), JsValue::from(3));
    assert_eq!(run("const k = 'z'; ({ [k]: 1 }).z"), JsValue::from(1));
    assert_eq!(run("const a = 1; ({ a }).a"), JsValue::from(1));
    assert_eq!(run("Array.isArray([])"), JsValue::Boolean(true));
}

#[test]
fn test_indirect_eval() {
    assert_eq!(run("eval('1 + 1')"), JsValue::from(2));
    assert_eq!(run("eval(5)"), JsValue::from(5));
}
