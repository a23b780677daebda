use super::api::{parse_to_ast, JsParser, Rule};
use super::ast::*;

use pest::consumes_to;
use pest::fails_with;
use pest::parses_to;

fn parse_single_expression(script: &str) -> ExpressionType {
    let mut program = parse_to_ast(script).unwrap();
    assert_eq!(program.body.len(), 1, "expected exactly one statement");
    match program.body.remove(0) {
        StatementType::ExpressionStatement { expression, .. } => *expression,
        s => panic!("expected an expression statement, got {:?}", s),
    }
}

#[test]
fn test_integer_numeric_literal() {
    parses_to! {
        parser: JsParser,
        input: "10",
        rule: Rule::numeric_literal,
        tokens: [
            numeric_literal(0, 2)
        ]
    };
}

#[test]
fn test_float_numeric_literal() {
    parses_to! {
        parser: JsParser,
        input: "10.25e3",
        rule: Rule::numeric_literal,
        tokens: [
            numeric_literal(0, 7)
        ]
    };
}

#[test]
fn test_identifier_rejects_reserved_word() {
    fails_with! {
        parser: JsParser,
        input: "typeof",
        rule: Rule::identifier,
        positives: vec![Rule::identifier],
        negatives: vec![],
        pos: 0
    };
}

#[test]
fn test_identifier_may_start_with_keyword() {
    parses_to! {
        parser: JsParser,
        input: "newValue",
        rule: Rule::identifier,
        tokens: [
            identifier(0, 8)
        ]
    };
}

#[test]
fn test_use_strict_directive() {
    let program = parse_to_ast("'use strict'; 1").unwrap();
    assert!(program.strict);
    assert_eq!(program.body.len(), 1);
    let program = parse_to_ast("1; 'use strict'").unwrap();
    assert!(!program.strict);
}

#[test]
fn test_variable_declarations() {
    let program = parse_to_ast("const a = 1, b; let c; var d = a").unwrap();
    assert_eq!(program.body.len(), 3);
    match &program.body[0] {
        StatementType::VariableDeclaration {
            kind, declarations, ..
        } => {
            assert_eq!(*kind, VariableDeclarationKind::Const);
            assert_eq!(declarations.len(), 2);
            assert_eq!(declarations[0].id.name, "a");
            assert!(declarations[0].init.is_some());
            assert!(declarations[1].init.is_none());
        }
        s => panic!("unexpected statement {:?}", s),
    }
}

#[test]
fn test_member_call_chain() {
    match parse_single_expression("a.b['c'](1, x)") {
        ExpressionType::CallExpression {
            callee, arguments, ..
        } => {
            assert_eq!(arguments.len(), 2);
            match *callee {
                ExpressionType::MemberExpression {
                    object,
                    property: MemberProperty::Computed(_),
                    ..
                } => assert!(matches!(
                    *object,
                    ExpressionType::MemberExpression {
                        property: MemberProperty::Dot(ref name),
                        ..
                    } if name == "b"
                )),
                e => panic!("unexpected callee {:?}", e),
            }
        }
        e => panic!("unexpected expression {:?}", e),
    }
}

#[test]
fn test_new_expression_binds_tighter_than_call() {
    match parse_single_expression("new Foo.Bar(1).baz") {
        ExpressionType::MemberExpression { object, .. } => match *object {
            ExpressionType::NewExpression {
                callee, arguments, ..
            } => {
                assert_eq!(arguments.len(), 1);
                assert!(matches!(*callee, ExpressionType::MemberExpression { .. }));
            }
            e => panic!("unexpected object {:?}", e),
        },
        e => panic!("unexpected expression {:?}", e),
    }
}

#[test]
fn test_arrow_function() {
    match parse_single_expression("(a, b) => a + b") {
        ExpressionType::ArrowFunctionExpression(f) => {
            let names: Vec<&str> = f.params.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["a", "b"]);
            assert!(matches!(
                *f.body,
                ExpressionType::BinaryExpression {
                    operator: BinaryOperator::Add,
                    ..
                }
            ));
        }
        e => panic!("unexpected expression {:?}", e),
    }
    assert!(matches!(
        parse_single_expression("x => x"),
        ExpressionType::ArrowFunctionExpression(_)
    ));
}

#[test]
fn test_assignment_is_right_associative() {
    match parse_single_expression("a = b = 3") {
        ExpressionType::AssignmentExpression { left, right, .. } => {
            assert!(matches!(*left, ExpressionType::Identifier(_)));
            assert!(matches!(*right, ExpressionType::AssignmentExpression { .. }));
        }
        e => panic!("unexpected expression {:?}", e),
    }
}

#[test]
fn test_assignment_to_call_is_rejected() {
    assert!(parse_to_ast("f() = 1").is_err());
}

#[test]
fn test_equality_vs_assignment() {
    assert!(matches!(
        parse_single_expression("a == b"),
        ExpressionType::BinaryExpression {
            operator: BinaryOperator::LooselyEqual,
            ..
        }
    ));
    assert!(matches!(
        parse_single_expression("a !== b"),
        ExpressionType::BinaryExpression {
            operator: BinaryOperator::StrictlyUnequal,
            ..
        }
    ));
}

#[test]
fn test_relational_keywords() {
    assert!(matches!(
        parse_single_expression("e instanceof TypeError"),
        ExpressionType::BinaryExpression {
            operator: BinaryOperator::InstanceOf,
            ..
        }
    ));
    assert!(matches!(
        parse_single_expression("'x' in o"),
        ExpressionType::BinaryExpression {
            operator: BinaryOperator::In,
            ..
        }
    ));
}

#[test]
fn test_unary_operators_nest() {
    match parse_single_expression("typeof !x") {
        ExpressionType::UnaryExpression {
            operator, argument, ..
        } => {
            assert_eq!(operator, UnaryOperator::TypeOf);
            assert!(matches!(
                *argument,
                ExpressionType::UnaryExpression {
                    operator: UnaryOperator::LogicalNot,
                    ..
                }
            ));
        }
        e => panic!("unexpected expression {:?}", e),
    }
}

#[test]
fn test_object_literal_keys() {
    match parse_single_expression("({ a: 1, 'b c': 2, 3: 3, [k]: 4, d })") {
        ExpressionType::ObjectExpression { properties, .. } => {
            assert_eq!(properties.len(), 5);
            let statics: Vec<String> = properties
                .iter()
                .filter_map(|p| match &p.key {
                    PropertyName::Static(s) => Some(s.clone()),
                    PropertyName::Computed(_) => None,
                })
                .collect();
            assert_eq!(statics, vec!["a", "b c", "3", "d"]);
        }
        e => panic!("unexpected expression {:?}", e),
    }
}

#[test]
fn test_string_escapes() {
    match parse_single_expression(r#""a\"b\n""#) {
        ExpressionType::Literal {
            value: LiteralType::StringLiteral(s),
            ..
        } => assert_eq!(s, "a\"b\n"),
        e => panic!("unexpected expression {:?}", e),
    }
}

#[test]
fn test_throw_statement() {
    let program = parse_to_ast("throw new TypeError('x');").unwrap();
    assert!(matches!(
        program.body[0],
        StatementType::ThrowStatement { .. }
    ));
}

#[test]
fn test_comments_are_skipped() {
    let program = parse_to_ast("// leading\n/* block */ 1; // trailing").unwrap();
    assert_eq!(program.body.len(), 1);
}

#[test]
fn test_syntax_error_is_reported() {
    let err = JsParser::parse_to_ast_from_str("let = ;").unwrap_err();
    assert!(err.to_string().starts_with("Uncaught syntax error"));
}
