use std::rc::Rc;

use pest::error::{Error, ErrorVariant};
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

use super::ast::*;
use crate::runner::ds::error::JErrorType;

#[derive(Parser)]
#[grammar = "parser/script_grammar.pest"] // relative to src
pub struct JsParser;

impl JsParser {
    /// Parses a script, reporting grammar failures as a `SyntaxError`.
    pub fn parse_to_ast_from_str(script: &str) -> Result<ProgramData, JErrorType> {
        parse_to_ast(script).map_err(|e| JErrorType::SyntaxError(e.to_string()))
    }
}

pub fn parse_to_ast(script: &str) -> Result<ProgramData, Error<Rule>> {
    let mut pairs = JsParser::parse(Rule::script, script)?;
    match pairs.next() {
        Some(script_pair) => build_ast_from_script(script_pair),
        None => Err(Error::new_from_pos(
            ErrorVariant::CustomError {
                message: "empty parse".to_string(),
            },
            pest::Position::from_start(script),
        )),
    }
}

fn get_unexpected_error(id: i32, pair: &Pair<Rule>) -> Error<Rule> {
    let message = format!("Unexpected state reached [{:?}] - {}", pair.as_rule(), id);
    Error::new_from_span(ErrorVariant::CustomError { message }, pair.as_span())
}

fn get_meta(pair: &Pair<Rule>) -> Meta {
    Meta {
        start_index: pair.as_span().start(),
        end_index: pair.as_span().end(),
    }
}

fn next_inner<'i>(
    pair_iter: &mut Pairs<'i, Rule>,
    parent: &Pair<'i, Rule>,
    id: i32,
) -> Result<Pair<'i, Rule>, Error<Rule>> {
    pair_iter
        .next()
        .ok_or_else(|| get_unexpected_error(id, parent))
}

fn build_ast_from_script(pair: Pair<Rule>) -> Result<ProgramData, Error<Rule>> {
    let meta = get_meta(&pair);
    let mut strict = false;
    let mut body = vec![];
    for inner_pair in pair.into_inner() {
        match inner_pair.as_rule() {
            Rule::directive => strict = true,
            Rule::statement => body.push(build_ast_from_statement(inner_pair)?),
            Rule::EOI => { /* Do nothing */ }
            _ => return Err(get_unexpected_error(1, &inner_pair)),
        }
    }
    Ok(ProgramData { meta, strict, body })
}

fn build_ast_from_statement(pair: Pair<Rule>) -> Result<StatementType, Error<Rule>> {
    let mut pair_iter = pair.clone().into_inner();
    let inner_pair = next_inner(&mut pair_iter, &pair, 2)?;
    let meta = get_meta(&inner_pair);
    Ok(match inner_pair.as_rule() {
        Rule::empty_statement => StatementType::EmptyStatement { meta },
        Rule::expression_statement => {
            let mut inner_iter = inner_pair.clone().into_inner();
            StatementType::ExpressionStatement {
                meta,
                expression: Box::new(build_ast_from_expression(next_inner(
                    &mut inner_iter,
                    &inner_pair,
                    3,
                )?)?),
            }
        }
        Rule::throw_statement => {
            let mut inner_iter = inner_pair.clone().into_inner();
            // k_throw
            next_inner(&mut inner_iter, &inner_pair, 4)?;
            StatementType::ThrowStatement {
                meta,
                argument: Box::new(build_ast_from_expression(next_inner(
                    &mut inner_iter,
                    &inner_pair,
                    5,
                )?)?),
            }
        }
        Rule::variable_statement => build_ast_from_variable_statement(inner_pair)?,
        _ => return Err(get_unexpected_error(6, &inner_pair)),
    })
}

fn build_ast_from_variable_statement(pair: Pair<Rule>) -> Result<StatementType, Error<Rule>> {
    let meta = get_meta(&pair);
    let mut pair_iter = pair.clone().into_inner();
    let kind_pair = next_inner(&mut pair_iter, &pair, 7)?;
    let kind = match kind_pair.as_str() {
        "var" => VariableDeclarationKind::Var,
        "let" => VariableDeclarationKind::Let,
        "const" => VariableDeclarationKind::Const,
        _ => return Err(get_unexpected_error(8, &kind_pair)),
    };
    let mut declarations = vec![];
    for declaration_pair in pair_iter {
        let decl_meta = get_meta(&declaration_pair);
        let mut decl_iter = declaration_pair.clone().into_inner();
        let id_pair = next_inner(&mut decl_iter, &declaration_pair, 9)?;
        let init = match decl_iter.next() {
            Some(init_pair) => Some(Box::new(build_ast_from_assignment_expression(init_pair)?)),
            None => None,
        };
        declarations.push(VariableDeclaratorData {
            meta: decl_meta,
            id: get_identifier_data(&id_pair),
            init,
        });
    }
    Ok(StatementType::VariableDeclaration {
        meta,
        kind,
        declarations,
    })
}

fn get_identifier_data(pair: &Pair<Rule>) -> IdentifierData {
    IdentifierData {
        name: pair.as_str().to_string(),
        meta: get_meta(pair),
    }
}

fn build_ast_from_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let mut pair_iter = pair.clone().into_inner();
    build_ast_from_assignment_expression(next_inner(&mut pair_iter, &pair, 10)?)
}

fn build_ast_from_assignment_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let mut pair_iter = pair.clone().into_inner();
    let inner_pair = next_inner(&mut pair_iter, &pair, 11)?;
    Ok(match inner_pair.as_rule() {
        Rule::arrow_function => build_ast_from_arrow_function(inner_pair)?,
        Rule::assignment => {
            let meta = get_meta(&inner_pair);
            let mut inner_iter = inner_pair.clone().into_inner();
            let left = build_ast_from_left_hand_side_expression(next_inner(
                &mut inner_iter,
                &inner_pair,
                12,
            )?)?;
            // assign_op
            next_inner(&mut inner_iter, &inner_pair, 13)?;
            let right =
                build_ast_from_assignment_expression(next_inner(&mut inner_iter, &inner_pair, 14)?)?;
            match left {
                ExpressionType::Identifier(_) | ExpressionType::MemberExpression { .. } => {}
                _ => return Err(get_unexpected_error(15, &inner_pair)),
            }
            ExpressionType::AssignmentExpression {
                meta,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        Rule::logical_or_expression => build_ast_from_logical_expression(inner_pair)?,
        _ => return Err(get_unexpected_error(16, &inner_pair)),
    })
}

fn build_ast_from_arrow_function(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let mut pair_iter = pair.clone().into_inner();
    let params_pair = next_inner(&mut pair_iter, &pair, 17)?;
    let params = params_pair
        .into_inner()
        .map(|p| get_identifier_data(&p))
        .collect();
    let body = build_ast_from_assignment_expression(next_inner(&mut pair_iter, &pair, 18)?)?;
    Ok(ExpressionType::ArrowFunctionExpression(Rc::new(FunctionData {
        meta,
        params,
        body: Box::new(body),
    })))
}

/// Both `||` and `&&` levels; operands of `&&` are equality expressions.
fn build_ast_from_logical_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let rule = pair.as_rule();
    let mut pair_iter = pair.clone().into_inner();
    let build_operand = |p: Pair<Rule>| match rule {
        Rule::logical_or_expression => build_ast_from_logical_expression(p),
        _ => build_ast_from_binary_expression(p),
    };
    let mut left = build_operand(next_inner(&mut pair_iter, &pair, 19)?)?;
    while let Some(op_pair) = pair_iter.next() {
        let operator = match op_pair.as_str() {
            "||" => LogicalOperator::Or,
            "&&" => LogicalOperator::And,
            _ => return Err(get_unexpected_error(20, &op_pair)),
        };
        let right = build_operand(next_inner(&mut pair_iter, &pair, 21)?)?;
        left = ExpressionType::LogicalExpression {
            meta: meta.clone(),
            operator,
            left: Box::new(left),
            right: Box::new(right),
        };
    }
    Ok(left)
}

/// Left-associative binary levels: equality, relational and additive.
fn build_ast_from_binary_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let rule = pair.as_rule();
    let mut pair_iter = pair.clone().into_inner();
    let build_operand = |p: Pair<Rule>| match rule {
        Rule::additive_expression => build_ast_from_unary_expression(p),
        _ => build_ast_from_binary_expression(p),
    };
    let mut left = build_operand(next_inner(&mut pair_iter, &pair, 22)?)?;
    while let Some(op_pair) = pair_iter.next() {
        let operator = match op_pair.as_str() {
            "===" => BinaryOperator::StrictlyEqual,
            "!==" => BinaryOperator::StrictlyUnequal,
            "==" => BinaryOperator::LooselyEqual,
            "!=" => BinaryOperator::LooselyUnequal,
            "<" => BinaryOperator::LessThan,
            ">" => BinaryOperator::GreaterThan,
            "<=" => BinaryOperator::LessThanEqual,
            ">=" => BinaryOperator::GreaterThanEqual,
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Subtract,
            "instanceof" => BinaryOperator::InstanceOf,
            "in" => BinaryOperator::In,
            _ => return Err(get_unexpected_error(23, &op_pair)),
        };
        let right = build_operand(next_inner(&mut pair_iter, &pair, 24)?)?;
        left = ExpressionType::BinaryExpression {
            meta: meta.clone(),
            operator,
            left: Box::new(left),
            right: Box::new(right),
        };
    }
    Ok(left)
}

fn build_ast_from_unary_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let mut inner_pairs: Vec<Pair<Rule>> = pair.clone().into_inner().collect();
    let operand_pair = match inner_pairs.pop() {
        Some(p) => p,
        None => return Err(get_unexpected_error(25, &pair)),
    };
    let mut node = build_ast_from_left_hand_side_expression(operand_pair)?;
    for op_pair in inner_pairs.into_iter().rev() {
        let operator = match op_pair.as_str() {
            "delete" => UnaryOperator::Delete,
            "void" => UnaryOperator::Void,
            "typeof" => UnaryOperator::TypeOf,
            "+" => UnaryOperator::Plus,
            "-" => UnaryOperator::Minus,
            "!" => UnaryOperator::LogicalNot,
            _ => return Err(get_unexpected_error(26, &op_pair)),
        };
        node = ExpressionType::UnaryExpression {
            meta: meta.clone(),
            operator,
            argument: Box::new(node),
        };
    }
    Ok(node)
}

fn build_ast_from_left_hand_side_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let mut pair_iter = pair.clone().into_inner();
    let head = next_inner(&mut pair_iter, &pair, 27)?;
    let mut obj = match head.as_rule() {
        Rule::new_expression => build_ast_from_new_expression(head)?,
        Rule::primary_expression => build_ast_from_primary_expression(head)?,
        _ => return Err(get_unexpected_error(28, &head)),
    };
    for accessor in pair_iter {
        obj = build_accessor(obj, accessor, &meta)?;
    }
    Ok(obj)
}

fn build_accessor(
    obj: ExpressionType,
    accessor: Pair<Rule>,
    meta: &Meta,
) -> Result<ExpressionType, Error<Rule>> {
    Ok(match accessor.as_rule() {
        Rule::dot_member => {
            let mut inner_iter = accessor.clone().into_inner();
            let name = next_inner(&mut inner_iter, &accessor, 29)?;
            ExpressionType::MemberExpression {
                meta: meta.clone(),
                object: Box::new(obj),
                property: MemberProperty::Dot(name.as_str().to_string()),
            }
        }
        Rule::bracket_member => {
            let mut inner_iter = accessor.clone().into_inner();
            let member = next_inner(&mut inner_iter, &accessor, 30)?;
            ExpressionType::MemberExpression {
                meta: meta.clone(),
                object: Box::new(obj),
                property: MemberProperty::Computed(Box::new(build_ast_from_expression(member)?)),
            }
        }
        Rule::arguments => ExpressionType::CallExpression {
            meta: meta.clone(),
            callee: Box::new(obj),
            arguments: get_arguments(accessor)?,
        },
        _ => return Err(get_unexpected_error(31, &accessor)),
    })
}

fn get_arguments(pair: Pair<Rule>) -> Result<Vec<ExpressionType>, Error<Rule>> {
    let mut arguments = vec![];
    for inner_pair in pair.into_inner() {
        arguments.push(build_ast_from_assignment_expression(inner_pair)?);
    }
    Ok(arguments)
}

fn build_ast_from_new_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let mut pair_iter = pair.clone().into_inner();
    // k_new
    next_inner(&mut pair_iter, &pair, 32)?;
    let callee_pair = next_inner(&mut pair_iter, &pair, 33)?;
    let callee_meta = get_meta(&callee_pair);
    let mut callee_iter = callee_pair.clone().into_inner();
    let mut callee =
        build_ast_from_primary_expression(next_inner(&mut callee_iter, &callee_pair, 34)?)?;
    for accessor in callee_iter {
        callee = build_accessor(callee, accessor, &callee_meta)?;
    }
    let arguments = match pair_iter.next() {
        Some(arguments_pair) => get_arguments(arguments_pair)?,
        None => vec![],
    };
    Ok(ExpressionType::NewExpression {
        meta,
        callee: Box::new(callee),
        arguments,
    })
}

fn build_ast_from_primary_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let mut pair_iter = pair.clone().into_inner();
    let inner_pair = next_inner(&mut pair_iter, &pair, 35)?;
    let meta = get_meta(&inner_pair);
    Ok(match inner_pair.as_rule() {
        Rule::this_keyword => ExpressionType::ThisExpression { meta },
        Rule::identifier => ExpressionType::Identifier(get_identifier_data(&inner_pair)),
        Rule::literal => build_ast_from_literal(inner_pair)?,
        Rule::parenthesized_expression => {
            let mut inner_iter = inner_pair.clone().into_inner();
            build_ast_from_expression(next_inner(&mut inner_iter, &inner_pair, 36)?)?
        }
        Rule::array_literal => {
            let mut elements = vec![];
            for element in inner_pair.into_inner() {
                elements.push(build_ast_from_assignment_expression(element)?);
            }
            ExpressionType::ArrayExpression { meta, elements }
        }
        Rule::object_literal => {
            let mut properties = vec![];
            for property in inner_pair.into_inner() {
                properties.push(build_ast_from_property_definition(property)?);
            }
            ExpressionType::ObjectExpression { meta, properties }
        }
        _ => return Err(get_unexpected_error(37, &inner_pair)),
    })
}

fn build_ast_from_property_definition(pair: Pair<Rule>) -> Result<PropertyData, Error<Rule>> {
    let meta = get_meta(&pair);
    let mut pair_iter = pair.clone().into_inner();
    let first = next_inner(&mut pair_iter, &pair, 38)?;
    if first.as_rule() == Rule::identifier {
        // shorthand `{ a }`
        let id = get_identifier_data(&first);
        return Ok(PropertyData {
            meta,
            key: PropertyName::Static(id.name.clone()),
            value: ExpressionType::Identifier(id),
        });
    }
    let mut name_iter = first.clone().into_inner();
    let name_pair = next_inner(&mut name_iter, &first, 39)?;
    let key = match name_pair.as_rule() {
        Rule::identifier_name => PropertyName::Static(name_pair.as_str().to_string()),
        Rule::string_literal => PropertyName::Static(unescape_string_literal(name_pair.as_str())),
        Rule::numeric_literal => PropertyName::Static(
            match parse_number(&name_pair)? {
                NumberLiteralType::IntegerLiteral(i) => i.to_string(),
                NumberLiteralType::FloatLiteral(f) => f.to_string(),
            },
        ),
        Rule::computed_property_name => {
            let mut computed_iter = name_pair.clone().into_inner();
            PropertyName::Computed(Box::new(build_ast_from_assignment_expression(next_inner(
                &mut computed_iter,
                &name_pair,
                40,
            )?)?))
        }
        _ => return Err(get_unexpected_error(41, &name_pair)),
    };
    let value = build_ast_from_assignment_expression(next_inner(&mut pair_iter, &pair, 42)?)?;
    Ok(PropertyData { meta, key, value })
}

fn build_ast_from_literal(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let mut pair_iter = pair.clone().into_inner();
    let inner_pair = next_inner(&mut pair_iter, &pair, 43)?;
    let meta = get_meta(&inner_pair);
    let value = match inner_pair.as_rule() {
        Rule::null_literal => LiteralType::NullLiteral,
        Rule::boolean_literal => LiteralType::BooleanLiteral(inner_pair.as_str() == "true"),
        Rule::numeric_literal => LiteralType::NumberLiteral(parse_number(&inner_pair)?),
        Rule::string_literal => {
            LiteralType::StringLiteral(unescape_string_literal(inner_pair.as_str()))
        }
        _ => return Err(get_unexpected_error(44, &inner_pair)),
    };
    Ok(ExpressionType::Literal { meta, value })
}

fn parse_number(pair: &Pair<Rule>) -> Result<NumberLiteralType, Error<Rule>> {
    let s = pair.as_str();
    if !s.contains(|c| c == '.' || c == 'e' || c == 'E') {
        if let Ok(i) = s.parse::<i64>() {
            return Ok(NumberLiteralType::IntegerLiteral(i));
        }
    }
    match s.parse::<f64>() {
        Ok(f) => Ok(NumberLiteralType::FloatLiteral(f)),
        Err(_) => Err(get_unexpected_error(45, pair)),
    }
}

/// Strips the quotes and resolves the common single-character escapes.
fn unescape_string_literal(s: &str) -> String {
    let body = &s[1..s.len() - 1];
    let mut result = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('0') => result.push('\0'),
            Some(other) => result.push(other),
            None => {}
        }
    }
    result
}
