//! Expression evaluation.

use crate::parser::ast::{
    BinaryOperator, ExpressionType, LiteralType, LogicalOperator, MemberProperty,
    NumberLiteralType, PropertyName, UnaryOperator,
};
use crate::runner::ds::array_object::create_array_from_list;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::new_object;
use crate::runner::ds::object_property::PropertyKey;
use crate::runner::ds::operations::object::{call, construct, create_data_property, has_property};
use crate::runner::ds::operations::test_and_comparison::{
    abstract_equality_comparison, is_callable, ordinary_has_instance, strict_equality_comparison,
};
use crate::runner::ds::operations::type_conversion::{
    get_type, to_boolean, to_number, to_property_key, to_string, TYPE_STR_UNDEFINED,
};
use crate::runner::ds::value::{JsNumberType, JsValue};

use super::function::create_arrow_function;
use super::types::{EvalContext, Reference, ReferenceResult, ValueResult};

/// Evaluate an expression and return its value.
pub fn evaluate_expression(expr: &ExpressionType, ctx: &EvalContext) -> ValueResult {
    match expr {
        ExpressionType::Literal { value, .. } => Ok(evaluate_literal(value)),

        ExpressionType::Identifier(id) => ctx.resolve_binding(&id.name)?.get_value(),

        ExpressionType::ThisExpression { .. } => Ok(ctx.this.clone()),

        ExpressionType::ArrayExpression { elements, .. } => {
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(evaluate_expression(element, ctx)?);
            }
            let proto = ctx.realm.intrinsics().array_prototype.clone();
            Ok(JsValue::Object(create_array_from_list(values, Some(proto))))
        }

        ExpressionType::ObjectExpression { properties, .. } => {
            let o = new_object(Some(ctx.realm.intrinsics().object_prototype.clone()));
            for property in properties {
                let key = match &property.key {
                    PropertyName::Static(name) => PropertyKey::from(name.as_str()),
                    PropertyName::Computed(expr) => {
                        to_property_key(&evaluate_expression(expr, ctx)?)?
                    }
                };
                let value = evaluate_named(&property.value, &key.to_string(), ctx)?;
                create_data_property(&o, key, value)?;
            }
            Ok(JsValue::Object(o))
        }

        ExpressionType::MemberExpression { .. } => evaluate_reference(expr, ctx)?.get_value(),

        ExpressionType::CallExpression {
            callee, arguments, ..
        } => {
            let (func, this) = match &**callee {
                ExpressionType::MemberExpression { .. } | ExpressionType::Identifier(_) => {
                    let reference = evaluate_reference(callee, ctx)?;
                    (reference.get_value()?, reference.get_this_value())
                }
                other => (evaluate_expression(other, ctx)?, JsValue::Undefined),
            };
            let args = evaluate_arguments(arguments, ctx)?;
            if !is_callable(&func) {
                return Err(JErrorType::TypeError(format!(
                    "{} is not a function",
                    describe_expression(callee)
                )));
            }
            call(&func, this, args)
        }

        ExpressionType::NewExpression {
            callee, arguments, ..
        } => {
            let constructor = evaluate_expression(callee, ctx)?;
            let args = evaluate_arguments(arguments, ctx)?;
            match &constructor {
                JsValue::Object(c) if c.borrow().is_constructor() => construct(c, args, None),
                _ => Err(JErrorType::TypeError(format!(
                    "{} is not a constructor",
                    describe_expression(callee)
                ))),
            }
        }

        ExpressionType::ArrowFunctionExpression(data) => {
            Ok(JsValue::Object(create_arrow_function(data, "", ctx)))
        }

        ExpressionType::UnaryExpression {
            operator, argument, ..
        } => evaluate_unary_expression(*operator, argument, ctx),

        ExpressionType::BinaryExpression {
            operator,
            left,
            right,
            ..
        } => {
            let lval = evaluate_expression(left, ctx)?;
            let rval = evaluate_expression(right, ctx)?;
            evaluate_binary_operator(*operator, &lval, &rval)
        }

        ExpressionType::LogicalExpression {
            operator,
            left,
            right,
            ..
        } => {
            let lval = evaluate_expression(left, ctx)?;
            let short_circuit = match operator {
                LogicalOperator::And => !to_boolean(&lval),
                LogicalOperator::Or => to_boolean(&lval),
            };
            if short_circuit {
                Ok(lval)
            } else {
                evaluate_expression(right, ctx)
            }
        }

        ExpressionType::AssignmentExpression { left, right, .. } => {
            let reference = evaluate_reference(left, ctx)?;
            let value = match &**left {
                ExpressionType::Identifier(id) => evaluate_named(right, &id.name, ctx)?,
                _ => evaluate_expression(right, ctx)?,
            };
            reference.put_value(value.clone(), ctx)?;
            Ok(value)
        }
    }
}

/// NamedEvaluation: anonymous arrow functions take the name of what they are bound to.
pub fn evaluate_named(expr: &ExpressionType, name: &str, ctx: &EvalContext) -> ValueResult {
    match expr {
        ExpressionType::ArrowFunctionExpression(data) => {
            Ok(JsValue::Object(create_arrow_function(data, name, ctx)))
        }
        _ => evaluate_expression(expr, ctx),
    }
}

/// Evaluate an identifier or member expression to a reference.
pub fn evaluate_reference(expr: &ExpressionType, ctx: &EvalContext) -> ReferenceResult {
    match expr {
        ExpressionType::Identifier(id) => ctx.resolve_binding(&id.name),
        ExpressionType::MemberExpression {
            object, property, ..
        } => {
            let base = evaluate_expression(object, ctx)?;
            let key = match property {
                MemberProperty::Dot(name) => PropertyKey::from(name.as_str()),
                MemberProperty::Computed(expr) => {
                    to_property_key(&evaluate_expression(expr, ctx)?)?
                }
            };
            Ok(Reference::Property {
                base,
                key,
                strict: ctx.strict,
            })
        }
        _ => Err(JErrorType::SyntaxError(
            "Invalid left-hand side in assignment".to_string(),
        )),
    }
}

fn evaluate_arguments(
    arguments: &[ExpressionType],
    ctx: &EvalContext,
) -> Result<Vec<JsValue>, JErrorType> {
    let mut args = Vec::with_capacity(arguments.len());
    for argument in arguments {
        args.push(evaluate_expression(argument, ctx)?);
    }
    Ok(args)
}

fn evaluate_literal(value: &LiteralType) -> JsValue {
    match value {
        LiteralType::NullLiteral => JsValue::Null,
        LiteralType::BooleanLiteral(b) => JsValue::Boolean(*b),
        LiteralType::StringLiteral(s) => JsValue::String(s.clone()),
        LiteralType::NumberLiteral(NumberLiteralType::IntegerLiteral(i)) => {
            JsValue::Number(JsNumberType::Integer(*i))
        }
        LiteralType::NumberLiteral(NumberLiteralType::FloatLiteral(f)) => {
            JsValue::Number(JsNumberType::from_f64(*f))
        }
    }
}

fn evaluate_unary_expression(
    operator: UnaryOperator,
    argument: &ExpressionType,
    ctx: &EvalContext,
) -> ValueResult {
    match operator {
        UnaryOperator::TypeOf => {
            if let ExpressionType::Identifier(id) = argument {
                let reference = ctx.resolve_binding(&id.name)?;
                if reference.is_unresolvable() {
                    return Ok(JsValue::from(TYPE_STR_UNDEFINED));
                }
                return Ok(JsValue::from(get_type(&reference.get_value()?)));
            }
            Ok(JsValue::from(get_type(&evaluate_expression(argument, ctx)?)))
        }
        UnaryOperator::Delete => match argument {
            ExpressionType::Identifier(_) | ExpressionType::MemberExpression { .. } => {
                evaluate_reference(argument, ctx)?.delete()
            }
            other => {
                evaluate_expression(other, ctx)?;
                Ok(JsValue::Boolean(true))
            }
        },
        UnaryOperator::Void => {
            evaluate_expression(argument, ctx)?;
            Ok(JsValue::Undefined)
        }
        UnaryOperator::LogicalNot => Ok(JsValue::Boolean(!to_boolean(&evaluate_expression(
            argument, ctx,
        )?))),
        UnaryOperator::Minus => {
            let n = to_number(&evaluate_expression(argument, ctx)?)?;
            Ok(JsValue::Number(JsNumberType::from_f64(-n.as_f64())))
        }
        UnaryOperator::Plus => Ok(JsValue::Number(to_number(&evaluate_expression(
            argument, ctx,
        )?)?)),
    }
}

pub fn evaluate_binary_operator(
    operator: BinaryOperator,
    lval: &JsValue,
    rval: &JsValue,
) -> ValueResult {
    Ok(match operator {
        BinaryOperator::StrictlyEqual => JsValue::Boolean(strict_equality_comparison(lval, rval)),
        BinaryOperator::StrictlyUnequal => {
            JsValue::Boolean(!strict_equality_comparison(lval, rval))
        }
        BinaryOperator::LooselyEqual => JsValue::Boolean(abstract_equality_comparison(lval, rval)),
        BinaryOperator::LooselyUnequal => {
            JsValue::Boolean(!abstract_equality_comparison(lval, rval))
        }
        BinaryOperator::LessThan => JsValue::Boolean(compare(lval, rval, |o| o.is_lt())?),
        BinaryOperator::GreaterThan => JsValue::Boolean(compare(lval, rval, |o| o.is_gt())?),
        BinaryOperator::LessThanEqual => JsValue::Boolean(compare(lval, rval, |o| o.is_le())?),
        BinaryOperator::GreaterThanEqual => {
            JsValue::Boolean(compare(lval, rval, |o| o.is_ge())?)
        }
        BinaryOperator::Add => match (lval, rval) {
            (JsValue::String(_) | JsValue::Object(_), _) | (_, JsValue::String(_) | JsValue::Object(_)) => {
                JsValue::String(format!("{}{}", to_string(lval)?, to_string(rval)?))
            }
            _ => JsValue::Number(add_numbers(&to_number(lval)?, &to_number(rval)?)),
        },
        BinaryOperator::Subtract => JsValue::Number(JsNumberType::from_f64(
            to_number(lval)?.as_f64() - to_number(rval)?.as_f64(),
        )),
        BinaryOperator::InstanceOf => match rval {
            JsValue::Object(_) => JsValue::Boolean(ordinary_has_instance(rval, lval)?),
            _ => {
                return Err(JErrorType::TypeError(
                    "Right-hand side of 'instanceof' is not an object".to_string(),
                ))
            }
        },
        BinaryOperator::In => match rval {
            JsValue::Object(o) => JsValue::Boolean(has_property(o, &to_property_key(lval)?)?),
            _ => {
                return Err(JErrorType::TypeError(format!(
                    "Cannot use 'in' operator to search for '{}' in {}",
                    to_string(lval)?,
                    rval
                )))
            }
        },
    })
}

fn add_numbers(a: &JsNumberType, b: &JsNumberType) -> JsNumberType {
    match (a, b) {
        (JsNumberType::Integer(x), JsNumberType::Integer(y)) => match x.checked_add(*y) {
            Some(sum) => JsNumberType::Integer(sum),
            None => JsNumberType::from_f64(*x as f64 + *y as f64),
        },
        _ => JsNumberType::from_f64(a.as_f64() + b.as_f64()),
    }
}

/// Abstract relational comparison: strings compare by code unit, everything else as
/// numbers, and any `NaN` makes the result false.
fn compare(
    lval: &JsValue,
    rval: &JsValue,
    test: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<bool, JErrorType> {
    if let (JsValue::String(a), JsValue::String(b)) = (lval, rval) {
        return Ok(test(a.encode_utf16().cmp(b.encode_utf16())));
    }
    let a = to_number(lval)?.as_f64();
    let b = to_number(rval)?.as_f64();
    Ok(match a.partial_cmp(&b) {
        Some(ordering) => test(ordering),
        None => false,
    })
}

/// Source-like rendering of a callee for error messages.
fn describe_expression(expr: &ExpressionType) -> String {
    match expr {
        ExpressionType::Identifier(id) => id.name.clone(),
        ExpressionType::ThisExpression { .. } => "this".to_string(),
        ExpressionType::MemberExpression {
            object,
            property: MemberProperty::Dot(name),
            ..
        } => format!("{}.{}", describe_expression(object), name),
        ExpressionType::MemberExpression { object, .. } => {
            format!("{}[...]", describe_expression(object))
        }
        _ => "expression".to_string(),
    }
}
