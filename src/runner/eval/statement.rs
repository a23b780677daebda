//! Statement execution.

use crate::parser::ast::{ProgramData, StatementType, VariableDeclarationKind};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object_property::{
    PropertyDescriptor, PropertyDescriptorSetter, PropertyKey,
};
use crate::runner::ds::operations::object::{define_property_or_throw, get_own_property};
use crate::runner::ds::value::JsValue;

use super::expression::{evaluate_expression, evaluate_named};
use super::types::{Completion, EvalContext, EvalResult};

/// GlobalDeclarationInstantiation for the declarations of one script.
///
/// `var` names become non-configurable properties of the global object; `let` and `const`
/// names become uninitialized bindings of the realm's global scope. Any clash between the
/// two, or with an earlier script's lexical names, is a SyntaxError and nothing runs.
pub fn instantiate_declarations(program: &ProgramData, ctx: &EvalContext) -> Result<(), JErrorType> {
    let global = ctx.realm.global_object();
    let mut lexical: Vec<(&str, bool)> = vec![];
    let mut vars: Vec<&str> = vec![];
    for stmt in &program.body {
        if let StatementType::VariableDeclaration {
            kind, declarations, ..
        } = stmt
        {
            for declaration in declarations {
                let name = declaration.id.name.as_str();
                match kind {
                    VariableDeclarationKind::Var => vars.push(name),
                    VariableDeclarationKind::Let | VariableDeclarationKind::Const => {
                        if *kind == VariableDeclarationKind::Const && declaration.init.is_none() {
                            return Err(JErrorType::SyntaxError(
                                "Missing initializer in const declaration".to_string(),
                            ));
                        }
                        if lexical.iter().any(|(n, _)| *n == name) {
                            return Err(already_declared(name));
                        }
                        lexical.push((name, *kind == VariableDeclarationKind::Let));
                    }
                }
            }
        }
    }
    for (name, _) in &lexical {
        if ctx.scope.has_own_binding(name) || vars.contains(name) {
            return Err(already_declared(name));
        }
        if let Some(existing) = get_own_property(&global, &PropertyKey::from(*name))? {
            if !existing.is_configurable() {
                return Err(already_declared(name));
            }
        }
    }
    for name in &vars {
        if ctx.scope.has_own_binding(name) {
            return Err(already_declared(name));
        }
    }
    for name in vars {
        let key = PropertyKey::from(name);
        if get_own_property(&global, &key)?.is_none() {
            define_property_or_throw(
                &global,
                key,
                PropertyDescriptorSetter::new_from_property_descriptor(PropertyDescriptor::new_data(
                    JsValue::Undefined,
                    true,
                    true,
                    false,
                )),
            )?;
        }
    }
    for (name, mutable) in lexical {
        ctx.scope.create_binding(name, mutable);
    }
    Ok(())
}

fn already_declared(name: &str) -> JErrorType {
    JErrorType::SyntaxError(format!("Identifier '{}' has already been declared", name))
}

/// Execute a statement and return its completion.
pub fn execute_statement(stmt: &StatementType, ctx: &EvalContext) -> EvalResult {
    match stmt {
        StatementType::EmptyStatement { .. } => Ok(Completion::normal()),

        StatementType::ExpressionStatement { expression, .. } => {
            let value = evaluate_expression(expression, ctx)?;
            Ok(Completion::normal_with_value(value))
        }

        StatementType::ThrowStatement { argument, .. } => {
            Err(JErrorType::Thrown(evaluate_expression(argument, ctx)?))
        }

        StatementType::VariableDeclaration {
            kind, declarations, ..
        } => {
            for declaration in declarations {
                let name = declaration.id.name.as_str();
                let value = match &declaration.init {
                    Some(init) => evaluate_named(init, name, ctx)?,
                    None if *kind == VariableDeclarationKind::Var => continue,
                    None => JsValue::Undefined,
                };
                match kind {
                    VariableDeclarationKind::Var => {
                        ctx.resolve_binding(name)?.put_value(value, ctx)?;
                    }
                    VariableDeclarationKind::Let | VariableDeclarationKind::Const => {
                        ctx.scope.initialize_binding(name, value);
                    }
                }
            }
            Ok(Completion::normal())
        }
    }
}

/// Runs every statement; the result is the value of the last statement that produced one.
pub fn execute_program(program: &ProgramData, ctx: &EvalContext) -> EvalResult {
    let mut completion = Completion::normal();
    for stmt in &program.body {
        completion = execute_statement(stmt, ctx)?.update_empty(completion.value);
    }
    Ok(completion)
}
