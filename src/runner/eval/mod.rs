//! Evaluation module for executing JavaScript AST.
//!
//! Scripts run against a realm's global object and global scope; arrow functions close
//! over the scope they were created in.

pub mod expression;
pub mod function;
pub mod statement;
pub mod types;

#[cfg(test)]
mod unit_tests;

use tracing::trace;

use crate::parser::JsParser;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::realm::JsCodeRealmType;
use crate::runner::ds::value::JsValue;

pub use types::{Completion, EvalContext, Reference, Scope, ScopeRef};

/// ScriptEvaluation. `force_strict` runs the script as if it began with `'use strict'`.
pub fn evaluate_script(
    realm: &JsCodeRealmType,
    source: &str,
    force_strict: bool,
) -> Result<JsValue, JErrorType> {
    let program = JsParser::parse_to_ast_from_str(source)?;
    let strict = force_strict || program.strict;
    trace!(realm = %realm.id(), strict, statements = program.body.len(), "evaluating script");
    let ctx = EvalContext {
        realm: realm.clone(),
        scope: realm.global_scope(),
        this: JsValue::Object(realm.global_object()),
        strict,
    };
    statement::instantiate_declarations(&program, &ctx)?;
    Ok(statement::execute_program(&program, &ctx)?.get_value())
}
