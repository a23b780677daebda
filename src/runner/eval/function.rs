//! Arrow function objects.

use std::rc::{Rc, Weak};

use crate::parser::ast::FunctionData;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::{new_native_function, NativeFn};
use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::realm::CodeRealm;
use crate::runner::ds::value::JsValue;

use super::expression::evaluate_expression;
use super::types::{EvalContext, Scope, ScopeRef};

/// Creates the function object for an arrow function closing over `ctx`.
///
/// Arrow functions have a lexical `this`, so the `this` passed to `[[Call]]` is ignored.
/// They have no `[[Construct]]`.
pub fn create_arrow_function(data: &Rc<FunctionData>, name: &str, ctx: &EvalContext) -> JsObjectType {
    let realm: Weak<CodeRealm> = Rc::downgrade(&ctx.realm);
    let closure = Closure {
        data: data.clone(),
        scope: ctx.scope.clone(),
        this: ctx.this.clone(),
        strict: ctx.strict,
        realm: realm.clone(),
    };
    let behaviour: NativeFn = Rc::new(move |_this, args, _new_target| closure.call(args));
    new_native_function(
        name,
        data.params.len() as u32,
        false,
        Some(ctx.realm.intrinsics().function_prototype.clone()),
        realm,
        behaviour,
    )
}

struct Closure {
    data: Rc<FunctionData>,
    scope: ScopeRef,
    this: JsValue,
    strict: bool,
    realm: Weak<CodeRealm>,
}

impl Closure {
    fn call(&self, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
        let realm = self.realm.upgrade().ok_or_else(|| {
            JErrorType::TypeError("the realm of this function has been discarded".to_string())
        })?;
        let scope = Scope::new_child(&self.scope);
        let mut args = args.into_iter();
        for param in &self.data.params {
            scope.declare(&param.name, args.next().unwrap_or(JsValue::Undefined));
        }
        let ctx = EvalContext {
            realm,
            scope,
            this: self.this.clone(),
            strict: self.strict,
        };
        evaluate_expression(&self.data.body, &ctx)
    }
}
