//! Core types for the evaluation engine.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object_property::PropertyKey;
use crate::runner::ds::operations::object::{delete, get_v, has_property, set};
use crate::runner::ds::operations::type_conversion::get_type;
use crate::runner::ds::realm::JsCodeRealmType;
use crate::runner::ds::value::JsValue;

/// Completion record of a statement. Abrupt completions travel as `Err`.
pub struct Completion {
    /// The value, if any.
    pub value: Option<JsValue>,
}

impl Completion {
    /// Create a normal completion with no value.
    pub fn normal() -> Self {
        Completion { value: None }
    }

    /// Create a normal completion with a value.
    pub fn normal_with_value(value: JsValue) -> Self {
        Completion { value: Some(value) }
    }

    /// Get the value, or undefined if none.
    pub fn get_value(&self) -> JsValue {
        self.value.clone().unwrap_or(JsValue::Undefined)
    }

    /// Keeps `previous` when this completion carries no value.
    pub fn update_empty(self, previous: Option<JsValue>) -> Self {
        match self.value {
            Some(_) => self,
            None => Completion { value: previous },
        }
    }
}

struct Binding {
    value: JsValue,
    mutable: bool,
    initialized: bool,
}

/// A declarative environment: `let`/`const` of a script, or the parameters of an arrow
/// function call.
pub struct Scope {
    bindings: RefCell<HashMap<String, Binding>>,
    parent: Option<ScopeRef>,
}
pub type ScopeRef = Rc<Scope>;

impl Scope {
    pub fn new_global() -> ScopeRef {
        Rc::new(Scope {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    pub fn new_child(parent: &ScopeRef) -> ScopeRef {
        Rc::new(Scope {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
        })
    }

    pub fn has_own_binding(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
    }

    /// Creates an uninitialized binding; reads before initialization throw.
    pub fn create_binding(&self, name: &str, mutable: bool) {
        self.bindings.borrow_mut().insert(
            name.to_string(),
            Binding {
                value: JsValue::Undefined,
                mutable,
                initialized: false,
            },
        );
    }

    pub fn initialize_binding(&self, name: &str, value: JsValue) {
        if let Some(binding) = self.bindings.borrow_mut().get_mut(name) {
            binding.value = value;
            binding.initialized = true;
        }
    }

    /// Creates and initializes a mutable binding in one step.
    pub fn declare(&self, name: &str, value: JsValue) {
        self.bindings.borrow_mut().insert(
            name.to_string(),
            Binding {
                value,
                mutable: true,
                initialized: true,
            },
        );
    }

    /// The innermost scope on the chain declaring `name`.
    pub fn resolve(self: &Rc<Self>, name: &str) -> Option<ScopeRef> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            if scope.has_own_binding(name) {
                return Some(scope);
            }
            current = scope.parent.clone();
        }
        None
    }

    pub fn get_binding_value(&self, name: &str) -> ValueResult {
        match self.bindings.borrow().get(name) {
            Some(b) if b.initialized => Ok(b.value.clone()),
            Some(_) => Err(uninitialized_error(name)),
            None => Err(JErrorType::ReferenceError(format!("{} is not defined", name))),
        }
    }

    pub fn set_mutable_binding(&self, name: &str, value: JsValue) -> Result<(), JErrorType> {
        match self.bindings.borrow_mut().get_mut(name) {
            Some(b) if !b.initialized => Err(uninitialized_error(name)),
            Some(b) if !b.mutable => Err(JErrorType::TypeError(
                "Assignment to constant variable".to_string(),
            )),
            Some(b) => {
                b.value = value;
                Ok(())
            }
            None => Err(JErrorType::ReferenceError(format!("{} is not defined", name))),
        }
    }
}

fn uninitialized_error(name: &str) -> JErrorType {
    JErrorType::ReferenceError(format!("Cannot access '{}' before initialization", name))
}

/// Everything an expression can observe of where it runs.
pub struct EvalContext {
    pub realm: JsCodeRealmType,
    pub scope: ScopeRef,
    pub this: JsValue,
    pub strict: bool,
}

impl EvalContext {
    /// A context for an arrow function body: a fresh scope, the rest inherited.
    pub fn with_scope(&self, scope: ScopeRef) -> Self {
        EvalContext {
            realm: self.realm.clone(),
            scope,
            this: self.this.clone(),
            strict: self.strict,
        }
    }

    /// IdentifierResolution: declarative scopes first, then the global object.
    pub fn resolve_binding(&self, name: &str) -> ReferenceResult {
        if let Some(scope) = self.scope.resolve(name) {
            return Ok(Reference::Binding {
                scope,
                name: name.to_string(),
                strict: self.strict,
            });
        }
        let global = self.realm.global_object();
        let key = PropertyKey::from(name);
        if has_property(&global, &key)? {
            Ok(Reference::Property {
                base: JsValue::Object(global),
                key,
                strict: self.strict,
            })
        } else {
            Ok(Reference::Unresolvable {
                name: name.to_string(),
                strict: self.strict,
            })
        }
    }
}

/// Reference type.
/// Used for identifier resolution and property access.
pub enum Reference {
    Property {
        base: JsValue,
        key: PropertyKey,
        strict: bool,
    },
    Binding {
        scope: ScopeRef,
        name: String,
        strict: bool,
    },
    Unresolvable {
        name: String,
        strict: bool,
    },
}

impl Reference {
    pub fn is_unresolvable(&self) -> bool {
        matches!(self, Reference::Unresolvable { .. })
    }

    /// The `this` value a call through this reference receives.
    pub fn get_this_value(&self) -> JsValue {
        match self {
            Reference::Property { base, .. } => base.clone(),
            _ => JsValue::Undefined,
        }
    }

    /// GetValue
    pub fn get_value(&self) -> ValueResult {
        match self {
            Reference::Property { base, key, .. } => get_v(base, key),
            Reference::Binding { scope, name, .. } => scope.get_binding_value(name),
            Reference::Unresolvable { name, .. } => {
                Err(JErrorType::ReferenceError(format!("{} is not defined", name)))
            }
        }
    }

    /// PutValue. A rejected write is silent in sloppy code and a TypeError in strict code.
    pub fn put_value(&self, value: JsValue, ctx: &EvalContext) -> Result<(), JErrorType> {
        match self {
            Reference::Property { base, key, strict } => match base {
                JsValue::Object(o) => {
                    if !set(o, key.clone(), value, base)? && *strict {
                        return Err(JErrorType::TypeError(format!(
                            "Cannot assign to read only property '{}' of object",
                            key
                        )));
                    }
                    Ok(())
                }
                JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
                    "Cannot set property '{}' of {}",
                    key, base
                ))),
                primitive => {
                    if *strict {
                        Err(JErrorType::TypeError(format!(
                            "Cannot create property '{}' on {} {}",
                            key,
                            get_type(primitive),
                            primitive
                        )))
                    } else {
                        Ok(())
                    }
                }
            },
            Reference::Binding { scope, name, .. } => scope.set_mutable_binding(name, value),
            Reference::Unresolvable { name, strict } => {
                if *strict {
                    return Err(JErrorType::ReferenceError(format!("{} is not defined", name)));
                }
                let global = ctx.realm.global_object();
                let receiver = JsValue::Object(global.clone());
                set(&global, PropertyKey::from(name.as_str()), value, &receiver)?;
                Ok(())
            }
        }
    }

    /// The `delete` operator applied to this reference.
    pub fn delete(&self) -> ValueResult {
        match self {
            Reference::Property { base, key, strict } => match base {
                JsValue::Object(o) => {
                    let deleted = delete(o, key)?;
                    if !deleted && *strict {
                        return Err(JErrorType::TypeError(format!(
                            "Cannot delete property '{}' of {}",
                            key, base
                        )));
                    }
                    Ok(JsValue::Boolean(deleted))
                }
                JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
                    "Cannot convert {} to object",
                    base
                ))),
                _ => Ok(JsValue::Boolean(true)),
            },
            Reference::Binding { .. } => Ok(JsValue::Boolean(false)),
            Reference::Unresolvable { .. } => Ok(JsValue::Boolean(true)),
        }
    }
}

/// Result type for evaluation operations.
pub type EvalResult = Result<Completion, JErrorType>;

/// Result type for value-returning operations.
pub type ValueResult = Result<JsValue, JErrorType>;

/// Result type for reference-returning operations.
pub type ReferenceResult = Result<Reference, JErrorType>;
