use crate::runner::ds::error::{ErrorKind, JErrorType};
use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::value::JsValue;
use crate::runner::eval::{evaluate_script, Scope, ScopeRef};
use crate::runner::std_lib::{create_intrinsics, create_global_object};
use std::cell::Cell;
use std::rc::{Rc, Weak};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownIntrinsics {
    Array,
    ArrayPrototype,
    Error,
    ErrorPrototype,
    Eval,
    FunctionPrototype,
    Object,
    ObjectPrototype,
    RangeError,
    RangeErrorPrototype,
    ReferenceError,
    ReferenceErrorPrototype,
    Reflect,
    SyntaxError,
    SyntaxErrorPrototype,
    TypeError,
    TypeErrorPrototype,
}
impl WellKnownIntrinsics {
    /// Intrinsics both realms of an environment share by identity instead of proxying.
    pub const LINKED: [WellKnownIntrinsics; 16] = [
        WellKnownIntrinsics::ObjectPrototype,
        WellKnownIntrinsics::FunctionPrototype,
        WellKnownIntrinsics::ArrayPrototype,
        WellKnownIntrinsics::Object,
        WellKnownIntrinsics::Array,
        WellKnownIntrinsics::Reflect,
        WellKnownIntrinsics::Error,
        WellKnownIntrinsics::ErrorPrototype,
        WellKnownIntrinsics::TypeError,
        WellKnownIntrinsics::TypeErrorPrototype,
        WellKnownIntrinsics::ReferenceError,
        WellKnownIntrinsics::ReferenceErrorPrototype,
        WellKnownIntrinsics::RangeError,
        WellKnownIntrinsics::RangeErrorPrototype,
        WellKnownIntrinsics::SyntaxError,
        WellKnownIntrinsics::SyntaxErrorPrototype,
    ];

    pub fn error_constructor(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Error => WellKnownIntrinsics::Error,
            ErrorKind::TypeError => WellKnownIntrinsics::TypeError,
            ErrorKind::ReferenceError => WellKnownIntrinsics::ReferenceError,
            ErrorKind::RangeError => WellKnownIntrinsics::RangeError,
            ErrorKind::SyntaxError => WellKnownIntrinsics::SyntaxError,
        }
    }

    pub fn error_prototype(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Error => WellKnownIntrinsics::ErrorPrototype,
            ErrorKind::TypeError => WellKnownIntrinsics::TypeErrorPrototype,
            ErrorKind::ReferenceError => WellKnownIntrinsics::ReferenceErrorPrototype,
            ErrorKind::RangeError => WellKnownIntrinsics::RangeErrorPrototype,
            ErrorKind::SyntaxError => WellKnownIntrinsics::SyntaxErrorPrototype,
        }
    }
}

/// The realm's intrinsic objects, created together before any script runs.
pub struct RealmIntrinsics {
    pub object: JsObjectType,
    pub object_prototype: JsObjectType,
    pub function_prototype: JsObjectType,
    pub array: JsObjectType,
    pub array_prototype: JsObjectType,
    pub reflect: JsObjectType,
    pub eval: JsObjectType,
    pub errors: Vec<(ErrorKind, JsObjectType, JsObjectType)>,
}
impl RealmIntrinsics {
    fn error_pair(&self, kind: ErrorKind) -> Option<&(ErrorKind, JsObjectType, JsObjectType)> {
        self.errors.iter().find(|(k, _, _)| *k == kind)
    }

    pub fn get(&self, int_name: WellKnownIntrinsics) -> Option<JsObjectType> {
        Some(match int_name {
            WellKnownIntrinsics::Array => self.array.clone(),
            WellKnownIntrinsics::ArrayPrototype => self.array_prototype.clone(),
            WellKnownIntrinsics::Eval => self.eval.clone(),
            WellKnownIntrinsics::FunctionPrototype => self.function_prototype.clone(),
            WellKnownIntrinsics::Object => self.object.clone(),
            WellKnownIntrinsics::ObjectPrototype => self.object_prototype.clone(),
            WellKnownIntrinsics::Reflect => self.reflect.clone(),
            WellKnownIntrinsics::Error
            | WellKnownIntrinsics::TypeError
            | WellKnownIntrinsics::ReferenceError
            | WellKnownIntrinsics::RangeError
            | WellKnownIntrinsics::SyntaxError => {
                let kind = error_kind_of(int_name)?;
                self.error_pair(kind)?.1.clone()
            }
            WellKnownIntrinsics::ErrorPrototype
            | WellKnownIntrinsics::TypeErrorPrototype
            | WellKnownIntrinsics::ReferenceErrorPrototype
            | WellKnownIntrinsics::RangeErrorPrototype
            | WellKnownIntrinsics::SyntaxErrorPrototype => {
                let kind = error_kind_of(int_name)?;
                self.error_pair(kind)?.2.clone()
            }
        })
    }
}

fn error_kind_of(int_name: WellKnownIntrinsics) -> Option<ErrorKind> {
    ErrorKind::ALL.iter().copied().find(|k| {
        WellKnownIntrinsics::error_constructor(*k) == int_name
            || WellKnownIntrinsics::error_prototype(*k) == int_name
    })
}

pub type JsCodeRealmType = Rc<CodeRealm>;

/// A realm: intrinsics, a global object, and an identity that changes on navigation.
pub struct CodeRealm {
    id: Uuid,
    generation: Cell<u64>,
    intrinsics: RealmIntrinsics,
    global_this: JsObjectType,
    global_scope: ScopeRef,
}
impl CodeRealm {
    pub fn new() -> JsCodeRealmType {
        Rc::new_cyclic(|realm: &Weak<CodeRealm>| {
            let intrinsics = create_intrinsics(realm);
            let global_this = create_global_object(&intrinsics);
            CodeRealm {
                id: Uuid::new_v4(),
                generation: Cell::new(0),
                intrinsics,
                global_this,
                global_scope: Scope::new_global(),
            }
        })
    }

    pub fn id(&self) -> String {
        self.id.to_hyphenated().to_string()
    }

    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Marks the realm as navigated: anything keyed on its identity must be re-derived.
    pub fn navigate(&self) {
        self.generation.set(self.generation.get() + 1);
    }

    pub fn global_object(&self) -> JsObjectType {
        self.global_this.clone()
    }

    /// Declarative bindings (`let`/`const`) shared by every script of the realm.
    pub fn global_scope(&self) -> ScopeRef {
        self.global_scope.clone()
    }

    pub fn intrinsics(&self) -> &RealmIntrinsics {
        &self.intrinsics
    }

    pub fn get_intrinsics_value(&self, int_name: WellKnownIntrinsics) -> Result<JsObjectType, JErrorType> {
        self.intrinsics.get(int_name).ok_or_else(|| {
            JErrorType::Error(format!("intrinsic {:?} is missing", int_name))
        })
    }

    /// Runs `source` as a script against this realm's global object.
    pub fn evaluate(self: &Rc<Self>, source: &str) -> Result<JsValue, JErrorType> {
        evaluate_script(self, source, false)
    }

    /// Like `evaluate`, with the script forced into strict mode.
    pub fn evaluate_strict(self: &Rc<Self>, source: &str) -> Result<JsValue, JErrorType> {
        evaluate_script(self, source, true)
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_navigate_bumps_generation() {
        let realm = CodeRealm::new();
        assert_eq!(realm.generation(), 0);
        realm.navigate();
        assert_eq!(realm.generation(), 1);
    }

    #[test]
    fn test_every_linked_intrinsic_exists() {
        let realm = CodeRealm::new();
        for i in WellKnownIntrinsics::LINKED.iter() {
            assert!(realm.get_intrinsics_value(*i).is_ok(), "{:?}", i);
        }
    }
}
