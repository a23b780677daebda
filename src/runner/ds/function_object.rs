use std::rc::{Rc, Weak};

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{JsObject, JsObjectType, ObjectBase, ObjectType};
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::realm::CodeRealm;
use crate::runner::ds::value::{JsNumberType, JsValue};
use std::cell::RefCell;

/// The `[[Call]]`/`[[Construct]]` behaviour of a function: `(this, arguments, newTarget)`.
/// `newTarget` is `None` for a call and `Some` for a construct.
pub type NativeFn =
    Rc<dyn Fn(JsValue, Vec<JsValue>, Option<JsObjectType>) -> Result<JsValue, JErrorType>>;

pub struct FunctionObject {
    base: ObjectBase,
    behaviour: NativeFn,
    is_constructor: bool,
    realm: Weak<CodeRealm>,
}
impl FunctionObject {
    pub fn new(
        behaviour: NativeFn,
        is_constructor: bool,
        proto: Option<JsObjectType>,
        realm: Weak<CodeRealm>,
    ) -> Self {
        FunctionObject {
            base: ObjectBase::new(proto),
            behaviour,
            is_constructor,
            realm,
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.is_constructor
    }

    /// A handle on the behaviour so the caller can release its borrow of the function
    /// before running it.
    pub fn behaviour(&self) -> NativeFn {
        self.behaviour.clone()
    }

    pub fn get_realm(&self) -> Option<Rc<CodeRealm>> {
        self.realm.upgrade()
    }
}
impl JsObject for FunctionObject {
    fn get_object_base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn get_object_base(&self) -> &ObjectBase {
        &self.base
    }
}

/// Allocates a function with the own `name` and `length` properties every built-in has.
pub fn new_native_function(
    name: &str,
    length: u32,
    is_constructor: bool,
    proto: Option<JsObjectType>,
    realm: Weak<CodeRealm>,
    behaviour: NativeFn,
) -> JsObjectType {
    let mut f = FunctionObject::new(behaviour, is_constructor, proto, realm);
    f.base.insert_property(
        PropertyKey::from("length"),
        PropertyDescriptor::new_data(
            JsValue::Number(JsNumberType::Integer(length as i64)),
            false,
            false,
            true,
        ),
    );
    f.base.insert_property(
        PropertyKey::from("name"),
        PropertyDescriptor::new_data(JsValue::from(name), false, false, true),
    );
    Rc::new(RefCell::new(ObjectType::Function(f)))
}

/// The realm a callable belongs to, looking through nothing: proxies have no realm slot.
pub fn get_function_realm(f: &JsObjectType) -> Option<Rc<CodeRealm>> {
    match &*f.borrow() {
        ObjectType::Function(func) => func.get_realm(),
        _ => None,
    }
}
