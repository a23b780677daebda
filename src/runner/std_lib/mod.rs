//! Standard library built-in objects.
//!
//! Builds the intrinsics of a realm (`Object`, `Array`, `Reflect`, the error
//! constructors and `eval`) and the global object exposing them.

pub mod array;
pub mod error;
pub mod object;
pub mod reflect;

use std::rc::{Rc, Weak};

use crate::runner::ds::array_object::array_create;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::{new_native_function, NativeFn};
use crate::runner::ds::object::{new_object, JsObjectType, ObjectBase, ObjectType};
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::realm::{CodeRealm, JsCodeRealmType, RealmIntrinsics};
use crate::runner::ds::value::{JsNumberType, JsValue};
use std::cell::RefCell;

/// A built-in's behaviour. The realm is the one the function was created in.
pub type BuiltInFn = fn(
    &JsCodeRealmType,
    JsValue,
    Vec<JsValue>,
    Option<JsObjectType>,
) -> Result<JsValue, JErrorType>;

/// Wraps `f` as a function object of the realm behind `realm`.
pub fn native_function(
    realm: &Weak<CodeRealm>,
    function_prototype: &JsObjectType,
    name: &str,
    length: u32,
    is_constructor: bool,
    f: BuiltInFn,
) -> JsObjectType {
    let weak = realm.clone();
    let behaviour: NativeFn = Rc::new(move |this, args, new_target| match weak.upgrade() {
        Some(realm) => f(&realm, this, args, new_target),
        None => Err(JErrorType::TypeError(
            "the realm of this function has been discarded".to_string(),
        )),
    });
    new_native_function(
        name,
        length,
        is_constructor,
        Some(function_prototype.clone()),
        realm.clone(),
        behaviour,
    )
}

/// Adds a property to a freshly built intrinsic, bypassing `[[DefineOwnProperty]]`.
pub(crate) fn install(o: &JsObjectType, key: PropertyKey, desc: PropertyDescriptor) {
    if let Some(js) = o.borrow_mut().as_js_object_mut() {
        js.get_object_base_mut().insert_property(key, desc);
    }
}

/// Builder for the methods and values of one built-in object.
pub struct BuiltInObject<'a> {
    realm: &'a Weak<CodeRealm>,
    function_prototype: &'a JsObjectType,
    object: JsObjectType,
}
impl<'a> BuiltInObject<'a> {
    pub fn new(
        realm: &'a Weak<CodeRealm>,
        function_prototype: &'a JsObjectType,
        object: JsObjectType,
    ) -> Self {
        BuiltInObject {
            realm,
            function_prototype,
            object,
        }
    }

    pub fn add_method(self, name: &str, length: u32, f: BuiltInFn) -> Self {
        let method = native_function(self.realm, self.function_prototype, name, length, false, f);
        self.add_value(name, JsValue::Object(method))
    }

    /// Writable, configurable and non-enumerable, like every built-in property.
    pub fn add_value(self, name: &str, value: JsValue) -> Self {
        install(
            &self.object,
            PropertyKey::from(name),
            PropertyDescriptor::new_data(value, true, false, true),
        );
        self
    }

    pub fn build(self) -> JsObjectType {
        self.object
    }
}

pub(crate) fn arg(args: &[JsValue], idx: usize) -> JsValue {
    args.get(idx).cloned().unwrap_or(JsValue::Undefined)
}

pub(crate) fn arg_object(args: &[JsValue], idx: usize, api: &str) -> Result<JsObjectType, JErrorType> {
    match args.get(idx) {
        Some(JsValue::Object(o)) => Ok(o.clone()),
        _ => Err(JErrorType::TypeError(format!(
            "{} called on non-object",
            api
        ))),
    }
}

/// Creates every intrinsic of a realm that is still being allocated.
pub fn create_intrinsics(realm: &Weak<CodeRealm>) -> RealmIntrinsics {
    let object_prototype = new_object(None);
    let function_prototype = new_object(Some(object_prototype.clone()));
    let array_prototype = array_create(0, Some(object_prototype.clone()));

    let object = object::create_object_constructor(realm, &function_prototype, &object_prototype);
    let array = array::create_array_constructor(realm, &function_prototype, &array_prototype);
    let reflect = reflect::create_reflect(realm, &function_prototype, &object_prototype);
    let errors = error::create_error_constructors(realm, &function_prototype, &object_prototype);
    let eval = native_function(realm, &function_prototype, "eval", 1, false, global_eval);

    RealmIntrinsics {
        object,
        object_prototype,
        function_prototype,
        array,
        array_prototype,
        reflect,
        eval,
        errors,
    }
}

/// The global object: value properties, the constructors and `globalThis`.
pub fn create_global_object(intrinsics: &RealmIntrinsics) -> JsObjectType {
    let mut base = ObjectBase::new(Some(intrinsics.object_prototype.clone()));
    let constant = |value| PropertyDescriptor::new_data(value, false, false, false);
    base.insert_property(PropertyKey::from("undefined"), constant(JsValue::Undefined));
    base.insert_property(
        PropertyKey::from("NaN"),
        constant(JsValue::Number(JsNumberType::NaN)),
    );
    base.insert_property(
        PropertyKey::from("Infinity"),
        constant(JsValue::Number(JsNumberType::PositiveInfinity)),
    );
    let binding = |o: &JsObjectType| PropertyDescriptor::new_data(JsValue::Object(o.clone()), true, false, true);
    base.insert_property(PropertyKey::from("Object"), binding(&intrinsics.object));
    base.insert_property(PropertyKey::from("Array"), binding(&intrinsics.array));
    base.insert_property(PropertyKey::from("Reflect"), binding(&intrinsics.reflect));
    base.insert_property(PropertyKey::from("eval"), binding(&intrinsics.eval));
    for (kind, constructor, _) in &intrinsics.errors {
        base.insert_property(PropertyKey::from(kind.name()), binding(constructor));
    }
    let global = Rc::new(RefCell::new(ObjectType::Ordinary(base)));
    install(
        &global,
        PropertyKey::from("globalThis"),
        PropertyDescriptor::new_data(JsValue::Object(global.clone()), true, false, true),
    );
    global
}

/// Indirect `eval`: strings run as a script of the function's realm, anything else is
/// returned unchanged.
fn global_eval(
    realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    match arg(&args, 0) {
        JsValue::String(source) => realm.evaluate(&source),
        other => Ok(other),
    }
}
