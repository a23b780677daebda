//! Error built-in objects.
//!
//! Provides Error, TypeError, ReferenceError, SyntaxError and RangeError constructors.

use std::rc::Weak;

use crate::runner::ds::error::{ErrorKind, JErrorType};
use crate::runner::ds::error_object::error_create;
use crate::runner::ds::object::{new_object, JsObjectType};
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::operations::object::{get, get_prototype_from_constructor};
use crate::runner::ds::operations::type_conversion::to_string;
use crate::runner::ds::realm::{CodeRealm, JsCodeRealmType, WellKnownIntrinsics};
use crate::runner::ds::value::JsValue;
use crate::runner::std_lib::{arg, install, native_function, BuiltInFn, BuiltInObject};

/// `(kind, constructor, prototype)` for every native error type.
pub fn create_error_constructors(
    realm: &Weak<CodeRealm>,
    function_prototype: &JsObjectType,
    object_prototype: &JsObjectType,
) -> Vec<(ErrorKind, JsObjectType, JsObjectType)> {
    let mut result: Vec<(ErrorKind, JsObjectType, JsObjectType)> = vec![];
    for kind in ErrorKind::ALL.iter().copied() {
        let (proto_parent, ctor_parent) = match result.first() {
            Some((_, base_ctor, base_proto)) => (base_proto.clone(), base_ctor.clone()),
            None => (object_prototype.clone(), function_prototype.clone()),
        };
        let prototype = new_object(Some(proto_parent));
        let constructor = native_function(
            realm,
            &ctor_parent,
            kind.name(),
            1,
            true,
            constructor_behaviour(kind),
        );
        install(
            &constructor,
            PropertyKey::from("prototype"),
            PropertyDescriptor::new_data(JsValue::Object(prototype.clone()), false, false, false),
        );
        let builder = BuiltInObject::new(realm, function_prototype, prototype.clone())
            .add_value("constructor", JsValue::Object(constructor.clone()))
            .add_value("name", JsValue::from(kind.name()))
            .add_value("message", JsValue::from(""));
        if kind == ErrorKind::Error {
            builder.add_method("toString", 0, error_to_string).build();
        } else {
            builder.build();
        }
        result.push((kind, constructor, prototype));
    }
    result
}

fn constructor_behaviour(kind: ErrorKind) -> BuiltInFn {
    match kind {
        ErrorKind::Error => error_constructor,
        ErrorKind::TypeError => type_error_constructor,
        ErrorKind::ReferenceError => reference_error_constructor,
        ErrorKind::RangeError => range_error_constructor,
        ErrorKind::SyntaxError => syntax_error_constructor,
    }
}

/// Allocates an error of `kind` in `realm`, using `newTarget.prototype` when present.
pub fn construct_error(
    realm: &CodeRealm,
    kind: ErrorKind,
    args: Vec<JsValue>,
    new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let default_proto = realm.get_intrinsics_value(WellKnownIntrinsics::error_prototype(kind))?;
    let proto = match &new_target {
        Some(nt) => get_prototype_from_constructor(nt, default_proto)?,
        None => default_proto,
    };
    let message = match arg(&args, 0) {
        JsValue::Undefined => None,
        v => Some(to_string(&v)?),
    };
    Ok(JsValue::Object(error_create(kind, message, proto)))
}

/// Error constructor.
fn error_constructor(
    realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    construct_error(realm, ErrorKind::Error, args, new_target)
}

/// TypeError constructor.
fn type_error_constructor(
    realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    construct_error(realm, ErrorKind::TypeError, args, new_target)
}

/// ReferenceError constructor.
fn reference_error_constructor(
    realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    construct_error(realm, ErrorKind::ReferenceError, args, new_target)
}

/// RangeError constructor.
fn range_error_constructor(
    realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    construct_error(realm, ErrorKind::RangeError, args, new_target)
}

/// SyntaxError constructor.
fn syntax_error_constructor(
    realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    construct_error(realm, ErrorKind::SyntaxError, args, new_target)
}

/// Error.prototype.toString
fn error_to_string(
    _realm: &JsCodeRealmType,
    this: JsValue,
    _args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let o = match &this {
        JsValue::Object(o) => o.clone(),
        _ => {
            return Err(JErrorType::TypeError(
                "Error.prototype.toString called on non-object".to_string(),
            ))
        }
    };
    let name = match get(&o, &PropertyKey::from("name"), &this)? {
        JsValue::Undefined => "Error".to_string(),
        v => to_string(&v)?,
    };
    let message = match get(&o, &PropertyKey::from("message"), &this)? {
        JsValue::Undefined => String::new(),
        v => to_string(&v)?,
    };
    Ok(JsValue::String(match (name.is_empty(), message.is_empty()) {
        (_, true) => name,
        (true, false) => message,
        (false, false) => format!("{}: {}", name, message),
    }))
}
