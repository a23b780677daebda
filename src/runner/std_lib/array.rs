//! Array built-in.
//!
//! Provides the Array constructor, `Array.isArray` and the prototype methods the
//! membrane tests lean on.

use std::rc::Weak;

use crate::runner::ds::array_object::{array_create, create_array_from_list};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{JsObjectType, ObjectType};
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::operations::object::{
    get, get_prototype_from_constructor, set,
};
use crate::runner::ds::operations::type_conversion::to_number;
use crate::runner::ds::realm::{CodeRealm, JsCodeRealmType, WellKnownIntrinsics};
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::std_lib::{arg, install, native_function, BuiltInObject};

pub fn create_array_constructor(
    realm: &Weak<CodeRealm>,
    function_prototype: &JsObjectType,
    array_prototype: &JsObjectType,
) -> JsObjectType {
    let constructor = native_function(realm, function_prototype, "Array", 1, true, array_constructor);
    install(
        &constructor,
        PropertyKey::from("prototype"),
        PropertyDescriptor::new_data(JsValue::Object(array_prototype.clone()), false, false, false),
    );
    BuiltInObject::new(realm, function_prototype, array_prototype.clone())
        .add_value("constructor", JsValue::Object(constructor.clone()))
        .add_method("push", 1, array_push)
        .build();
    BuiltInObject::new(realm, function_prototype, constructor)
        .add_method("isArray", 1, array_is_array)
        .build()
}

/// IsArray, looking through proxies to their target.
pub fn is_array(v: &JsValue) -> Result<bool, JErrorType> {
    let mut current = match v {
        JsValue::Object(o) => o.clone(),
        _ => return Ok(false),
    };
    loop {
        let next = match &*current.borrow() {
            ObjectType::Array(_) => return Ok(true),
            ObjectType::Proxy(p) => p.parts()?.0,
            _ => return Ok(false),
        };
        current = next;
    }
}

/// Array constructor.
fn array_constructor(
    realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let default_proto = realm.get_intrinsics_value(WellKnownIntrinsics::ArrayPrototype)?;
    let proto = match &new_target {
        Some(nt) => get_prototype_from_constructor(nt, default_proto)?,
        None => default_proto,
    };
    if args.len() == 1 {
        if let JsValue::Number(n) = &args[0] {
            return match n {
                JsNumberType::Integer(len) if *len >= 0 && *len < u32::MAX as i64 => {
                    Ok(JsValue::Object(array_create(*len as u32, Some(proto))))
                }
                _ => Err(JErrorType::RangeError("Invalid array length".to_string())),
            };
        }
    }
    Ok(JsValue::Object(create_array_from_list(args, Some(proto))))
}

/// Array.isArray
fn array_is_array(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Boolean(is_array(&arg(&args, 0))?))
}

/// Array.prototype.push
fn array_push(
    _realm: &JsCodeRealmType,
    this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let o = match &this {
        JsValue::Object(o) => o.clone(),
        _ => {
            return Err(JErrorType::TypeError(
                "Array.prototype.push called on non-object".to_string(),
            ))
        }
    };
    let length_key = PropertyKey::from("length");
    let mut len = match to_number(&get(&o, &length_key, &this)?)? {
        JsNumberType::Integer(i) if i >= 0 => i,
        _ => 0,
    };
    for item in args {
        if !set(&o, PropertyKey::from(len.to_string()), item, &this)? {
            return Err(JErrorType::TypeError(format!(
                "Cannot assign to index {} of the array",
                len
            )));
        }
        len += 1;
    }
    if !set(&o, length_key, JsValue::from(len), &this)? {
        return Err(JErrorType::TypeError(
            "Cannot assign to read only property 'length'".to_string(),
        ));
    }
    Ok(JsValue::from(len))
}
