//! Reflect namespace: every internal method of an object, one function each.

use std::rc::Weak;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{new_object, JsObjectType};
use crate::runner::ds::operations::object::{
    call, construct, define_own_property, delete, get, get_own_property, get_prototype_of,
    has_property, is_extensible, own_property_keys, prevent_extensions, set, set_prototype_of,
};
use crate::runner::ds::operations::type_conversion::to_property_key;
use crate::runner::ds::realm::{CodeRealm, JsCodeRealmType};
use crate::runner::ds::value::JsValue;
use crate::runner::std_lib::array::is_array;
use crate::runner::std_lib::object::{from_property_descriptor, keys_to_array, to_property_descriptor};
use crate::runner::std_lib::{arg, arg_object, BuiltInObject};

pub fn create_reflect(
    realm: &Weak<CodeRealm>,
    function_prototype: &JsObjectType,
    object_prototype: &JsObjectType,
) -> JsObjectType {
    BuiltInObject::new(realm, function_prototype, new_object(Some(object_prototype.clone())))
        .add_method("apply", 3, reflect_apply)
        .add_method("construct", 2, reflect_construct)
        .add_method("defineProperty", 3, reflect_define_property)
        .add_method("deleteProperty", 2, reflect_delete_property)
        .add_method("get", 2, reflect_get)
        .add_method("getOwnPropertyDescriptor", 2, reflect_get_own_property_descriptor)
        .add_method("getPrototypeOf", 1, reflect_get_prototype_of)
        .add_method("has", 2, reflect_has)
        .add_method("isExtensible", 1, reflect_is_extensible)
        .add_method("ownKeys", 1, reflect_own_keys)
        .add_method("preventExtensions", 1, reflect_prevent_extensions)
        .add_method("set", 3, reflect_set)
        .add_method("setPrototypeOf", 2, reflect_set_prototype_of)
        .build()
}

/// CreateListFromArrayLike, for array arguments only.
fn list_from_array(v: &JsValue) -> Result<Vec<JsValue>, JErrorType> {
    match v {
        JsValue::Undefined | JsValue::Null => Ok(vec![]),
        JsValue::Object(o) if is_array(v)? => {
            let len = match get(o, &"length".into(), v)? {
                JsValue::Number(n) => n.as_f64() as u32,
                _ => 0,
            };
            let mut list = Vec::with_capacity(len as usize);
            for i in 0..len {
                list.push(get(o, &i.into(), v)?);
            }
            Ok(list)
        }
        _ => Err(JErrorType::TypeError(
            "CreateListFromArrayLike called on non-array".to_string(),
        )),
    }
}

/// Reflect.apply
fn reflect_apply(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let list = list_from_array(&arg(&args, 2))?;
    call(&arg(&args, 0), arg(&args, 1), list)
}

/// Reflect.construct
fn reflect_construct(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let target = arg_object(&args, 0, "Reflect.construct")?;
    let new_target = match args.get(2) {
        Some(JsValue::Object(nt)) if nt.borrow().is_constructor() => Some(nt.clone()),
        Some(_) => {
            return Err(JErrorType::TypeError(
                "Reflect.construct newTarget is not a constructor".to_string(),
            ))
        }
        None => None,
    };
    construct(&target, list_from_array(&arg(&args, 1))?, new_target)
}

/// Reflect.defineProperty
fn reflect_define_property(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let o = arg_object(&args, 0, "Reflect.defineProperty")?;
    let key = to_property_key(&arg(&args, 1))?;
    let desc = to_property_descriptor(&arg(&args, 2))?;
    Ok(JsValue::Boolean(define_own_property(&o, key, desc)?))
}

/// Reflect.deleteProperty
fn reflect_delete_property(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let o = arg_object(&args, 0, "Reflect.deleteProperty")?;
    let key = to_property_key(&arg(&args, 1))?;
    Ok(JsValue::Boolean(delete(&o, &key)?))
}

/// Reflect.get
fn reflect_get(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let o = arg_object(&args, 0, "Reflect.get")?;
    let key = to_property_key(&arg(&args, 1))?;
    let receiver = args.get(2).cloned().unwrap_or_else(|| JsValue::Object(o.clone()));
    get(&o, &key, &receiver)
}

/// Reflect.getOwnPropertyDescriptor
fn reflect_get_own_property_descriptor(
    realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let o = arg_object(&args, 0, "Reflect.getOwnPropertyDescriptor")?;
    let key = to_property_key(&arg(&args, 1))?;
    from_property_descriptor(realm, get_own_property(&o, &key)?)
}

/// Reflect.getPrototypeOf
fn reflect_get_prototype_of(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let o = arg_object(&args, 0, "Reflect.getPrototypeOf")?;
    Ok(get_prototype_of(&o)?.map(JsValue::Object).unwrap_or(JsValue::Null))
}

/// Reflect.has
fn reflect_has(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let o = arg_object(&args, 0, "Reflect.has")?;
    let key = to_property_key(&arg(&args, 1))?;
    Ok(JsValue::Boolean(has_property(&o, &key)?))
}

/// Reflect.isExtensible
fn reflect_is_extensible(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let o = arg_object(&args, 0, "Reflect.isExtensible")?;
    Ok(JsValue::Boolean(is_extensible(&o)?))
}

/// Reflect.ownKeys
fn reflect_own_keys(
    realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let o = arg_object(&args, 0, "Reflect.ownKeys")?;
    keys_to_array(realm, own_property_keys(&o)?)
}

/// Reflect.preventExtensions
fn reflect_prevent_extensions(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let o = arg_object(&args, 0, "Reflect.preventExtensions")?;
    Ok(JsValue::Boolean(prevent_extensions(&o)?))
}

/// Reflect.set
fn reflect_set(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let o = arg_object(&args, 0, "Reflect.set")?;
    let key = to_property_key(&arg(&args, 1))?;
    let receiver = args.get(3).cloned().unwrap_or_else(|| JsValue::Object(o.clone()));
    Ok(JsValue::Boolean(set(&o, key, arg(&args, 2), &receiver)?))
}

/// Reflect.setPrototypeOf
fn reflect_set_prototype_of(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let o = arg_object(&args, 0, "Reflect.setPrototypeOf")?;
    let proto = match arg(&args, 1) {
        JsValue::Object(p) => Some(p),
        JsValue::Null => None,
        _ => {
            return Err(JErrorType::TypeError(
                "Object prototype may only be an Object or null".to_string(),
            ))
        }
    };
    Ok(JsValue::Boolean(set_prototype_of(&o, proto)?))
}
