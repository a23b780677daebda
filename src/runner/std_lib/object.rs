//! Object built-in.
//!
//! Provides the Object constructor, its descriptor/prototype/integrity statics and
//! the `Object.prototype` methods.

use std::rc::Weak;

use crate::runner::ds::array_object::create_array_from_list;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{new_object, JsObjectType};
use crate::runner::ds::object_property::{
    PropertyDescriptor, PropertyDescriptorSetter, PropertyKey,
};
use crate::runner::ds::operations::object::{
    create_data_property, define_property_or_throw, get, get_own_property,
    get_prototype_from_constructor, get_prototype_of, has_property, is_extensible,
    own_property_keys, prevent_extensions, set_integrity_level, set_prototype_of,
    test_integrity_level,
};
use crate::runner::ds::operations::test_and_comparison::is_callable;
use crate::runner::ds::operations::type_conversion::{to_boolean, to_property_key};
use crate::runner::ds::realm::{CodeRealm, JsCodeRealmType, WellKnownIntrinsics};
use crate::runner::ds::value::JsValue;
use crate::runner::std_lib::{arg, arg_object, install, native_function, BuiltInObject};

pub fn create_object_constructor(
    realm: &Weak<CodeRealm>,
    function_prototype: &JsObjectType,
    object_prototype: &JsObjectType,
) -> JsObjectType {
    let constructor =
        native_function(realm, function_prototype, "Object", 1, true, object_constructor);
    install(
        &constructor,
        PropertyKey::from("prototype"),
        PropertyDescriptor::new_data(JsValue::Object(object_prototype.clone()), false, false, false),
    );
    BuiltInObject::new(realm, function_prototype, object_prototype.clone())
        .add_value("constructor", JsValue::Object(constructor.clone()))
        .add_method("hasOwnProperty", 1, object_has_own_property)
        .add_method("toString", 0, object_to_string)
        .build();
    BuiltInObject::new(realm, function_prototype, constructor)
        .add_method("getOwnPropertyNames", 1, object_get_own_property_names)
        .add_method("getOwnPropertyDescriptor", 2, object_get_own_property_descriptor)
        .add_method("defineProperty", 3, object_define_property)
        .add_method("getPrototypeOf", 1, object_get_prototype_of)
        .add_method("setPrototypeOf", 2, object_set_prototype_of)
        .add_method("create", 1, object_create)
        .add_method("keys", 1, object_keys)
        .add_method("freeze", 1, object_freeze)
        .add_method("isFrozen", 1, object_is_frozen)
        .add_method("seal", 1, object_seal)
        .add_method("isSealed", 1, object_is_sealed)
        .add_method("preventExtensions", 1, object_prevent_extensions)
        .add_method("isExtensible", 1, object_is_extensible)
        .build()
}

/// FromPropertyDescriptor.
pub fn from_property_descriptor(
    realm: &CodeRealm,
    desc: Option<PropertyDescriptor>,
) -> Result<JsValue, JErrorType> {
    let desc = match desc {
        None => return Ok(JsValue::Undefined),
        Some(d) => d,
    };
    let o = new_object(Some(realm.get_intrinsics_value(WellKnownIntrinsics::ObjectPrototype)?));
    let optional = |f: Option<JsObjectType>| f.map(JsValue::Object).unwrap_or(JsValue::Undefined);
    match &desc {
        PropertyDescriptor::Data(d) => {
            create_data_property(&o, "value".into(), d.value.clone())?;
            create_data_property(&o, "writable".into(), JsValue::Boolean(d.writable))?;
        }
        PropertyDescriptor::Accessor(a) => {
            create_data_property(&o, "get".into(), optional(a.get.clone()))?;
            create_data_property(&o, "set".into(), optional(a.set.clone()))?;
        }
    }
    create_data_property(&o, "enumerable".into(), JsValue::Boolean(desc.is_enumerable()))?;
    create_data_property(&o, "configurable".into(), JsValue::Boolean(desc.is_configurable()))?;
    Ok(JsValue::Object(o))
}

/// ToPropertyDescriptor.
pub fn to_property_descriptor(obj: &JsValue) -> Result<PropertyDescriptorSetter, JErrorType> {
    let o = match obj {
        JsValue::Object(o) => o.clone(),
        _ => {
            return Err(JErrorType::TypeError(format!(
                "Property description must be an object: {}",
                obj
            )))
        }
    };
    let field = |name: &str| -> Result<Option<JsValue>, JErrorType> {
        let key = PropertyKey::from(name);
        if has_property(&o, &key)? {
            Ok(Some(get(&o, &key, obj)?))
        } else {
            Ok(None)
        }
    };
    let accessor = |name: &str, v: Option<JsValue>| -> Result<Option<Option<JsObjectType>>, JErrorType> {
        match v {
            None => Ok(None),
            Some(JsValue::Undefined) => Ok(Some(None)),
            Some(f) if is_callable(&f) => Ok(f.as_object().cloned().map(Some)),
            Some(f) => Err(JErrorType::TypeError(format!(
                "{} must be a function: {}",
                name, f
            ))),
        }
    };
    let enumerable = field("enumerable")?.map(|v| to_boolean(&v));
    let configurable = field("configurable")?.map(|v| to_boolean(&v));
    let value = field("value")?;
    let writable = field("writable")?.map(|v| to_boolean(&v));
    let getter = accessor("Getter", field("get")?)?;
    let setter = accessor("Setter", field("set")?)?;

    if (getter.is_some() || setter.is_some()) && (value.is_some() || writable.is_some()) {
        return Err(JErrorType::TypeError(
            "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute"
                .to_string(),
        ));
    }
    let descriptor = if getter.is_some() || setter.is_some() {
        PropertyDescriptor::new_accessor(
            getter.clone().flatten(),
            setter.clone().flatten(),
            enumerable.unwrap_or(false),
            configurable.unwrap_or(false),
        )
    } else {
        PropertyDescriptor::new_data(
            value.clone().unwrap_or(JsValue::Undefined),
            writable.unwrap_or(false),
            enumerable.unwrap_or(false),
            configurable.unwrap_or(false),
        )
    };
    Ok(PropertyDescriptorSetter {
        honour_value: value.is_some(),
        honour_writable: writable.is_some(),
        honour_get: getter.is_some(),
        honour_set: setter.is_some(),
        honour_enumerable: enumerable.is_some(),
        honour_configurable: configurable.is_some(),
        descriptor,
    })
}

pub(crate) fn keys_to_array(realm: &CodeRealm, keys: Vec<PropertyKey>) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Object(create_array_from_list(
        keys.iter().map(|k| k.to_js_value()).collect(),
        Some(realm.get_intrinsics_value(WellKnownIntrinsics::ArrayPrototype)?),
    )))
}

/// Object constructor.
fn object_constructor(
    realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let default_proto = realm.get_intrinsics_value(WellKnownIntrinsics::ObjectPrototype)?;
    if let Some(nt) = &new_target {
        let object_ctor = realm.get_intrinsics_value(WellKnownIntrinsics::Object)?;
        if !std::rc::Rc::ptr_eq(nt, &object_ctor) {
            return Ok(JsValue::Object(new_object(Some(
                get_prototype_from_constructor(nt, default_proto)?,
            ))));
        }
    }
    match arg(&args, 0) {
        v @ JsValue::Object(_) => Ok(v),
        _ => Ok(JsValue::Object(new_object(Some(default_proto)))),
    }
}

/// Object.prototype.hasOwnProperty
fn object_has_own_property(
    _realm: &JsCodeRealmType,
    this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let key = to_property_key(&arg(&args, 0))?;
    match &this {
        JsValue::Object(o) => Ok(JsValue::Boolean(get_own_property(o, &key)?.is_some())),
        _ => Err(JErrorType::TypeError(
            "Object.prototype.hasOwnProperty called on non-object".to_string(),
        )),
    }
}

/// Object.prototype.toString
fn object_to_string(
    _realm: &JsCodeRealmType,
    this: JsValue,
    _args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let tag = match &this {
        JsValue::Undefined => "[object Undefined]".to_string(),
        JsValue::Null => "[object Null]".to_string(),
        JsValue::Object(o) => o.borrow().class_name().to_string(),
        JsValue::Boolean(_) => "[object Boolean]".to_string(),
        JsValue::Number(_) => "[object Number]".to_string(),
        JsValue::String(_) => "[object String]".to_string(),
        JsValue::Symbol(_) => "[object Symbol]".to_string(),
    };
    Ok(JsValue::String(tag))
}

/// Object.getOwnPropertyNames
fn object_get_own_property_names(
    realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let o = arg_object(&args, 0, "Object.getOwnPropertyNames")?;
    let keys = own_property_keys(&o)?
        .into_iter()
        .filter(|k| !k.is_symbol())
        .collect();
    keys_to_array(realm, keys)
}

/// Object.keys
fn object_keys(
    realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let o = arg_object(&args, 0, "Object.keys")?;
    let mut keys = vec![];
    for k in own_property_keys(&o)? {
        if k.is_symbol() {
            continue;
        }
        if let Some(d) = get_own_property(&o, &k)? {
            if d.is_enumerable() {
                keys.push(k);
            }
        }
    }
    keys_to_array(realm, keys)
}

/// Object.getOwnPropertyDescriptor
fn object_get_own_property_descriptor(
    realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let o = arg_object(&args, 0, "Object.getOwnPropertyDescriptor")?;
    let key = to_property_key(&arg(&args, 1))?;
    from_property_descriptor(realm, get_own_property(&o, &key)?)
}

/// Object.defineProperty
fn object_define_property(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let o = arg_object(&args, 0, "Object.defineProperty")?;
    let key = to_property_key(&arg(&args, 1))?;
    let desc = to_property_descriptor(&arg(&args, 2))?;
    define_property_or_throw(&o, key, desc)?;
    Ok(JsValue::Object(o))
}

/// Object.getPrototypeOf
fn object_get_prototype_of(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let o = arg_object(&args, 0, "Object.getPrototypeOf")?;
    Ok(get_prototype_of(&o)?.map(JsValue::Object).unwrap_or(JsValue::Null))
}

/// Object.setPrototypeOf
fn object_set_prototype_of(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let proto = match arg(&args, 1) {
        JsValue::Object(p) => Some(p),
        JsValue::Null => None,
        _ => {
            return Err(JErrorType::TypeError(
                "Object prototype may only be an Object or null".to_string(),
            ))
        }
    };
    let target = arg(&args, 0);
    if let JsValue::Object(o) = &target {
        if !set_prototype_of(o, proto)? {
            return Err(JErrorType::TypeError(
                "Object.setPrototypeOf could not set the prototype".to_string(),
            ));
        }
    }
    Ok(target)
}

/// Object.create
fn object_create(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    match arg(&args, 0) {
        JsValue::Object(p) => Ok(JsValue::Object(new_object(Some(p)))),
        JsValue::Null => Ok(JsValue::Object(new_object(None))),
        _ => Err(JErrorType::TypeError(
            "Object prototype may only be an Object or null".to_string(),
        )),
    }
}

fn integrity(args: &[JsValue], frozen: bool, api: &str) -> Result<JsValue, JErrorType> {
    let target = arg(args, 0);
    if let JsValue::Object(o) = &target {
        if !set_integrity_level(o, frozen)? {
            return Err(JErrorType::TypeError(format!("{} failed", api)));
        }
    }
    Ok(target)
}

/// Object.freeze
fn object_freeze(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    integrity(&args, true, "Object.freeze")
}

/// Object.seal
fn object_seal(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    integrity(&args, false, "Object.seal")
}

/// Object.isFrozen
fn object_is_frozen(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    match arg(&args, 0) {
        JsValue::Object(o) => Ok(JsValue::Boolean(test_integrity_level(&o, true)?)),
        _ => Ok(JsValue::Boolean(true)),
    }
}

/// Object.isSealed
fn object_is_sealed(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    match arg(&args, 0) {
        JsValue::Object(o) => Ok(JsValue::Boolean(test_integrity_level(&o, false)?)),
        _ => Ok(JsValue::Boolean(true)),
    }
}

/// Object.preventExtensions
fn object_prevent_extensions(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let target = arg(&args, 0);
    if let JsValue::Object(o) = &target {
        if !prevent_extensions(o)? {
            return Err(JErrorType::TypeError(
                "Object.preventExtensions failed".to_string(),
            ));
        }
    }
    Ok(target)
}

/// Object.isExtensible
fn object_is_extensible(
    _realm: &JsCodeRealmType,
    _this: JsValue,
    args: Vec<JsValue>,
    _new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    match arg(&args, 0) {
        JsValue::Object(o) => Ok(JsValue::Boolean(is_extensible(&o)?)),
        _ => Ok(JsValue::Boolean(false)),
    }
}
