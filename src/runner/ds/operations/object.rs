use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{JsObject, JsObjectType, ObjectType};
use crate::runner::ds::object_property::{
    PropertyDescriptor, PropertyDescriptorSetter, PropertyKey,
};
use crate::runner::ds::operations::stack::StackGuard;
use crate::runner::ds::operations::test_and_comparison::same_value;
use crate::runner::ds::proxy_object::ProxyHandler;
use crate::runner::ds::value::JsValue;

/// How an internal method is dispatched: on the object itself or through a proxy's trap.
/// A trap holds one level of the stack budget while it runs.
enum Dispatch {
    Ordinary,
    Proxy(JsObjectType, Rc<dyn ProxyHandler>, StackGuard),
}

fn dispatch(o: &JsObjectType) -> Result<Dispatch, JErrorType> {
    let parts = match &*o.borrow() {
        ObjectType::Proxy(p) => Some(p.parts()?),
        _ => None,
    };
    match parts {
        Some((target, handler)) => Ok(Dispatch::Proxy(target, handler, StackGuard::enter()?)),
        None => Ok(Dispatch::Ordinary),
    }
}

fn with_ordinary<R>(o: &JsObjectType, f: impl FnOnce(&dyn JsObject) -> R) -> Result<R, JErrorType> {
    match o.borrow().as_js_object() {
        Some(js) => Ok(f(js)),
        None => Err(invariant_error("unexpected proxy")),
    }
}

fn with_ordinary_mut<R>(
    o: &JsObjectType,
    f: impl FnOnce(&mut dyn JsObject) -> R,
) -> Result<R, JErrorType> {
    match o.borrow_mut().as_js_object_mut() {
        Some(js) => Ok(f(js)),
        None => Err(invariant_error("unexpected proxy")),
    }
}

fn invariant_error(detail: &str) -> JErrorType {
    JErrorType::TypeError(format!("proxy invariant violated, {}", detail))
}

fn same_proto(a: &Option<JsObjectType>, b: &Option<JsObjectType>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

pub fn get_prototype_of(o: &JsObjectType) -> Result<Option<JsObjectType>, JErrorType> {
    match dispatch(o)? {
        Dispatch::Ordinary => with_ordinary(o, |js| js.get_prototype_of()),
        Dispatch::Proxy(target, handler, _guard) => {
            let proto = handler.get_prototype_of(&target)?;
            if !is_extensible(&target)? && !same_proto(&proto, &get_prototype_of(&target)?) {
                return Err(invariant_error(
                    "getPrototypeOf of a non-extensible target must report its prototype",
                ));
            }
            Ok(proto)
        }
    }
}

/// OrdinarySetPrototypeOf, including the prototype chain cycle check.
pub fn set_prototype_of(o: &JsObjectType, proto: Option<JsObjectType>) -> Result<bool, JErrorType> {
    match dispatch(o)? {
        Dispatch::Ordinary => {
            let (current, extensible) =
                with_ordinary(o, |js| (js.get_prototype_of(), js.is_extensible()))?;
            if same_proto(&current, &proto) {
                return Ok(true);
            }
            if !extensible {
                return Ok(false);
            }
            let mut p = proto.clone();
            while let Some(step) = p {
                if Rc::ptr_eq(&step, o) {
                    return Ok(false);
                }
                if step.borrow().is_proxy() {
                    break;
                }
                p = with_ordinary(&step, |js| js.get_prototype_of())?;
            }
            with_ordinary_mut(o, |js| js.get_object_base_mut().set_prototype(proto))?;
            Ok(true)
        }
        Dispatch::Proxy(target, handler, _guard) => {
            let result = handler.set_prototype_of(&target, proto.clone())?;
            if result
                && !is_extensible(&target)?
                && !same_proto(&proto, &get_prototype_of(&target)?)
            {
                return Err(invariant_error(
                    "setPrototypeOf cannot change the prototype of a non-extensible target",
                ));
            }
            Ok(result)
        }
    }
}

pub fn is_extensible(o: &JsObjectType) -> Result<bool, JErrorType> {
    match dispatch(o)? {
        Dispatch::Ordinary => with_ordinary(o, |js| js.is_extensible()),
        Dispatch::Proxy(target, handler, _guard) => {
            let result = handler.is_extensible(&target)?;
            if result != is_extensible(&target)? {
                return Err(invariant_error(
                    "isExtensible must report the extensibility of the target",
                ));
            }
            Ok(result)
        }
    }
}

pub fn prevent_extensions(o: &JsObjectType) -> Result<bool, JErrorType> {
    match dispatch(o)? {
        Dispatch::Ordinary => with_ordinary_mut(o, |js| js.prevent_extensions()),
        Dispatch::Proxy(target, handler, _guard) => {
            let result = handler.prevent_extensions(&target)?;
            if result && is_extensible(&target)? {
                return Err(invariant_error(
                    "preventExtensions reported success but the target is extensible",
                ));
            }
            Ok(result)
        }
    }
}

pub fn get_own_property(
    o: &JsObjectType,
    key: &PropertyKey,
) -> Result<Option<PropertyDescriptor>, JErrorType> {
    match dispatch(o)? {
        Dispatch::Ordinary => with_ordinary(o, |js| js.get_own_property(key)),
        Dispatch::Proxy(target, handler, _guard) => {
            let result = handler.get_own_property_descriptor(&target, key)?;
            let target_desc = get_own_property(&target, key)?;
            match &result {
                None => {
                    if let Some(td) = &target_desc {
                        if !td.is_configurable() {
                            return Err(invariant_error(&format!(
                                "'{}' is non-configurable on the target and cannot be reported as absent",
                                key
                            )));
                        }
                        if !is_extensible(&target)? {
                            return Err(invariant_error(&format!(
                                "'{}' exists on a non-extensible target and cannot be reported as absent",
                                key
                            )));
                        }
                    }
                }
                Some(d) => {
                    if target_desc.is_none() && !is_extensible(&target)? {
                        return Err(invariant_error(&format!(
                            "'{}' cannot be reported on a non-extensible target that lacks it",
                            key
                        )));
                    }
                    if !d.is_configurable() {
                        match &target_desc {
                            Some(td) if !td.is_configurable() => {
                                if d.is_data_descriptor() && !d.is_writable() && td.is_writable() {
                                    return Err(invariant_error(&format!(
                                        "'{}' cannot be reported non-writable while writable on the target",
                                        key
                                    )));
                                }
                            }
                            _ => {
                                return Err(invariant_error(&format!(
                                    "'{}' cannot be reported non-configurable",
                                    key
                                )))
                            }
                        }
                    }
                }
            }
            Ok(result)
        }
    }
}

pub fn define_own_property(
    o: &JsObjectType,
    key: PropertyKey,
    desc: PropertyDescriptorSetter,
) -> Result<bool, JErrorType> {
    match dispatch(o)? {
        Dispatch::Ordinary => with_ordinary_mut(o, |js| js.define_own_property(key, desc)),
        Dispatch::Proxy(target, handler, _guard) => {
            let setting_config_false = desc.configurable() == Some(false);
            let setting_writable_false = desc.writable() == Some(false);
            if !handler.define_property(&target, key.clone(), desc)? {
                return Ok(false);
            }
            match get_own_property(&target, &key)? {
                None => {
                    if !is_extensible(&target)? {
                        return Err(invariant_error(&format!(
                            "'{}' cannot be added to a non-extensible target",
                            key
                        )));
                    }
                    if setting_config_false {
                        return Err(invariant_error(&format!(
                            "'{}' cannot be defined non-configurable when absent on the target",
                            key
                        )));
                    }
                }
                Some(td) => {
                    if setting_config_false && td.is_configurable() {
                        return Err(invariant_error(&format!(
                            "'{}' cannot be defined non-configurable while configurable on the target",
                            key
                        )));
                    }
                    if setting_writable_false
                        && td.is_data_descriptor()
                        && !td.is_configurable()
                        && td.is_writable()
                    {
                        return Err(invariant_error(&format!(
                            "'{}' cannot be defined non-writable while writable on the target",
                            key
                        )));
                    }
                }
            }
            Ok(true)
        }
    }
}

/// DefinePropertyOrThrow.
pub fn define_property_or_throw(
    o: &JsObjectType,
    key: PropertyKey,
    desc: PropertyDescriptorSetter,
) -> Result<(), JErrorType> {
    let name = key.to_string();
    if define_own_property(o, key, desc)? {
        Ok(())
    } else {
        Err(JErrorType::TypeError(format!("Cannot define property '{}'", name)))
    }
}

/// CreateDataProperty.
pub fn create_data_property(
    o: &JsObjectType,
    key: PropertyKey,
    value: JsValue,
) -> Result<bool, JErrorType> {
    define_own_property(
        o,
        key,
        PropertyDescriptorSetter::new_from_property_descriptor(
            PropertyDescriptor::new_default_data(value),
        ),
    )
}

pub fn has_property(o: &JsObjectType, key: &PropertyKey) -> Result<bool, JErrorType> {
    match dispatch(o)? {
        Dispatch::Ordinary => {
            if with_ordinary(o, |js| js.get_own_property(key))?.is_some() {
                return Ok(true);
            }
            match get_prototype_of(o)? {
                Some(parent) => has_property(&parent, key),
                None => Ok(false),
            }
        }
        Dispatch::Proxy(target, handler, _guard) => {
            let result = handler.has(&target, key)?;
            if !result {
                if let Some(td) = get_own_property(&target, key)? {
                    if !td.is_configurable() || !is_extensible(&target)? {
                        return Err(invariant_error(&format!(
                            "'{}' exists on the target and cannot be reported as absent",
                            key
                        )));
                    }
                }
            }
            Ok(result)
        }
    }
}

pub fn get(o: &JsObjectType, key: &PropertyKey, receiver: &JsValue) -> Result<JsValue, JErrorType> {
    match dispatch(o)? {
        Dispatch::Ordinary => match with_ordinary(o, |js| js.get_own_property(key))? {
            None => match get_prototype_of(o)? {
                Some(parent) => get(&parent, key, receiver),
                None => Ok(JsValue::Undefined),
            },
            Some(PropertyDescriptor::Data(d)) => Ok(d.value),
            Some(PropertyDescriptor::Accessor(a)) => match a.get {
                None => Ok(JsValue::Undefined),
                Some(getter) => call(&JsValue::Object(getter), receiver.clone(), vec![]),
            },
        },
        Dispatch::Proxy(target, handler, _guard) => {
            let value = handler.get(&target, key, receiver)?;
            match get_own_property(&target, key)? {
                Some(PropertyDescriptor::Data(d))
                    if !d.configurable && !d.writable && !same_value(&value, &d.value) =>
                {
                    Err(invariant_error(&format!(
                        "'{}' is a non-writable, non-configurable data property and must report its value",
                        key
                    )))
                }
                Some(PropertyDescriptor::Accessor(a))
                    if !a.configurable && a.get.is_none() && value != JsValue::Undefined =>
                {
                    Err(invariant_error(&format!(
                        "'{}' has no getter on the target and must report undefined",
                        key
                    )))
                }
                _ => Ok(value),
            }
        }
    }
}

/// `o[key]` for any value, boxing nothing: primitives other than nullish have no
/// properties in this engine.
pub fn get_v(v: &JsValue, key: &PropertyKey) -> Result<JsValue, JErrorType> {
    match v {
        JsValue::Object(o) => get(o, key, v),
        JsValue::String(s) if *key == PropertyKey::from("length") => {
            Ok(JsValue::from(s.chars().count() as i64))
        }
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "Cannot read property '{}' of {}",
            key, v
        ))),
        _ => Ok(JsValue::Undefined),
    }
}

pub fn set(
    o: &JsObjectType,
    key: PropertyKey,
    value: JsValue,
    receiver: &JsValue,
) -> Result<bool, JErrorType> {
    match dispatch(o)? {
        Dispatch::Ordinary => {
            let own_desc = with_ordinary(o, |js| js.get_own_property(&key))?;
            ordinary_set_with_own_descriptor(o, key, value, receiver, own_desc)
        }
        Dispatch::Proxy(target, handler, _guard) => {
            let result = handler.set(&target, key.clone(), value.clone(), receiver)?;
            if !result {
                return Ok(false);
            }
            match get_own_property(&target, &key)? {
                Some(PropertyDescriptor::Data(d))
                    if !d.configurable && !d.writable && !same_value(&value, &d.value) =>
                {
                    Err(invariant_error(&format!(
                        "'{}' is a non-writable, non-configurable data property and cannot be set",
                        key
                    )))
                }
                Some(PropertyDescriptor::Accessor(a)) if !a.configurable && a.set.is_none() => {
                    Err(invariant_error(&format!(
                        "'{}' has no setter on the target and cannot be set",
                        key
                    )))
                }
                _ => Ok(true),
            }
        }
    }
}

/// OrdinarySetWithOwnDescriptor.
pub fn ordinary_set_with_own_descriptor(
    o: &JsObjectType,
    key: PropertyKey,
    value: JsValue,
    receiver: &JsValue,
    own_desc: Option<PropertyDescriptor>,
) -> Result<bool, JErrorType> {
    let own_desc = match own_desc {
        Some(d) => d,
        None => match get_prototype_of(o)? {
            Some(parent) => return set(&parent, key, value, receiver),
            None => PropertyDescriptor::new_default_data(JsValue::Undefined),
        },
    };
    match own_desc {
        PropertyDescriptor::Data(d) => {
            if !d.writable {
                return Ok(false);
            }
            let receiver = match receiver {
                JsValue::Object(r) => r,
                _ => return Ok(false),
            };
            match get_own_property(receiver, &key)? {
                Some(existing) => {
                    if existing.is_accessor_descriptor() || !existing.is_writable() {
                        return Ok(false);
                    }
                    define_own_property(receiver, key, PropertyDescriptorSetter::new_value_only(value))
                }
                None => create_data_property(receiver, key, value),
            }
        }
        PropertyDescriptor::Accessor(a) => match a.set {
            None => Ok(false),
            Some(setter) => {
                call(&JsValue::Object(setter), receiver.clone(), vec![value])?;
                Ok(true)
            }
        },
    }
}

pub fn delete(o: &JsObjectType, key: &PropertyKey) -> Result<bool, JErrorType> {
    match dispatch(o)? {
        Dispatch::Ordinary => with_ordinary_mut(o, |js| js.delete(key)),
        Dispatch::Proxy(target, handler, _guard) => {
            let result = handler.delete_property(&target, key)?;
            if !result {
                return Ok(false);
            }
            if let Some(td) = get_own_property(&target, key)? {
                if !td.is_configurable() || !is_extensible(&target)? {
                    return Err(invariant_error(&format!(
                        "'{}' exists on the target and cannot be reported as deleted",
                        key
                    )));
                }
            }
            Ok(true)
        }
    }
}

pub fn own_property_keys(o: &JsObjectType) -> Result<Vec<PropertyKey>, JErrorType> {
    match dispatch(o)? {
        Dispatch::Ordinary => with_ordinary(o, |js| js.own_property_keys()),
        Dispatch::Proxy(target, handler, _guard) => {
            let keys = handler.own_keys(&target)?;
            for (i, k) in keys.iter().enumerate() {
                if keys[..i].contains(k) {
                    return Err(invariant_error(&format!("ownKeys reported '{}' twice", k)));
                }
            }
            let extensible = is_extensible(&target)?;
            let target_keys = own_property_keys(&target)?;
            for tk in &target_keys {
                if keys.contains(tk) {
                    continue;
                }
                let non_configurable = match get_own_property(&target, tk)? {
                    Some(d) => !d.is_configurable(),
                    None => false,
                };
                if non_configurable || !extensible {
                    return Err(invariant_error(&format!("ownKeys must report '{}'", tk)));
                }
            }
            if !extensible && keys.iter().any(|k| !target_keys.contains(k)) {
                return Err(invariant_error(
                    "ownKeys of a non-extensible target cannot report new keys",
                ));
            }
            Ok(keys)
        }
    }
}

/// Call(F, V, argumentsList).
pub fn call(f: &JsValue, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let f_obj = match f {
        JsValue::Object(o) => o,
        _ => return Err(JErrorType::TypeError(format!("{} is not a function", f))),
    };
    let behaviour = match &*f_obj.borrow() {
        ObjectType::Function(func) => Some(func.behaviour()),
        ObjectType::Proxy(p) if p.is_callable() => None,
        _ => return Err(JErrorType::TypeError(format!("{} is not a function", f))),
    };
    match behaviour {
        Some(behaviour) => {
            let _guard = StackGuard::enter()?;
            behaviour(this, args, None)
        }
        None => match dispatch(f_obj)? {
            Dispatch::Proxy(target, handler, _guard) => handler.apply(&target, this, args),
            Dispatch::Ordinary => Err(JErrorType::TypeError(format!("{} is not a function", f))),
        },
    }
}

/// Construct(F, argumentsList, newTarget). `newTarget` defaults to `f`.
pub fn construct(
    f: &JsObjectType,
    args: Vec<JsValue>,
    new_target: Option<JsObjectType>,
) -> Result<JsValue, JErrorType> {
    let new_target = new_target.unwrap_or_else(|| f.clone());
    let behaviour = match &*f.borrow() {
        ObjectType::Function(func) if func.is_constructor() => Some(func.behaviour()),
        ObjectType::Proxy(p) if p.is_constructor() => None,
        other => {
            return Err(JErrorType::TypeError(format!(
                "{} is not a constructor",
                other.class_name()
            )))
        }
    };
    let result = match behaviour {
        Some(behaviour) => {
            let _guard = StackGuard::enter()?;
            behaviour(JsValue::Undefined, args, Some(new_target))?
        }
        None => match dispatch(f)? {
            Dispatch::Proxy(target, handler, _guard) => {
                handler.construct(&target, args, Some(new_target))?
            }
            Dispatch::Ordinary => {
                return Err(JErrorType::TypeError("not a constructor".to_string()))
            }
        },
    };
    if !result.is_object() {
        return Err(JErrorType::TypeError(
            "construct must return an object".to_string(),
        ));
    }
    Ok(result)
}

/// GetPrototypeFromConstructor, falling back to `default_proto` when `constructor.prototype`
/// is not an object.
pub fn get_prototype_from_constructor(
    constructor: &JsObjectType,
    default_proto: JsObjectType,
) -> Result<JsObjectType, JErrorType> {
    match get(constructor, &PropertyKey::from("prototype"), &JsValue::Object(constructor.clone()))? {
        JsValue::Object(p) => Ok(p),
        _ => Ok(default_proto),
    }
}

/// SetIntegrityLevel: sealed, or frozen when `frozen` is set.
pub fn set_integrity_level(o: &JsObjectType, frozen: bool) -> Result<bool, JErrorType> {
    if !prevent_extensions(o)? {
        return Ok(false);
    }
    for key in own_property_keys(o)? {
        let desc = if frozen {
            match get_own_property(o, &key)? {
                Some(PropertyDescriptor::Data(_)) => {
                    let mut d = PropertyDescriptorSetter::new_generic(None, Some(false));
                    d.honour_writable = true;
                    d
                }
                Some(PropertyDescriptor::Accessor(_)) => {
                    PropertyDescriptorSetter::new_generic(None, Some(false))
                }
                None => continue,
            }
        } else {
            PropertyDescriptorSetter::new_generic(None, Some(false))
        };
        define_property_or_throw(o, key, desc)?;
    }
    Ok(true)
}

/// TestIntegrityLevel.
pub fn test_integrity_level(o: &JsObjectType, frozen: bool) -> Result<bool, JErrorType> {
    if is_extensible(o)? {
        return Ok(false);
    }
    for key in own_property_keys(o)? {
        if let Some(d) = get_own_property(o, &key)? {
            if d.is_configurable() || (frozen && d.is_writable()) {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::runner::ds::object::new_object;
    use crate::runner::ds::proxy_object::{proxy_create, proxy_revoke, TransparentHandler};

    #[test]
    fn test_set_creates_data_property_on_receiver() {
        let o = new_object(None);
        let receiver = JsValue::Object(o.clone());
        assert!(set(&o, "x".into(), JsValue::from(1), &receiver).unwrap());
        assert_eq!(get(&o, &"x".into(), &receiver).unwrap(), JsValue::from(1));
    }

    #[test]
    fn test_prototype_cycle_is_rejected() {
        let a = new_object(None);
        let b = new_object(Some(a.clone()));
        assert!(!set_prototype_of(&a, Some(b)).unwrap());
    }

    #[test]
    fn test_frozen_object_rejects_writes() {
        let o = new_object(None);
        let receiver = JsValue::Object(o.clone());
        create_data_property(&o, "x".into(), JsValue::from(1)).unwrap();
        assert!(set_integrity_level(&o, true).unwrap());
        assert!(test_integrity_level(&o, true).unwrap());
        assert!(!set(&o, "x".into(), JsValue::from(2), &receiver).unwrap());
        assert!(!delete(&o, &"x".into()).unwrap());
    }

    #[test]
    fn test_transparent_proxy_forwards() {
        let t = new_object(None);
        let p = proxy_create(t.clone(), Rc::new(TransparentHandler));
        let receiver = JsValue::Object(p.clone());
        assert!(set(&p, "y".into(), JsValue::from(true), &receiver).unwrap());
        assert_eq!(
            get(&t, &"y".into(), &JsValue::Object(t.clone())).unwrap(),
            JsValue::from(true)
        );
        assert_eq!(own_property_keys(&p).unwrap(), vec![PropertyKey::from("y")]);
    }

    #[test]
    fn test_revoked_proxy_throws() {
        let p = proxy_create(new_object(None), Rc::new(TransparentHandler));
        proxy_revoke(&p);
        assert!(matches!(
            get(&p, &"x".into(), &JsValue::Undefined),
            Err(JErrorType::TypeError(_))
        ));
    }

    struct LyingHandler;
    impl ProxyHandler for LyingHandler {
        fn is_extensible(&self, _target: &JsObjectType) -> Result<bool, JErrorType> {
            Ok(false)
        }
    }

    #[test]
    fn test_is_extensible_invariant_is_enforced() {
        let p = proxy_create(new_object(None), Rc::new(LyingHandler));
        assert!(matches!(is_extensible(&p), Err(JErrorType::TypeError(_))));
    }
}
