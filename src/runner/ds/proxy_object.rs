use std::cell::RefCell;
use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{JsObjectType, ObjectType};
use crate::runner::ds::object_property::{
    PropertyDescriptor, PropertyDescriptorSetter, PropertyKey,
};
use crate::runner::ds::operations::object as ops;
use crate::runner::ds::value::JsValue;

/// One method per `Proxy` trap. Every default behaves like a handler object that does
/// not define the trap: the operation is forwarded to the target.
pub trait ProxyHandler {
    fn get_prototype_of(&self, target: &JsObjectType) -> Result<Option<JsObjectType>, JErrorType> {
        ops::get_prototype_of(target)
    }

    fn set_prototype_of(
        &self,
        target: &JsObjectType,
        proto: Option<JsObjectType>,
    ) -> Result<bool, JErrorType> {
        ops::set_prototype_of(target, proto)
    }

    fn is_extensible(&self, target: &JsObjectType) -> Result<bool, JErrorType> {
        ops::is_extensible(target)
    }

    fn prevent_extensions(&self, target: &JsObjectType) -> Result<bool, JErrorType> {
        ops::prevent_extensions(target)
    }

    fn get_own_property_descriptor(
        &self,
        target: &JsObjectType,
        key: &PropertyKey,
    ) -> Result<Option<PropertyDescriptor>, JErrorType> {
        ops::get_own_property(target, key)
    }

    fn define_property(
        &self,
        target: &JsObjectType,
        key: PropertyKey,
        desc: PropertyDescriptorSetter,
    ) -> Result<bool, JErrorType> {
        ops::define_own_property(target, key, desc)
    }

    fn has(&self, target: &JsObjectType, key: &PropertyKey) -> Result<bool, JErrorType> {
        ops::has_property(target, key)
    }

    fn get(
        &self,
        target: &JsObjectType,
        key: &PropertyKey,
        receiver: &JsValue,
    ) -> Result<JsValue, JErrorType> {
        ops::get(target, key, receiver)
    }

    fn set(
        &self,
        target: &JsObjectType,
        key: PropertyKey,
        value: JsValue,
        receiver: &JsValue,
    ) -> Result<bool, JErrorType> {
        ops::set(target, key, value, receiver)
    }

    fn delete_property(&self, target: &JsObjectType, key: &PropertyKey) -> Result<bool, JErrorType> {
        ops::delete(target, key)
    }

    fn own_keys(&self, target: &JsObjectType) -> Result<Vec<PropertyKey>, JErrorType> {
        ops::own_property_keys(target)
    }

    fn apply(
        &self,
        target: &JsObjectType,
        this: JsValue,
        args: Vec<JsValue>,
    ) -> Result<JsValue, JErrorType> {
        ops::call(&JsValue::Object(target.clone()), this, args)
    }

    fn construct(
        &self,
        target: &JsObjectType,
        args: Vec<JsValue>,
        new_target: Option<JsObjectType>,
    ) -> Result<JsValue, JErrorType> {
        ops::construct(target, args, new_target)
    }
}

/// The default handler, `new Proxy(target, {})`.
pub struct TransparentHandler;
impl ProxyHandler for TransparentHandler {}

pub struct ProxyObject {
    target: Option<JsObjectType>,
    handler: Option<Rc<dyn ProxyHandler>>,
    callable: bool,
    constructor: bool,
}
impl ProxyObject {
    pub fn is_callable(&self) -> bool {
        self.callable
    }

    pub fn is_constructor(&self) -> bool {
        self.constructor
    }

    pub fn is_revoked(&self) -> bool {
        self.handler.is_none()
    }

    /// Target and handler of a live proxy; a revoked proxy fails every operation.
    pub fn parts(&self) -> Result<(JsObjectType, Rc<dyn ProxyHandler>), JErrorType> {
        match (&self.target, &self.handler) {
            (Some(t), Some(h)) => Ok((t.clone(), h.clone())),
            _ => Err(JErrorType::TypeError(
                "Cannot perform operation on a revoked proxy".to_string(),
            )),
        }
    }
}

/// ProxyCreate. Callability and constructability are fixed from the target.
pub fn proxy_create(target: JsObjectType, handler: Rc<dyn ProxyHandler>) -> JsObjectType {
    let (callable, constructor) = {
        let t = target.borrow();
        (t.is_callable(), t.is_constructor())
    };
    Rc::new(RefCell::new(ObjectType::Proxy(ProxyObject {
        target: Some(target),
        handler: Some(handler),
        callable,
        constructor,
    })))
}

/// Revokes `proxy` if it is one; the dropped handler is released after the borrow ends.
pub fn proxy_revoke(proxy: &JsObjectType) {
    let dropped = match &mut *proxy.borrow_mut() {
        ObjectType::Proxy(p) => Some((p.target.take(), p.handler.take())),
        _ => None,
    };
    drop(dropped);
}
