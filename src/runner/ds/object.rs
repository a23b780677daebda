use crate::runner::ds::array_object::ArrayObject;
use crate::runner::ds::error_object::ErrorObject;
use crate::runner::ds::function_object::FunctionObject;
use crate::runner::ds::object_property::{
    same_optional_object, PropertyDescriptor, PropertyDescriptorSetter, PropertyKey,
};
use crate::runner::ds::operations::test_and_comparison::same_value;
use crate::runner::ds::proxy_object::ProxyObject;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

pub type JsObjectType = Rc<RefCell<ObjectType>>;

pub enum ObjectType {
    Ordinary(ObjectBase),
    Array(ArrayObject),
    Function(FunctionObject),
    Error(ErrorObject),
    Proxy(ProxyObject),
}
impl ObjectType {
    pub fn is_callable(&self) -> bool {
        match self {
            ObjectType::Function(_) => true,
            ObjectType::Proxy(p) => p.is_callable(),
            _ => false,
        }
    }

    pub fn is_constructor(&self) -> bool {
        match self {
            ObjectType::Function(f) => f.is_constructor(),
            ObjectType::Proxy(p) => p.is_constructor(),
            _ => false,
        }
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self, ObjectType::Proxy(_))
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            ObjectType::Ordinary(_) => "[object Object]",
            ObjectType::Array(_) => "[object Array]",
            ObjectType::Function(_) => "[object Function]",
            ObjectType::Error(_) => "[object Error]",
            ObjectType::Proxy(p) if p.is_callable() => "[object Function]",
            ObjectType::Proxy(_) => "[object Object]",
        }
    }

    /// The ordinary internal methods, absent for proxies whose methods are traps.
    pub fn as_js_object(&self) -> Option<&dyn JsObject> {
        match self {
            ObjectType::Ordinary(o) => Some(o),
            ObjectType::Array(o) => Some(o),
            ObjectType::Function(o) => Some(o),
            ObjectType::Error(o) => Some(o),
            ObjectType::Proxy(_) => None,
        }
    }

    pub fn as_js_object_mut(&mut self) -> Option<&mut dyn JsObject> {
        match self {
            ObjectType::Ordinary(o) => Some(o),
            ObjectType::Array(o) => Some(o),
            ObjectType::Function(o) => Some(o),
            ObjectType::Error(o) => Some(o),
            ObjectType::Proxy(_) => None,
        }
    }
}

pub struct ObjectBase {
    properties: IndexMap<PropertyKey, PropertyDescriptor>,
    is_extensible: bool,
    prototype: Option<JsObjectType>,
}
impl ObjectBase {
    pub fn new(prototype: Option<JsObjectType>) -> Self {
        ObjectBase {
            properties: IndexMap::new(),
            is_extensible: true,
            prototype,
        }
    }

    pub(crate) fn set_prototype(&mut self, prototype: Option<JsObjectType>) {
        self.prototype = prototype;
    }

    pub(crate) fn insert_property(&mut self, key: PropertyKey, desc: PropertyDescriptor) {
        self.properties.insert(key, desc);
    }
}
impl JsObject for ObjectBase {
    fn get_object_base_mut(&mut self) -> &mut ObjectBase {
        self
    }

    fn get_object_base(&self) -> &ObjectBase {
        self
    }
}

pub fn new_object(prototype: Option<JsObjectType>) -> JsObjectType {
    Rc::new(RefCell::new(ObjectType::Ordinary(ObjectBase::new(prototype))))
}

/// Ordinary internal methods that never run script. Anything that may call a getter,
/// setter or trap lives in `operations::object` and works on handles instead.
pub trait JsObject {
    fn get_object_base_mut(&mut self) -> &mut ObjectBase;

    fn get_object_base(&self) -> &ObjectBase;

    fn get_prototype_of(&self) -> Option<JsObjectType> {
        self.get_object_base().prototype.clone()
    }

    fn is_extensible(&self) -> bool {
        self.get_object_base().is_extensible
    }

    fn prevent_extensions(&mut self) -> bool {
        self.get_object_base_mut().is_extensible = false;
        true
    }

    fn get_own_property(&self, property: &PropertyKey) -> Option<PropertyDescriptor> {
        self.get_object_base().properties.get(property).cloned()
    }

    fn define_own_property(
        &mut self,
        property: PropertyKey,
        descriptor_setter: PropertyDescriptorSetter,
    ) -> bool {
        ordinary_define_own_property(self.get_object_base_mut(), property, descriptor_setter)
    }

    fn delete(&mut self, property: &PropertyKey) -> bool {
        match self.get_own_property(property) {
            None => true,
            Some(pd) => {
                if pd.is_configurable() {
                    self.get_object_base_mut().properties.shift_remove(property);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn own_property_keys(&self) -> Vec<PropertyKey> {
        let mut int_keys = vec![];
        let mut str_keys = vec![];
        let mut sym_keys = vec![];
        for key in self.get_object_base().properties.keys() {
            match key {
                PropertyKey::Str(_) => str_keys.push(key.clone()),
                PropertyKey::Int(d) => int_keys.push(*d),
                PropertyKey::Sym(_) => sym_keys.push(key.clone()),
            }
        }
        int_keys.sort_unstable();

        let mut result: Vec<PropertyKey> = int_keys.into_iter().map(PropertyKey::Int).collect();
        result.append(&mut str_keys);
        result.append(&mut sym_keys);
        result
    }
}

/// ValidateAndApplyPropertyDescriptor for an ordinary object.
pub fn ordinary_define_own_property<J: JsObject + ?Sized>(
    o: &mut J,
    property: PropertyKey,
    descriptor_setter: PropertyDescriptorSetter,
) -> bool {
    let current_descriptor = o.get_own_property(&property);
    let current = match current_descriptor {
        None => {
            if !o.is_extensible() {
                return false;
            }
            o.get_object_base_mut().properties.insert(
                property,
                PropertyDescriptor::new_from_property_descriptor_setter(descriptor_setter),
            );
            return true;
        }
        Some(c) => c,
    };
    if descriptor_setter.is_empty() {
        return true;
    }
    if !current.is_configurable() {
        if descriptor_setter.configurable() == Some(true) {
            return false;
        }
        if let Some(enumerable) = descriptor_setter.enumerable() {
            if enumerable != current.is_enumerable() {
                return false;
            }
        }
    }
    if !descriptor_setter.is_generic_descriptor() {
        if current.is_data_descriptor() != descriptor_setter.is_data_descriptor() {
            if !current.is_configurable() {
                return false;
            }
        } else if let PropertyDescriptor::Data(current_data) = &current {
            if !current.is_configurable() && !current_data.writable {
                if descriptor_setter.writable() == Some(true) {
                    return false;
                }
                if let Some(value) = descriptor_setter.value() {
                    if !same_value(value, &current_data.value) {
                        return false;
                    }
                }
            }
        } else if let PropertyDescriptor::Accessor(current_accessor) = &current {
            if !current.is_configurable() {
                if let Some(set) = descriptor_setter.setter() {
                    if !same_optional_object(set, &current_accessor.set) {
                        return false;
                    }
                }
                if let Some(get) = descriptor_setter.getter() {
                    if !same_optional_object(get, &current_accessor.get) {
                        return false;
                    }
                }
            }
        }
    }
    let merged = descriptor_setter.merge_into(&current);
    o.get_object_base_mut().properties.insert(property, merged);
    true
}
