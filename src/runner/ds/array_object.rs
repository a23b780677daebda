use crate::runner::ds::object::{
    ordinary_define_own_property, JsObject, JsObjectType, ObjectBase, ObjectType,
};
use crate::runner::ds::object_property::{
    PropertyDescriptor, PropertyDescriptorData, PropertyDescriptorSetter, PropertyKey,
};
use crate::runner::ds::value::{JsNumberType, JsValue};
use std::cell::RefCell;
use std::rc::Rc;

lazy_static! {
    pub static ref ARRAY_LENGTH_PROP: PropertyKey = PropertyKey::Str("length".to_string());
}

/// Array exotic object: `length` tracks the largest index and truncates on shrink.
pub struct ArrayObject {
    base: ObjectBase,
}
impl ArrayObject {
    pub fn new(length: u32, proto: Option<JsObjectType>) -> Self {
        let mut base = ObjectBase::new(proto);
        base.insert_property(
            ARRAY_LENGTH_PROP.clone(),
            PropertyDescriptor::new_data(
                JsValue::Number(JsNumberType::Integer(length as i64)),
                true,
                false,
                false,
            ),
        );
        ArrayObject { base }
    }

    fn get_own_length_property(&self) -> PropertyDescriptorData {
        match self.get_own_property(&ARRAY_LENGTH_PROP) {
            Some(PropertyDescriptor::Data(d)) => d,
            _ => PropertyDescriptorData {
                value: JsValue::Number(JsNumberType::Integer(0)),
                writable: true,
                enumerable: false,
                configurable: false,
            },
        }
    }

    pub fn length(&self) -> u32 {
        length_of(&self.get_own_length_property().value)
    }

    fn set_length_unchecked(&mut self, length: u32, writable: Option<bool>) {
        let mut desc = self.get_own_length_property();
        desc.value = JsValue::Number(JsNumberType::Integer(length as i64));
        if let Some(writable) = writable {
            desc.writable = writable;
        }
        self.base
            .insert_property(ARRAY_LENGTH_PROP.clone(), PropertyDescriptor::Data(desc));
    }
}
impl JsObject for ArrayObject {
    fn get_object_base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn get_object_base(&self) -> &ObjectBase {
        &self.base
    }

    fn define_own_property(
        &mut self,
        property: PropertyKey,
        descriptor_setter: PropertyDescriptorSetter,
    ) -> bool {
        match &property {
            PropertyKey::Str(s) if s == "length" => array_set_length(self, descriptor_setter),
            PropertyKey::Int(idx) => {
                let idx = *idx;
                let len_desc = self.get_own_length_property();
                let old_len = length_of(&len_desc.value);
                if idx >= old_len && !len_desc.writable {
                    return false;
                }
                if !ordinary_define_own_property(self, property, descriptor_setter) {
                    return false;
                }
                if idx >= old_len {
                    self.set_length_unchecked(idx + 1, None);
                }
                true
            }
            _ => ordinary_define_own_property(self, property, descriptor_setter),
        }
    }
}

fn length_of(value: &JsValue) -> u32 {
    match value {
        JsValue::Number(JsNumberType::Integer(i)) if *i >= 0 => *i as u32,
        _ => 0,
    }
}

/// ArraySetLength. A non-integral or negative length is rejected rather than thrown
/// here; callers that need the RangeError check the value before defining.
pub fn array_set_length(array: &mut ArrayObject, descriptor_setter: PropertyDescriptorSetter) -> bool {
    let new_length = match descriptor_setter.value() {
        None => {
            return ordinary_define_own_property(
                array,
                ARRAY_LENGTH_PROP.clone(),
                descriptor_setter,
            )
        }
        Some(JsValue::Number(JsNumberType::Integer(i))) if *i >= 0 && *i <= u32::MAX as i64 => {
            *i as u32
        }
        Some(_) => return false,
    };
    let old_descriptor = array.get_own_length_property();
    let old_length = length_of(&old_descriptor.value);
    if new_length >= old_length {
        return ordinary_define_own_property(array, ARRAY_LENGTH_PROP.clone(), descriptor_setter);
    }
    if !old_descriptor.writable {
        return false;
    }
    let new_writable = descriptor_setter.writable().unwrap_or(true);
    let mut idx = old_length;
    while idx > new_length {
        idx -= 1;
        if !array.delete(&PropertyKey::Int(idx)) {
            array.set_length_unchecked(idx + 1, if new_writable { None } else { Some(false) });
            return false;
        }
    }
    let mut setter = descriptor_setter;
    if let PropertyDescriptor::Data(d) = &mut setter.descriptor {
        d.writable = new_writable;
    }
    ordinary_define_own_property(array, ARRAY_LENGTH_PROP.clone(), setter)
}

pub fn array_create(length: u32, proto: Option<JsObjectType>) -> JsObjectType {
    Rc::new(RefCell::new(ObjectType::Array(ArrayObject::new(length, proto))))
}

/// CreateArrayFromList.
pub fn create_array_from_list(elements: Vec<JsValue>, proto: Option<JsObjectType>) -> JsObjectType {
    let mut array = ArrayObject::new(0, proto);
    for (i, element) in elements.into_iter().enumerate() {
        array.define_own_property(
            PropertyKey::Int(i as u32),
            PropertyDescriptorSetter::new_from_property_descriptor(
                PropertyDescriptor::new_default_data(element),
            ),
        );
    }
    Rc::new(RefCell::new(ObjectType::Array(array)))
}
