use crate::runner::ds::error::ErrorKind;
use crate::runner::ds::object::{JsObject, JsObjectType, ObjectBase, ObjectType};
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::value::JsValue;
use std::cell::RefCell;
use std::rc::Rc;

lazy_static! {
    pub static ref ERROR_MESSAGE_PROP: PropertyKey = PropertyKey::from("message");
}

/// An ordinary object with an `[[ErrorData]]` slot.
pub struct ErrorObject {
    base: ObjectBase,
    kind: ErrorKind,
}
impl ErrorObject {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The own `message`, when it is a string data property.
    pub fn message(&self) -> Option<String> {
        match self.get_own_property(&ERROR_MESSAGE_PROP) {
            Some(PropertyDescriptor::Data(d)) => match d.value {
                JsValue::String(s) => Some(s),
                _ => None,
            },
            _ => None,
        }
    }
}
impl JsObject for ErrorObject {
    fn get_object_base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn get_object_base(&self) -> &ObjectBase {
        &self.base
    }
}

pub fn error_create(kind: ErrorKind, message: Option<String>, proto: JsObjectType) -> JsObjectType {
    let mut base = ObjectBase::new(Some(proto));
    if let Some(message) = message {
        base.insert_property(
            ERROR_MESSAGE_PROP.clone(),
            PropertyDescriptor::new_data(JsValue::String(message), true, false, true),
        );
    }
    Rc::new(RefCell::new(ObjectType::Error(ErrorObject { base, kind })))
}
