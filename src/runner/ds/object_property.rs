use std::fmt;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::operations::test_and_comparison::same_value;
use crate::runner::ds::symbol::SymbolData;
use crate::runner::ds::value::JsValue;

/// Canonical array indices are stored as `Int` so `"0"` and `0` name the same property.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum PropertyKey {
    Str(String),
    Int(u32),
    Sym(SymbolData),
}
impl PropertyKey {
    pub fn is_array_index(&self) -> bool {
        matches!(self, PropertyKey::Int(_))
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, PropertyKey::Sym(_))
    }

    /// The value `Reflect.ownKeys` would report for this key.
    pub fn to_js_value(&self) -> JsValue {
        match self {
            PropertyKey::Str(s) => JsValue::String(s.to_string()),
            PropertyKey::Int(i) => JsValue::String(i.to_string()),
            PropertyKey::Sym(s) => JsValue::Symbol(s.clone()),
        }
    }
}
impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        match canonical_array_index(s) {
            Some(i) => PropertyKey::Int(i),
            None => PropertyKey::Str(s.to_string()),
        }
    }
}
impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        match canonical_array_index(&s) {
            Some(i) => PropertyKey::Int(i),
            None => PropertyKey::Str(s),
        }
    }
}
impl From<u32> for PropertyKey {
    fn from(i: u32) -> Self {
        PropertyKey::Int(i)
    }
}
impl Display for PropertyKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Str(s) => write!(f, "{}", s),
            PropertyKey::Int(i) => write!(f, "{}", i),
            PropertyKey::Sym(s) => write!(f, "{}", s),
        }
    }
}

/// `"0"`, `"1"`, ... `"4294967294"`; no leading zeros, no sign.
pub fn canonical_array_index(s: &str) -> Option<u32> {
    if s.is_empty() || (s.len() > 1 && s.starts_with('0')) {
        return None;
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match s.parse::<u64>() {
        Ok(n) if n < u32::MAX as u64 => Some(n as u32),
        _ => None,
    }
}

#[derive(Clone)]
pub struct PropertyDescriptorData {
    pub value: JsValue,
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

#[derive(Clone)]
pub struct PropertyDescriptorAccessor {
    pub get: Option<JsObjectType>,
    pub set: Option<JsObjectType>,
    pub enumerable: bool,
    pub configurable: bool,
}

#[derive(Clone)]
pub enum PropertyDescriptor {
    Data(PropertyDescriptorData),
    Accessor(PropertyDescriptorAccessor),
}
impl PropertyDescriptor {
    pub fn new_data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        PropertyDescriptor::Data(PropertyDescriptorData {
            value,
            writable,
            enumerable,
            configurable,
        })
    }

    pub fn new_accessor(
        get: Option<JsObjectType>,
        set: Option<JsObjectType>,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        PropertyDescriptor::Accessor(PropertyDescriptorAccessor {
            get,
            set,
            enumerable,
            configurable,
        })
    }

    /// The descriptor `CreateDataProperty` installs.
    pub fn new_default_data(value: JsValue) -> Self {
        Self::new_data(value, true, true, true)
    }

    pub fn new_from_property_descriptor_setter(desc_setter: PropertyDescriptorSetter) -> Self {
        let enumerable = desc_setter.honour_enumerable && desc_setter.descriptor.is_enumerable();
        let configurable =
            desc_setter.honour_configurable && desc_setter.descriptor.is_configurable();
        if desc_setter.is_accessor_descriptor() {
            if let PropertyDescriptor::Accessor(a) = desc_setter.descriptor {
                return PropertyDescriptor::Accessor(PropertyDescriptorAccessor {
                    get: if desc_setter.honour_get { a.get } else { None },
                    set: if desc_setter.honour_set { a.set } else { None },
                    enumerable,
                    configurable,
                });
            }
        }
        match desc_setter.descriptor {
            PropertyDescriptor::Data(d) => PropertyDescriptor::Data(PropertyDescriptorData {
                value: if desc_setter.honour_value {
                    d.value
                } else {
                    JsValue::Undefined
                },
                writable: desc_setter.honour_writable && d.writable,
                enumerable,
                configurable,
            }),
            PropertyDescriptor::Accessor(_) => PropertyDescriptor::Data(PropertyDescriptorData {
                value: JsValue::Undefined,
                writable: false,
                enumerable,
                configurable,
            }),
        }
    }

    pub fn is_enumerable(&self) -> bool {
        match self {
            PropertyDescriptor::Data(d) => d.enumerable,
            PropertyDescriptor::Accessor(a) => a.enumerable,
        }
    }

    pub fn is_configurable(&self) -> bool {
        match self {
            PropertyDescriptor::Data(d) => d.configurable,
            PropertyDescriptor::Accessor(a) => a.configurable,
        }
    }

    pub fn is_data_descriptor(&self) -> bool {
        matches!(self, PropertyDescriptor::Data(_))
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        matches!(self, PropertyDescriptor::Accessor(_))
    }

    /// Non-writable data or accessor; either way a plain `[[Set]]` cannot change it.
    pub fn is_writable(&self) -> bool {
        match self {
            PropertyDescriptor::Data(d) => d.writable,
            PropertyDescriptor::Accessor(_) => false,
        }
    }
}
impl PartialEq for PropertyDescriptor {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropertyDescriptor::Data(a), PropertyDescriptor::Data(b)) => {
                same_value(&a.value, &b.value)
                    && a.writable == b.writable
                    && a.enumerable == b.enumerable
                    && a.configurable == b.configurable
            }
            (PropertyDescriptor::Accessor(a), PropertyDescriptor::Accessor(b)) => {
                same_optional_object(&a.get, &b.get)
                    && same_optional_object(&a.set, &b.set)
                    && a.enumerable == b.enumerable
                    && a.configurable == b.configurable
            }
            _ => false,
        }
    }
}

pub fn same_optional_object(a: &Option<JsObjectType>, b: &Option<JsObjectType>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// A possibly partial descriptor, as passed to `[[DefineOwnProperty]]`. Only the fields
/// whose `honour_*` flag is set are present; the rest of `descriptor` is ignored.
#[derive(Clone)]
pub struct PropertyDescriptorSetter {
    pub honour_value: bool,
    pub honour_writable: bool,
    pub honour_set: bool,
    pub honour_get: bool,
    pub honour_enumerable: bool,
    pub honour_configurable: bool,
    pub descriptor: PropertyDescriptor,
}
impl PropertyDescriptorSetter {
    pub fn new_from_property_descriptor(desc: PropertyDescriptor) -> Self {
        match desc {
            PropertyDescriptor::Data { .. } => PropertyDescriptorSetter {
                honour_value: true,
                honour_writable: true,
                honour_configurable: true,
                honour_enumerable: true,
                descriptor: desc,
                honour_set: false,
                honour_get: false,
            },
            PropertyDescriptor::Accessor { .. } => PropertyDescriptorSetter {
                honour_set: true,
                honour_get: true,
                honour_configurable: true,
                honour_enumerable: true,
                descriptor: desc,
                honour_value: false,
                honour_writable: false,
            },
        }
    }

    /// `{ value }` and nothing else, what OrdinarySet uses to update an existing property.
    pub fn new_value_only(value: JsValue) -> Self {
        PropertyDescriptorSetter {
            honour_value: true,
            honour_writable: false,
            honour_set: false,
            honour_get: false,
            honour_enumerable: false,
            honour_configurable: false,
            descriptor: PropertyDescriptor::new_data(value, false, false, false),
        }
    }

    /// A generic descriptor carrying at most `enumerable` and `configurable`.
    pub fn new_generic(enumerable: Option<bool>, configurable: Option<bool>) -> Self {
        PropertyDescriptorSetter {
            honour_value: false,
            honour_writable: false,
            honour_set: false,
            honour_get: false,
            honour_enumerable: enumerable.is_some(),
            honour_configurable: configurable.is_some(),
            descriptor: PropertyDescriptor::new_data(
                JsValue::Undefined,
                false,
                enumerable.unwrap_or(false),
                configurable.unwrap_or(false),
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.honour_configurable
            && !self.honour_enumerable
            && !self.honour_get
            && !self.honour_set
            && !self.honour_value
            && !self.honour_writable
    }

    pub fn is_generic_descriptor(&self) -> bool {
        !self.honour_get && !self.honour_set && !self.honour_value && !self.honour_writable
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        self.honour_get || self.honour_set
    }

    pub fn is_data_descriptor(&self) -> bool {
        self.honour_value || self.honour_writable
    }

    pub fn configurable(&self) -> Option<bool> {
        if self.honour_configurable {
            Some(self.descriptor.is_configurable())
        } else {
            None
        }
    }

    pub fn enumerable(&self) -> Option<bool> {
        if self.honour_enumerable {
            Some(self.descriptor.is_enumerable())
        } else {
            None
        }
    }

    pub fn writable(&self) -> Option<bool> {
        match (&self.descriptor, self.honour_writable) {
            (PropertyDescriptor::Data(d), true) => Some(d.writable),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&JsValue> {
        match (&self.descriptor, self.honour_value) {
            (PropertyDescriptor::Data(d), true) => Some(&d.value),
            _ => None,
        }
    }

    pub fn getter(&self) -> Option<&Option<JsObjectType>> {
        match (&self.descriptor, self.honour_get) {
            (PropertyDescriptor::Accessor(a), true) => Some(&a.get),
            _ => None,
        }
    }

    pub fn setter(&self) -> Option<&Option<JsObjectType>> {
        match (&self.descriptor, self.honour_set) {
            (PropertyDescriptor::Accessor(a), true) => Some(&a.set),
            _ => None,
        }
    }

    /// Applies the present fields over `current`, producing the stored descriptor.
    pub fn merge_into(&self, current: &PropertyDescriptor) -> PropertyDescriptor {
        let enumerable = self.enumerable().unwrap_or_else(|| current.is_enumerable());
        let configurable = self.configurable().unwrap_or_else(|| current.is_configurable());
        if self.is_generic_descriptor() {
            return match current {
                PropertyDescriptor::Data(d) => PropertyDescriptor::new_data(
                    d.value.clone(),
                    d.writable,
                    enumerable,
                    configurable,
                ),
                PropertyDescriptor::Accessor(a) => PropertyDescriptor::new_accessor(
                    a.get.clone(),
                    a.set.clone(),
                    enumerable,
                    configurable,
                ),
            };
        }
        if self.is_accessor_descriptor() {
            let (cur_get, cur_set) = match current {
                PropertyDescriptor::Accessor(a) => (a.get.clone(), a.set.clone()),
                PropertyDescriptor::Data(_) => (None, None),
            };
            PropertyDescriptor::new_accessor(
                self.getter().cloned().unwrap_or(cur_get),
                self.setter().cloned().unwrap_or(cur_set),
                enumerable,
                configurable,
            )
        } else {
            let (cur_value, cur_writable) = match current {
                PropertyDescriptor::Data(d) => (d.value.clone(), d.writable),
                PropertyDescriptor::Accessor(_) => (JsValue::Undefined, false),
            };
            PropertyDescriptor::new_data(
                self.value().cloned().unwrap_or(cur_value),
                self.writable().unwrap_or(cur_writable),
                enumerable,
                configurable,
            )
        }
    }
}
