//! One realm's half of a membrane.
//!
//! A `MembraneMarshal` turns local values into `CrossValue`s for the other half and back,
//! owns the realm's export registry and import table, and creates the proxies that stand
//! in for foreign objects. The blue half runs the embedder's policy callbacks while
//! exporting; the red half never does.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::membrane::callables::{CrossResult, RealmCallables};
use crate::membrane::connector::Connector;
use crate::membrane::handler::{ForwardHandler, ReverseHandler};
use crate::membrane::intrinsics::CapturedIntrinsics;
use crate::membrane::options::MembranePolicy;
use crate::membrane::pointer::{
    CrossDescriptor, CrossValue, Pointer, PointerTraits, RealmColor, TargetKind,
};
use crate::membrane::registry::{PointerRegistry, ProxyTable};
use crate::membrane::shadow::create_shadow_target;
use crate::runner::ds::array_object::create_array_from_list;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{JsObjectType, ObjectType};
use crate::runner::ds::object_property::{
    PropertyDescriptor, PropertyDescriptorSetter, PropertyKey,
};
use crate::runner::ds::operations::object as ops;
use crate::runner::ds::proxy_object::{proxy_create, proxy_revoke, ProxyHandler};
use crate::runner::ds::value::JsValue;
use crate::runner::std_lib::array::is_array;

/// Sizes of one half's side tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarshalStats {
    /// Local objects the other realm currently references.
    pub exported: usize,
    /// Of those, the ones kept for the environment's lifetime.
    pub pinned: usize,
    /// Foreign ids with a local stand-in, live or not yet swept.
    pub imported: usize,
    /// Of those, the ones shared by identity.
    pub linked: usize,
}

pub struct MembraneMarshal {
    pub(super) color: RealmColor,
    pub(super) connector: Rc<Connector>,
    pub(super) policy: MembranePolicy,
    pub(super) exports: RefCell<PointerRegistry>,
    pub(super) imports: RefCell<ProxyTable>,
    released: RefCell<Vec<u64>>,
    foreign: RefCell<Option<Weak<dyn RealmCallables>>>,
    pub(super) this: Weak<MembraneMarshal>,
}
impl MembraneMarshal {
    pub(crate) fn new(color: RealmColor, connector: Rc<Connector>, policy: MembranePolicy) -> Rc<Self> {
        Rc::new_cyclic(|this| MembraneMarshal {
            color,
            connector,
            policy,
            exports: RefCell::new(PointerRegistry::new()),
            imports: RefCell::new(ProxyTable::new()),
            released: RefCell::new(vec![]),
            foreign: RefCell::new(None),
            this: this.clone(),
        })
    }

    /// Completes the handshake: `other` becomes the half this one calls into.
    pub(crate) fn attach(&self, other: &Rc<MembraneMarshal>) {
        let other: Rc<dyn RealmCallables> = other.clone();
        *self.foreign.borrow_mut() = Some(Rc::downgrade(&other));
        debug!(realm = %self.color, "Attached membrane half");
    }

    pub fn color(&self) -> RealmColor {
        self.color
    }

    pub fn intrinsics(&self) -> &CapturedIntrinsics {
        self.connector.intrinsics()
    }

    pub(crate) fn foreign(&self) -> Result<Rc<dyn RealmCallables>, JErrorType> {
        self.foreign
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(|| JErrorType::TypeError("the membrane has been disconnected".to_string()))
    }

    /// Calls into the other half, re-homing whatever it throws.
    pub(crate) fn call_foreign<T>(
        &self,
        f: impl FnOnce(&dyn RealmCallables) -> CrossResult<T>,
    ) -> Result<T, JErrorType> {
        let foreign = self.foreign()?;
        f(&*foreign).map_err(|e| self.import_error(e))
    }

    /// Runs a callee-side operation, turning its abrupt completion into a `CrossError`.
    pub(super) fn boundary<T>(&self, f: impl FnOnce() -> Result<T, JErrorType>) -> CrossResult<T> {
        f().map_err(|e| self.export_error(e))
    }

    pub(crate) fn resolve_export(&self, id: u64) -> Result<JsObjectType, JErrorType> {
        self.exports.borrow().resolve(id).ok_or_else(|| {
            JErrorType::TypeError(format!(
                "pointer {} is no longer valid",
                Pointer {
                    owner: self.color,
                    id
                }
            ))
        })
    }

    /// Whether `o` is a stand-in for a value of the other realm.
    pub fn is_foreign(&self, o: &JsObjectType) -> bool {
        self.imports.borrow().foreign_id_of(o).is_some()
    }

    // ----- export -----

    pub fn export_value(&self, value: &JsValue) -> Result<CrossValue, JErrorType> {
        self.flush_released();
        self.export_at(value.clone(), 0, &mut vec![])
    }

    pub(crate) fn export_values(&self, values: &[JsValue]) -> Result<Vec<CrossValue>, JErrorType> {
        values.iter().map(|v| self.export_value(v)).collect()
    }

    /// Exports `o` as a pointer even when it is an array.
    pub(crate) fn export_reference(&self, o: &JsObjectType) -> Result<CrossValue, JErrorType> {
        self.flush_released();
        self.export_object(o.clone(), usize::MAX, &mut vec![])
    }

    fn export_at(
        &self,
        value: JsValue,
        depth: usize,
        visiting: &mut Vec<JsObjectType>,
    ) -> Result<CrossValue, JErrorType> {
        Ok(match self.policy.distort(value) {
            JsValue::Undefined => CrossValue::Undefined,
            JsValue::Null => CrossValue::Null,
            JsValue::Boolean(b) => CrossValue::Boolean(b),
            JsValue::String(s) => CrossValue::String(s),
            JsValue::Number(n) => CrossValue::Number(n),
            JsValue::Symbol(s) => CrossValue::Symbol(s),
            JsValue::Object(o) => self.export_object(o, depth, visiting)?,
        })
    }

    fn export_object(
        &self,
        o: JsObjectType,
        depth: usize,
        visiting: &mut Vec<JsObjectType>,
    ) -> Result<CrossValue, JErrorType> {
        let imported = self.imports.borrow().foreign_id_of(&o);
        if let Some((id, traits)) = imported {
            return Ok(CrossValue::Pointer(
                Pointer {
                    owner: self.color.opposite(),
                    id,
                },
                traits,
            ));
        }
        let length = match &*o.borrow() {
            ObjectType::Array(array) => Some(array.length()),
            _ => None,
        };
        if let Some(length) = length {
            let cyclic = visiting.iter().any(|v| Rc::ptr_eq(v, &o));
            if depth < self.policy.config.array_depth_limit && !cyclic {
                visiting.push(o.clone());
                let elements = self.export_elements(&o, length, depth, visiting);
                visiting.pop();
                return Ok(CrossValue::Array(elements?));
            }
        }
        let retained = self.exports.borrow_mut().retain(&o);
        let (id, traits) = match retained {
            Some(found) => found,
            None => {
                let traits = self.traits_for(&o);
                let exported = self.exports.borrow_mut().insert(&o, traits);
                if traits.revoked {
                    self.exports.borrow_mut().pin(&o, traits);
                }
                exported
            }
        };
        Ok(CrossValue::Pointer(
            Pointer {
                owner: self.color,
                id,
            },
            traits,
        ))
    }

    fn export_elements(
        &self,
        array: &JsObjectType,
        length: u32,
        depth: usize,
        visiting: &mut Vec<JsObjectType>,
    ) -> Result<Vec<CrossValue>, JErrorType> {
        let receiver = JsValue::Object(array.clone());
        let mut elements = Vec::with_capacity(length as usize);
        for i in 0..length {
            let exported = ops::get(array, &PropertyKey::Int(i), &receiver)
                .and_then(|element| self.export_at(element, depth + 1, visiting));
            match exported {
                Ok(element) => elements.push(element),
                Err(e) => {
                    elements.iter().for_each(|element| self.release_exported(element));
                    return Err(e);
                }
            }
        }
        Ok(elements)
    }

    /// Gives back the references `value` took on export when it never reaches the other
    /// realm.
    pub(crate) fn release_exported(&self, value: &CrossValue) {
        match value {
            CrossValue::Pointer(pointer, _) if pointer.owner == self.color => {
                let freed = self.exports.borrow_mut().release(pointer.id, 1);
                drop(freed);
            }
            CrossValue::Array(elements) => {
                elements.iter().for_each(|element| self.release_exported(element))
            }
            _ => {}
        }
    }

    pub(crate) fn release_exported_descriptor(&self, desc: &CrossDescriptor) {
        for value in [&desc.value, &desc.get, &desc.set].into_iter().flatten() {
            self.release_exported(value);
        }
    }

    /// Shape of `o`, plus the policy verdicts when this is the blue half.
    pub(super) fn traits_for(&self, o: &JsObjectType) -> PointerTraits {
        let mut traits = PointerTraits::new(kind_of(o));
        if self.color == RealmColor::Blue {
            traits.live = self.policy.is_live(o);
            traits.revoked = self.policy.is_revoked(o);
        }
        traits
    }

    pub fn export_descriptor(&self, desc: &PropertyDescriptor) -> Result<CrossDescriptor, JErrorType> {
        Ok(match desc {
            PropertyDescriptor::Data(d) => CrossDescriptor {
                value: Some(self.export_value(&d.value)?),
                writable: Some(d.writable),
                get: None,
                set: None,
                enumerable: Some(d.enumerable),
                configurable: Some(d.configurable),
            },
            PropertyDescriptor::Accessor(a) => CrossDescriptor {
                value: None,
                writable: None,
                get: Some(self.export_accessor(&a.get)?),
                set: Some(self.export_accessor(&a.set)?),
                enumerable: Some(a.enumerable),
                configurable: Some(a.configurable),
            },
        })
    }

    /// Only the fields the partial descriptor carries cross.
    pub fn export_partial_descriptor(
        &self,
        desc: &PropertyDescriptorSetter,
    ) -> Result<CrossDescriptor, JErrorType> {
        Ok(CrossDescriptor {
            value: desc.value().map(|v| self.export_value(v)).transpose()?,
            writable: desc.writable(),
            get: desc.getter().map(|g| self.export_accessor(g)).transpose()?,
            set: desc.setter().map(|s| self.export_accessor(s)).transpose()?,
            enumerable: desc.enumerable(),
            configurable: desc.configurable(),
        })
    }

    fn export_accessor(&self, f: &Option<JsObjectType>) -> Result<CrossValue, JErrorType> {
        match f {
            Some(f) => self.export_value(&JsValue::Object(f.clone())),
            None => Ok(CrossValue::Undefined),
        }
    }

    // ----- import -----

    pub fn import_value(&self, value: CrossValue) -> Result<JsValue, JErrorType> {
        self.flush_released();
        self.import_at(value)
    }

    pub(crate) fn import_values(&self, values: Vec<CrossValue>) -> Result<Vec<JsValue>, JErrorType> {
        values.into_iter().map(|v| self.import_value(v)).collect()
    }

    pub(crate) fn import_object(&self, value: CrossValue) -> Result<JsObjectType, JErrorType> {
        match self.import_value(value)? {
            JsValue::Object(o) => Ok(o),
            other => Err(JErrorType::TypeError(format!("{} is not an object", other))),
        }
    }

    /// A prototype: an object or `null`.
    pub(crate) fn import_proto(&self, value: CrossValue) -> Result<Option<JsObjectType>, JErrorType> {
        match self.import_value(value)? {
            JsValue::Object(o) => Ok(Some(o)),
            JsValue::Null => Ok(None),
            other => Err(JErrorType::TypeError(format!(
                "Object prototype may only be an Object or null: {}",
                other
            ))),
        }
    }

    fn import_at(&self, value: CrossValue) -> Result<JsValue, JErrorType> {
        Ok(match value {
            CrossValue::Undefined => JsValue::Undefined,
            CrossValue::Null => JsValue::Null,
            CrossValue::Boolean(b) => JsValue::Boolean(b),
            CrossValue::String(s) => JsValue::String(s),
            CrossValue::Number(n) => JsValue::Number(n),
            CrossValue::Symbol(s) => JsValue::Symbol(s),
            CrossValue::Array(elements) => {
                let values = elements
                    .into_iter()
                    .map(|e| self.import_at(e))
                    .collect::<Result<Vec<_>, _>>()?;
                JsValue::Object(create_array_from_list(
                    values,
                    Some(self.intrinsics().array_prototype.clone()),
                ))
            }
            CrossValue::Pointer(pointer, traits) => {
                JsValue::Object(self.import_pointer(pointer, traits)?)
            }
        })
    }

    /// The local value for `pointer`: our own object when it is ours, otherwise the one
    /// proxy (or linked value) standing in for the foreign object.
    pub(crate) fn import_pointer(
        &self,
        pointer: Pointer,
        traits: PointerTraits,
    ) -> Result<JsObjectType, JErrorType> {
        if pointer.owner == self.color {
            return self.resolve_export(pointer.id);
        }
        let existing = self.imports.borrow().get(pointer.id);
        if let Some(local) = existing {
            // The exporter counted one more reference than we need.
            self.foreign()?.release_pointer(pointer.id, 1);
            return Ok(local);
        }
        let stale = self.imports.borrow_mut().remove_if_dead(pointer.id);
        if stale {
            self.foreign()?.release_pointer(pointer.id, 1);
        }
        let proxy = self.create_proxy(pointer.id, traits);
        self.imports
            .borrow_mut()
            .insert_proxy(pointer.id, &proxy, traits);
        Ok(proxy)
    }

    fn create_proxy(&self, id: u64, traits: PointerTraits) -> JsObjectType {
        let shadow = create_shadow_target(traits.kind);
        let handler: Rc<dyn ProxyHandler> = match self.color {
            RealmColor::Red => Rc::new(ForwardHandler::new(self.this.clone(), id, traits.live)),
            RealmColor::Blue => Rc::new(ReverseHandler::new(self.this.clone(), id)),
        };
        let proxy = proxy_create(shadow, handler);
        if traits.revoked {
            proxy_revoke(&proxy);
        }
        debug!(
            realm = %self.color,
            id,
            kind = ?traits.kind,
            live = traits.live,
            revoked = traits.revoked,
            "Created membrane proxy"
        );
        proxy
    }

    pub fn import_descriptor(&self, desc: CrossDescriptor) -> Result<PropertyDescriptorSetter, JErrorType> {
        let enumerable = desc.enumerable;
        let configurable = desc.configurable;
        if desc.is_accessor() {
            let get = desc
                .get
                .map(|g| self.import_accessor(g, "Getter"))
                .transpose()?;
            let set = desc
                .set
                .map(|s| self.import_accessor(s, "Setter"))
                .transpose()?;
            Ok(PropertyDescriptorSetter {
                honour_value: false,
                honour_writable: false,
                honour_get: get.is_some(),
                honour_set: set.is_some(),
                honour_enumerable: enumerable.is_some(),
                honour_configurable: configurable.is_some(),
                descriptor: PropertyDescriptor::new_accessor(
                    get.flatten(),
                    set.flatten(),
                    enumerable.unwrap_or(false),
                    configurable.unwrap_or(false),
                ),
            })
        } else {
            let value = desc.value.map(|v| self.import_value(v)).transpose()?;
            Ok(PropertyDescriptorSetter {
                honour_value: value.is_some(),
                honour_writable: desc.writable.is_some(),
                honour_get: false,
                honour_set: false,
                honour_enumerable: enumerable.is_some(),
                honour_configurable: configurable.is_some(),
                descriptor: PropertyDescriptor::new_data(
                    value.unwrap_or(JsValue::Undefined),
                    desc.writable.unwrap_or(false),
                    enumerable.unwrap_or(false),
                    configurable.unwrap_or(false),
                ),
            })
        }
    }

    /// A descriptor the owner reported for an existing property, so every field is set.
    pub fn import_complete_descriptor(&self, desc: CrossDescriptor) -> Result<PropertyDescriptor, JErrorType> {
        Ok(PropertyDescriptor::new_from_property_descriptor_setter(
            self.import_descriptor(desc)?,
        ))
    }

    fn import_accessor(&self, f: CrossValue, what: &str) -> Result<Option<JsObjectType>, JErrorType> {
        match self.import_value(f)? {
            JsValue::Undefined => Ok(None),
            JsValue::Object(o) => Ok(Some(o)),
            other => Err(JErrorType::TypeError(format!(
                "{} must be a function: {}",
                what, other
            ))),
        }
    }

    // ----- release -----

    /// Called when a proxy of ours goes away; processed on the next import or export.
    pub(crate) fn queue_release(&self, id: u64) {
        if let Ok(mut released) = self.released.try_borrow_mut() {
            released.push(id);
        }
    }

    /// Gives back the exporter's count for every dropped proxy.
    pub(crate) fn flush_released(&self) {
        let ids = match self.released.try_borrow_mut() {
            Ok(mut released) => std::mem::take(&mut *released),
            Err(_) => return,
        };
        if ids.is_empty() {
            return;
        }
        let foreign = match self.foreign() {
            Ok(foreign) => foreign,
            Err(_) => return,
        };
        for id in ids {
            let dead = self.imports.borrow_mut().remove_if_dead(id);
            if dead {
                foreign.release_pointer(id, 1);
            }
        }
    }

    pub fn stats(&self) -> MarshalStats {
        let exports = self.exports.borrow();
        let imports = self.imports.borrow();
        MarshalStats {
            exported: exports.len(),
            pinned: exports.pinned_count(),
            imported: imports.len(),
            linked: imports.linked_count(),
        }
    }
}

pub(super) fn kind_of(o: &JsObjectType) -> TargetKind {
    let callable = {
        let b = o.borrow();
        if b.is_callable() {
            Some(b.is_constructor())
        } else {
            None
        }
    };
    match callable {
        Some(constructor) => TargetKind::Function { constructor },
        None if is_array(&JsValue::Object(o.clone())).unwrap_or(false) => TargetKind::Array,
        None => TargetKind::Object,
    }
}

/// Own property descriptors of `o`, in key order.
pub(super) fn local_descriptors(
    o: &JsObjectType,
) -> Result<Vec<(PropertyKey, PropertyDescriptor)>, JErrorType> {
    let mut descriptors = vec![];
    for key in ops::own_property_keys(o)? {
        if let Some(desc) = ops::get_own_property(o, &key)? {
            descriptors.push((key, desc));
        }
    }
    Ok(descriptors)
}
