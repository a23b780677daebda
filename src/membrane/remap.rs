//! Installing the other realm's descriptors onto local objects.
//!
//! This is how endowments reach the red global: `remap` installs them immediately, while
//! `lazy_remap` installs placeholder accessors that fetch the real descriptor the first
//! time the property is touched.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::membrane::marshal::MembraneMarshal;
use crate::membrane::pointer::{CrossDescriptor, CrossValue};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::{new_native_function, NativeFn};
use crate::runner::ds::object::{JsObjectType, ObjectType};
use crate::runner::ds::object_property::{
    PropertyDescriptor, PropertyDescriptorSetter, PropertyKey,
};
use crate::runner::ds::operations::object as ops;
use crate::runner::ds::value::JsValue;
use crate::runner::std_lib::array::is_array;

impl MembraneMarshal {
    /// Whether `key` may be installed on `target` at all: index keys only go onto arrays,
    /// and a non-configurable property the target already has always wins. Targets are
    /// always objects of this realm, never snapshot views, so an array target is live.
    fn accepts_key(&self, target: &JsObjectType, key: &PropertyKey, array_target: bool) -> Result<bool, JErrorType> {
        if key.is_array_index() && !array_target {
            return Ok(false);
        }
        Ok(ops::get_own_property(target, key)?.map_or(true, |d| d.is_configurable()))
    }

    pub(super) fn remap_onto(
        &self,
        target: &JsObjectType,
        descriptors: Vec<(PropertyKey, CrossDescriptor)>,
    ) -> Result<(), JErrorType> {
        let array_target = is_array(&JsValue::Object(target.clone()))?;
        let mut installed = 0;
        for (key, desc) in descriptors {
            if !self.accepts_key(target, &key, array_target)? {
                debug!(realm = %self.color, %key, "Skipping remap of untamable key");
                continue;
            }
            let getter_only = desc.is_getter_only();
            let desc = self.import_descriptor(desc)?;
            if self.install_remapped(target, key, desc, getter_only)? {
                installed += 1;
            }
        }
        debug!(realm = %self.color, installed, "Remapped descriptors");
        Ok(())
    }

    /// Defines `desc` on `target`. A getter-only accessor gets a setter that shadows the
    /// written value on the receiver instead of reaching the original.
    fn install_remapped(
        &self,
        target: &JsObjectType,
        key: PropertyKey,
        mut desc: PropertyDescriptorSetter,
        getter_only: bool,
    ) -> Result<bool, JErrorType> {
        if getter_only {
            if let PropertyDescriptor::Accessor(a) = &mut desc.descriptor {
                a.set = Some(self.shadowing_setter(&key));
                desc.honour_set = true;
            }
        }
        ops::define_own_property(target, key, desc)
    }

    fn shadowing_setter(&self, key: &PropertyKey) -> JsObjectType {
        let shadowed = key.clone();
        let behaviour: NativeFn = Rc::new(move |this, args, _| {
            if let JsValue::Object(receiver) = this {
                let value = args.into_iter().next().unwrap_or(JsValue::Undefined);
                ops::create_data_property(&receiver, shadowed.clone(), value)?;
            }
            Ok(JsValue::Undefined)
        });
        self.local_function(&format!("set {}", key), behaviour)
    }

    fn local_function(&self, name: &str, behaviour: NativeFn) -> JsObjectType {
        let intrinsics = self.intrinsics();
        new_native_function(
            name,
            1,
            false,
            Some(intrinsics.function_prototype.clone()),
            intrinsics.realm(),
            behaviour,
        )
    }

    /// `source` must be a pointer to an object of the other realm. For a live source the
    /// accessors forward every read and write to it; otherwise they fetch the source's
    /// descriptor once and replace themselves with it.
    pub(super) fn install_lazy(
        &self,
        target: &JsObjectType,
        source: CrossValue,
        keys: Vec<PropertyKey>,
    ) -> Result<(), JErrorType> {
        let (pointer, traits) = match &source {
            CrossValue::Pointer(pointer, traits) if pointer.owner != self.color => (*pointer, *traits),
            _ => {
                return Err(JErrorType::TypeError(
                    "lazy remap source must be an object of the other realm".to_string(),
                ))
            }
        };
        let source = self.import_object(source)?;
        let array_target = is_array(&JsValue::Object(target.clone()))?;
        for key in keys {
            if !self.accepts_key(target, &key, array_target)? {
                continue;
            }
            let entry = Rc::new(LazyEntry {
                marshal: self.this.clone(),
                target: Rc::downgrade(target),
                source: source.clone(),
                source_id: pointer.id,
                key: key.clone(),
                done: Cell::new(false),
            });
            let (get, set) = if traits.live {
                (entry.forwarding_getter(), entry.forwarding_setter())
            } else {
                (entry.materializing_getter(), entry.materializing_setter())
            };
            let get = self.local_function(&format!("get {}", key), get);
            let set = self.local_function(&format!("set {}", key), set);
            ops::define_own_property(
                target,
                key,
                PropertyDescriptorSetter::new_from_property_descriptor(
                    PropertyDescriptor::new_accessor(Some(get), Some(set), true, true),
                ),
            )?;
        }
        debug!(realm = %self.color, source = %pointer, live = traits.live, "Installed lazy descriptors");
        Ok(())
    }
}

/// One key installed by `lazy_remap`, shared by its placeholder getter and setter.
struct LazyEntry {
    marshal: Weak<MembraneMarshal>,
    target: Weak<std::cell::RefCell<ObjectType>>,
    source: JsObjectType,
    source_id: u64,
    key: PropertyKey,
    done: Cell<bool>,
}
impl LazyEntry {
    fn target(&self) -> Result<JsObjectType, JErrorType> {
        self.target
            .upgrade()
            .ok_or_else(|| JErrorType::TypeError("lazy remap target is gone".to_string()))
    }

    fn forwarding_getter(self: &Rc<Self>) -> NativeFn {
        let entry = self.clone();
        Rc::new(move |_, _, _| {
            let receiver = JsValue::Object(entry.source.clone());
            ops::get(&entry.source, &entry.key, &receiver)
        })
    }

    fn forwarding_setter(self: &Rc<Self>) -> NativeFn {
        let entry = self.clone();
        Rc::new(move |_, args, _| {
            let value = args.into_iter().next().unwrap_or(JsValue::Undefined);
            let receiver = JsValue::Object(entry.source.clone());
            ops::set(&entry.source, entry.key.clone(), value, &receiver)?;
            Ok(JsValue::Undefined)
        })
    }

    /// Replaces the placeholder with the source's current descriptor, or removes it when
    /// the source has no such property. Placeholders kept past that point read and write
    /// the materialized property.
    fn materialize(&self) -> Result<(), JErrorType> {
        if self.done.get() {
            return Ok(());
        }
        let marshal = self.marshal.upgrade().ok_or_else(|| {
            JErrorType::TypeError("the membrane has been disconnected".to_string())
        })?;
        let target = self.target()?;
        let desc = marshal.call_foreign(|f| f.get_own_property_descriptor(self.source_id, self.key.clone()))?;
        match desc {
            Some(desc) => {
                let getter_only = desc.is_getter_only();
                let desc = marshal.import_descriptor(desc)?;
                marshal.install_remapped(&target, self.key.clone(), desc, getter_only)?;
            }
            None => {
                ops::delete(&target, &self.key)?;
            }
        }
        self.done.set(true);
        debug!(realm = %marshal.color, key = %self.key, "Materialized lazy descriptor");
        Ok(())
    }

    fn materializing_getter(self: &Rc<Self>) -> NativeFn {
        let entry = self.clone();
        Rc::new(move |this, _, _| {
            entry.materialize()?;
            ops::get(&entry.target()?, &entry.key, &this)
        })
    }

    fn materializing_setter(self: &Rc<Self>) -> NativeFn {
        let entry = self.clone();
        Rc::new(move |this, args, _| {
            entry.materialize()?;
            let value = args.into_iter().next().unwrap_or(JsValue::Undefined);
            ops::set(&entry.target()?, entry.key.clone(), value, &this)?;
            Ok(JsValue::Undefined)
        })
    }
}
