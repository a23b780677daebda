//! Trap handlers of membrane proxies.
//!
//! `ForwardHandler` backs red proxies of blue objects. By default it copies the original
//! into its shadow on the first trap and answers from the shadow afterwards; a live
//! target forwards every trap instead. `ReverseHandler` backs blue proxies of red
//! objects: reads are always live and nothing that would change the red object's shape
//! ever succeeds.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::membrane::marshal::MembraneMarshal;
use crate::membrane::shadow::{populate_shadow, sync_descriptor, ShadowSnapshot, ShadowState};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::object_property::{
    PropertyDescriptor, PropertyDescriptorSetter, PropertyKey,
};
use crate::runner::ds::operations::object as ops;
use crate::runner::ds::proxy_object::ProxyHandler;
use crate::runner::ds::value::JsValue;

/// The foreign object a proxy stands for, reached through the other membrane half.
/// Dropping it gives the exporter's reference back.
struct RemoteTarget {
    marshal: Weak<MembraneMarshal>,
    id: u64,
}
impl RemoteTarget {
    fn marshal(&self) -> Result<Rc<MembraneMarshal>, JErrorType> {
        self.marshal.upgrade().ok_or_else(|| {
            JErrorType::TypeError("the membrane has been disconnected".to_string())
        })
    }

    fn trace(&self, trap: &'static str, key: Option<&PropertyKey>) {
        if let Some(m) = self.marshal.upgrade() {
            if m.policy.config.trace_traps {
                match key {
                    Some(key) => trace!(realm = %m.color(), id = self.id, trap, %key, "Proxy trap"),
                    None => trace!(realm = %m.color(), id = self.id, trap, "Proxy trap"),
                }
            }
        }
    }

    fn get_prototype_of(&self) -> Result<Option<JsObjectType>, JErrorType> {
        let m = self.marshal()?;
        let proto = m.call_foreign(|f| f.get_prototype_of(self.id))?;
        m.import_proto(proto)
    }

    fn set_prototype_of(&self, proto: Option<JsObjectType>) -> Result<bool, JErrorType> {
        let m = self.marshal()?;
        let proto = match proto {
            Some(p) => m.export_value(&JsValue::Object(p))?,
            None => m.export_value(&JsValue::Null)?,
        };
        m.call_foreign(|f| f.set_prototype_of(self.id, proto))
    }

    fn is_extensible(&self) -> Result<bool, JErrorType> {
        self.marshal()?.call_foreign(|f| f.is_extensible(self.id))
    }

    fn prevent_extensions(&self) -> Result<bool, JErrorType> {
        self.marshal()?.call_foreign(|f| f.prevent_extensions(self.id))
    }

    fn get_own_property_descriptor(
        &self,
        key: &PropertyKey,
    ) -> Result<Option<PropertyDescriptor>, JErrorType> {
        let m = self.marshal()?;
        match m.call_foreign(|f| f.get_own_property_descriptor(self.id, key.clone()))? {
            Some(desc) => Ok(Some(m.import_complete_descriptor(desc)?)),
            None => Ok(None),
        }
    }

    fn define_property(
        &self,
        key: &PropertyKey,
        desc: &PropertyDescriptorSetter,
    ) -> Result<bool, JErrorType> {
        let m = self.marshal()?;
        let desc = m.export_partial_descriptor(desc)?;
        m.call_foreign(|f| f.define_property(self.id, key.clone(), desc))
    }

    fn has(&self, key: &PropertyKey) -> Result<bool, JErrorType> {
        self.marshal()?.call_foreign(|f| f.has(self.id, key.clone()))
    }

    fn get(&self, key: &PropertyKey, receiver: &JsValue) -> Result<JsValue, JErrorType> {
        let m = self.marshal()?;
        let receiver = m.export_value(receiver)?;
        let value = m.call_foreign(|f| f.get(self.id, key.clone(), receiver))?;
        m.import_value(value)
    }

    fn set(&self, key: PropertyKey, value: &JsValue, receiver: &JsValue) -> Result<bool, JErrorType> {
        let m = self.marshal()?;
        let value = m.export_value(value)?;
        let receiver = m.export_value(receiver)?;
        m.call_foreign(|f| f.set(self.id, key, value, receiver))
    }

    fn delete_property(&self, key: &PropertyKey) -> Result<bool, JErrorType> {
        self.marshal()?
            .call_foreign(|f| f.delete_property(self.id, key.clone()))
    }

    fn own_keys(&self) -> Result<Vec<PropertyKey>, JErrorType> {
        self.marshal()?.call_foreign(|f| f.own_keys(self.id))
    }

    fn apply(&self, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JErrorType> {
        let m = self.marshal()?;
        let this = m.export_value(this)?;
        let args = m.export_values(args)?;
        let result = m.call_foreign(|f| f.apply(self.id, this, args))?;
        m.import_value(result)
    }

    fn construct(&self, args: &[JsValue], new_target: Option<JsObjectType>) -> Result<JsValue, JErrorType> {
        let new_target = new_target
            .ok_or_else(|| JErrorType::TypeError("Invalid invocation".to_string()))?;
        let m = self.marshal()?;
        let args = m.export_values(args)?;
        let new_target = m.export_value(&JsValue::Object(new_target))?;
        let result = m.call_foreign(|f| f.construct(self.id, args, new_target))?;
        m.import_value(result)
    }

    /// Everything about the original, imported; `None` when its owner could not describe it.
    fn snapshot(&self) -> Result<Option<ShadowSnapshot>, JErrorType> {
        let m = self.marshal()?;
        let meta = m.call_foreign(|f| f.get_target_meta(self.id))?;
        if meta.is_broken {
            return Ok(None);
        }
        let proto = m.import_proto(meta.proto)?;
        let mut descriptors = Vec::with_capacity(meta.descriptors.len());
        for (key, desc) in meta.descriptors {
            descriptors.push((key, m.import_complete_descriptor(desc)?));
        }
        Ok(Some(ShadowSnapshot {
            proto,
            descriptors,
            is_extensible: meta.is_extensible,
            is_frozen: meta.is_frozen,
            is_sealed: meta.is_sealed,
        }))
    }

    // Live traps keep the shadow just consistent enough for the host invariants.

    /// The original stopped being extensible: copy it whole and close the shadow too.
    fn lock_shadow(&self, shadow: &JsObjectType) -> Result<(), JErrorType> {
        if !ops::is_extensible(shadow)? {
            return Ok(());
        }
        match self.snapshot()? {
            Some(snapshot) => populate_shadow(
                shadow,
                ShadowSnapshot {
                    is_extensible: false,
                    ..snapshot
                },
            )?,
            None => {
                ops::prevent_extensions(shadow)?;
            }
        }
        if ops::is_extensible(shadow)? {
            ops::prevent_extensions(shadow)?;
        }
        Ok(())
    }

    fn live_get_own_property_descriptor(
        &self,
        shadow: &JsObjectType,
        key: &PropertyKey,
    ) -> Result<Option<PropertyDescriptor>, JErrorType> {
        let desc = self.get_own_property_descriptor(key)?;
        sync_descriptor(shadow, key, desc.as_ref())?;
        Ok(desc)
    }

    fn live_get(
        &self,
        shadow: &JsObjectType,
        key: &PropertyKey,
        receiver: &JsValue,
    ) -> Result<JsValue, JErrorType> {
        // A frozen value cannot change, and a rebuilt array would not be the same value.
        if let Some(PropertyDescriptor::Data(d)) = ops::get_own_property(shadow, key)? {
            if !d.configurable && !d.writable {
                return Ok(d.value);
            }
        }
        self.get(key, receiver)
    }

    fn live_define_property(
        &self,
        shadow: &JsObjectType,
        key: PropertyKey,
        desc: PropertyDescriptorSetter,
    ) -> Result<bool, JErrorType> {
        let fixes_property = desc.configurable() == Some(false);
        if !self.define_property(&key, &desc)? {
            return Ok(false);
        }
        if fixes_property {
            let current = self.get_own_property_descriptor(&key)?;
            sync_descriptor(shadow, &key, current.as_ref())?;
        }
        Ok(true)
    }

    fn live_delete_property(&self, shadow: &JsObjectType, key: &PropertyKey) -> Result<bool, JErrorType> {
        let deleted = self.delete_property(key)?;
        if deleted {
            sync_descriptor(shadow, key, None)?;
        }
        Ok(deleted)
    }

    fn live_own_keys(&self, shadow: &JsObjectType) -> Result<Vec<PropertyKey>, JErrorType> {
        let keys = self.own_keys()?;
        if !ops::is_extensible(shadow)? {
            for key in ops::own_property_keys(shadow)? {
                if !keys.contains(&key) {
                    sync_descriptor(shadow, &key, None)?;
                }
            }
        }
        Ok(keys)
    }

    fn live_is_extensible(&self, shadow: &JsObjectType) -> Result<bool, JErrorType> {
        let extensible = self.is_extensible()?;
        if !extensible {
            self.lock_shadow(shadow)?;
        }
        Ok(extensible)
    }

    fn live_prevent_extensions(&self, shadow: &JsObjectType) -> Result<bool, JErrorType> {
        let prevented = self.prevent_extensions()?;
        if prevented {
            self.lock_shadow(shadow)?;
        }
        Ok(prevented)
    }
}
impl Drop for RemoteTarget {
    fn drop(&mut self) {
        if let Some(m) = self.marshal.upgrade() {
            m.queue_release(self.id);
        }
    }
}

/// Red view of a blue object.
pub struct ForwardHandler {
    remote: RemoteTarget,
    live: bool,
    state: Cell<ShadowState>,
}
impl ForwardHandler {
    pub fn new(marshal: Weak<MembraneMarshal>, id: u64, live: bool) -> Self {
        ForwardHandler {
            remote: RemoteTarget { marshal, id },
            live,
            state: Cell::new(ShadowState::Uninitialized),
        }
    }

    pub fn state(&self) -> ShadowState {
        self.state.get()
    }

    /// Populates the shadow exactly once. Failure leaves the proxy broken, not throwing.
    fn ensure_initialized(&self, shadow: &JsObjectType) -> ShadowState {
        if self.state.get() != ShadowState::Uninitialized {
            return self.state.get();
        }
        self.state.set(ShadowState::Initializing);
        let outcome = self.remote.snapshot().and_then(|snapshot| match snapshot {
            Some(snapshot) => populate_shadow(shadow, snapshot).map(|_| true),
            None => Ok(false),
        });
        let next = match outcome {
            Ok(true) => {
                debug!(id = self.remote.id, "Initialized shadow target");
                ShadowState::Initialized
            }
            Ok(false) => {
                warn!(id = self.remote.id, "Original cannot be described, proxy is broken");
                ShadowState::Broken
            }
            Err(e) => {
                warn!(id = self.remote.id, "Shadow initialization failed, proxy is broken: {}", e);
                ShadowState::Broken
            }
        };
        self.state.set(next);
        next
    }

    /// Initializes and reports whether writes may proceed against the shadow.
    fn writable_snapshot(&self, shadow: &JsObjectType) -> bool {
        self.ensure_initialized(shadow) != ShadowState::Broken
    }
}
impl ProxyHandler for ForwardHandler {
    fn get_prototype_of(&self, target: &JsObjectType) -> Result<Option<JsObjectType>, JErrorType> {
        self.remote.trace("getPrototypeOf", None);
        if self.live {
            return self.remote.get_prototype_of();
        }
        self.ensure_initialized(target);
        ops::get_prototype_of(target)
    }

    fn set_prototype_of(
        &self,
        target: &JsObjectType,
        proto: Option<JsObjectType>,
    ) -> Result<bool, JErrorType> {
        self.remote.trace("setPrototypeOf", None);
        if self.live {
            return self.remote.set_prototype_of(proto);
        }
        if !self.writable_snapshot(target) {
            return Ok(false);
        }
        ops::set_prototype_of(target, proto)
    }

    fn is_extensible(&self, target: &JsObjectType) -> Result<bool, JErrorType> {
        self.remote.trace("isExtensible", None);
        if self.live {
            return self.remote.live_is_extensible(target);
        }
        self.ensure_initialized(target);
        ops::is_extensible(target)
    }

    fn prevent_extensions(&self, target: &JsObjectType) -> Result<bool, JErrorType> {
        self.remote.trace("preventExtensions", None);
        if self.live {
            return self.remote.live_prevent_extensions(target);
        }
        if !self.writable_snapshot(target) {
            return Ok(false);
        }
        ops::prevent_extensions(target)
    }

    fn get_own_property_descriptor(
        &self,
        target: &JsObjectType,
        key: &PropertyKey,
    ) -> Result<Option<PropertyDescriptor>, JErrorType> {
        self.remote.trace("getOwnPropertyDescriptor", Some(key));
        if self.live {
            return self.remote.live_get_own_property_descriptor(target, key);
        }
        self.ensure_initialized(target);
        ops::get_own_property(target, key)
    }

    fn define_property(
        &self,
        target: &JsObjectType,
        key: PropertyKey,
        desc: PropertyDescriptorSetter,
    ) -> Result<bool, JErrorType> {
        self.remote.trace("defineProperty", Some(&key));
        if self.live {
            return self.remote.live_define_property(target, key, desc);
        }
        if !self.writable_snapshot(target) {
            return Ok(false);
        }
        ops::define_own_property(target, key, desc)
    }

    fn has(&self, target: &JsObjectType, key: &PropertyKey) -> Result<bool, JErrorType> {
        self.remote.trace("has", Some(key));
        if self.live {
            return self.remote.has(key);
        }
        self.ensure_initialized(target);
        ops::has_property(target, key)
    }

    fn get(
        &self,
        target: &JsObjectType,
        key: &PropertyKey,
        receiver: &JsValue,
    ) -> Result<JsValue, JErrorType> {
        self.remote.trace("get", Some(key));
        if self.live {
            return self.remote.live_get(target, key, receiver);
        }
        self.ensure_initialized(target);
        ops::get(target, key, receiver)
    }

    fn set(
        &self,
        target: &JsObjectType,
        key: PropertyKey,
        value: JsValue,
        receiver: &JsValue,
    ) -> Result<bool, JErrorType> {
        self.remote.trace("set", Some(&key));
        if self.live {
            return self.remote.set(key, &value, receiver);
        }
        if !self.writable_snapshot(target) {
            return Ok(false);
        }
        ops::set(target, key, value, receiver)
    }

    fn delete_property(&self, target: &JsObjectType, key: &PropertyKey) -> Result<bool, JErrorType> {
        self.remote.trace("deleteProperty", Some(key));
        if self.live {
            return self.remote.live_delete_property(target, key);
        }
        if !self.writable_snapshot(target) {
            return Ok(false);
        }
        ops::delete(target, key)
    }

    fn own_keys(&self, target: &JsObjectType) -> Result<Vec<PropertyKey>, JErrorType> {
        self.remote.trace("ownKeys", None);
        if self.live {
            return self.remote.live_own_keys(target);
        }
        self.ensure_initialized(target);
        ops::own_property_keys(target)
    }

    fn apply(
        &self,
        _target: &JsObjectType,
        this: JsValue,
        args: Vec<JsValue>,
    ) -> Result<JsValue, JErrorType> {
        self.remote.trace("apply", None);
        self.remote.apply(&this, &args)
    }

    fn construct(
        &self,
        _target: &JsObjectType,
        args: Vec<JsValue>,
        new_target: Option<JsObjectType>,
    ) -> Result<JsValue, JErrorType> {
        self.remote.trace("construct", None);
        self.remote.construct(&args, new_target)
    }
}

/// Blue view of a red object.
pub struct ReverseHandler {
    remote: RemoteTarget,
}
impl ReverseHandler {
    pub fn new(marshal: Weak<MembraneMarshal>, id: u64) -> Self {
        ReverseHandler {
            remote: RemoteTarget { marshal, id },
        }
    }
}
impl ProxyHandler for ReverseHandler {
    fn get_prototype_of(&self, _target: &JsObjectType) -> Result<Option<JsObjectType>, JErrorType> {
        self.remote.trace("getPrototypeOf", None);
        self.remote.get_prototype_of()
    }

    fn set_prototype_of(
        &self,
        _target: &JsObjectType,
        _proto: Option<JsObjectType>,
    ) -> Result<bool, JErrorType> {
        self.remote.trace("setPrototypeOf", None);
        Ok(false)
    }

    fn is_extensible(&self, target: &JsObjectType) -> Result<bool, JErrorType> {
        self.remote.trace("isExtensible", None);
        self.remote.live_is_extensible(target)
    }

    fn prevent_extensions(&self, _target: &JsObjectType) -> Result<bool, JErrorType> {
        self.remote.trace("preventExtensions", None);
        Ok(false)
    }

    fn get_own_property_descriptor(
        &self,
        target: &JsObjectType,
        key: &PropertyKey,
    ) -> Result<Option<PropertyDescriptor>, JErrorType> {
        self.remote.trace("getOwnPropertyDescriptor", Some(key));
        self.remote.live_get_own_property_descriptor(target, key)
    }

    fn define_property(
        &self,
        _target: &JsObjectType,
        key: PropertyKey,
        _desc: PropertyDescriptorSetter,
    ) -> Result<bool, JErrorType> {
        self.remote.trace("defineProperty", Some(&key));
        Ok(false)
    }

    fn has(&self, _target: &JsObjectType, key: &PropertyKey) -> Result<bool, JErrorType> {
        self.remote.trace("has", Some(key));
        self.remote.has(key)
    }

    fn get(
        &self,
        target: &JsObjectType,
        key: &PropertyKey,
        receiver: &JsValue,
    ) -> Result<JsValue, JErrorType> {
        self.remote.trace("get", Some(key));
        self.remote.live_get(target, key, receiver)
    }

    fn set(
        &self,
        _target: &JsObjectType,
        key: PropertyKey,
        value: JsValue,
        receiver: &JsValue,
    ) -> Result<bool, JErrorType> {
        self.remote.trace("set", Some(&key));
        self.remote.set(key, &value, receiver)
    }

    fn delete_property(&self, _target: &JsObjectType, key: &PropertyKey) -> Result<bool, JErrorType> {
        self.remote.trace("deleteProperty", Some(key));
        Ok(false)
    }

    fn own_keys(&self, target: &JsObjectType) -> Result<Vec<PropertyKey>, JErrorType> {
        self.remote.trace("ownKeys", None);
        self.remote.live_own_keys(target)
    }

    fn apply(
        &self,
        _target: &JsObjectType,
        this: JsValue,
        args: Vec<JsValue>,
    ) -> Result<JsValue, JErrorType> {
        self.remote.trace("apply", None);
        self.remote.apply(&this, &args)
    }

    fn construct(
        &self,
        _target: &JsObjectType,
        args: Vec<JsValue>,
        new_target: Option<JsObjectType>,
    ) -> Result<JsValue, JErrorType> {
        self.remote.trace("construct", None);
        self.remote.construct(&args, new_target)
    }
}
