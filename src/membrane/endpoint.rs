//! The callee side of the connector protocol: what a membrane half does when the other
//! half calls into it. Every operation resolves its pointer ids against this realm's
//! exports, runs the matching abstract operation, and converts any abrupt completion
//! into a `CrossError` before it leaves the realm.

use tracing::{debug, warn};

use crate::membrane::callables::{CrossResult, RealmCallables};
use crate::membrane::marshal::{kind_of, local_descriptors, MembraneMarshal};
use crate::membrane::pointer::{
    CrossDescriptor, CrossError, CrossTargetMeta, CrossValue, LinkTarget, Pointer, PointerTraits,
};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::operations::object as ops;
use crate::runner::ds::value::JsValue;

impl MembraneMarshal {
    fn describe_target(&self, target: u64) -> Result<CrossTargetMeta, JErrorType> {
        let o = self.resolve_export(target)?;
        let proto = ops::get_prototype_of(&o)?;
        let locals = local_descriptors(&o)?;
        let mut meta = CrossTargetMeta {
            proto: CrossValue::Null,
            descriptors: Vec::with_capacity(locals.len()),
            is_extensible: ops::is_extensible(&o)?,
            is_frozen: ops::test_integrity_level(&o, true)?,
            is_sealed: ops::test_integrity_level(&o, false)?,
            is_broken: false,
        };
        if let Err(e) = self.export_meta(&mut meta, proto, locals) {
            self.release_exported(&meta.proto);
            for (_, desc) in &meta.descriptors {
                self.release_exported_descriptor(desc);
            }
            return Err(e);
        }
        Ok(meta)
    }

    /// Fills in `meta` one export at a time, so a failure leaves behind exactly the
    /// values that must be released.
    fn export_meta(
        &self,
        meta: &mut CrossTargetMeta,
        proto: Option<JsObjectType>,
        locals: Vec<(PropertyKey, PropertyDescriptor)>,
    ) -> Result<(), JErrorType> {
        if let Some(p) = proto {
            meta.proto = self.export_value(&JsValue::Object(p))?;
        }
        for (key, desc) in locals {
            let desc = self.export_descriptor(&desc)?;
            meta.descriptors.push((key, desc));
        }
        Ok(())
    }

    fn resolve_link(&self, target: &LinkTarget) -> Result<JsObjectType, JErrorType> {
        let realm = self.connector.realm();
        match target {
            LinkTarget::Intrinsic(intrinsic) => realm.get_intrinsics_value(*intrinsic),
            LinkTarget::Path(path) => {
                let mut current = realm.global_object();
                for key in path {
                    let receiver = JsValue::Object(current.clone());
                    current = match ops::get(&current, key, &receiver)? {
                        JsValue::Object(o) => o,
                        other => {
                            return Err(JErrorType::TypeError(format!(
                                "{} is not an object: {}",
                                target, other
                            )))
                        }
                    };
                }
                Ok(current)
            }
        }
    }
}

impl RealmCallables for MembraneMarshal {
    fn evaluate(&self, source: &str) -> CrossResult<CrossValue> {
        self.boundary(|| {
            let result = self
                .connector
                .evaluate(source, self.policy.config.strict_evaluation)?;
            self.export_value(&result)
        })
    }

    fn apply(&self, target: u64, this: CrossValue, args: Vec<CrossValue>) -> CrossResult<CrossValue> {
        self.boundary(|| {
            let f = self.resolve_export(target)?;
            let this = self.import_value(this)?;
            let args = self.import_values(args)?;
            let result = ops::call(&JsValue::Object(f), this, args)?;
            self.export_value(&result)
        })
    }

    fn construct(
        &self,
        target: u64,
        args: Vec<CrossValue>,
        new_target: CrossValue,
    ) -> CrossResult<CrossValue> {
        if new_target.is_undefined() {
            return Err(CrossError::type_error("Invalid invocation"));
        }
        self.boundary(|| {
            let f = self.resolve_export(target)?;
            let args = self.import_values(args)?;
            let new_target = self.import_object(new_target)?;
            let result = ops::construct(&f, args, Some(new_target))?;
            self.export_value(&result)
        })
    }

    fn get(&self, target: u64, key: PropertyKey, receiver: CrossValue) -> CrossResult<CrossValue> {
        self.boundary(|| {
            let o = self.resolve_export(target)?;
            let receiver = self.import_value(receiver)?;
            let value = ops::get(&o, &key, &receiver)?;
            self.export_value(&value)
        })
    }

    fn set(
        &self,
        target: u64,
        key: PropertyKey,
        value: CrossValue,
        receiver: CrossValue,
    ) -> CrossResult<bool> {
        self.boundary(|| {
            let o = self.resolve_export(target)?;
            let value = self.import_value(value)?;
            let receiver = self.import_value(receiver)?;
            ops::set(&o, key, value, &receiver)
        })
    }

    fn has(&self, target: u64, key: PropertyKey) -> CrossResult<bool> {
        self.boundary(|| ops::has_property(&self.resolve_export(target)?, &key))
    }

    fn delete_property(&self, target: u64, key: PropertyKey) -> CrossResult<bool> {
        self.boundary(|| ops::delete(&self.resolve_export(target)?, &key))
    }

    fn define_property(
        &self,
        target: u64,
        key: PropertyKey,
        desc: CrossDescriptor,
    ) -> CrossResult<bool> {
        self.boundary(|| {
            let o = self.resolve_export(target)?;
            let desc = self.import_descriptor(desc)?;
            ops::define_own_property(&o, key, desc)
        })
    }

    fn get_own_property_descriptor(
        &self,
        target: u64,
        key: PropertyKey,
    ) -> CrossResult<Option<CrossDescriptor>> {
        self.boundary(|| {
            let o = self.resolve_export(target)?;
            match ops::get_own_property(&o, &key)? {
                Some(desc) => Ok(Some(self.export_descriptor(&desc)?)),
                None => Ok(None),
            }
        })
    }

    fn get_prototype_of(&self, target: u64) -> CrossResult<CrossValue> {
        self.boundary(|| match ops::get_prototype_of(&self.resolve_export(target)?)? {
            Some(proto) => self.export_value(&JsValue::Object(proto)),
            None => Ok(CrossValue::Null),
        })
    }

    fn set_prototype_of(&self, target: u64, proto: CrossValue) -> CrossResult<bool> {
        self.boundary(|| {
            let o = self.resolve_export(target)?;
            let proto = self.import_proto(proto)?;
            ops::set_prototype_of(&o, proto)
        })
    }

    fn is_extensible(&self, target: u64) -> CrossResult<bool> {
        self.boundary(|| ops::is_extensible(&self.resolve_export(target)?))
    }

    fn prevent_extensions(&self, target: u64) -> CrossResult<bool> {
        self.boundary(|| ops::prevent_extensions(&self.resolve_export(target)?))
    }

    fn own_keys(&self, target: u64) -> CrossResult<Vec<PropertyKey>> {
        self.boundary(|| ops::own_property_keys(&self.resolve_export(target)?))
    }

    fn get_target_meta(&self, target: u64) -> CrossResult<CrossTargetMeta> {
        match self.describe_target(target) {
            Ok(meta) => Ok(meta),
            Err(e) => {
                warn!(realm = %self.color, id = target, "Target cannot be described: {}", e);
                Ok(CrossTargetMeta::broken())
            }
        }
    }

    fn remap_descriptors(
        &self,
        target: CrossValue,
        descriptors: Vec<(PropertyKey, CrossDescriptor)>,
    ) -> CrossResult<()> {
        self.boundary(|| {
            let target = self.import_object(target)?;
            self.remap_onto(&target, descriptors)
        })
    }

    fn install_lazy_descriptors(
        &self,
        target: CrossValue,
        source: CrossValue,
        keys: Vec<PropertyKey>,
    ) -> CrossResult<()> {
        self.boundary(|| {
            let target = self.import_object(target)?;
            self.install_lazy(&target, source, keys)
        })
    }

    fn remap_proto(&self, target: CrossValue, proto: CrossValue) -> CrossResult<bool> {
        self.boundary(|| {
            let target = self.import_object(target)?;
            let proto = self.import_proto(proto)?;
            ops::set_prototype_of(&target, proto)
        })
    }

    fn link_target(&self, target: &LinkTarget) -> CrossResult<u64> {
        self.boundary(|| {
            let o = self.resolve_link(target)?;
            let traits = PointerTraits::new(kind_of(&o));
            let id = self.exports.borrow_mut().pin(&o, traits);
            debug!(realm = %self.color, %target, id, "Pinned link target");
            Ok(id)
        })
    }

    fn link_pointer(&self, foreign: Pointer, local: u64) -> CrossResult<()> {
        self.boundary(|| {
            let o = self.resolve_export(local)?;
            let traits = PointerTraits::new(kind_of(&o));
            self.imports.borrow_mut().link(foreign.id, &o, traits);
            debug!(realm = %self.color, %foreign, local, "Linked values");
            Ok(())
        })
    }

    fn release_pointer(&self, id: u64, count: usize) {
        let freed = self.exports.borrow_mut().release(id, count);
        if freed.is_some() {
            debug!(realm = %self.color, id, "Released export");
        }
        drop(freed);
    }
}
