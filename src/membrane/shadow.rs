//! Shadow targets: the local objects behind membrane proxies.
//!
//! A shadow exists to give the host `Proxy` a target of the right shape (callable,
//! constructor, array) and to hold whatever state the host invariants compare trap
//! results against. Script never sees one.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::membrane::pointer::TargetKind;
use crate::runner::ds::array_object::array_create;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::{FunctionObject, NativeFn};
use crate::runner::ds::object::{new_object, JsObjectType, ObjectType};
use crate::runner::ds::object_property::{
    PropertyDescriptor, PropertyDescriptorSetter, PropertyKey,
};
use crate::runner::ds::operations::object as ops;

/// Lifecycle of a snapshot proxy's shadow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowState {
    Uninitialized,
    /// Being populated; traps arriving now read the partial shadow.
    Initializing,
    Initialized,
    /// The original could not be described; reads see the shadow, writes fail.
    Broken,
}

/// A blank target with the callability of `kind`. Functions get no `name` or `length`;
/// those arrive with the rest of the own properties.
pub fn create_shadow_target(kind: TargetKind) -> JsObjectType {
    match kind {
        TargetKind::Object => new_object(None),
        TargetKind::Array => array_create(0, None),
        TargetKind::Function { constructor } => {
            let behaviour: NativeFn = Rc::new(|_, _, _| {
                Err(JErrorType::TypeError(
                    "shadow targets cannot be called".to_string(),
                ))
            });
            Rc::new(RefCell::new(ObjectType::Function(FunctionObject::new(
                behaviour,
                constructor,
                None,
                Weak::new(),
            ))))
        }
    }
}

/// Mirrors what the owner reported for `key` when the host would otherwise reject the
/// report: a non-configurable property must exist on the shadow, and a property the owner
/// no longer has must not linger there.
pub fn sync_descriptor(
    shadow: &JsObjectType,
    key: &PropertyKey,
    reported: Option<&PropertyDescriptor>,
) -> Result<(), JErrorType> {
    match reported {
        Some(desc) if !desc.is_configurable() => {
            define_on_shadow(shadow, key.clone(), desc.clone())?;
        }
        Some(_) => {}
        None => {
            let lingering = ops::get_own_property(shadow, key)?.map_or(false, |d| d.is_configurable());
            if lingering {
                ops::delete(shadow, key)?;
            }
        }
    }
    Ok(())
}

/// Defines `desc` on the shadow, ignoring a refusal: a shadow that already holds a
/// non-configurable version of the property keeps it.
pub fn define_on_shadow(
    shadow: &JsObjectType,
    key: PropertyKey,
    desc: PropertyDescriptor,
) -> Result<bool, JErrorType> {
    ops::define_own_property(
        shadow,
        key,
        PropertyDescriptorSetter::new_from_property_descriptor(desc),
    )
}

/// What a fully described original looks like, already imported into this realm.
pub struct ShadowSnapshot {
    pub proto: Option<JsObjectType>,
    pub descriptors: Vec<(PropertyKey, PropertyDescriptor)>,
    pub is_extensible: bool,
    pub is_frozen: bool,
    pub is_sealed: bool,
}

/// Copies `snapshot` into the shadow: prototype, every own property, then integrity.
pub fn populate_shadow(shadow: &JsObjectType, snapshot: ShadowSnapshot) -> Result<(), JErrorType> {
    if ops::is_extensible(shadow)? {
        ops::set_prototype_of(shadow, snapshot.proto)?;
    }
    for (key, desc) in snapshot.descriptors {
        define_on_shadow(shadow, key, desc)?;
    }
    if snapshot.is_frozen {
        ops::set_integrity_level(shadow, true)?;
    } else if snapshot.is_sealed {
        ops::set_integrity_level(shadow, false)?;
    } else if !snapshot.is_extensible {
        ops::prevent_extensions(shadow)?;
    }
    Ok(())
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::runner::ds::value::JsValue;

    #[test]
    fn test_shadow_shapes() {
        let f = create_shadow_target(TargetKind::Function { constructor: true });
        assert!(f.borrow().is_callable());
        assert!(f.borrow().is_constructor());
        let g = create_shadow_target(TargetKind::Function { constructor: false });
        assert!(!g.borrow().is_constructor());
        let a = create_shadow_target(TargetKind::Array);
        assert!(matches!(&*a.borrow(), ObjectType::Array(_)));
        let o = create_shadow_target(TargetKind::Object);
        assert!(!o.borrow().is_callable());
        assert!(ops::own_property_keys(&f).unwrap().is_empty());
    }

    #[test]
    fn test_sync_adds_non_configurable_and_drops_vanished() {
        let shadow = create_shadow_target(TargetKind::Object);
        let key = PropertyKey::from("k");
        let fixed = PropertyDescriptor::new_data(JsValue::from(1), false, true, false);
        sync_descriptor(&shadow, &key, Some(&fixed)).unwrap();
        assert!(!ops::get_own_property(&shadow, &key).unwrap().unwrap().is_configurable());

        let loose = PropertyKey::from("loose");
        define_on_shadow(
            &shadow,
            loose.clone(),
            PropertyDescriptor::new_default_data(JsValue::from(2)),
        )
        .unwrap();
        sync_descriptor(&shadow, &loose, None).unwrap();
        assert!(ops::get_own_property(&shadow, &loose).unwrap().is_none());
    }

    #[test]
    fn test_populate_applies_integrity_last() {
        let shadow = create_shadow_target(TargetKind::Object);
        let proto = new_object(None);
        populate_shadow(
            &shadow,
            ShadowSnapshot {
                proto: Some(proto.clone()),
                descriptors: vec![(
                    PropertyKey::from("a"),
                    PropertyDescriptor::new_default_data(JsValue::from(1)),
                )],
                is_extensible: false,
                is_frozen: true,
                is_sealed: true,
            },
        )
        .unwrap();
        assert!(Rc::ptr_eq(&ops::get_prototype_of(&shadow).unwrap().unwrap(), &proto));
        assert!(ops::test_integrity_level(&shadow, true).unwrap());
    }
}
