//! Built-ins a membrane half allocates with, captured before any untrusted code runs.

use std::rc::Weak;

use crate::runner::ds::error::ErrorKind;
use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::realm::{CodeRealm, JsCodeRealmType};

/// Prototypes of one realm, held directly so later changes to the realm's globals
/// (`Object.prototype = ...`, a replaced `TypeError`) cannot redirect what the membrane
/// builds.
pub struct CapturedIntrinsics {
    realm: Weak<CodeRealm>,
    pub object_prototype: JsObjectType,
    pub function_prototype: JsObjectType,
    pub array_prototype: JsObjectType,
    error_prototypes: Vec<(ErrorKind, JsObjectType)>,
}
impl CapturedIntrinsics {
    pub fn capture(realm: &JsCodeRealmType) -> Self {
        let intrinsics = realm.intrinsics();
        CapturedIntrinsics {
            realm: std::rc::Rc::downgrade(realm),
            object_prototype: intrinsics.object_prototype.clone(),
            function_prototype: intrinsics.function_prototype.clone(),
            array_prototype: intrinsics.array_prototype.clone(),
            error_prototypes: intrinsics
                .errors
                .iter()
                .map(|(kind, _, proto)| (*kind, proto.clone()))
                .collect(),
        }
    }

    pub fn realm(&self) -> Weak<CodeRealm> {
        self.realm.clone()
    }

    /// `%TypeError.prototype%` and friends; `Error.prototype` for a kind the realm lacks.
    pub fn error_prototype(&self, kind: ErrorKind) -> JsObjectType {
        let find = |k: ErrorKind| {
            self.error_prototypes
                .iter()
                .find(|(candidate, _)| *candidate == k)
                .map(|(_, p)| p.clone())
        };
        find(kind)
            .or_else(|| find(ErrorKind::Error))
            .unwrap_or_else(|| self.object_prototype.clone())
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::runner::ds::object::new_object;
    use crate::runner::ds::operations::object::{get, set};
    use crate::runner::ds::object_property::PropertyKey;
    use crate::runner::ds::realm::{CodeRealm, WellKnownIntrinsics};
    use crate::runner::ds::value::JsValue;
    use std::rc::Rc;

    #[test]
    fn test_capture_survives_global_tampering() {
        let realm = CodeRealm::new();
        let captured = CapturedIntrinsics::capture(&realm);
        let original = realm
            .get_intrinsics_value(WellKnownIntrinsics::TypeErrorPrototype)
            .unwrap();
        let type_error = realm
            .get_intrinsics_value(WellKnownIntrinsics::TypeError)
            .unwrap();
        let fake = new_object(None);
        let receiver = JsValue::Object(type_error.clone());
        // `TypeError.prototype` is read-only, so tamper through the global binding instead.
        let global = realm.global_object();
        set(
            &global,
            PropertyKey::from("TypeError"),
            JsValue::Object(fake),
            &JsValue::Object(global.clone()),
        )
        .unwrap();
        assert!(Rc::ptr_eq(
            &captured.error_prototype(ErrorKind::TypeError),
            &original
        ));
        assert!(matches!(
            get(&type_error, &PropertyKey::from("prototype"), &receiver).unwrap(),
            JsValue::Object(p) if Rc::ptr_eq(&p, &original)
        ));
    }
}
