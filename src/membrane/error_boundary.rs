//! Re-homing of abrupt completions at every boundary crossing.
//!
//! An error object never crosses. The throwing half reduces it to an `ErrorTag` and the
//! catching half builds a fresh error from its own captured prototypes, so `instanceof`
//! in the catching realm sees its own `TypeError`. Engine-raised errors stay native until
//! a realm materializes them. Any other thrown value crosses like an ordinary value.

use tracing::debug;

use crate::membrane::marshal::MembraneMarshal;
use crate::membrane::pointer::{CrossError, ErrorTag};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::error_object::error_create;
use crate::runner::ds::object::ObjectType;
use crate::runner::ds::value::JsValue;

impl MembraneMarshal {
    pub fn export_error(&self, error: JErrorType) -> CrossError {
        if let Some((kind, message)) = error.native_parts() {
            return CrossError::Native {
                kind,
                message: message.to_string(),
            };
        }
        let thrown = match error {
            JErrorType::Thrown(v) => v,
            _ => JsValue::Undefined,
        };
        if let JsValue::Object(o) = &thrown {
            let tag = match &*o.borrow() {
                ObjectType::Error(e) => Some(ErrorTag {
                    origin: self.color,
                    kind: e.kind(),
                    message: e.message(),
                }),
                _ => None,
            };
            if let Some(tag) = tag {
                return CrossError::Error(tag);
            }
        }
        match self.export_value(&thrown) {
            Ok(value) => CrossError::Value(value),
            Err(e) => match e.native_parts() {
                Some((kind, message)) => CrossError::Native {
                    kind,
                    message: message.to_string(),
                },
                None => CrossError::type_error("thrown value could not cross the membrane"),
            },
        }
    }

    pub fn import_error(&self, error: CrossError) -> JErrorType {
        match error {
            CrossError::Native { kind, message } => JErrorType::from_kind(kind, message),
            CrossError::Error(tag) => {
                debug!(
                    realm = %self.color,
                    origin = %tag.origin,
                    kind = %tag.kind,
                    "Re-homing thrown error"
                );
                let proto = self.intrinsics().error_prototype(tag.kind);
                JErrorType::Thrown(JsValue::Object(error_create(tag.kind, tag.message, proto)))
            }
            CrossError::Value(value) => match self.import_value(value) {
                Ok(v) => JErrorType::Thrown(v),
                Err(e) => e,
            },
        }
    }
}
