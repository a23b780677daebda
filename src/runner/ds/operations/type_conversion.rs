use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::ObjectType;
use crate::runner::ds::object_property::PropertyKey;
use crate::runner::ds::value::{JsNumberType, JsValue};

pub const TYPE_STR_UNDEFINED: &str = "undefined";
pub const TYPE_STR_NULL: &str = "null";
pub const TYPE_STR_BOOLEAN: &str = "boolean";
pub const TYPE_STR_STRING: &str = "string";
pub const TYPE_STR_SYMBOL: &str = "symbol";
pub const TYPE_STR_NUMBER: &str = "number";
pub const TYPE_STR_OBJECT: &str = "object";
pub const TYPE_STR_FUNCTION: &str = "function";

/// The `typeof` result. `null` reports "object".
pub fn get_type(a: &JsValue) -> &'static str {
    match a {
        JsValue::Undefined => TYPE_STR_UNDEFINED,
        JsValue::Null => TYPE_STR_OBJECT,
        JsValue::Boolean(_) => TYPE_STR_BOOLEAN,
        JsValue::String(_) => TYPE_STR_STRING,
        JsValue::Symbol(_) => TYPE_STR_SYMBOL,
        JsValue::Number(_) => TYPE_STR_NUMBER,
        JsValue::Object(o) => {
            if (**o).borrow().is_callable() {
                TYPE_STR_FUNCTION
            } else {
                TYPE_STR_OBJECT
            }
        }
    }
}

pub fn to_boolean(v: &JsValue) -> bool {
    match v {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::String(s) => !s.is_empty(),
        JsValue::Symbol(_) | JsValue::Object(_) => true,
        JsValue::Number(n) => match n {
            JsNumberType::Integer(i) => *i != 0,
            JsNumberType::Float(f) => *f != 0.0,
            JsNumberType::NaN => false,
            JsNumberType::PositiveInfinity | JsNumberType::NegativeInfinity => true,
        },
    }
}

/// ToNumber without ToPrimitive: objects convert to `NaN`.
pub fn to_number(v: &JsValue) -> Result<JsNumberType, JErrorType> {
    match v {
        JsValue::Undefined => Ok(JsNumberType::NaN),
        JsValue::Null => Ok(JsNumberType::Integer(0)),
        JsValue::Boolean(b) => Ok(JsNumberType::Integer(if *b { 1 } else { 0 })),
        JsValue::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                Ok(JsNumberType::Integer(0))
            } else {
                Ok(match t {
                    "Infinity" | "+Infinity" => JsNumberType::PositiveInfinity,
                    "-Infinity" => JsNumberType::NegativeInfinity,
                    _ => match t.parse::<f64>() {
                        Ok(f) => JsNumberType::from_f64(f),
                        Err(_) => JsNumberType::NaN,
                    },
                })
            }
        }
        JsValue::Symbol(s) => Err(JErrorType::TypeError(format!(
            "'{}' symbol cannot be converted to number",
            s
        ))),
        JsValue::Number(n) => Ok(n.clone()),
        JsValue::Object(_) => Ok(JsNumberType::NaN),
    }
}

/// ToString without ToPrimitive: objects render as their class tag.
pub fn to_string(v: &JsValue) -> Result<String, JErrorType> {
    match v {
        JsValue::Undefined => Ok(TYPE_STR_UNDEFINED.to_string()),
        JsValue::Null => Ok(TYPE_STR_NULL.to_string()),
        JsValue::Boolean(b) => Ok(b.to_string()),
        JsValue::String(s) => Ok(s.to_string()),
        JsValue::Symbol(s) => Err(JErrorType::TypeError(format!(
            "Cannot convert '{}' to a string",
            s
        ))),
        JsValue::Number(n) => Ok(n.to_string()),
        JsValue::Object(o) => Ok(match &*(**o).borrow() {
            ObjectType::Error(e) => match e.message() {
                Some(m) => format!("{}: {}", e.kind(), m),
                None => e.kind().to_string(),
            },
            other => other.class_name().to_string(),
        }),
    }
}

/// ToPropertyKey. Canonical numeric strings become `Int` keys.
pub fn to_property_key(v: &JsValue) -> Result<PropertyKey, JErrorType> {
    match v {
        JsValue::Symbol(s) => Ok(PropertyKey::Sym(s.clone())),
        JsValue::Number(JsNumberType::Integer(i)) if *i >= 0 && *i < u32::MAX as i64 => {
            Ok(PropertyKey::Int(*i as u32))
        }
        _ => Ok(PropertyKey::from(to_string(v)?)),
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_to_property_key_canonicalizes_indices() {
        assert_eq!(to_property_key(&JsValue::from("3")).unwrap(), PropertyKey::Int(3));
        assert_eq!(to_property_key(&JsValue::from(3)).unwrap(), PropertyKey::Int(3));
        assert_eq!(
            to_property_key(&JsValue::from("03")).unwrap(),
            PropertyKey::Str("03".to_string())
        );
    }

    #[test]
    fn test_typeof_null_is_object() {
        assert_eq!(get_type(&JsValue::Null), TYPE_STR_OBJECT);
    }

    #[test]
    fn test_to_number_of_strings() {
        assert_eq!(to_number(&JsValue::from(" 42 ")).unwrap(), JsNumberType::Integer(42));
        assert!(matches!(to_number(&JsValue::from("x")).unwrap(), JsNumberType::NaN));
    }
}
