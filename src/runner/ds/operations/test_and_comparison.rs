use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::object::{get, get_prototype_of};
use crate::runner::ds::value::{JsNumberType, JsValue};
use std::rc::Rc;

fn is_same_value(a: &JsValue, b: &JsValue, strict_mode: bool) -> bool {
    match (a, b) {
        (JsValue::Undefined, JsValue::Undefined) | (JsValue::Null, JsValue::Null) => true,
        (JsValue::Number(na), JsValue::Number(nb)) => match (na, nb) {
            (JsNumberType::NaN, JsNumberType::NaN) => !strict_mode,
            (JsNumberType::NaN, _) | (_, JsNumberType::NaN) => false,
            (JsNumberType::Integer(x), JsNumberType::Integer(y)) => x == y,
            _ => {
                let (x, y) = (na.as_f64(), nb.as_f64());
                if !strict_mode && x == 0.0 && y == 0.0 {
                    x.is_sign_negative() == y.is_sign_negative()
                } else {
                    x == y
                }
            }
        },
        (JsValue::String(x), JsValue::String(y)) => x == y,
        (JsValue::Boolean(x), JsValue::Boolean(y)) => x == y,
        (JsValue::Symbol(x), JsValue::Symbol(y)) => x == y,
        (JsValue::Object(x), JsValue::Object(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// SameValue: `NaN` equals itself, `+0` and `-0` differ.
pub fn same_value(a: &JsValue, b: &JsValue) -> bool {
    is_same_value(a, b, false)
}

/// `===`
pub fn strict_equality_comparison(a: &JsValue, b: &JsValue) -> bool {
    is_same_value(a, b, true)
}

/// `==`, restricted to the coercions the engine's primitive set needs.
pub fn abstract_equality_comparison(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Undefined | JsValue::Null, JsValue::Undefined | JsValue::Null) => true,
        (JsValue::Undefined | JsValue::Null, _) | (_, JsValue::Undefined | JsValue::Null) => false,
        (JsValue::Number(n), JsValue::String(s)) | (JsValue::String(s), JsValue::Number(n)) => {
            match s.trim().parse::<f64>() {
                Ok(f) => f == n.as_f64(),
                Err(_) => s.trim().is_empty() && n.as_f64() == 0.0,
            }
        }
        (JsValue::Boolean(x), other) | (other, JsValue::Boolean(x)) => abstract_equality_comparison(
            &JsValue::Number(JsNumberType::Integer(if *x { 1 } else { 0 })),
            other,
        ),
        _ => strict_equality_comparison(a, b),
    }
}

/// OrdinaryHasInstance. Bound functions and `Symbol.hasInstance` do not exist here.
pub fn ordinary_has_instance(c: &JsValue, o: &JsValue) -> Result<bool, JErrorType> {
    let c_obj = match c {
        JsValue::Object(c_obj) if c_obj.borrow().is_callable() => c_obj.clone(),
        _ => {
            return Err(JErrorType::TypeError(
                "Right-hand side of 'instanceof' is not callable".to_string(),
            ))
        }
    };
    let mut current = match o {
        JsValue::Object(o) => o.clone(),
        _ => return Ok(false),
    };
    let proto = match get(&c_obj, &"prototype".into(), c)? {
        JsValue::Object(p) => p,
        _ => {
            return Err(JErrorType::TypeError(
                "Function has non-object prototype in instanceof check".to_string(),
            ))
        }
    };
    loop {
        match get_prototype_of(&current)? {
            None => return Ok(false),
            Some(p) => {
                if Rc::ptr_eq(&p, &proto) {
                    return Ok(true);
                }
                current = p;
            }
        }
    }
}

/// IsCallable on a value.
pub fn is_callable(v: &JsValue) -> bool {
    match v {
        JsValue::Object(o) => o.borrow().is_callable(),
        _ => false,
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_same_value_nan_and_zero() {
        let nan = JsValue::Number(JsNumberType::NaN);
        assert!(same_value(&nan, &nan));
        assert!(!strict_equality_comparison(&nan, &nan));
        let pz = JsValue::Number(JsNumberType::Float(0.0));
        let nz = JsValue::Number(JsNumberType::Float(-0.0));
        assert!(!same_value(&pz, &nz));
        assert!(strict_equality_comparison(&pz, &nz));
    }

    #[test]
    fn test_abstract_equality() {
        assert!(abstract_equality_comparison(&JsValue::Null, &JsValue::Undefined));
        assert!(abstract_equality_comparison(&JsValue::from("1"), &JsValue::from(1)));
        assert!(abstract_equality_comparison(&JsValue::from(true), &JsValue::from(1)));
        assert!(!abstract_equality_comparison(&JsValue::Null, &JsValue::from(0)));
    }
}
