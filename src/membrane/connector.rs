//! Per-realm connectors.
//!
//! A connector is created once per realm from something that can run source text in it,
//! captures the realm's intrinsics on the spot, and later produces the realm's half of a
//! membrane. Connectors are cached per realm identity, so asking twice for the same realm
//! returns the same connector until the realm navigates.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::membrane::error::{MembraneError, Result};
use crate::membrane::intrinsics::CapturedIntrinsics;
use crate::membrane::marshal::MembraneMarshal;
use crate::membrane::options::MembranePolicy;
use crate::membrane::pointer::RealmColor;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::get_function_realm;
use crate::runner::ds::operations::object as ops;
use crate::runner::ds::operations::test_and_comparison::is_callable;
use crate::runner::ds::realm::JsCodeRealmType;
use crate::runner::ds::value::JsValue;

/// How source text reaches a realm.
#[derive(Clone)]
pub enum RealmEvaluator {
    /// The realm itself; scripts run against its global object.
    Global(JsCodeRealmType),
    /// An indirect-eval-shaped function of the realm, called with the source string.
    Function(JsValue),
}
impl fmt::Debug for RealmEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RealmEvaluator::Global(realm) => write!(f, "Global({})", realm.id()),
            RealmEvaluator::Function(_) => write!(f, "Function"),
        }
    }
}

pub struct Connector {
    realm: JsCodeRealmType,
    evaluator: RealmEvaluator,
    intrinsics: CapturedIntrinsics,
}
impl Connector {
    pub fn realm(&self) -> &JsCodeRealmType {
        &self.realm
    }

    pub fn realm_id(&self) -> String {
        self.realm.id()
    }

    pub fn intrinsics(&self) -> &CapturedIntrinsics {
        &self.intrinsics
    }

    pub fn evaluate(&self, source: &str, strict: bool) -> std::result::Result<JsValue, JErrorType> {
        match &self.evaluator {
            RealmEvaluator::Global(realm) if strict => realm.evaluate_strict(source),
            RealmEvaluator::Global(realm) => realm.evaluate(source),
            RealmEvaluator::Function(f) => {
                let source = if strict {
                    format!("'use strict';\n{}", source)
                } else {
                    source.to_string()
                };
                ops::call(f, JsValue::Undefined, vec![JsValue::String(source)])
            }
        }
    }

    /// Produces this realm's half of a new membrane. The halves still have to be
    /// attached to each other.
    pub fn connect(self: &Rc<Self>, color: RealmColor, policy: MembranePolicy) -> Rc<MembraneMarshal> {
        debug!(realm = %self.realm_id(), %color, "Connecting realm");
        MembraneMarshal::new(color, self.clone(), policy)
    }
}
impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("realm", &self.realm.id())
            .field("evaluator", &self.evaluator)
            .finish()
    }
}

thread_local! {
    static CONNECTORS: RefCell<HashMap<(String, u64), Weak<Connector>>> = RefCell::new(HashMap::new());
}

/// The connector of the realm `evaluator` runs code in.
///
/// Fails with `InvalidArgument` when the evaluator is `undefined`/`null`, not callable,
/// or a callable with no realm of its own (a proxy, for instance).
pub fn create_connector(evaluator: RealmEvaluator) -> Result<Rc<Connector>> {
    let realm = match &evaluator {
        RealmEvaluator::Global(realm) => realm.clone(),
        RealmEvaluator::Function(f) => {
            if f.is_nullish() {
                return Err(MembraneError::InvalidArgument(
                    "the evaluator must not be undefined or null".to_string(),
                ));
            }
            if !is_callable(f) {
                return Err(MembraneError::InvalidArgument(format!(
                    "the evaluator must be a function, got {}",
                    f
                )));
            }
            match f.as_object().and_then(get_function_realm) {
                Some(realm) => realm,
                None => {
                    return Err(MembraneError::InvalidArgument(
                        "the evaluator does not belong to any realm".to_string(),
                    ))
                }
            }
        }
    };
    let key = (realm.id(), realm.generation());
    let cached = CONNECTORS.with(|c| c.borrow().get(&key).and_then(Weak::upgrade));
    if let Some(connector) = cached {
        debug!(realm = %key.0, generation = key.1, "Reusing connector");
        return Ok(connector);
    }
    let connector = Rc::new(Connector {
        intrinsics: CapturedIntrinsics::capture(&realm),
        realm,
        evaluator,
    });
    CONNECTORS.with(|c| {
        let mut c = c.borrow_mut();
        c.retain(|_, weak| weak.strong_count() > 0);
        c.insert(key.clone(), Rc::downgrade(&connector));
    });
    debug!(realm = %key.0, generation = key.1, "Created connector");
    Ok(connector)
}
