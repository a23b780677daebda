//! `VirtualEnvironment`: a blue realm, a red realm and the membrane between them.

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::membrane::callables::{CrossResult, RealmCallables};
use crate::membrane::connector::Connector;
use crate::membrane::error::{MembraneError, Result};
use crate::membrane::instrumentation::Instrumentation;
use crate::membrane::marshal::{MarshalStats, MembraneMarshal};
use crate::membrane::options::{EnvironmentOptions, MembranePolicy, SignSourceCallback};
use crate::membrane::pointer::{CrossValue, LinkTarget, Pointer, RealmColor};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::realm::WellKnownIntrinsics;
use crate::runner::ds::value::JsValue;

/// Side table sizes of both halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvironmentStats {
    pub blue: MarshalStats,
    pub red: MarshalStats,
}

pub struct VirtualEnvironment {
    blue: Rc<MembraneMarshal>,
    red: Rc<MembraneMarshal>,
    sign_source: Option<SignSourceCallback>,
    instrumentation: Option<Rc<dyn Instrumentation>>,
}
impl VirtualEnvironment {
    pub fn new(options: EnvironmentOptions) -> Result<Self> {
        Self::try_new(Some(options))
    }

    /// Connects both realms and links the intrinsics they share by identity.
    pub fn try_new(options: Option<EnvironmentOptions>) -> Result<Self> {
        let options = options
            .ok_or_else(|| MembraneError::InvalidOptions("options are required".to_string()))?;
        let blue_connector = required_connector(&options.blue_connector, RealmColor::Blue)?;
        let red_connector = required_connector(&options.red_connector, RealmColor::Red)?;
        if blue_connector.realm_id() == red_connector.realm_id() {
            return Err(MembraneError::InvalidConnector(
                "blue and red connectors belong to the same realm".to_string(),
            ));
        }

        let blue = blue_connector.connect(RealmColor::Blue, options.blue_policy());
        let red = red_connector.connect(
            RealmColor::Red,
            MembranePolicy::passive(options.config.clone()),
        );
        blue.attach(&red);
        red.attach(&blue);

        let env = VirtualEnvironment {
            blue,
            red,
            sign_source: options.sign_source.clone(),
            instrumentation: options.instrumentation.clone(),
        };
        for intrinsic in WellKnownIntrinsics::LINKED.iter() {
            env.link_target(&LinkTarget::Intrinsic(*intrinsic))?;
        }
        debug!(
            blue = %blue_connector.realm_id(),
            red = %red_connector.realm_id(),
            "Created virtual environment"
        );
        Ok(env)
    }

    fn activity<T>(
        &self,
        name: &'static str,
        f: impl FnOnce() -> std::result::Result<T, JErrorType>,
    ) -> std::result::Result<T, JErrorType> {
        let instrumentation = match &self.instrumentation {
            Some(i) => i.clone(),
            None => return f(),
        };
        instrumentation.start_activity(name);
        let result = f();
        if let Err(e) = &result {
            instrumentation.error(name, e);
        }
        instrumentation.stop_activity(name);
        result
    }

    /// Runs `source` in the red realm and returns its completion value as seen from blue.
    pub fn evaluate(&self, source: &str) -> std::result::Result<JsValue, JErrorType> {
        self.activity("evaluate", || {
            let source = match &self.sign_source {
                Some(sign) => sign(source),
                None => source.to_string(),
            };
            let result = self.blue.call_foreign(|red| red.evaluate(&source))?;
            self.blue.import_value(result)
        })
    }

    /// Installs blue `descriptors` on the red object `target`.
    pub fn remap(
        &self,
        target: &JsObjectType,
        descriptors: Vec<(PropertyKey, PropertyDescriptor)>,
    ) -> Result<()> {
        self.check_red_target(target)?;
        Ok(self.activity("remap", || {
            let mut exported = Vec::with_capacity(descriptors.len());
            for (key, desc) in &descriptors {
                exported.push((key.clone(), self.blue.export_descriptor(desc)?));
            }
            self.with_red_target(target, |red, target| red.remap_descriptors(target, exported))
        })?)
    }

    /// Installs accessors for `keys` on the red object `target` that resolve against the
    /// blue object `source` when first used.
    pub fn lazy_remap(
        &self,
        target: &JsObjectType,
        source: &JsObjectType,
        keys: Vec<PropertyKey>,
    ) -> Result<()> {
        self.check_red_target(target)?;
        if self.blue.is_foreign(source) {
            return Err(MembraneError::InvalidInvocation(
                "lazy remap source must be a blue object".to_string(),
            ));
        }
        Ok(self.activity("lazy_remap", || {
            let source = self.blue.export_reference(source)?;
            self.with_red_target(target, |red, target| {
                red.install_lazy_descriptors(target, source, keys)
            })
        })?)
    }

    /// Sets the prototype of the red object `target` to the red view of `proto`.
    pub fn remap_proto(&self, target: &JsObjectType, proto: Option<&JsObjectType>) -> Result<bool> {
        self.check_red_target(target)?;
        Ok(self.activity("remap_proto", || {
            let proto = match proto {
                Some(p) => self.blue.export_value(&JsValue::Object(p.clone()))?,
                None => CrossValue::Null,
            };
            self.with_red_target(target, |red, target| red.remap_proto(target, proto))
        })?)
    }

    /// Shares the value found by walking `path` from each realm's global object by
    /// identity instead of proxying it.
    pub fn link(&self, path: &[&str]) -> Result<()> {
        if path.is_empty() {
            return Err(MembraneError::InvalidArgument(
                "link needs at least one property name".to_string(),
            ));
        }
        let path = path.iter().map(|k| PropertyKey::from(*k)).collect();
        self.link_target(&LinkTarget::Path(path))
    }

    fn link_target(&self, target: &LinkTarget) -> Result<()> {
        let blue_id = self
            .blue
            .link_target(target)
            .map_err(|e| self.blue.import_error(e))?;
        let red_id = self
            .red
            .link_target(target)
            .map_err(|e| self.blue.import_error(e))?;
        self.red
            .link_pointer(Pointer { owner: RealmColor::Blue, id: blue_id }, red_id)
            .map_err(|e| self.blue.import_error(e))?;
        self.blue
            .link_pointer(Pointer { owner: RealmColor::Red, id: red_id }, blue_id)
            .map_err(|e| self.blue.import_error(e))?;
        debug!(%target, blue_id, red_id, "Linked");
        Ok(())
    }

    fn check_red_target(&self, target: &JsObjectType) -> Result<()> {
        if self.red.is_foreign(target) {
            return Err(MembraneError::InvalidInvocation(
                "remap target must be a red object".to_string(),
            ));
        }
        Ok(())
    }

    /// Runs a red-side operation against the red object `target`.
    fn with_red_target<T>(
        &self,
        target: &JsObjectType,
        f: impl FnOnce(&MembraneMarshal, CrossValue) -> CrossResult<T>,
    ) -> std::result::Result<T, JErrorType> {
        let exported = self.red.export_reference(target)?;
        let id = match &exported {
            CrossValue::Pointer(pointer, _) => Some(pointer.id),
            _ => None,
        };
        let result = f(&self.red, exported).map_err(|e| self.blue.import_error(e));
        if let Some(id) = id {
            self.red.release_pointer(id, 1);
        }
        result
    }

    /// The red view of a blue value.
    pub fn get_red(&self, blue_value: &JsValue) -> std::result::Result<JsValue, JErrorType> {
        let value = self.blue.export_value(blue_value)?;
        self.red.import_value(value)
    }

    /// The blue view of a red value.
    pub fn get_blue(&self, red_value: &JsValue) -> std::result::Result<JsValue, JErrorType> {
        let value = self.red.export_value(red_value)?;
        self.blue.import_value(value)
    }

    pub fn blue_connector(&self) -> &Rc<Connector> {
        &self.blue.connector
    }

    pub fn red_connector(&self) -> &Rc<Connector> {
        &self.red.connector
    }

    /// Table sizes after giving back every reference held by a dropped proxy.
    pub fn stats(&self) -> EnvironmentStats {
        // Releasing on one side can drop proxies whose releases land on the other.
        for _ in 0..2 {
            self.blue.flush_released();
            self.red.flush_released();
        }
        EnvironmentStats {
            blue: self.blue.stats(),
            red: self.red.stats(),
        }
    }
}
impl fmt::Debug for VirtualEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualEnvironment")
            .field("blue", &self.blue.connector.realm_id())
            .field("red", &self.red.connector.realm_id())
            .finish()
    }
}

fn required_connector(connector: &Option<Rc<Connector>>, color: RealmColor) -> Result<Rc<Connector>> {
    connector
        .clone()
        .ok_or_else(|| MembraneError::InvalidConnector(format!("the {} connector is required", color)))
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::membrane::connector::{create_connector, RealmEvaluator};
    use crate::membrane::pointer::CrossError;
    use crate::runner::ds::error::ErrorKind;
    use crate::runner::ds::realm::CodeRealm;

    fn environment() -> VirtualEnvironment {
        VirtualEnvironment::new(
            EnvironmentOptions::new()
                .blue_connector(create_connector(RealmEvaluator::Global(CodeRealm::new())).unwrap())
                .red_connector(create_connector(RealmEvaluator::Global(CodeRealm::new())).unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_construct_without_new_target_is_rejected() {
        let env = environment();
        let f = env.blue.connector.realm().evaluate("() => 1").unwrap();
        let id = match env.blue.export_value(&f).unwrap() {
            CrossValue::Pointer(pointer, _) => pointer.id,
            other => panic!("expected a pointer, got {:?}", other),
        };
        let result = RealmCallables::construct(&*env.blue, id, vec![], CrossValue::Undefined);
        assert!(matches!(
            result,
            Err(CrossError::Native { kind: ErrorKind::TypeError, .. })
        ));
    }

    #[test]
    fn test_remap_target_is_exported_only_for_the_call() {
        let env = environment();
        let before = env.stats();
        let target = env.red.connector.realm().global_object();
        env.remap(&target, vec![]).unwrap();
        assert_eq!(env.stats().red.exported, before.red.exported);
    }
}
