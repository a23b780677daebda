//! Construction options of a `VirtualEnvironment` and the policy each membrane half
//! applies when it exports a value.

use std::fmt;
use std::rc::Rc;

use crate::membrane::config::MembraneConfig;
use crate::membrane::connector::Connector;
use crate::membrane::instrumentation::Instrumentation;
use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::value::JsValue;

/// Replaces a blue value before the red realm can see it.
pub type DistortionCallback = Rc<dyn Fn(&JsValue) -> JsValue>;
/// Whether the red proxy for a blue object forwards every trap instead of snapshotting.
pub type LiveTargetCallback = Rc<dyn Fn(&JsObjectType) -> bool>;
/// Whether the red proxy for a blue object is revoked from the start.
pub type RevokedProxyCallback = Rc<dyn Fn(&JsObjectType) -> bool>;
/// Rewrites source text before the red realm evaluates it.
pub type SignSourceCallback = Rc<dyn Fn(&str) -> String>;

/// What one membrane half consults while exporting.
#[derive(Clone, Default)]
pub struct MembranePolicy {
    pub distortion: Option<DistortionCallback>,
    pub live_target: Option<LiveTargetCallback>,
    pub revoked_proxy: Option<RevokedProxyCallback>,
    pub config: MembraneConfig,
}
impl MembranePolicy {
    /// A policy with no callbacks, as the red half uses.
    pub fn passive(config: MembraneConfig) -> Self {
        MembranePolicy {
            config,
            ..Default::default()
        }
    }

    pub fn distort(&self, value: JsValue) -> JsValue {
        match (&self.distortion, &value) {
            (Some(distortion), JsValue::Object(_)) => distortion(&value),
            _ => value,
        }
    }

    pub fn is_live(&self, o: &JsObjectType) -> bool {
        match &self.live_target {
            Some(callback) => callback(o),
            None => self.config.live_targets,
        }
    }

    pub fn is_revoked(&self, o: &JsObjectType) -> bool {
        self.revoked_proxy.as_ref().map_or(false, |callback| callback(o))
    }
}

/// Everything `VirtualEnvironment::new` needs. Both connectors are required.
#[derive(Clone, Default)]
pub struct EnvironmentOptions {
    pub(crate) blue_connector: Option<Rc<Connector>>,
    pub(crate) red_connector: Option<Rc<Connector>>,
    pub(crate) distortion: Option<DistortionCallback>,
    pub(crate) live_target: Option<LiveTargetCallback>,
    pub(crate) revoked_proxy: Option<RevokedProxyCallback>,
    pub(crate) sign_source: Option<SignSourceCallback>,
    pub(crate) instrumentation: Option<Rc<dyn Instrumentation>>,
    pub(crate) config: MembraneConfig,
}
impl EnvironmentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blue_connector(mut self, connector: Rc<Connector>) -> Self {
        self.blue_connector = Some(connector);
        self
    }

    pub fn red_connector(mut self, connector: Rc<Connector>) -> Self {
        self.red_connector = Some(connector);
        self
    }

    pub fn distortion_callback(mut self, callback: impl Fn(&JsValue) -> JsValue + 'static) -> Self {
        self.distortion = Some(Rc::new(callback));
        self
    }

    pub fn live_target_callback(
        mut self,
        callback: impl Fn(&JsObjectType) -> bool + 'static,
    ) -> Self {
        self.live_target = Some(Rc::new(callback));
        self
    }

    pub fn revoked_proxy_callback(
        mut self,
        callback: impl Fn(&JsObjectType) -> bool + 'static,
    ) -> Self {
        self.revoked_proxy = Some(Rc::new(callback));
        self
    }

    pub fn sign_source_callback(mut self, callback: impl Fn(&str) -> String + 'static) -> Self {
        self.sign_source = Some(Rc::new(callback));
        self
    }

    pub fn instrumentation(mut self, instrumentation: Rc<dyn Instrumentation>) -> Self {
        self.instrumentation = Some(instrumentation);
        self
    }

    pub fn config(mut self, config: MembraneConfig) -> Self {
        self.config = config;
        self
    }

    pub(crate) fn blue_policy(&self) -> MembranePolicy {
        MembranePolicy {
            distortion: self.distortion.clone(),
            live_target: self.live_target.clone(),
            revoked_proxy: self.revoked_proxy.clone(),
            config: self.config.clone(),
        }
    }
}
impl fmt::Debug for EnvironmentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentOptions")
            .field("blue_connector", &self.blue_connector.is_some())
            .field("red_connector", &self.red_connector.is_some())
            .field("distortion", &self.distortion.is_some())
            .field("live_target", &self.live_target.is_some())
            .field("revoked_proxy", &self.revoked_proxy.is_some())
            .field("sign_source", &self.sign_source.is_some())
            .field("instrumentation", &self.instrumentation.is_some())
            .field("config", &self.config)
            .finish()
    }
}
