//! The near-membrane: two realms, two membrane halves and the proxies between them.
//!
//! Each realm gets a [`connector::Connector`], each connector produces one
//! [`marshal::MembraneMarshal`], and a [`environment::VirtualEnvironment`] attaches the
//! two halves so that every value crossing between realms is either a primitive, a
//! rebuilt array or a proxy.

pub mod callables;
pub mod config;
pub mod connector;
mod endpoint;
pub mod environment;
pub mod error;
mod error_boundary;
pub mod handler;
pub mod instrumentation;
pub mod intrinsics;
pub mod marshal;
pub mod options;
pub mod pointer;
pub mod registry;
mod remap;
pub mod shadow;

pub use config::MembraneConfig;
pub use connector::{create_connector, Connector, RealmEvaluator};
pub use environment::{EnvironmentStats, VirtualEnvironment};
pub use error::MembraneError;
pub use instrumentation::{Instrumentation, TracingInstrumentation};
pub use options::EnvironmentOptions;
pub use pointer::RealmColor;
