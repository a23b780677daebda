//! # near-membrane - a sandbox between two JavaScript realms
//!
//! Code evaluated in a sandboxed *red* realm sees the objects of a trusted *blue* realm
//! only through proxies. The membrane preserves identity across crossings, rebuilds arrays
//! with the receiving realm's `Array`, applies the embedder's distortions, and re-homes
//! every exception with the catching realm's own error constructors.
//!
//! The crate carries the engine it sandboxes: a PEG parser for a compact JavaScript
//! subset, an object model with an invariant-checking `Proxy` exotic object, and a tree-walking
//! evaluator.
//!
//! ## Quick Start
//!
//! ```
//! use near_membrane::membrane::{create_connector, EnvironmentOptions, RealmEvaluator, VirtualEnvironment};
//! use near_membrane::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
//! use near_membrane::runner::ds::realm::CodeRealm;
//! use near_membrane::runner::ds::value::JsValue;
//!
//! let blue = CodeRealm::new();
//! let red = CodeRealm::new();
//! let env = VirtualEnvironment::new(
//!     EnvironmentOptions::new()
//!         .blue_connector(create_connector(RealmEvaluator::Global(blue.clone())).unwrap())
//!         .red_connector(create_connector(RealmEvaluator::Global(red.clone())).unwrap()),
//! )
//! .unwrap();
//!
//! let endowment = blue.evaluate("({ greeting: 'hello' })").unwrap();
//! env.remap(
//!     &red.global_object(),
//!     vec![(PropertyKey::from("host"), PropertyDescriptor::new_data(endowment, true, true, true))],
//! )
//! .unwrap();
//!
//! assert_eq!(env.evaluate("host.greeting").unwrap(), JsValue::from("hello"));
//! ```
//!
//! ## Architecture
//!
//! - **[`parser`]** - PEG parser and AST types
//! - **[`runner`]** - the host engine
//!   - **[`runner::ds`]** - values, objects, proxies, realms and abstract operations
//!   - **[`runner::std_lib`]** - `Object`, `Array`, `Reflect` and the error constructors
//!   - **[`runner::eval`]** - tree-walking evaluator
//! - **[`membrane`]** - connectors, the two membrane halves, trap handlers and
//!   `VirtualEnvironment`

#[macro_use]
extern crate lazy_static;

pub mod membrane;
pub mod parser;
pub mod runner;

pub use membrane::{
    create_connector, EnvironmentOptions, MembraneConfig, MembraneError, RealmEvaluator,
    VirtualEnvironment,
};
