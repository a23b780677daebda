//! The in-process host engine: object model, built-ins and a tree-walking evaluator.

pub mod ds;
pub mod eval;
pub mod std_lib;
