//! Host engine data structures: values, the object model, the `Proxy` exotic object
//! and the realm that owns a set of intrinsics.

pub mod array_object;
pub mod error;
pub mod error_object;
pub mod function_object;
pub mod object;
pub mod object_property;
pub mod operations;
pub mod proxy_object;
pub mod realm;
pub mod symbol;
pub mod value;
