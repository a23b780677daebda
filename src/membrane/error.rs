//! Errors surfaced by the membrane's Rust API.

use thiserror::Error;

use crate::runner::ds::error::JErrorType;

#[derive(Debug, Error)]
pub enum MembraneError {
    /// The options bag is missing or malformed.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// A connector or evaluator that cannot be called.
    #[error("invalid connector: {0}")]
    InvalidConnector(String),

    /// A value of the wrong shape passed to a membrane API.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A cross-realm call made outside the protocol, such as `construct` without `newTarget`.
    #[error("invalid invocation: {0}")]
    InvalidInvocation(String),

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// An exception raised by evaluated code or by a cross-realm operation.
    #[error(transparent)]
    Js(#[from] JErrorType),
}

pub type Result<T> = std::result::Result<T, MembraneError>;
