use std::fmt;

use thiserror::Error;

use crate::runner::ds::value::JsValue;

/// The native error constructors every realm carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Error,
    TypeError,
    ReferenceError,
    RangeError,
    SyntaxError,
}
impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Error,
        ErrorKind::TypeError,
        ErrorKind::ReferenceError,
        ErrorKind::RangeError,
        ErrorKind::SyntaxError,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::SyntaxError => "SyntaxError",
        }
    }
}
impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An abrupt completion. The message-carrying variants are raised by the engine itself
/// and are not yet objects of any realm; `Thrown` carries a value thrown by script or
/// re-homed by the membrane.
#[derive(Debug, Clone, Error)]
pub enum JErrorType {
    #[error("Uncaught reference error: {0}.")]
    ReferenceError(String),
    #[error("Uncaught type error: {0}.")]
    TypeError(String),
    #[error("Uncaught range error: {0}.")]
    RangeError(String),
    #[error("Uncaught syntax error: {0}.")]
    SyntaxError(String),
    #[error("Uncaught error: {0}.")]
    Error(String),
    #[error("Uncaught {0}")]
    Thrown(JsValue),
}
impl JErrorType {
    pub fn from_kind(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::Error => JErrorType::Error(message),
            ErrorKind::TypeError => JErrorType::TypeError(message),
            ErrorKind::ReferenceError => JErrorType::ReferenceError(message),
            ErrorKind::RangeError => JErrorType::RangeError(message),
            ErrorKind::SyntaxError => JErrorType::SyntaxError(message),
        }
    }

    /// Kind and message of an engine-raised error, `None` for thrown values.
    pub fn native_parts(&self) -> Option<(ErrorKind, &str)> {
        match self {
            JErrorType::ReferenceError(m) => Some((ErrorKind::ReferenceError, m)),
            JErrorType::TypeError(m) => Some((ErrorKind::TypeError, m)),
            JErrorType::RangeError(m) => Some((ErrorKind::RangeError, m)),
            JErrorType::SyntaxError(m) => Some((ErrorKind::SyntaxError, m)),
            JErrorType::Error(m) => Some((ErrorKind::Error, m)),
            JErrorType::Thrown(_) => None,
        }
    }
}
