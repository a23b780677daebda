//! What crosses the boundary: primitives, rebuilt arrays and opaque pointers.
//!
//! Object references never leave their realm. A `Pointer` names an entry in the export
//! registry of the realm that owns the object, and only that realm can resolve it.

use std::fmt;

use crate::runner::ds::error::ErrorKind;
use crate::runner::ds::object_property::PropertyKey;
use crate::runner::ds::realm::WellKnownIntrinsics;
use crate::runner::ds::symbol::SymbolData;
use crate::runner::ds::value::JsNumberType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RealmColor {
    Blue,
    Red,
}
impl RealmColor {
    pub fn opposite(self) -> Self {
        match self {
            RealmColor::Blue => RealmColor::Red,
            RealmColor::Red => RealmColor::Blue,
        }
    }
}
impl fmt::Display for RealmColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RealmColor::Blue => write!(f, "blue"),
            RealmColor::Red => write!(f, "red"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pointer {
    pub owner: RealmColor,
    pub id: u64,
}
impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.owner, self.id)
    }
}

/// The shape a shadow target must have for the host to accept a proxy over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Object,
    Array,
    Function { constructor: bool },
}

/// Facts about a pointer's referent decided by its owner when it is exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerTraits {
    pub kind: TargetKind,
    pub live: bool,
    pub revoked: bool,
}
impl PointerTraits {
    pub fn new(kind: TargetKind) -> Self {
        PointerTraits {
            kind,
            live: false,
            revoked: false,
        }
    }
}

/// A value in transit between two realms.
#[derive(Debug, Clone)]
pub enum CrossValue {
    Undefined,
    Null,
    Boolean(bool),
    String(String),
    Number(JsNumberType),
    Symbol(SymbolData),
    /// An array copied element by element; the receiver rebuilds it with its own `Array`.
    Array(Vec<CrossValue>),
    Pointer(Pointer, PointerTraits),
}
impl CrossValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, CrossValue::Undefined)
    }
}

/// A possibly partial property descriptor whose values are in transit.
#[derive(Debug, Clone, Default)]
pub struct CrossDescriptor {
    pub value: Option<CrossValue>,
    pub writable: Option<bool>,
    pub get: Option<CrossValue>,
    pub set: Option<CrossValue>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}
impl CrossDescriptor {
    pub fn is_accessor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub fn is_configurable(&self) -> bool {
        self.configurable == Some(true)
    }

    /// An accessor with a getter and no setter.
    pub fn is_getter_only(&self) -> bool {
        matches!(&self.get, Some(g) if !g.is_undefined())
            && self.set.as_ref().map_or(true, |s| s.is_undefined())
    }
}

/// Everything needed to populate a snapshot shadow target in one round trip.
#[derive(Debug, Clone)]
pub struct CrossTargetMeta {
    pub proto: CrossValue,
    pub descriptors: Vec<(PropertyKey, CrossDescriptor)>,
    pub is_extensible: bool,
    pub is_frozen: bool,
    pub is_sealed: bool,
    /// The owner could not describe the target, so the proxy must stay inert.
    pub is_broken: bool,
}
impl CrossTargetMeta {
    pub fn broken() -> Self {
        CrossTargetMeta {
            proto: CrossValue::Null,
            descriptors: vec![],
            is_extensible: true,
            is_frozen: false,
            is_sealed: false,
            is_broken: true,
        }
    }
}

/// What identifies a thrown error object so the catching realm can rebuild it.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorTag {
    pub origin: RealmColor,
    pub kind: ErrorKind,
    pub message: Option<String>,
}

/// An abrupt completion in transit.
#[derive(Debug, Clone)]
pub enum CrossError {
    /// Raised by the engine itself, not yet an object of any realm.
    Native { kind: ErrorKind, message: String },
    /// A thrown error object, re-created from its tag with the catching realm's constructors.
    Error(ErrorTag),
    /// Any other thrown value, re-thrown as-is after marshalling.
    Value(CrossValue),
}
impl CrossError {
    pub fn type_error(message: impl Into<String>) -> Self {
        CrossError::Native {
            kind: ErrorKind::TypeError,
            message: message.into(),
        }
    }
}

/// Something both realms resolve locally and then agree to share by identity.
#[derive(Debug, Clone)]
pub enum LinkTarget {
    Intrinsic(WellKnownIntrinsics),
    /// Property names walked from the global object.
    Path(Vec<PropertyKey>),
}
impl fmt::Display for LinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkTarget::Intrinsic(i) => write!(f, "%{:?}%", i),
            LinkTarget::Path(path) => {
                write!(f, "globalThis")?;
                for key in path {
                    write!(f, ".{}", key)?;
                }
                Ok(())
            }
        }
    }
}
