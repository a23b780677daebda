use std::fmt;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// A symbol primitive. Identity is the uuid, the description is informational only,
/// so two symbols with the same description are still distinct values.
pub struct SymbolData {
    id: Uuid,
    description: String,
}

impl SymbolData {
    pub fn new(description: String) -> Self {
        SymbolData {
            id: Uuid::new_v4(),
            description,
        }
    }

    pub fn new_empty() -> Self {
        SymbolData {
            id: Uuid::new_v4(),
            description: String::new(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn id(&self) -> String {
        self.id.to_hyphenated().to_string()
    }
}
impl Clone for SymbolData {
    fn clone(&self) -> Self {
        SymbolData {
            id: self.id,
            description: self.description.to_string(),
        }
    }
}
impl PartialEq for SymbolData {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for SymbolData {}
impl Hash for SymbolData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
impl Display for SymbolData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}
impl fmt::Debug for SymbolData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}
