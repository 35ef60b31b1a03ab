use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of the pet a walk belongs to. The only thing checked
/// about it is that it is not empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PetId(String);

impl PetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
