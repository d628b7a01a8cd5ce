//! Campfire participant identity.

use std::any::Any;
use std::fmt;

use ember_core::Identifier;

/// A Campfire participant, known only by display name.
///
/// `user`, `person` and `nick` all return the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CampfireIdentifier {
    name: String,
}

impl CampfireIdentifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the display name.
    pub fn user(&self) -> &str {
        &self.name
    }
}

impl Identifier for CampfireIdentifier {
    fn person(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for CampfireIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for CampfireIdentifier {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for CampfireIdentifier {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}
