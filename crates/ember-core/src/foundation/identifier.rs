//! Identifier abstraction for chat participants.
//!
//! Every backend models "who" differently. The framework only needs a
//! person-level handle and a nickname that can be mentioned; backends expose
//! the rest through their concrete types.

use std::any::Any;
use std::fmt::{Debug, Display};
use std::sync::Arc;

/// A chat participant as seen by a backend.
///
/// # Example
///
/// ```rust,ignore
/// use ember_core::Identifier;
///
/// fn greet(who: &dyn Identifier) -> String {
///     format!("hello {}", who.nick())
/// }
/// ```
pub trait Identifier: Debug + Display + Send + Sync + 'static {
    /// Returns the person-level handle of this participant.
    fn person(&self) -> &str;

    /// Returns the name used to mention this participant.
    fn nick(&self) -> &str {
        self.person()
    }

    /// Returns self as `&dyn Any` for downcasting to the backend type.
    fn as_any(&self) -> &dyn Any;
}

/// A shared, type-erased identifier.
pub type BoxedIdentifier = Arc<dyn Identifier>;

/// Returns true if both identifiers refer to the same person.
pub fn same_person(a: &dyn Identifier, b: &dyn Identifier) -> bool {
    a.person() == b.person()
}
