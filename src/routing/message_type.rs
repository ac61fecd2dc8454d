//! # Runtime identity of a message (or recipient) type.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a Rust type, as used for table keys and target filters.
///
/// Wraps a [`TypeId`] together with the type's name for logs and errors.
/// Equality and hashing only consider the `TypeId`.
///
/// Works for unsized types too, so capabilities expressed as trait objects
/// (`dyn Trait`) have an identity of their own.
///
/// ## Example
/// ```rust
/// use weakbus::MessageType;
///
/// trait Audible {}
///
/// assert_eq!(MessageType::of::<u32>(), MessageType::of::<u32>());
/// assert_ne!(MessageType::of::<u32>(), MessageType::of::<dyn Audible>());
/// assert!(MessageType::of::<String>().name().contains("String"));
/// ```
#[derive(Clone, Copy)]
pub struct MessageType {
    id: TypeId,
    name: &'static str,
}

impl MessageType {
    /// Returns the identity of `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Underlying `TypeId`.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name (diagnostic only, not guaranteed stable).
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageType {}

impl Hash for MessageType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
