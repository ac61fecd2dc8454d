//! A message wrapping an arbitrary payload.

use std::fmt;

use crate::routing::{Lineage, Routable};

use super::MessageBase;

/// A message carrying one value of type `T`.
///
/// ```rust
/// use weakbus::messages::{GenericMessage, MessageBase};
///
/// let msg = GenericMessage::new(42u32).with_base(MessageBase::from_sender("counter"));
/// assert_eq!(*msg.content(), 42);
/// assert_eq!(msg.base().sender(), Some("counter"));
/// ```
#[derive(Clone, Default, PartialEq)]
pub struct GenericMessage<T> {
    base: MessageBase,
    content: T,
}

impl<T> GenericMessage<T> {
    /// Wraps `content` under an empty header.
    pub fn new(content: T) -> Self {
        Self {
            base: MessageBase::new(),
            content,
        }
    }

    /// Replaces the header.
    pub fn with_base(mut self, base: MessageBase) -> Self {
        self.base = base;
        self
    }

    /// The header.
    pub fn base(&self) -> &MessageBase {
        &self.base
    }

    /// Borrows the payload.
    pub fn content(&self) -> &T {
        &self.content
    }

    /// Unwraps the payload, dropping the header.
    pub fn into_content(self) -> T {
        self.content
    }
}

impl<T: fmt::Debug> fmt::Debug for GenericMessage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericMessage")
            .field("sender", &self.base.sender())
            .field("content", &self.content)
            .finish()
    }
}

impl<T: Send + Sync + 'static> Routable for GenericMessage<T> {
    fn lineage(lineage: &mut Lineage<Self>) {
        lineage.is_a::<MessageBase>(|msg| &msg.base);
    }
}
