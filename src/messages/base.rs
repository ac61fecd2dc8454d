//! The header shared by every library message.
//!
//! The header never steers delivery. It only labels where a message came from
//! and which type it was meant for.

use std::sync::Arc;

use crate::routing::{MessageType, Routable};

/// Common header of the library messages.
///
/// Both fields are informational; routing is decided by the send call, not by the header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageBase {
    sender: Option<Arc<str>>,
    target: Option<MessageType>,
}

impl MessageBase {
    /// Header with no sender and no target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Header labelled with the sender's name.
    pub fn from_sender(sender: impl Into<Arc<str>>) -> Self {
        Self {
            sender: Some(sender.into()),
            target: None,
        }
    }

    /// Records the type the message is intended for.
    pub fn with_target<T: ?Sized + 'static>(mut self) -> Self {
        self.target = Some(MessageType::of::<T>());
        self
    }

    /// Name of the sender, if one was given.
    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    /// Type recorded by [`with_target`](Self::with_target), if any.
    ///
    /// ```rust
    /// use weakbus::messages::{MessageBase, NotificationMessage};
    /// use weakbus::MessageType;
    ///
    /// let base = MessageBase::from_sender("panel").with_target::<NotificationMessage>();
    /// assert_eq!(base.sender(), Some("panel"));
    /// assert_eq!(base.target(), Some(MessageType::of::<NotificationMessage>()));
    /// assert_eq!(MessageBase::new().target(), None);
    /// ```
    pub fn target(&self) -> Option<MessageType> {
        self.target
    }
}

impl Routable for MessageBase {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields_default_to_none() {
        let base = MessageBase::new();
        assert_eq!(base.sender(), None);
        assert_eq!(base.target(), None);
        assert_eq!(base, MessageBase::default());
    }

    #[test]
    fn test_target_accepts_trait_objects() {
        let base = MessageBase::from_sender("ui").with_target::<dyn std::fmt::Debug>();
        assert_eq!(base.sender(), Some("ui"));
        assert_eq!(base.target(), Some(MessageType::of::<dyn std::fmt::Debug>()));
    }
}
