//! Text notifications, optionally carrying a reply callback.
//!
//! [`NotificationWithCallback`] is-a [`NotificationMessage`], which is-a
//! [`MessageBase`], so a derived subscription on either parent sees both.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::routing::{Lineage, Routable};

use super::MessageBase;

/// A plain text notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationMessage {
    base: MessageBase,
    notification: Cow<'static, str>,
}

impl NotificationMessage {
    /// Notification with the given text under an empty header.
    pub fn new(notification: impl Into<Cow<'static, str>>) -> Self {
        Self {
            base: MessageBase::new(),
            notification: notification.into(),
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

    /// The notification text.
    pub fn notification(&self) -> &str {
        &self.notification
    }
}

impl Routable for NotificationMessage {
    fn lineage(lineage: &mut Lineage<Self>) {
        lineage.is_a::<MessageBase>(|msg| &msg.base);
    }
}

/// A notification the recipient can answer through a callback.
///
/// The callback runs on whichever thread calls [`execute`](Self::execute).
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use weakbus::messages::NotificationWithCallback;
///
/// let answers = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&answers);
/// let msg = NotificationWithCallback::new("confirm?", move |yes: bool| {
///     sink.lock().unwrap().push(yes);
/// });
///
/// msg.execute(true);
/// assert_eq!(msg.notification().notification(), "confirm?");
/// assert_eq!(*answers.lock().unwrap(), vec![true]);
/// ```
pub struct NotificationWithCallback<P = ()> {
    notification: NotificationMessage,
    callback: Arc<dyn Fn(P) + Send + Sync>,
}

impl<P> NotificationWithCallback<P> {
    /// Notification with the given text, answered through `callback`.
    pub fn new<F>(notification: impl Into<Cow<'static, str>>, callback: F) -> Self
    where
        F: Fn(P) + Send + Sync + 'static,
    {
        Self {
            notification: NotificationMessage::new(notification),
            callback: Arc::new(callback),
        }
    }

    /// Replaces the header.
    pub fn with_base(mut self, base: MessageBase) -> Self {
        self.notification = self.notification.with_base(base);
        self
    }

    /// The wrapped notification, header included.
    pub fn notification(&self) -> &NotificationMessage {
        &self.notification
    }

    /// Runs the callback with `arg`.
    pub fn execute(&self, arg: P) {
        (self.callback)(arg)
    }
}

impl<P> Clone for NotificationWithCallback<P> {
    fn clone(&self) -> Self {
        Self {
            notification: self.notification.clone(),
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<P> fmt::Debug for NotificationWithCallback<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationWithCallback")
            .field("notification", &self.notification.notification())
            .finish_non_exhaustive()
    }
}

impl<P: 'static> Routable for NotificationWithCallback<P> {
    fn lineage(lineage: &mut Lineage<Self>) {
        lineage.is_a::<NotificationMessage>(|msg| &msg.notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{Ancestry, MessageType};

    #[test]
    fn test_callback_notification_inherits_base() {
        let ancestry = Ancestry::of::<NotificationWithCallback<u8>>();
        let types: Vec<MessageType> = ancestry.types().collect();
        assert_eq!(
            types,
            vec![
                MessageType::of::<NotificationWithCallback<u8>>(),
                MessageType::of::<NotificationMessage>(),
                MessageType::of::<MessageBase>(),
            ]
        );
    }

    #[test]
    fn test_clone_shares_callback() {
        let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let msg = NotificationWithCallback::new("ping", move |n: usize| {
            seen.fetch_add(n, std::sync::atomic::Ordering::SeqCst);
        });
        msg.clone().execute(2);
        msg.execute(3);
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 5);
    }
}
