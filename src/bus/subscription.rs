//! Builder-style registration: `bus.subscribe(&r).token(..).derived().handle(h)`.

use std::any::Any;
use std::sync::{Arc, Weak};

use crate::error::BusError;
use crate::handles::{Handler, WeakHandle};
use crate::routing::Routable;
use crate::token::Token;

use super::Bus;

/// Pending registration of one recipient; finished by [`handle`](Subscription::handle).
#[must_use = "a subscription registers nothing until `handle` is called"]
pub struct Subscription<'a, R> {
    bus: &'a Bus,
    recipient: &'a Arc<R>,
    token: Option<Token>,
    derived: bool,
    owner: Option<Weak<dyn Any + Send + Sync>>,
}

impl<'a, R: Routable> Subscription<'a, R> {
    pub(crate) fn new(bus: &'a Bus, recipient: &'a Arc<R>) -> Self {
        Self {
            bus,
            recipient,
            token: None,
            derived: false,
            owner: None,
        }
    }

    /// Listens on the channel identified by `token` instead of untokenized sends.
    pub fn token(mut self, token: impl Into<Token>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Also receives every message whose lineage contains the handler's type.
    pub fn derived(self) -> Self {
        self.receive_derived(true)
    }

    /// Sets derived delivery explicitly.
    pub fn receive_derived(mut self, yes: bool) -> Self {
        self.derived = yes;
        self
    }

    /// Ties the subscription to `owner` as well: it dies when either goes away.
    pub fn owner<O: Any + Send + Sync>(mut self, owner: &Arc<O>) -> Self {
        let owner: Arc<dyn Any + Send + Sync> = owner.clone();
        self.owner = Some(Arc::downgrade(&owner));
        self
    }

    /// Registers `handler` with the collected options.
    ///
    /// # Errors
    /// [`BusError::UnnamedHandler`] if the handler's name is empty.
    pub fn handle<K: ?Sized + 'static>(self, handler: Handler<R, K>) -> Result<(), BusError> {
        let mut handle = WeakHandle::bound(self.recipient, handler);
        if let Some(owner) = self.owner {
            handle = handle.with_owner_weak(owner);
        }
        self.bus.insert(handle, self.token, self.derived)
    }
}
