//! # Bus: registration, unregistration, dispatch and deferred cleanup.
//!
//! The [`Bus`] owns two subscription tables and the cleanup state, and hands
//! deferred work to an [`IdleScheduler`].
//!
//! ## High-level architecture
//! ```text
//! register(&Arc<R>, token, derived, Handler<R, K>)
//!   └─► WeakHandle::bound ─► (derived ? polymorphic : exact).insert(K, entry) ─► request_cleanup()
//!
//! send(&M, target?, token?)
//!   ├─► Ancestry::of::<M>()
//!   ├─► polymorphic pass: for K in keys() (snapshot) where ancestry ∋ K
//!   │       └─► snapshot(K) ─► deliver(snapshot, projection(K))      (lock released)
//!   ├─► exact pass: snapshot(M) ─► deliver(snapshot, identity)
//!   └─► request_cleanup()                          (if cfg.cleanup_on_send; also on unwind)
//!
//! unregister(&Arc<R>, token?, type?, handler?)
//!   └─► tombstone matching entries in both tables ─► request_cleanup()
//!
//! request_cleanup()
//!   └─ first request since last pass? ─► scheduler.schedule_when_idle(cleanup)
//! cleanup()
//!   └─► sweep exact + polymorphic ─► clear pending flag
//! ```
//!
//! ## Rules
//! - Handlers run on the sender's thread, with no bus lock held; they may register,
//!   unregister or send re-entrantly. Their changes apply from the next send on.
//! - A send delivers to the entries it snapshotted. A recipient or owner that goes
//!   away is skipped at once; a tombstone set mid-send counts from the next send.
//! - Dead entries are removed physically only by a cleanup pass.
//! - At most one cleanup pass is pending at any time.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::BusConfig;
use crate::error::BusError;
use crate::handles::{address_of, Handler, WeakHandle};
use crate::routing::{Ancestry, MessageType, Routable};
use crate::schedulers::IdleScheduler;
use crate::token::{Token, TokenFilter};

use super::builder::BusBuilder;
use super::dispatch::{deliver, Outgoing};
use super::subscription::Subscription;
use super::table::{Entry, Table};

/// Counts of what the tables physically hold, dead entries included.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableStats {
    /// Message types with an exact-delivery bucket.
    pub exact_keys: usize,
    /// Message types with a polymorphic-delivery bucket.
    pub polymorphic_keys: usize,
    /// Entries across all exact buckets.
    pub exact_entries: usize,
    /// Entries across all polymorphic buckets.
    pub polymorphic_entries: usize,
}

impl TableStats {
    /// Total number of stored entries.
    #[inline]
    pub fn total_entries(&self) -> usize {
        self.exact_entries + self.polymorphic_entries
    }

    /// Returns `true` when both tables are empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.exact_keys == 0 && self.polymorphic_keys == 0
    }
}

/// State shared by every clone of a [`Bus`].
pub(crate) struct Shared {
    cfg: BusConfig,
    exact: Table,
    polymorphic: Table,
    cleanup_pending: AtomicBool,
    scheduler: Arc<dyn IdleScheduler>,
}

impl Routable for Shared {}

impl Shared {
    fn cleanup(&self) {
        let exact = self.exact.sweep();
        let polymorphic = self.polymorphic.sweep();
        self.cleanup_pending.store(false, Ordering::Release);

        let removed_entries = exact.removed_entries + polymorphic.removed_entries;
        let removed_keys = exact.removed_keys + polymorphic.removed_keys;
        if removed_entries > 0 {
            tracing::debug!(
                bus = %self.cfg.name,
                removed_entries,
                removed_keys,
                "cleanup pass removed dead subscriptions"
            );
        }
    }
}

/// In-process publish/subscribe bus with weak subscriptions.
///
/// Cheap to clone; clones share the same tables.
///
/// ## Example
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use weakbus::{Bus, Handler};
///
/// struct Foo { val: i32 }
/// struct Panel { seen: Mutex<Vec<i32>> }
/// weakbus::routable!(Foo, Panel);
///
/// let bus = Bus::new();
/// let panel = Arc::new(Panel { seen: Mutex::new(Vec::new()) });
///
/// bus.register(&panel, None, false, Handler::new("on_foo", |p: &Panel, m: &Foo| {
///     p.seen.lock().unwrap().push(m.val);
/// }))?;
///
/// assert_eq!(bus.send(&Foo { val: 1 })?, 1);
/// assert_eq!(*panel.seen.lock().unwrap(), vec![1]);
///
/// drop(panel);                                   // no unregister needed
/// assert_eq!(bus.send(&Foo { val: 2 })?, 0);
/// # Ok::<(), weakbus::BusError>(())
/// ```
#[derive(Clone)]
pub struct Bus {
    shared: Arc<Shared>,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    /// Creates a bus with the default configuration and the [`TokioIdle`](crate::TokioIdle) scheduler.
    #[must_use]
    pub fn new() -> Self {
        BusBuilder::new(BusConfig::default()).build()
    }

    /// Starts building a bus with the given configuration.
    pub fn builder(cfg: BusConfig) -> BusBuilder {
        BusBuilder::new(cfg)
    }

    pub(crate) fn from_parts(cfg: BusConfig, scheduler: Arc<dyn IdleScheduler>) -> Self {
        Self {
            shared: Arc::new(Shared {
                cfg,
                exact: Table::default(),
                polymorphic: Table::default(),
                cleanup_pending: AtomicBool::new(false),
                scheduler,
            }),
        }
    }

    /// Configuration this bus was built with.
    pub fn config(&self) -> &BusConfig {
        &self.shared.cfg
    }

    /// Returns `true` if both handles refer to the same bus.
    pub fn same_bus(&self, other: &Bus) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    // ---------------------------
    // Registration
    // ---------------------------

    /// Subscribes `recipient` to messages of type `K`.
    ///
    /// - `token`: channel; `None` receives only untokenized sends.
    /// - `receive_derived`: also receive every type whose lineage contains `K`.
    ///
    /// The bus keeps only a weak reference to `recipient`. Registering the same
    /// recipient and handler twice produces two independent subscriptions.
    ///
    /// # Errors
    /// [`BusError::UnnamedHandler`] if the handler's name is empty; nothing is registered.
    pub fn register<R, K>(
        &self,
        recipient: &Arc<R>,
        token: Option<Token>,
        receive_derived: bool,
        handler: Handler<R, K>,
    ) -> Result<(), BusError>
    where
        R: Routable,
        K: ?Sized + 'static,
    {
        self.insert(WeakHandle::bound(recipient, handler), token, receive_derived)
    }

    /// Builder-style registration for `recipient`.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use weakbus::{Bus, Handler};
    ///
    /// struct Tick;
    /// struct Clock;
    /// weakbus::routable!(Tick, Clock);
    ///
    /// let bus = Bus::new();
    /// let clock = Arc::new(Clock);
    /// bus.subscribe(&clock)
    ///     .token("ui")
    ///     .handle(Handler::new("on_tick", |_: &Clock, _: &Tick| {}))?;
    ///
    /// assert_eq!(bus.send(&Tick)?, 0);
    /// assert_eq!(bus.send_with_token(&Tick, "ui")?, 1);
    /// # Ok::<(), weakbus::BusError>(())
    /// ```
    pub fn subscribe<'a, R: Routable>(&'a self, recipient: &'a Arc<R>) -> Subscription<'a, R> {
        Subscription::new(self, recipient)
    }

    pub(crate) fn insert<K: ?Sized + 'static>(
        &self,
        handle: WeakHandle<K>,
        token: Option<Token>,
        receive_derived: bool,
    ) -> Result<(), BusError> {
        if handle.method_name().is_empty() {
            return Err(BusError::UnnamedHandler);
        }

        let key = MessageType::of::<K>();
        tracing::debug!(
            bus = %self.shared.cfg.name,
            message = key.name(),
            handler = handle.method_name(),
            derived = receive_derived,
            tokenized = token.is_some(),
            "subscription registered"
        );

        let table = if receive_derived {
            &self.shared.polymorphic
        } else {
            &self.shared.exact
        };
        table.insert(
            key,
            Entry {
                handle: Arc::new(handle),
                token,
            },
        );

        self.request_cleanup();
        Ok(())
    }

    // ---------------------------
    // Unregistration
    // ---------------------------

    /// Removes every subscription of `recipient`: all message types, all tokens.
    ///
    /// Returns how many subscriptions were newly tombstoned. Takes effect for the
    /// next send, even before the cleanup pass runs.
    pub fn unregister<R: ?Sized>(&self, recipient: &Arc<R>) -> usize {
        self.tombstone(address_of(recipient), TokenFilter::Any, None, None)
    }

    /// Removes the subscriptions of `recipient` to message type `K`, any token.
    pub fn unregister_type<K: ?Sized + 'static>(&self, recipient: &Arc<impl Routable>) -> usize {
        self.tombstone(
            address_of(recipient),
            TokenFilter::Any,
            Some(MessageType::of::<K>()),
            None,
        )
    }

    /// Removes the subscriptions of `recipient` made with a handler named like `handler`
    /// for its message type `K`, any token.
    pub fn unregister_handler<R, K>(&self, recipient: &Arc<R>, handler: &Handler<R, K>) -> usize
    where
        R: Routable,
        K: ?Sized + 'static,
    {
        self.tombstone(
            address_of(recipient),
            TokenFilter::Any,
            Some(MessageType::of::<K>()),
            Some(handler.name()),
        )
    }

    /// Fully specified unregistration.
    ///
    /// An entry of `recipient` is removed iff:
    /// - `token` is `None` and the entry has no token, or both tokens are equal;
    /// - `message_type` is `None`, or the entry is keyed by it (in either table);
    /// - `handler` is `None`, or equals the entry's declared handler name.
    pub fn unregister_matching<R: ?Sized>(
        &self,
        recipient: &Arc<R>,
        token: Option<&Token>,
        message_type: Option<MessageType>,
        handler: Option<&str>,
    ) -> usize {
        self.tombstone(address_of(recipient), token.into(), message_type, handler)
    }

    fn tombstone(
        &self,
        address: usize,
        token: TokenFilter,
        message_type: Option<MessageType>,
        handler: Option<&str>,
    ) -> usize {
        let matches = |entry: &Entry| {
            entry.handle.is_bound_at(address)
                && token.admits(entry.token.as_ref())
                && handler.map_or(true, |name| entry.handle.method_name() == name)
        };
        let removed = self.shared.exact.tombstone_where(message_type, matches)
            + self.shared.polymorphic.tombstone_where(message_type, matches);

        tracing::debug!(
            bus = %self.shared.cfg.name,
            removed,
            message = message_type.map(|ty| ty.name()),
            handler,
            "subscriptions unregistered"
        );

        self.request_cleanup();
        removed
    }

    // ---------------------------
    // Dispatch
    // ---------------------------

    /// Sends `message` to every matching untokenized subscription.
    ///
    /// Returns how many handlers ran.
    ///
    /// # Errors
    /// With [`FaultPolicy::Propagate`](crate::FaultPolicy::Propagate), the first
    /// [`BusError::TypeMismatch`] stops delivery and is returned.
    pub fn send<M: Routable>(&self, message: &M) -> Result<usize, BusError> {
        self.send_filtered(message, None, None)
    }

    /// Sends `message` only to recipients that are `T` (or declare `T` in their lineage).
    pub fn send_to<T: ?Sized + 'static>(&self, message: &impl Routable) -> Result<usize, BusError> {
        self.send_filtered(message, Some(MessageType::of::<T>()), None)
    }

    /// Sends `message` on the channel identified by `token`.
    pub fn send_with_token<M: Routable>(
        &self,
        message: &M,
        token: impl Into<Token>,
    ) -> Result<usize, BusError> {
        let token = token.into();
        self.send_filtered(message, None, Some(&token))
    }

    /// Sends `message` with an optional recipient-type filter and an optional token.
    pub fn send_filtered<M: Routable>(
        &self,
        message: &M,
        target: Option<MessageType>,
        token: Option<&Token>,
    ) -> Result<usize, BusError> {
        let ancestry = Ancestry::of::<M>();
        let out = Outgoing {
            message: message as &dyn Any,
            actual: type_name::<M>(),
            target,
            token,
            policy: self.shared.cfg.fault_policy,
            bus: &self.shared.cfg.name,
        };

        // Dropped on return and on unwind alike.
        let _cleanup = CleanupOnExit {
            bus: self,
            armed: self.shared.cfg.cleanup_on_send,
        };
        let result = self.dispatch(&ancestry, &out);

        if let Ok(invoked) = &result {
            tracing::trace!(
                bus = %self.shared.cfg.name,
                message = out.actual,
                invoked,
                "message sent"
            );
        }
        result
    }

    fn dispatch(&self, ancestry: &Ancestry, out: &Outgoing<'_>) -> Result<usize, BusError> {
        let mut invoked = 0;

        for key in self.shared.polymorphic.keys() {
            let Some(projection) = ancestry.projection(key) else {
                continue;
            };
            if let Some(snapshot) = self.shared.polymorphic.snapshot(key) {
                invoked += deliver(&snapshot, projection, out)?;
            }
        }

        if let Some(snapshot) = self.shared.exact.snapshot(ancestry.root()) {
            invoked += deliver(&snapshot, ancestry.identity(), out)?;
        }

        Ok(invoked)
    }

    // ---------------------------
    // Cleanup
    // ---------------------------

    /// Schedules a cleanup pass on the idle scheduler, unless one is already pending.
    pub fn request_cleanup(&self) {
        if self.shared.cleanup_pending.swap(true, Ordering::AcqRel) {
            return;
        }

        let sweep = WeakHandle::bound(
            &self.shared,
            Handler::new("cleanup", |shared: &Shared, _: &()| shared.cleanup()),
        );
        self.shared
            .scheduler
            .schedule_when_idle(Box::new(move || {
                if !sweep.invoke(&()) {
                    tracing::trace!("bus dropped before its cleanup pass ran");
                }
            }));
    }

    /// Runs a cleanup pass now: removes dead and tombstoned entries and empty keys.
    pub fn cleanup(&self) {
        self.shared.cleanup();
    }

    /// Returns `true` while a requested cleanup pass has not run yet.
    pub fn cleanup_pending(&self) -> bool {
        self.shared.cleanup_pending.load(Ordering::Acquire)
    }

    // ---------------------------
    // Diagnostics
    // ---------------------------

    /// What both tables physically hold right now.
    pub fn stats(&self) -> TableStats {
        let (exact_keys, exact_entries) = self.shared.exact.counts();
        let (polymorphic_keys, polymorphic_entries) = self.shared.polymorphic.counts();
        TableStats {
            exact_keys,
            polymorphic_keys,
            exact_entries,
            polymorphic_entries,
        }
    }

    /// Returns `true` if any live subscription is keyed by `K`, in either table.
    pub fn has_subscribers<K: ?Sized + 'static>(&self) -> bool {
        let key = MessageType::of::<K>();
        self.shared.exact.has_live(key) || self.shared.polymorphic.has_live(key)
    }
}

/// Requests a cleanup pass when a send ends, even if a handler panic unwinds through it.
struct CleanupOnExit<'a> {
    bus: &'a Bus,
    armed: bool,
}

impl Drop for CleanupOnExit<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.bus.request_cleanup();
        }
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("name", &self.shared.cfg.name)
            .field("stats", &self.stats())
            .field("cleanup_pending", &self.cleanup_pending())
            .finish()
    }
}
