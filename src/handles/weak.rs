//! # Weak handle: a callable that never keeps its receiver alive.
//!
//! [`WeakHandle`] is the unit stored in the subscription table. It holds:
//! - an optional **owner** (`Weak`), whose collection also kills the handle;
//! - an optional **receiver** (`Weak`), the object the callback runs on;
//! - the callback and its declared name;
//! - a **tombstone** flag, set by unregister and never cleared.
//!
//! ## Liveness
//! ```text
//! kind                     alive iff
//! ───────────────────────  ─────────────────────────────────────────
//! free,  no owner          not tombstoned
//! free,  owner             not tombstoned && owner resolves
//! bound, no owner          not tombstoned && receiver resolves
//! bound, owner             not tombstoned && receiver && owner resolve
//! ```
//!
//! ## Rules
//! - `invoke` on a dead handle is a no-op.
//! - While a callback runs, the receiver (and owner) are upgraded and held, so they
//!   cannot be reclaimed mid-call; the handle itself holds no strong reference.

use std::any::{type_name, Any};
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::error::BusError;
use crate::routing::{Ancestry, ErasedProjection, MessageType, Projection, Routable};

use super::Handler;

type Owner = Weak<dyn Any + Send + Sync>;

/// Weakly bound callback for payloads of type `K`.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use weakbus::{Handler, WeakHandle};
///
/// struct Counter(AtomicU32);
/// weakbus::routable!(Counter);
///
/// let counter = Arc::new(Counter(AtomicU32::new(0)));
/// let handle = WeakHandle::bound(
///     &counter,
///     Handler::new("add", |c: &Counter, n: &u32| {
///         c.0.fetch_add(*n, Ordering::Relaxed);
///     }),
/// );
///
/// assert!(handle.invoke(&5));
/// assert_eq!(counter.0.load(Ordering::Relaxed), 5);
///
/// drop(counter);
/// assert!(!handle.is_alive());
/// assert!(!handle.invoke(&5)); // no-op
/// ```
pub struct WeakHandle<K: ?Sized + 'static> {
    name: Cow<'static, str>,
    owner: Option<Owner>,
    target: Target<K>,
    tombstoned: AtomicBool,
}

enum Target<K: ?Sized + 'static> {
    Free(Arc<dyn Fn(&K) + Send + Sync>),
    Bound(Box<dyn Receiver<K>>),
}

/// Receiver side of a bound handle, erased over the receiver type.
trait Receiver<K: ?Sized>: Send + Sync {
    fn resolves(&self) -> bool;
    fn address(&self) -> usize;
    fn ancestry(&self) -> &Ancestry;
    fn call(&self, payload: &K) -> bool;
}

struct BoundTo<R, K: ?Sized> {
    receiver: Weak<R>,
    ancestry: Arc<Ancestry>,
    f: Arc<dyn Fn(&R, &K) + Send + Sync>,
}

impl<R: Routable, K: ?Sized + 'static> Receiver<K> for BoundTo<R, K> {
    fn resolves(&self) -> bool {
        self.receiver.strong_count() > 0
    }

    fn address(&self) -> usize {
        self.receiver.as_ptr().cast::<()>() as usize
    }

    fn ancestry(&self) -> &Ancestry {
        &self.ancestry
    }

    fn call(&self, payload: &K) -> bool {
        match self.receiver.upgrade() {
            Some(receiver) => {
                (self.f)(&*receiver, payload);
                true
            }
            None => false,
        }
    }
}

/// Identity of a recipient as seen by weak handles.
#[inline]
pub(crate) fn address_of<R: ?Sized>(recipient: &Arc<R>) -> usize {
    Arc::as_ptr(recipient).cast::<()>() as usize
}

impl<K: ?Sized + 'static> WeakHandle<K> {
    /// Creates a handle bound to `receiver`; only a weak reference is kept.
    pub fn bound<R: Routable>(receiver: &Arc<R>, handler: Handler<R, K>) -> Self {
        let (name, f) = handler.into_parts();
        Self {
            name,
            owner: None,
            target: Target::Bound(Box::new(BoundTo {
                receiver: Arc::downgrade(receiver),
                ancestry: Ancestry::of::<R>(),
                f,
            })),
            tombstoned: AtomicBool::new(false),
        }
    }

    /// Creates a handle around a free function (no receiver).
    pub fn free<F>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&K) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            owner: None,
            target: Target::Free(Arc::new(f)),
            tombstoned: AtomicBool::new(false),
        }
    }

    /// Free handle that dies with `owner`.
    pub fn free_owned<O, F>(name: impl Into<Cow<'static, str>>, owner: &Arc<O>, f: F) -> Self
    where
        O: Any + Send + Sync,
        F: Fn(&K) + Send + Sync + 'static,
    {
        Self::free(name, f).with_owner(owner)
    }

    /// Ties the handle's lifetime to `owner` as well.
    pub fn with_owner<O: Any + Send + Sync>(self, owner: &Arc<O>) -> Self {
        let owner = Arc::downgrade(owner) as Owner;
        self.with_owner_weak(owner)
    }

    pub(crate) fn with_owner_weak(mut self, owner: Owner) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Returns `true` while the handle may still run its callback.
    pub fn is_alive(&self) -> bool {
        !self.is_tombstoned() && self.resolves()
    }

    /// Owner and receiver (where present) still resolve; the tombstone is not consulted.
    fn resolves(&self) -> bool {
        if let Some(owner) = &self.owner {
            if owner.strong_count() == 0 {
                return false;
            }
        }
        match &self.target {
            Target::Free(_) => true,
            Target::Bound(receiver) => receiver.resolves(),
        }
    }

    /// Marks the handle dead for good.
    ///
    /// Returns `true` if this call did the marking, `false` if it was already tombstoned.
    pub fn tombstone(&self) -> bool {
        !self.tombstoned.swap(true, Ordering::AcqRel)
    }

    /// Returns `true` once [`tombstone`](Self::tombstone) has been called.
    pub fn is_tombstoned(&self) -> bool {
        self.tombstoned.load(Ordering::Acquire)
    }

    /// Declared name of the callback.
    pub fn method_name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the handle is bound to exactly this recipient.
    pub fn is_bound_to<R: ?Sized>(&self, recipient: &Arc<R>) -> bool {
        self.receiver_address() == Some(address_of(recipient))
    }

    /// Runs the callback with `payload` if the handle is alive.
    ///
    /// Returns `true` when the callback actually ran.
    pub fn invoke(&self, payload: &K) -> bool {
        !self.is_tombstoned() && self.run(payload)
    }

    /// Upgrades owner and receiver, then runs the callback; `false` if either is gone.
    fn run(&self, payload: &K) -> bool {
        let _owner = match &self.owner {
            Some(owner) => match owner.upgrade() {
                Some(owner) => Some(owner),
                None => return false,
            },
            None => None,
        };
        match &self.target {
            Target::Free(f) => {
                f(payload);
                true
            }
            Target::Bound(receiver) => receiver.call(payload),
        }
    }

    fn receiver_address(&self) -> Option<usize> {
        match &self.target {
            Target::Free(_) => None,
            Target::Bound(receiver) => Some(receiver.address()),
        }
    }
}

impl<K: ?Sized + 'static> fmt::Debug for WeakHandle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakHandle")
            .field("name", &self.name)
            .field("payload", &type_name::<K>())
            .field("bound", &matches!(self.target, Target::Bound(_)))
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Table-facing view of a [`WeakHandle`], erased over the payload type.
pub(crate) trait ErasedHandle: Send + Sync {
    fn method_name(&self) -> &str;
    fn is_alive(&self) -> bool;
    fn is_tombstoned(&self) -> bool;
    fn tombstone(&self) -> bool;

    /// Owner and receiver still resolve, regardless of the tombstone.
    fn resolves(&self) -> bool;
    fn has_receiver(&self) -> bool;
    fn is_bound_at(&self, address: usize) -> bool;

    /// `true` if the receiver's type is `target` or declares it in its lineage.
    fn receiver_is(&self, target: MessageType) -> bool;

    /// Presents `message` through `projection` and invokes the callback.
    ///
    /// The tombstone is not consulted: the caller decides from its snapshot.
    /// `actual` is the message's type name, for mismatch reporting.
    fn deliver(
        &self,
        message: &dyn Any,
        actual: &'static str,
        projection: &dyn ErasedProjection,
    ) -> Result<bool, BusError>;
}

impl<K: ?Sized + 'static> ErasedHandle for WeakHandle<K> {
    fn method_name(&self) -> &str {
        WeakHandle::method_name(self)
    }

    fn is_alive(&self) -> bool {
        WeakHandle::is_alive(self)
    }

    fn is_tombstoned(&self) -> bool {
        WeakHandle::is_tombstoned(self)
    }

    fn tombstone(&self) -> bool {
        WeakHandle::tombstone(self)
    }

    fn resolves(&self) -> bool {
        WeakHandle::resolves(self)
    }

    fn has_receiver(&self) -> bool {
        match &self.target {
            Target::Free(_) => false,
            Target::Bound(receiver) => receiver.resolves(),
        }
    }

    fn is_bound_at(&self, address: usize) -> bool {
        self.receiver_address() == Some(address)
    }

    fn receiver_is(&self, target: MessageType) -> bool {
        match &self.target {
            Target::Free(_) => false,
            Target::Bound(receiver) => receiver.ancestry().contains(target),
        }
    }

    fn deliver(
        &self,
        message: &dyn Any,
        actual: &'static str,
        projection: &dyn ErasedProjection,
    ) -> Result<bool, BusError> {
        let mismatch = || BusError::TypeMismatch {
            expected: type_name::<K>(),
            actual,
        };
        let projection = projection
            .as_any()
            .downcast_ref::<Projection<K>>()
            .ok_or_else(mismatch)?;
        let payload = projection.apply(message).ok_or_else(mismatch)?;
        Ok(self.run(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Tally {
        hits: AtomicUsize,
    }

    impl Routable for Tally {}

    struct Ping(usize);

    impl Routable for Ping {}

    fn tally_handle(tally: &Arc<Tally>) -> WeakHandle<Ping> {
        WeakHandle::bound(
            tally,
            Handler::new("on_ping", |p: &Tally, ping: &Ping| {
                p.hits.fetch_add(ping.0, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn test_bound_handle_does_not_keep_receiver_alive() {
        let tally = Arc::new(Tally::default());
        let handle = tally_handle(&tally);
        assert_eq!(Arc::strong_count(&tally), 1);

        assert!(handle.invoke(&Ping(2)));
        assert_eq!(tally.hits.load(Ordering::SeqCst), 2);

        drop(tally);
        assert!(!handle.is_alive());
        assert!(!handle.invoke(&Ping(2)));
    }

    #[test]
    fn test_tombstone_is_idempotent_and_final() {
        let tally = Arc::new(Tally::default());
        let handle = tally_handle(&tally);

        assert!(handle.tombstone());
        assert!(!handle.tombstone());
        assert!(handle.is_tombstoned());
        assert!(!handle.is_alive());
        assert!(!handle.invoke(&Ping(1)));
        assert_eq!(tally.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_free_handle_lives_until_owner_goes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let free = WeakHandle::free("count", move |n: &usize| {
            seen.fetch_add(*n, Ordering::SeqCst);
        });
        assert!(free.is_alive());
        assert!(free.invoke(&3));

        let owner = Arc::new(String::from("owner"));
        let owned = WeakHandle::free("noop", |_: &usize| {}).with_owner(&owner);
        assert!(owned.is_alive());
        drop(owner);
        assert!(!owned.is_alive());
        assert!(!owned.invoke(&1));

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_owner_extends_bound_liveness() {
        let tally = Arc::new(Tally::default());
        let owner = Arc::new(7u8);
        let handle = tally_handle(&tally).with_owner(&owner);
        assert!(handle.is_alive());

        drop(owner);
        assert!(!handle.is_alive());
        assert!(!handle.invoke(&Ping(1)));
        assert_eq!(tally.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_identity_and_name() {
        let tally = Arc::new(Tally::default());
        let other = Arc::new(Tally::default());
        let handle = tally_handle(&tally);
        assert!(handle.is_bound_to(&tally));
        assert!(!handle.is_bound_to(&other));
        assert_eq!(handle.method_name(), "on_ping");

        let free = WeakHandle::free("f", |_: &Ping| {});
        assert!(!free.is_bound_to(&tally));
        assert!(!ErasedHandle::has_receiver(&free));
    }

    #[test]
    fn test_deliver_reports_mismatched_projection() {
        let tally = Arc::new(Tally::default());
        let handle = tally_handle(&tally);
        let wrong = Ancestry::of::<u32>();

        let err = ErasedHandle::deliver(&handle, &5u32, "u32", wrong.identity())
            .expect_err("u32 projection cannot feed a Ping handler");
        assert_eq!(err.as_label(), "type_mismatch");
        assert_eq!(tally.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_deliver_leaves_tombstone_to_caller_but_not_liveness() {
        let tally = Arc::new(Tally::default());
        let handle = tally_handle(&tally);
        let ancestry = Ancestry::of::<Ping>();
        handle.tombstone();

        let ran = ErasedHandle::deliver(&handle, &Ping(4), "Ping", ancestry.identity())
            .expect("matching projection");
        assert!(ran);
        assert_eq!(tally.hits.load(Ordering::SeqCst), 4);
        assert!(!handle.invoke(&Ping(4)));

        drop(tally);
        let ran = ErasedHandle::deliver(&handle, &Ping(4), "Ping", ancestry.identity())
            .expect("matching projection");
        assert!(!ran);
    }

    #[test]
    fn test_free_owned_dies_with_owner() {
        let owner = Arc::new(String::from("panel"));
        let handle = WeakHandle::free_owned("noop", &owner, |_: &Ping| {});
        assert!(ErasedHandle::resolves(&handle));
        drop(owner);
        assert!(!ErasedHandle::resolves(&handle));
        assert!(!handle.invoke(&Ping(1)));
    }
}
