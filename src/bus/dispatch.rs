//! # Delivery of one message against one snapshot.
//!
//! [`deliver`] walks a snapshot in order and invokes every entry that passes the
//! filters of the outgoing message:
//!
//! ```text
//! entry ─► tombstoned at snapshot? ─► owner/receiver gone? ─► target type ok? ─► same channel? ─► invoke
//!               yes                        yes                    no                 no
//!               └──────────────────────────┴──────────────────────┴──────────────────┴──► skip
//! ```
//!
//! Tombstones come from the snapshot, so unregistering from inside a handler does
//! not change the rest of the current delivery. A recipient that has been dropped
//! is skipped at once.
//!
//! Fault handling depends on [`FaultPolicy`]:
//! - `Propagate`: a type mismatch returns `Err` at once; a panic unwinds through.
//! - `Isolate`: each invocation runs under `catch_unwind`; faults are logged and skipped.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::config::FaultPolicy;
use crate::error::{panic_message, BusError};
use crate::routing::{ErasedProjection, MessageType};
use crate::token::{same_channel, Token};

use super::table::Captured;

/// Everything a delivery loop needs to know about the message being sent.
pub(crate) struct Outgoing<'a> {
    pub(crate) message: &'a dyn Any,
    pub(crate) actual: &'static str,
    pub(crate) target: Option<MessageType>,
    pub(crate) token: Option<&'a Token>,
    pub(crate) policy: FaultPolicy,
    pub(crate) bus: &'a str,
}

impl Outgoing<'_> {
    fn admits(&self, captured: &Captured) -> bool {
        let entry = &captured.entry;
        !captured.tombstoned
            && entry.handle.resolves()
            && entry.handle.has_receiver()
            && self
                .target
                .map_or(true, |target| entry.handle.receiver_is(target))
            && same_channel(self.token, entry.token.as_ref())
    }
}

/// Delivers `out` to every admitted entry of `snapshot`; returns how many handlers ran.
pub(crate) fn deliver(
    snapshot: &[Captured],
    projection: &dyn ErasedProjection,
    out: &Outgoing<'_>,
) -> Result<usize, BusError> {
    let mut invoked = 0;
    for entry in snapshot
        .iter()
        .filter(|captured| out.admits(captured))
        .map(|captured| &captured.entry)
    {
        let attempt = || entry.handle.deliver(out.message, out.actual, projection);
        match out.policy {
            FaultPolicy::Propagate => {
                if attempt()? {
                    invoked += 1;
                }
            }
            FaultPolicy::Isolate => match panic::catch_unwind(AssertUnwindSafe(attempt)) {
                Ok(Ok(true)) => invoked += 1,
                Ok(Ok(false)) => {}
                Ok(Err(err)) => {
                    tracing::warn!(
                        bus = out.bus,
                        handler = entry.handle.method_name(),
                        error = err.as_label(),
                        detail = %err.as_message(),
                        "delivery skipped"
                    );
                }
                Err(payload) => {
                    let err = BusError::HandlerPanicked {
                        handler: entry.handle.method_name().to_string(),
                        message: panic_message(payload.as_ref()),
                    };
                    tracing::error!(
                        bus = out.bus,
                        error = err.as_label(),
                        detail = %err.as_message(),
                        "handler panicked; continuing delivery"
                    );
                }
            },
        }
    }
    Ok(invoked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::bus::table::Entry;
    use crate::handles::{Handler, WeakHandle};
    use crate::routing::{Ancestry, Routable};

    #[derive(Default)]
    struct Counter {
        hits: AtomicUsize,
    }

    impl Routable for Counter {}

    struct Ping;

    fn captured<K: ?Sized + 'static>(handle: WeakHandle<K>, tombstoned: bool) -> Captured {
        Captured {
            entry: Entry {
                handle: Arc::new(handle),
                token: None,
            },
            tombstoned,
        }
    }

    /// A `Ping` handler followed by a `u32` handler, both fed a `u32` projection.
    fn mismatched_then_matching(counter: &Arc<Counter>) -> Vec<Captured> {
        vec![
            captured(
                WeakHandle::bound(
                    counter,
                    Handler::new("on_ping", |c: &Counter, _: &Ping| {
                        c.hits.fetch_add(100, Ordering::SeqCst);
                    }),
                ),
                false,
            ),
            captured(
                WeakHandle::bound(
                    counter,
                    Handler::new("on_u32", |c: &Counter, n: &u32| {
                        c.hits.fetch_add(*n as usize, Ordering::SeqCst);
                    }),
                ),
                false,
            ),
        ]
    }

    fn outgoing(message: &u32, policy: FaultPolicy) -> Outgoing<'_> {
        Outgoing {
            message,
            actual: "u32",
            target: None,
            token: None,
            policy,
            bus: "test",
        }
    }

    #[test]
    fn test_type_mismatch_stops_the_pass_by_default() {
        let counter = Arc::new(Counter::default());
        let snapshot = mismatched_then_matching(&counter);
        let ancestry = Ancestry::of::<u32>();

        let err = deliver(&snapshot, ancestry.identity(), &outgoing(&3, FaultPolicy::Propagate))
            .expect_err("Ping handler cannot take a u32");
        assert_eq!(
            err,
            BusError::TypeMismatch {
                expected: std::any::type_name::<Ping>(),
                actual: "u32",
            }
        );
        assert_eq!(counter.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_type_mismatch_is_skipped_when_isolating() {
        let counter = Arc::new(Counter::default());
        let snapshot = mismatched_then_matching(&counter);
        let ancestry = Ancestry::of::<u32>();

        let invoked = deliver(&snapshot, ancestry.identity(), &outgoing(&3, FaultPolicy::Isolate))
            .expect("faults are contained");
        assert_eq!(invoked, 1);
        assert_eq!(counter.hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_tombstone_frozen_in_snapshot_decides_delivery() {
        let counter = Arc::new(Counter::default());
        let on_u32 = || {
            WeakHandle::bound(
                &counter,
                Handler::new("on_u32", |c: &Counter, n: &u32| {
                    c.hits.fetch_add(*n as usize, Ordering::SeqCst);
                }),
            )
        };
        let late = on_u32();
        late.tombstone();
        let snapshot = vec![captured(on_u32(), true), captured(late, false)];
        let ancestry = Ancestry::of::<u32>();

        let invoked = deliver(&snapshot, ancestry.identity(), &outgoing(&5, FaultPolicy::Propagate))
            .expect("no faults");
        assert_eq!(invoked, 1);
        assert_eq!(counter.hits.load(Ordering::SeqCst), 5);
    }
}
