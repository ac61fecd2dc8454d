//! Process-wide default bus.
//!
//! [`get`] lazily creates the instance on first use; [`override_default`] installs
//! a host-built bus (for example one pumped by [`ManualIdle`](crate::ManualIdle));
//! [`reset`] forgets the current instance so the next `get` builds a fresh one.
//!
//! Every function here is safe to call from any thread.

use std::sync::{PoisonError, RwLock};

use crate::bus::Bus;
use crate::config::BusConfig;

static DEFAULT: RwLock<Option<Bus>> = RwLock::new(None);

/// Returns the default bus, creating it with [`BusConfig::default`] if needed.
///
/// ```rust
/// let a = weakbus::global::get();
/// let b = weakbus::global::get();
/// assert!(a.same_bus(&b));
/// ```
pub fn get() -> Bus {
    if let Some(bus) = DEFAULT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
    {
        return bus.clone();
    }

    let mut slot = DEFAULT.write().unwrap_or_else(PoisonError::into_inner);
    slot.get_or_insert_with(|| Bus::builder(BusConfig::named("global")).build())
        .clone()
}

/// Installs `bus` as the default; returns the instance it replaces, if any.
///
/// Clones of the previous default handed out earlier keep working on their own tables.
pub fn override_default(bus: Bus) -> Option<Bus> {
    tracing::debug!(bus = %bus.config().name, "default bus overridden");
    DEFAULT
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(bus)
}

/// Drops the default; the next [`get`] creates a new one.
pub fn reset() -> Option<Bus> {
    DEFAULT
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
}

/// Returns `true` if a default bus currently exists.
pub fn is_initialized() -> bool {
    DEFAULT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}
