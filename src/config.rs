//! # Bus configuration.
//!
//! Provides [`BusConfig`], the settings a [`Bus`](crate::Bus) is built with,
//! and [`FaultPolicy`], which decides what happens when a handler faults mid-send.
//!
//! Config is used in two ways:
//! 1. **Bus creation**: `Bus::builder(config).build()`
//! 2. **Global default**: [`global::get`](crate::global::get) builds its instance from `BusConfig::named("global")`

use std::borrow::Cow;

/// What a send does when one of its handlers faults.
///
/// A fault is either a payload that cannot be presented as the handler's
/// declared type, or a panic raised by the handler itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FaultPolicy {
    /// The first fault ends the send (default).
    ///
    /// - Type mismatches are returned as `Err` from the send.
    /// - Handler panics unwind into the caller.
    ///
    /// Subscribers later in the pass are not invoked.
    #[default]
    Propagate,
    /// Every handler runs under `catch_unwind`; faults are logged and delivery continues.
    ///
    /// The send still returns `Ok` with the number of handlers that completed.
    Isolate,
}

/// Configuration for a bus instance.
///
/// ## Field semantics
/// - `name`: label attached to every log line emitted by the bus
/// - `fault_policy`: see [`FaultPolicy`]
/// - `cleanup_on_send`: whether every send ends with a cleanup request
#[derive(Clone, Debug)]
pub struct BusConfig {
    /// Label used in log fields (`bus = ...`).
    pub name: Cow<'static, str>,

    /// Behaviour when a handler faults during a send.
    pub fault_policy: FaultPolicy,

    /// Request a deferred cleanup pass at the end of every send.
    ///
    /// Register and unregister always request one. Sends are the common path,
    /// so a host that pumps cleanup itself can switch this off. The request is
    /// made even when a handler panic unwinds out of the send.
    pub cleanup_on_send: bool,
}

impl BusConfig {
    /// Returns a config with the given name and default settings otherwise.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns `true` when handler faults are contained per subscriber.
    #[inline]
    pub fn isolates_faults(&self) -> bool {
        self.fault_policy == FaultPolicy::Isolate
    }
}

impl Default for BusConfig {
    /// Default configuration:
    ///
    /// - `name = "default"`
    /// - `fault_policy = FaultPolicy::Propagate`
    /// - `cleanup_on_send = true`
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("default"),
            fault_policy: FaultPolicy::default(),
            cleanup_on_send: true,
        }
    }
}
