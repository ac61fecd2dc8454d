//! The bus: subscription tables, dispatch, and deferred cleanup.
//!
//! ## Contents
//! - [`Bus`] public entry point (register / unregister / send / cleanup)
//! - [`BusBuilder`] config plus scheduler selection
//! - [`Subscription`] builder-style registration
//! - [`TableStats`] what the tables physically hold
//!
//! Internals: `table` (lock-guarded buckets), `dispatch` (one delivery loop).

mod builder;
mod dispatch;
mod engine;
mod subscription;
mod table;

pub use builder::BusBuilder;
pub use engine::{Bus, TableStats};
pub use subscription::Subscription;
