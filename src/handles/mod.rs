//! Weak handles and typed handlers.
//!
//! This module holds the callable side of a subscription.
//!
//! ## Contents
//! - [`Handler`] named `Fn(&R, &K)` supplied at registration (and again at unregister)
//! - [`WeakHandle`] weakly bound wrapper with liveness, tombstone and invocation
//!
//! ## Quick wiring
//! ```text
//! Bus::register(&Arc<R>, token, derived, Handler<R, K>)
//!      └─► WeakHandle::bound(&recipient, handler)        (Weak<R>, never Arc<R>)
//!           └─► stored in the table as Arc<dyn ErasedHandle>
//! ```

mod handler;
mod weak;

pub use handler::Handler;
pub use weak::WeakHandle;

pub(crate) use weak::{address_of, ErasedHandle};
