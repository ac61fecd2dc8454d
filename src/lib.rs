//! # weakbus
//!
//! **weakbus** is an in-process publish/subscribe bus whose subscriptions never keep
//! their recipients alive.
//!
//! Components register interest in a message type; senders broadcast values without
//! knowing who listens. The bus holds only weak references, so a recipient that goes
//! away simply stops receiving, with no unregister call required.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   host: Arc<Screen>          host: Arc<Logger>          host: Arc<Panel>
//!        │ register(Foo)            │ register(Base, derived)   │ subscribe().token("c1")
//!        ▼                          ▼                           ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │  Bus                                                                  │
//! │  - exact table        MessageType ─► [WeakHandle + token]             │
//! │  - polymorphic table  MessageType ─► [WeakHandle + token]             │
//! │  - cleanup_pending    at most one deferred pass queued                │
//! └──────┬───────────────────────────────────────────────┬────────────────┘
//!        │ send(&msg, target?, token?)                    │ request_cleanup()
//!        ▼                                                ▼
//!   snapshot under lock ─► release ─► invoke        IdleScheduler
//!   (polymorphic pass, then exact pass)          (TokioIdle / ManualIdle /
//!                                                  IdleWorker / closure)
//!                                                         │ later
//!                                                         ▼
//!                                                  cleanup(): sweep both tables
//! ```
//!
//! ### Delivery
//! ```text
//! send::<M>(&msg)
//!   ├─► Ancestry::of::<M>()               M, its declared supertypes and capabilities
//!   ├─► for K in polymorphic keys where M is-a / implements K
//!   │       └─► each live entry on the same channel ─► handler(&recipient, &msg as &K)
//!   ├─► exact entries keyed by M
//!   │       └─► each live entry on the same channel ─► handler(&recipient, &msg)
//!   └─► request_cleanup()
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                         |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Bus**           | Register, unregister, send, cleanup.                         | [`Bus`], [`Subscription`], [`TableStats`]  |
//! | **Handles**       | Weakly bound callbacks with tombstones.                      | [`WeakHandle`], [`Handler`]                |
//! | **Routing**       | Declared lineage replacing runtime type inspection.          | [`Routable`], [`Lineage`], [`Ancestry`]    |
//! | **Channels**      | Token-partitioned delivery.                                  | [`Token`]                                  |
//! | **Idle work**     | Where deferred cleanup runs.                                 | [`IdleScheduler`], [`TokioIdle`], [`ManualIdle`], [`IdleWorker`] |
//! | **Errors**        | Typed registration and delivery faults.                      | [`BusError`]                               |
//! | **Configuration** | Bus name, fault policy, cleanup on send.                     | [`BusConfig`], [`FaultPolicy`]             |
//! | **Messages**      | Ready-made message hierarchy.                                | [`messages`]                               |
//! | **Default bus**   | Process-wide instance.                                       | [`global`]                                 |
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use weakbus::{Bus, BusConfig, Handler, Lineage, ManualIdle, Routable};
//!
//! struct Base { id: u32 }
//! struct Derived { base: Base }
//! impl Routable for Base {}
//! impl Routable for Derived {
//!     fn lineage(lineage: &mut Lineage<Self>) {
//!         lineage.is_a::<Base>(|d| &d.base);
//!     }
//! }
//!
//! struct Logger { ids: Mutex<Vec<u32>> }
//! weakbus::routable!(Logger);
//!
//! fn main() -> Result<(), weakbus::BusError> {
//!     let idle = Arc::new(ManualIdle::new());
//!     let bus = Bus::builder(BusConfig::named("ui"))
//!         .with_scheduler(Arc::clone(&idle))
//!         .build();
//!
//!     let logger = Arc::new(Logger { ids: Mutex::new(Vec::new()) });
//!     bus.subscribe(&logger)
//!         .derived()
//!         .handle(Handler::new("on_base", |l: &Logger, m: &Base| {
//!             l.ids.lock().unwrap().push(m.id);
//!         }))?;
//!
//!     bus.send(&Derived { base: Base { id: 7 } })?;
//!     assert_eq!(*logger.ids.lock().unwrap(), vec![7]);
//!
//!     drop(logger);
//!     idle.run_pending();                 // host pumps deferred cleanup
//!     assert!(bus.stats().is_empty());
//!     Ok(())
//! }
//! ```
mod bus;
mod config;
mod error;
mod handles;
mod routing;
mod schedulers;
mod token;

pub mod global;
pub mod messages;

// ---- Public re-exports ----

pub use bus::{Bus, BusBuilder, Subscription, TableStats};
pub use config::{BusConfig, FaultPolicy};
pub use error::BusError;
pub use handles::{Handler, WeakHandle};
pub use routing::{Ancestry, Lineage, MessageType, Routable};
pub use schedulers::{IdleScheduler, IdleWorker, Job, ManualIdle, TokioIdle};
pub use token::Token;
