//! Type routing: identities, declared lineages and projections.
//!
//! The bus never asks the runtime whether one type "is a" another. Instead every
//! routable type declares its lineage once, and the bus looks it up.
//!
//! ## Contents
//! - [`MessageType`] identity of a type (`TypeId` + name), usable for `dyn Trait` too
//! - [`Routable`] implemented by messages and recipients; declares the lineage
//! - [`Lineage`] builder handed to [`Routable::lineage`]
//! - [`Ancestry`] frozen, cached lineage with typed projections
//!
//! ## Quick wiring
//! ```text
//! Bus::send(&msg: M)
//!   └─► Ancestry::of::<M>()
//!         ├─ polymorphic keys K with ancestry.contains(K) → projection(K) → handler(&R, &K)
//!         └─ exact key M                                   → identity     → handler(&R, &M)
//! ```

mod lineage;
mod message_type;
mod routable;

pub use lineage::{Ancestry, Lineage};
pub use message_type::MessageType;
pub use routable::Routable;

pub(crate) use lineage::{ErasedProjection, Projection};
