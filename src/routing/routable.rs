//! # Types that can travel through the bus.
//!
//! [`Routable`] is implemented by every message type and every recipient type.
//! Its only job is to declare the type's **lineage**: the supertypes it can be
//! delivered as, and the capabilities (trait objects) it can be viewed through.
//!
//! Types without supertypes just need an empty impl, or the [`routable!`](crate::routable)
//! macro for several at once.

use std::any::Any;

use super::Lineage;

/// A message or recipient type known to the bus.
///
/// ## Declaring a lineage
/// ```rust
/// use weakbus::{Lineage, Routable};
///
/// trait Audible {
///     fn volume(&self) -> u8;
/// }
///
/// struct Alert { level: u8 }
///
/// struct Alarm { alert: Alert, siren: bool }
///
/// impl Audible for Alarm {
///     fn volume(&self) -> u8 { if self.siren { 11 } else { 3 } }
/// }
///
/// impl Routable for Alert {}
///
/// impl Routable for Alarm {
///     fn lineage(lineage: &mut Lineage<Self>) {
///         lineage
///             .is_a::<Alert>(|alarm| &alarm.alert)
///             .implements::<dyn Audible>(|alarm| alarm);
///     }
/// }
/// ```
///
/// ## Rules
/// - `is_a` is transitive: the supertype's own lineage is inherited.
/// - `implements` is not: a capability has no lineage of its own.
/// - Lineages must be acyclic.
pub trait Routable: Any + Send + Sync {
    /// Declares the supertypes and capabilities of `Self`.
    ///
    /// Called once per type and cached for the life of the process.
    fn lineage(lineage: &mut Lineage<Self>)
    where
        Self: Sized,
    {
        let _ = lineage;
    }
}

/// Implements [`Routable`] with an empty lineage for each listed type.
///
/// ```rust
/// struct Ping;
/// struct Pong(u32);
///
/// weakbus::routable!(Ping, Pong);
/// ```
#[macro_export]
macro_rules! routable {
    ($($ty:ty),+ $(,)?) => {
        $(impl $crate::Routable for $ty {})+
    };
}

routable!((), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, String);
