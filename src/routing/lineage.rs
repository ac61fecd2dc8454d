//! # Declared lineages and the process-wide ancestry cache.
//!
//! A [`Lineage`] is filled in by [`Routable::lineage`]; the result is frozen into an
//! [`Ancestry`]: the list of every type a value of `T` can be presented as, each with
//! a **projection** that borrows the right view out of a `&T`.
//!
//! ## Architecture
//! ```text
//! Routable::lineage(&mut Lineage<T>)
//!        │  is_a::<B>(|t| &t.b)          (pulls in B's ancestry, composed)
//!        │  implements::<dyn Cap>(|t| t)
//!        ▼
//! Ancestry { root: T, links: [T → T, T → B, T → A, T → dyn Cap] }
//!        │
//!        ▼
//! ANCESTRIES: TypeId → Arc<Ancestry>   (built once, read-mostly)
//! ```
//!
//! ## Rules
//! - The first link is always the identity projection of the root type.
//! - When a type is reachable twice (diamond), the first declaration wins.
//! - Projections are typed on the target side (`Projection<K>`) and erased behind
//!   [`ErasedProjection`] so the routing table can hold them uniformly.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use super::{MessageType, Routable};

/// Built ancestries, keyed by the root type.
static ANCESTRIES: LazyLock<RwLock<HashMap<TypeId, Arc<Ancestry>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// One hop `&dyn Any -> &dyn Any` used to compose projections.
type Step = Arc<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync>;

fn step<F>(f: F) -> Step
where
    F: for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Borrowing view from an erased message to a `&K`.
pub(crate) struct Projection<K: ?Sized + 'static> {
    view: Arc<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a K> + Send + Sync>,
}

impl<K: ?Sized + 'static> Projection<K> {
    fn new<F>(view: F) -> Self
    where
        F: for<'a> Fn(&'a dyn Any) -> Option<&'a K> + Send + Sync + 'static,
    {
        Self {
            view: Arc::new(view),
        }
    }

    /// Presents `message` as a `&K`, or `None` when it is not the expected root type.
    #[inline]
    pub(crate) fn apply<'a>(&self, message: &'a dyn Any) -> Option<&'a K> {
        (self.view)(message)
    }
}

impl<K: 'static> Projection<K> {
    fn identity() -> Self {
        Self::new(|message: &dyn Any| message.downcast_ref::<K>())
    }
}

/// Type-erased [`Projection`], so links to different targets can share a list.
pub(crate) trait ErasedProjection: Send + Sync {
    /// The type this projection produces.
    fn target(&self) -> MessageType;

    /// Access to the concrete `Projection<K>` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a projection that first applies `step`, then this one.
    fn after(&self, step: Step) -> Box<dyn ErasedProjection>;
}

impl<K: ?Sized + 'static> ErasedProjection for Projection<K> {
    fn target(&self) -> MessageType {
        MessageType::of::<K>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn after(&self, step: Step) -> Box<dyn ErasedProjection> {
        let view = Arc::clone(&self.view);
        Box::new(Projection::<K>::new(move |message: &dyn Any| {
            step(message).and_then(|mid| view(mid))
        }))
    }
}

/// Builder passed to [`Routable::lineage`].
///
/// See [`Routable`] for a complete example.
pub struct Lineage<T> {
    links: Vec<Box<dyn ErasedProjection>>,
    _root: PhantomData<fn(&T)>,
}

impl<T: Routable> Lineage<T> {
    fn new() -> Self {
        Self {
            links: vec![Box::new(Projection::<T>::identity())],
            _root: PhantomData,
        }
    }

    /// Declares that `T` is a `B`, reachable through `upcast`.
    ///
    /// Everything `B` is declared to be is inherited as well.
    pub fn is_a<B: Routable>(&mut self, upcast: fn(&T) -> &B) -> &mut Self {
        let hop = step(move |message: &dyn Any| {
            message
                .downcast_ref::<T>()
                .map(|value| upcast(value) as &dyn Any)
        });
        for link in &Ancestry::of::<B>().links {
            self.push(link.after(Arc::clone(&hop)));
        }
        self
    }

    /// Declares that `T` can be viewed as `K`, typically a trait object.
    ///
    /// Subscriptions to `K` with derived delivery enabled will then receive `T`.
    pub fn implements<K: ?Sized + 'static>(&mut self, view: fn(&T) -> &K) -> &mut Self {
        self.push(Box::new(Projection::<K>::new(move |message: &dyn Any| {
            message.downcast_ref::<T>().map(view)
        })));
        self
    }

    fn push(&mut self, link: Box<dyn ErasedProjection>) {
        let target = link.target();
        if self.links.iter().all(|known| known.target() != target) {
            self.links.push(link);
        }
    }
}

/// Frozen lineage of one root type.
///
/// Obtained with [`Ancestry::of`]; shared and immutable.
pub struct Ancestry {
    root: MessageType,
    links: Vec<Box<dyn ErasedProjection>>,
}

impl Ancestry {
    /// Returns the (cached) ancestry of `T`, building it on first use.
    ///
    /// The build runs outside the cache lock, so lineages may freely refer to
    /// other types' ancestries. Two threads racing on the same type both build;
    /// the first insert wins.
    pub fn of<T: Routable>() -> Arc<Ancestry> {
        let key = TypeId::of::<T>();
        if let Some(found) = ANCESTRIES
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(found);
        }

        let mut lineage = Lineage::<T>::new();
        T::lineage(&mut lineage);
        let built = Arc::new(Ancestry {
            root: MessageType::of::<T>(),
            links: lineage.links,
        });

        let mut cache = ANCESTRIES.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cache.entry(key).or_insert(built))
    }

    /// The type this ancestry describes.
    #[inline]
    pub fn root(&self) -> MessageType {
        self.root
    }

    /// Returns `true` if the root type is, is a subtype of, or implements `ty`.
    pub fn contains(&self, ty: MessageType) -> bool {
        self.links.iter().any(|link| link.target() == ty)
    }

    /// Every type the root can be presented as, root first.
    pub fn types(&self) -> impl Iterator<Item = MessageType> + '_ {
        self.links.iter().map(|link| link.target())
    }

    pub(crate) fn projection(&self, ty: MessageType) -> Option<&dyn ErasedProjection> {
        self.links
            .iter()
            .find(|link| link.target() == ty)
            .map(|link| link.as_ref())
    }

    pub(crate) fn identity(&self) -> &dyn ErasedProjection {
        self.links[0].as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Describe {
        fn describe(&self) -> String;
    }

    struct Animal {
        legs: u8,
    }

    struct Dog {
        animal: Animal,
        name: &'static str,
    }

    struct Puppy {
        dog: Dog,
    }

    impl Describe for Dog {
        fn describe(&self) -> String {
            format!("{} with {} legs", self.name, self.animal.legs)
        }
    }

    impl Routable for Animal {}

    impl Routable for Dog {
        fn lineage(lineage: &mut Lineage<Self>) {
            lineage
                .is_a::<Animal>(|dog| &dog.animal)
                .implements::<dyn Describe>(|dog| dog);
        }
    }

    impl Routable for Puppy {
        fn lineage(lineage: &mut Lineage<Self>) {
            lineage.is_a::<Dog>(|puppy| &puppy.dog);
        }
    }

    fn puppy() -> Puppy {
        Puppy {
            dog: Dog {
                animal: Animal { legs: 4 },
                name: "rex",
            },
        }
    }

    #[test]
    fn test_identity_link_comes_first() {
        let ancestry = Ancestry::of::<Animal>();
        assert_eq!(ancestry.root(), MessageType::of::<Animal>());
        assert_eq!(ancestry.types().collect::<Vec<_>>(), vec![MessageType::of::<Animal>()]);
        assert!(ancestry.identity().as_any().is::<Projection<Animal>>());
    }

    #[test]
    fn test_is_a_is_transitive() {
        let ancestry = Ancestry::of::<Puppy>();
        assert!(ancestry.contains(MessageType::of::<Puppy>()));
        assert!(ancestry.contains(MessageType::of::<Dog>()));
        assert!(ancestry.contains(MessageType::of::<Animal>()));
        assert!(ancestry.contains(MessageType::of::<dyn Describe>()));
        assert!(!ancestry.contains(MessageType::of::<String>()));
    }

    #[test]
    fn test_projection_borrows_the_declared_view() {
        let ancestry = Ancestry::of::<Puppy>();
        let value = puppy();

        let link = ancestry
            .projection(MessageType::of::<Animal>())
            .expect("animal link");
        let projection = link
            .as_any()
            .downcast_ref::<Projection<Animal>>()
            .expect("typed projection");
        assert_eq!(projection.apply(&value).map(|a| a.legs), Some(4));

        let link = ancestry
            .projection(MessageType::of::<dyn Describe>())
            .expect("capability link");
        let projection = link
            .as_any()
            .downcast_ref::<Projection<dyn Describe>>()
            .expect("typed projection");
        assert_eq!(
            projection.apply(&value).map(|d| d.describe()),
            Some("rex with 4 legs".to_string())
        );
    }

    #[test]
    fn test_projection_rejects_foreign_payload() {
        let ancestry = Ancestry::of::<Dog>();
        let link = ancestry.projection(MessageType::of::<Animal>()).expect("link");
        let projection = link
            .as_any()
            .downcast_ref::<Projection<Animal>>()
            .expect("typed projection");
        assert!(projection.apply(&42u32).is_none());
    }

    #[test]
    fn test_cache_returns_same_instance() {
        let first = Ancestry::of::<Dog>();
        let second = Ancestry::of::<Dog>();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
