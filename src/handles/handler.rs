//! # Typed, named handler (`Handler`)
//!
//! [`Handler`] wraps a callable `Fn(&R, &K)`: "on recipient `R`, handle a `K`".
//! The name is the handler's identity for `unregister`: a fresh `Handler` built later
//! with the same name addresses the same subscriptions.
//!
//! ## Naming
//! - [`Handler::new`] takes an explicit name.
//! - [`Handler::from_fn`] derives it from the callable's type name. For a method path
//!   such as `Screen::on_resize` that is the method's path, which is stable across
//!   calls. Closures get a compiler-generated name; prefer `new` for them.

use std::any::type_name;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Callback for messages of type `K`, invoked on a recipient of type `R`.
///
/// ## Example
/// ```rust
/// use weakbus::Handler;
///
/// struct Screen;
/// struct Resize { width: u32 }
///
/// impl Screen {
///     fn on_resize(&self, msg: &Resize) {
///         let _ = msg.width;
///     }
/// }
///
/// let named = Handler::new("resize", |screen: &Screen, msg: &Resize| screen.on_resize(msg));
/// assert_eq!(named.name(), "resize");
///
/// let by_path = Handler::from_fn(Screen::on_resize);
/// assert!(by_path.name().ends_with("on_resize"));
/// ```
pub struct Handler<R, K: ?Sized> {
    name: Cow<'static, str>,
    f: Arc<dyn Fn(&R, &K) + Send + Sync>,
}

impl<R: 'static, K: ?Sized + 'static> Handler<R, K> {
    /// Creates a handler with an explicit name.
    pub fn new<F>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&R, &K) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    /// Creates a handler named after the callable's type.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&R, &K) + Send + Sync + 'static,
    {
        Self::new(type_name::<F>(), f)
    }
}

impl<R, K: ?Sized> Handler<R, K> {
    /// Declared name (identity for unregister).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (Cow<'static, str>, Arc<dyn Fn(&R, &K) + Send + Sync>) {
        (self.name, self.f)
    }
}

impl<R, K: ?Sized> Clone for Handler<R, K> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            f: Arc::clone(&self.f),
        }
    }
}

impl<R, K: ?Sized> fmt::Debug for Handler<R, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("name", &self.name).finish()
    }
}
