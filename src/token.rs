//! # Channel tokens.
//!
//! A [`Token`] partitions one message type into independent channels. It wraps any
//! value that is `PartialEq + Debug + Send + Sync + 'static`; two tokens are equal
//! when they hold values of the same type that compare equal.
//!
//! ## Matching rules
//! ```text
//! send token   entry token   delivered?
//! ──────────   ───────────   ──────────
//! none         none          yes
//! none         Some(_)       no
//! Some(a)      none          no
//! Some(a)      Some(b)       a == b
//! ```
//!
//! String tokens are normalized: `"c1"` and `String::from("c1")` are the same channel.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque, equality-comparable channel key.
///
/// ## Example
/// ```rust
/// use weakbus::Token;
///
/// assert_eq!(Token::from("c1"), Token::from(String::from("c1")));
/// assert_ne!(Token::from("c1"), Token::from("c2"));
/// assert_ne!(Token::new(1u64), Token::new(1u32)); // different value types
/// ```
#[derive(Clone)]
pub struct Token(Arc<dyn TokenValue>);

trait TokenValue: Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn eq_value(&self, other: &dyn TokenValue) -> bool;
}

impl<T> TokenValue for T
where
    T: PartialEq + fmt::Debug + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_value(&self, other: &dyn TokenValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }
}

impl Token {
    /// Wraps an arbitrary comparable value.
    pub fn new<T>(value: T) -> Self
    where
        T: PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        Self(Arc::new(value))
    }

    /// Returns the wrapped value if it is a `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.eq_value(other.0.as_ref())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&self.0).finish()
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::new(value.to_owned())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::new(value)
    }
}

impl From<u64> for Token {
    fn from(value: u64) -> Self {
        Token::new(value)
    }
}

impl From<usize> for Token {
    fn from(value: usize) -> Self {
        Token::new(value)
    }
}

impl From<i64> for Token {
    fn from(value: i64) -> Self {
        Token::new(value)
    }
}

/// Delivery rule between a send and a subscription.
#[inline]
pub(crate) fn same_channel(sent: Option<&Token>, registered: Option<&Token>) -> bool {
    match (sent, registered) {
        (None, None) => true,
        (Some(sent), Some(registered)) => sent == registered,
        _ => false,
    }
}

/// Token clause of an unregister request.
#[derive(Clone, Debug)]
pub(crate) enum TokenFilter {
    /// Any token, including none.
    Any,
    /// Only subscriptions registered without a token.
    Untokenized,
    /// Only subscriptions registered with an equal token.
    Exactly(Token),
}

impl TokenFilter {
    pub(crate) fn admits(&self, registered: Option<&Token>) -> bool {
        match self {
            TokenFilter::Any => true,
            TokenFilter::Untokenized => registered.is_none(),
            TokenFilter::Exactly(token) => registered == Some(token),
        }
    }
}

impl From<Option<&Token>> for TokenFilter {
    fn from(token: Option<&Token>) -> Self {
        match token {
            Some(token) => TokenFilter::Exactly(token.clone()),
            None => TokenFilter::Untokenized,
        }
    }
}
