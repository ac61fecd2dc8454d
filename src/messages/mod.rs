//! Ready-made message types.
//!
//! ```text
//! MessageBase                    sender label, target type
//!   ├── GenericMessage<T>        + content
//!   └── NotificationMessage      + notification text
//!         └── NotificationWithCallback<P>   + reply callback
//! ```
//!
//! A recipient subscribed to `MessageBase` with derived delivery receives all of them.

mod base;
mod generic;
mod notification;

pub use base::MessageBase;
pub use generic::GenericMessage;
pub use notification::{NotificationMessage, NotificationWithCallback};
