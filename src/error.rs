//! Error types used by the bus.
//!
//! [`BusError`] covers the few ways a bus operation can fail:
//!
//! - registration of a handler that cannot be addressed later ([`BusError::UnnamedHandler`]);
//! - a payload that cannot be presented as a handler's declared type ([`BusError::TypeMismatch`]);
//! - a handler that panicked while the bus isolates faults ([`BusError::HandlerPanicked`]).
//!
//! Every variant provides `as_label` / `as_message` helpers for logs.
//! Unregistering something that is not registered, or sending a message nobody
//! listens to, is **not** an error.

use std::any::Any;

use thiserror::Error;

/// # Errors produced by the bus.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// A handler was registered with an empty declared name.
    ///
    /// The name is the identity `unregister` matches on, so an unnamed handler
    /// could never be removed selectively. Rejected before any state changes.
    #[error("handler has no declared name")]
    UnnamedHandler,

    /// A payload could not be presented as the handler's declared message type.
    #[error("payload of type {actual} cannot be delivered as {expected}")]
    TypeMismatch {
        /// Type the handler declared.
        expected: &'static str,
        /// Runtime type of the message being sent.
        actual: &'static str,
    },

    /// A handler panicked while the bus was isolating faults.
    #[error("handler {handler} panicked: {message}")]
    HandlerPanicked {
        /// Declared name of the handler.
        handler: String,
        /// Panic payload, if it was a string.
        message: String,
    },
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use weakbus::BusError;
    ///
    /// let err = BusError::TypeMismatch { expected: "Foo", actual: "Bar" };
    /// assert_eq!(err.as_label(), "type_mismatch");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::UnnamedHandler => "unnamed_handler",
            BusError::TypeMismatch { .. } => "type_mismatch",
            BusError::HandlerPanicked { .. } => "handler_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BusError::UnnamedHandler => "handler name must not be empty".to_string(),
            BusError::TypeMismatch { expected, actual } => {
                format!("expected={expected} actual={actual}")
            }
            BusError::HandlerPanicked { handler, message } => {
                format!("handler={handler} panic={message}")
            }
        }
    }

    /// Indicates whether the error is a delivery fault (as opposed to a bad argument).
    ///
    /// # Example
    /// ```
    /// use weakbus::BusError;
    ///
    /// assert!(!BusError::UnnamedHandler.is_delivery_fault());
    /// assert!(BusError::TypeMismatch { expected: "A", actual: "B" }.is_delivery_fault());
    /// ```
    pub fn is_delivery_fault(&self) -> bool {
        matches!(
            self,
            BusError::TypeMismatch { .. } | BusError::HandlerPanicked { .. }
        )
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(BusError::UnnamedHandler.as_label(), "unnamed_handler");
        assert_eq!(
            BusError::HandlerPanicked {
                handler: "h".into(),
                message: "boom".into()
            }
            .as_label(),
            "handler_panicked"
        );
    }

    #[test]
    fn test_display_names_both_types() {
        let err = BusError::TypeMismatch {
            expected: "Base",
            actual: "Other",
        };
        let text = err.to_string();
        assert!(text.contains("Base"));
        assert!(text.contains("Other"));
        assert_eq!(err.as_message(), "expected=Base actual=Other");
    }

    #[test]
    fn test_panic_message_variants() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
