//! Error types used by the frame bus.
//!
//! [`BusError`] covers the only failures the bus surfaces to callers: a payload
//! that cannot be turned into a transport value, and (internally) an inbound
//! value that does not match the envelope shape.
//!
//! Both variants provide helper methods (`as_label`, `as_message`) for logs.
//! Listener panics are never returned as errors; they are caught and logged
//! by the registry.

use thiserror::Error;

/// # Errors produced by the frame bus.
///
/// `Encode` is returned from [`FrameBus::emit`](crate::FrameBus::emit).
/// `Decode` is produced while demultiplexing inbound traffic; the bus logs and
/// drops such messages instead of propagating them.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Payload could not be converted into a transport value.
    #[error("failed to encode envelope: {reason}")]
    Encode {
        /// The underlying serializer message.
        reason: String,
    },

    /// Inbound value is not an envelope of the expected payload type.
    #[error("failed to decode envelope: {reason}")]
    Decode {
        /// The underlying deserializer message.
        reason: String,
    },
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use framebus::BusError;
    ///
    /// let err = BusError::Encode { reason: "key must be a string".into() };
    /// assert_eq!(err.as_label(), "envelope_encode");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::Encode { .. } => "envelope_encode",
            BusError::Decode { .. } => "envelope_decode",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BusError::Encode { reason } => format!("encode: {reason}"),
            BusError::Decode { reason } => format!("decode: {reason}"),
        }
    }

    pub(crate) fn encode(err: serde_json::Error) -> Self {
        BusError::Encode {
            reason: err.to_string(),
        }
    }

    pub(crate) fn decode(err: serde_json::Error) -> Self {
        BusError::Decode {
            reason: err.to_string(),
        }
    }
}
