//! Wire decoding errors.

use thiserror::Error;

/// A message envelope that could not be decoded into a [`crate::Message`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("Unknown message type: {0}")]
    UnknownType(String),

    #[error("Invalid payload for {message_type}: {reason}")]
    InvalidPayload { message_type: String, reason: String },

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Unknown modifier: {0}")]
    UnknownModifier(String),
}
