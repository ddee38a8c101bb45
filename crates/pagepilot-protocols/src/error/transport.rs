//! Messaging transport errors.

use thiserror::Error;

/// Failure to deliver a message to a content script or to receive its reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No content script is listening in the target tab.
    #[error("Could not establish connection. Receiving end does not exist.")]
    ReceivingEndMissing,

    /// The content script went away before replying.
    #[error("The message channel closed before a response was received")]
    ChannelClosed,

    /// Lower-level failure (CDP, serialization).
    #[error("{0}")]
    Other(String),
}
