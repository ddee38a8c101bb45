//! Page-side errors.

use pagepilot_protocols::{ErrorClass, WireError};
use thiserror::Error;

/// Failure of a single DOM primitive.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomError {
    /// The node handle no longer refers to a live element.
    #[error("Node is detached: {0}")]
    Detached(String),

    #[error("Document has no body")]
    NoBody,

    /// The operation does not apply to this kind of element.
    #[error("Unsupported on this element: {0}")]
    Unsupported(String),

    /// Script evaluation in the page threw.
    #[error("Page script error: {0}")]
    Script(String),

    /// The channel to the page failed.
    #[error("Page bridge error: {0}")]
    Bridge(String),
}

/// Failure of a page action, reported back as `{success: false, error}`.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("No clickable element found at ({x}, {y})")]
    NoElementAtPoint { x: f64, y: f64 },

    #[error("{0} event was cancelled")]
    EventCancelled(String),

    #[error("Invalid screenshot scale: zoom {zoom} x device pixel ratio {ratio}")]
    InvalidScale { zoom: f64, ratio: f64 },

    #[error("Scaled screenshot would be {width}x{height} px, over the {max} px limit")]
    ScreenshotTooLarge { width: f64, height: f64, max: u32 },

    #[error("Invalid image data URL: {0}")]
    InvalidDataUrl(String),

    #[error("Failed to decode screenshot: {0}")]
    ImageDecode(String),

    #[error("Failed to encode screenshot: {0}")]
    ImageEncode(String),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("DOM operation failed: {0}")]
    Dom(#[from] DomError),
}

impl PageError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PageError::InvalidScale { .. }
            | PageError::ScreenshotTooLarge { .. }
            | PageError::InvalidDataUrl(_)
            | PageError::Wire(_) => ErrorClass::Validation,
            PageError::NoElementAtPoint { .. } => ErrorClass::TargetResolution,
            PageError::EventCancelled(_)
            | PageError::ImageDecode(_)
            | PageError::ImageEncode(_)
            | PageError::Dom(_) => ErrorClass::Execution,
        }
    }
}
