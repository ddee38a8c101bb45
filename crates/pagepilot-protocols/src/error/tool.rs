//! Tool execution errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::TransportError;

/// Coarse classification of a tool failure.
///
/// Every class is normalized to the same `{error}` shape at the dispatcher;
/// the class only feeds logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Malformed or missing arguments, detected before touching a page.
    Validation,
    /// No tab, no element or a page that may not be automated.
    TargetResolution,
    /// The action started but could not complete.
    Execution,
    /// The content script could not be reached.
    Transport,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("No active tab found")]
    NoActiveTab,

    #[error("Tab not found: {0}")]
    TabNotFound(String),

    #[error("Cannot automate restricted browser page: {0}")]
    RestrictedPage(String),

    /// Failure reported by the content script in its response envelope.
    #[error("{0}")]
    PageAction(String),

    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Content script unreachable: {0}")]
    Transport(#[from] TransportError),
}

impl ToolError {
    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            ToolError::NotFound(_) | ToolError::InvalidParameters(_) => ErrorClass::Validation,
            ToolError::NoActiveTab | ToolError::TabNotFound(_) | ToolError::RestrictedPage(_) => {
                ErrorClass::TargetResolution
            }
            ToolError::PageAction(_) | ToolError::ExecutionFailed(_) => ErrorClass::Execution,
            ToolError::Transport(_) => ErrorClass::Transport,
        }
    }
}
