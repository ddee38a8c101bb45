//! Orchestrator-side errors.

use pagepilot_protocols::{ToolError, TransportError};
use thiserror::Error;

use crate::cdp::CdpError;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error(transparent)]
    Cdp(#[from] CdpError),

    #[error("Chrome executable not found. Set browser.chrome_path or start Chrome with --remote-debugging-port")]
    ChromeNotFound,

    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("No active tab found")]
    NoActiveTab,

    #[error("Tab not found: {0}")]
    TabNotFound(String),

    /// `go_back` / `go_forward` past the end of the session history.
    #[error("Cannot find a {0} page in history")]
    NoHistoryEntry(&'static str),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Tool already registered: {0}")]
    AlreadyRegistered(String),
}

impl From<BrowserError> for ToolError {
    fn from(e: BrowserError) -> Self {
        match e {
            BrowserError::NoActiveTab => ToolError::NoActiveTab,
            BrowserError::TabNotFound(id) => ToolError::TabNotFound(id),
            BrowserError::Transport(t) => ToolError::Transport(t),
            other => ToolError::ExecutionFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagepilot_protocols::ErrorClass;

    #[test]
    fn test_into_tool_error_keeps_class() {
        let err: ToolError = BrowserError::NoActiveTab.into();
        assert_eq!(err.class(), ErrorClass::TargetResolution);

        let err: ToolError = BrowserError::TabNotFound("T9".into()).into();
        assert_eq!(err.to_string(), "Tab not found: T9");

        let err: ToolError = BrowserError::Transport(TransportError::ChannelClosed).into();
        assert_eq!(err.class(), ErrorClass::Transport);
    }

    #[test]
    fn test_other_errors_are_execution_failures() {
        let err: ToolError = BrowserError::NoHistoryEntry("previous").into();
        assert_eq!(
            err.to_string(),
            "Tool execution failed: Cannot find a previous page in history"
        );
        assert_eq!(err.class(), ErrorClass::Execution);

        let err: ToolError = BrowserError::Cdp(CdpError::SessionClosed).into();
        assert_eq!(err.class(), ErrorClass::Execution);
    }
}
