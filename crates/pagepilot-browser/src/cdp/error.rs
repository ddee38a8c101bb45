//! CDP error types.

use thiserror::Error;

/// CDP client errors.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Failed to connect to Chrome.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Chrome not found or not running with remote debugging.
    #[error("Chrome not available at {0}. Start Chrome with: chrome --remote-debugging-port=9222")]
    ChromeNotAvailable(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Error object in a command response.
    #[error("CDP error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error (for endpoint discovery).
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// A script evaluated in the page threw.
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    /// The WebSocket closed before the response arrived.
    #[error("Session closed")]
    SessionClosed,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl CdpError {
    /// The remote object or execution context referenced by a command is gone,
    /// usually because the page navigated.
    pub fn is_stale_reference(&self) -> bool {
        match self {
            CdpError::Protocol { message, .. } => {
                message.contains("Could not find object")
                    || message.contains("Cannot find context")
                    || message.contains("Execution context was destroyed")
            }
            _ => false,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::ConnectionFailed(format!("Invalid URL: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_message() {
        let err = CdpError::Protocol {
            code: -32000,
            message: "Not allowed".to_string(),
        };
        assert_eq!(err.to_string(), "CDP error: Not allowed (code: -32000)");
    }

    #[test]
    fn test_stale_reference() {
        let stale = CdpError::Protocol {
            code: -32000,
            message: "Could not find object with given id".to_string(),
        };
        assert!(stale.is_stale_reference());
        assert!(!CdpError::SessionClosed.is_stale_reference());
        assert!(!CdpError::JavaScript("boom".into()).is_stale_reference());
    }

    #[test]
    fn test_url_parse_error_from() {
        let err: CdpError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, CdpError::ConnectionFailed(_)));
    }
}
