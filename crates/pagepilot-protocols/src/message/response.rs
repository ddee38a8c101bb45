//! Response envelope returned by the content script.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reply to a [`crate::Message`].
///
/// `success == true` carries a `result`; `success == false` carries an
/// `error`. Use the constructors to keep the two halves consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn ok(result: impl Into<Value>) -> Self {
        Self {
            success: true,
            result: Some(result.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Split into the result value or the error message.
    pub fn into_result(self) -> Result<Value, String> {
        if self.success {
            Ok(self.result.unwrap_or(Value::Null))
        } else {
            Err(self.error.unwrap_or_else(|| "Unknown error".to_string()))
        }
    }

    /// Decode a reply from a peer that may still use the older shapes:
    /// a bare string, `{error}`, or `{success, result}`.
    pub fn from_wire(value: Value) -> Self {
        match value {
            Value::Null => Self::failure("Empty response from content script"),
            Value::String(s) => Self::ok(s),
            Value::Object(ref map) if map.contains_key("success") => {
                match serde_json::from_value::<ResponseEnvelope>(value.clone()) {
                    Ok(envelope) if envelope.success => envelope,
                    Ok(envelope) => Self::failure(
                        envelope.error.unwrap_or_else(|| "Unknown error".to_string()),
                    ),
                    Err(e) => Self::failure(format!("Malformed response: {}", e)),
                }
            }
            Value::Object(ref map) if map.contains_key("error") => {
                let message = match &map["error"] {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Self::failure(message)
            }
            other => Self::ok(other),
        }
    }
}

/// Render a result value as the text an LLM should read.
pub fn result_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
