//! CDP page session for interacting with a single page.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use super::client::Connection;
use super::error::CdpError;
use super::protocol::{CallArgument, CaptureFormat, CdpEvent, PropertyDescriptor, RemoteObject};

/// A session attached to a single page target.
pub struct PageSession {
    target_id: String,
    session_id: String,
    conn: Arc<Connection>,
    events: Mutex<Option<mpsc::UnboundedReceiver<CdpEvent>>>,
}

impl PageSession {
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        conn: Arc<Connection>,
        events: mpsc::UnboundedReceiver<CdpEvent>,
    ) -> Self {
        Self {
            target_id,
            session_id,
            conn,
            events: Mutex::new(Some(events)),
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Take the event stream for this session. Only the first caller gets it.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<CdpEvent>> {
        self.events.lock().take()
    }

    /// Send a CDP command to this page session.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.conn.call(method, params, Some(&self.session_id)).await
    }

    /// Enable the domains whose events the tab host follows.
    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        debug!("Enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    /// Stop routing events to this session.
    pub(crate) fn detach(&self) {
        self.conn.unregister_session(&self.session_id);
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Start navigating the main frame. Completion is reported through
    /// `Page.loadEventFired`.
    pub async fn navigate(&self, url: &str) -> Result<String, CdpError> {
        let result = self
            .call("Page.navigate", Some(json!({"url": url})))
            .await?;

        if let Some(error) = result.get("errorText").and_then(Value::as_str) {
            return Err(CdpError::NavigationFailed(error.to_string()));
        }

        debug!("Navigating {} to {}", self.target_id, url);
        Ok(result["frameId"].as_str().unwrap_or(&self.target_id).to_string())
    }

    pub async fn reload(&self) -> Result<(), CdpError> {
        self.call("Page.reload", None).await?;
        Ok(())
    }

    /// Move `delta` entries through the session history. Returns `false` when
    /// there is no such entry.
    pub async fn history_step(&self, delta: i64) -> Result<bool, CdpError> {
        let history = self.call("Page.getNavigationHistory", None).await?;
        let current_index = history["currentIndex"].as_i64().unwrap_or(0);
        let entries = history["entries"].as_array().cloned().unwrap_or_default();

        let target = current_index + delta;
        if target < 0 {
            return Ok(false);
        }
        let Some(entry) = entries.get(target as usize) else {
            return Ok(false);
        };
        let entry_id = entry["id"]
            .as_i64()
            .ok_or_else(|| CdpError::InvalidResponse("History entry without id".to_string()))?;

        self.call(
            "Page.navigateToHistoryEntry",
            Some(json!({"entryId": entry_id})),
        )
        .await?;
        Ok(true)
    }

    pub async fn go_back(&self) -> Result<bool, CdpError> {
        self.history_step(-1).await
    }

    pub async fn go_forward(&self) -> Result<bool, CdpError> {
        self.history_step(1).await
    }

    pub async fn bring_to_front(&self) -> Result<(), CdpError> {
        self.call("Page.bringToFront", None).await?;
        Ok(())
    }

    /// Capture the visible viewport. Returns base64 image data.
    pub async fn capture_screenshot(&self, format: CaptureFormat) -> Result<String, CdpError> {
        let result = self
            .call(
                "Page.captureScreenshot",
                Some(json!({
                    "format": format,
                    "captureBeyondViewport": false,
                })),
            )
            .await?;

        result["data"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CdpError::InvalidResponse("Missing screenshot data".to_string()))
    }

    // ========================================================================
    // JavaScript Execution
    // ========================================================================

    /// Evaluate an expression and return its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;
        check_exception(&result)?;
        Ok(result["result"]["value"].clone())
    }

    /// Evaluate an expression and return a handle to the result, held in
    /// `object_group` until that group is released.
    pub async fn evaluate_handle(
        &self,
        expression: &str,
        object_group: &str,
    ) -> Result<RemoteObject, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": false,
                    "objectGroup": object_group,
                })),
            )
            .await?;
        check_exception(&result)?;
        Ok(serde_json::from_value(result["result"].clone())?)
    }

    /// Call `function` with `this` bound to a remote object and return the
    /// result by value.
    pub async fn call_function_on(
        &self,
        object_id: &str,
        function: &str,
        args: &[CallArgument],
    ) -> Result<Value, CdpError> {
        let result = self.call_function(object_id, function, args, None).await?;
        Ok(result["value"].clone())
    }

    /// Like [`Self::call_function_on`], returning a handle to the result held
    /// in `object_group`.
    pub async fn call_function_on_handle(
        &self,
        object_id: &str,
        function: &str,
        args: &[CallArgument],
        object_group: &str,
    ) -> Result<RemoteObject, CdpError> {
        let result = self
            .call_function(object_id, function, args, Some(object_group))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// `None` for `object_group` returns the result by value.
    async fn call_function(
        &self,
        object_id: &str,
        function: &str,
        args: &[CallArgument],
        object_group: Option<&str>,
    ) -> Result<Value, CdpError> {
        let mut params = json!({
            "objectId": object_id,
            "functionDeclaration": function,
            "arguments": args,
            "returnByValue": object_group.is_none(),
            "awaitPromise": true,
        });
        if let Some(group) = object_group {
            params["objectGroup"] = json!(group);
        }
        let result = self.call("Runtime.callFunctionOn", Some(params)).await?;
        check_exception(&result)?;
        Ok(result["result"].clone())
    }

    /// Own properties of a remote object. Handles in the result share the
    /// object's group.
    pub async fn get_properties(
        &self,
        object_id: &str,
    ) -> Result<Vec<PropertyDescriptor>, CdpError> {
        let result = self
            .call(
                "Runtime.getProperties",
                Some(json!({
                    "objectId": object_id,
                    "ownProperties": true,
                })),
            )
            .await?;
        check_exception(&result)?;
        Ok(serde_json::from_value(result["result"].clone())?)
    }

    /// Release every handle in `object_group`.
    pub async fn release_object_group(&self, object_group: &str) -> Result<(), CdpError> {
        self.call(
            "Runtime.releaseObjectGroup",
            Some(json!({"objectGroup": object_group})),
        )
        .await?;
        Ok(())
    }

    pub async fn release_object(&self, object_id: &str) -> Result<(), CdpError> {
        self.call(
            "Runtime.releaseObject",
            Some(json!({"objectId": object_id})),
        )
        .await?;
        Ok(())
    }
}

/// Turn `exceptionDetails` into an error, preferring the thrown value's
/// description over the generic "Uncaught" text.
fn check_exception(result: &Value) -> Result<(), CdpError> {
    let Some(details) = result.get("exceptionDetails") else {
        return Ok(());
    };
    let text = details["exception"]["description"]
        .as_str()
        .or_else(|| details["text"].as_str())
        .unwrap_or("Unknown error");
    Err(CdpError::JavaScript(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_exception_prefers_description() {
        let result = json!({
            "result": {"type": "object"},
            "exceptionDetails": {
                "text": "Uncaught",
                "exception": {"type": "object", "description": "TypeError: x is not a function"}
            }
        });
        let err = check_exception(&result).unwrap_err();
        assert_eq!(err.to_string(), "JavaScript error: TypeError: x is not a function");
    }

    #[test]
    fn test_check_exception_falls_back_to_text() {
        let result = json!({"exceptionDetails": {"text": "Uncaught SyntaxError"}});
        let err = check_exception(&result).unwrap_err();
        assert!(err.to_string().contains("Uncaught SyntaxError"));
    }

    #[test]
    fn test_check_exception_ok() {
        assert!(check_exception(&json!({"result": {"type": "number", "value": 1}})).is_ok());
    }
}
