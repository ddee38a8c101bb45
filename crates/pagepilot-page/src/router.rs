//! Content-script message router.
//!
//! Decodes a raw wire message, runs the matching page action and turns the
//! outcome into a [`ResponseEnvelope`]. Nothing escapes this boundary: decode
//! failures, action errors and panics all become `{success: false, error}`.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use pagepilot_config::ScreenshotFormat;
use pagepilot_protocols::{panic_message, Message, ResponseEnvelope};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::actions::{PageActions, ScreenshotJob};
use crate::dom::Dom;
use crate::error::PageError;
use crate::timings::Timings;

/// Whether the router is between messages or inside a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouterState {
    #[default]
    Idle,
    Dispatching,
}

/// The in-page endpoint for one page lifetime.
pub struct ContentScript<D: Dom> {
    actions: PageActions<D>,
    state: RouterState,
}

impl<D: Dom> ContentScript<D> {
    pub fn new(dom: Arc<D>, timings: Timings, screenshot_format: ScreenshotFormat) -> Self {
        Self::from_actions(PageActions::new(dom, timings, screenshot_format))
    }

    pub fn from_actions(actions: PageActions<D>) -> Self {
        Self {
            actions,
            state: RouterState::Idle,
        }
    }

    pub fn state(&self) -> RouterState {
        self.state
    }

    pub fn actions(&self) -> &PageActions<D> {
        &self.actions
    }

    /// Handle one raw message.
    pub async fn handle(&mut self, raw: Value) -> ResponseEnvelope {
        let message = match Message::from_wire(&raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Rejected content script message");
                return ResponseEnvelope::failure(e.to_string());
            }
        };
        let message_type = message.message_type();
        debug!(message_type = message_type.as_str(), "Dispatching message");

        self.state = RouterState::Dispatching;
        let outcome = AssertUnwindSafe(self.dispatch(message))
            .catch_unwind()
            .await;
        self.state = RouterState::Idle;

        if let Err(e) = self.actions.dom().release_handles().await {
            warn!(error = %e, "Failed to release page handles");
        }

        match outcome {
            Ok(Ok(result)) => ResponseEnvelope::ok(result),
            Ok(Err(e)) => {
                debug!(message_type = message_type.as_str(), error = %e, class = ?e.class(), "Handler failed");
                ResponseEnvelope::failure(e.to_string())
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(message_type = message_type.as_str(), %reason, "Handler panicked");
                ResponseEnvelope::failure(format!(
                    "{} handler panicked: {}",
                    message_type.as_str(),
                    reason
                ))
            }
        }
    }

    async fn dispatch(&self, message: Message) -> Result<Value, PageError> {
        let actions = &self.actions;
        let result = match message {
            Message::SimulateClick(p) => actions.click_at(p.coordinates, p.click_type).await?,
            Message::ScrollPage(p) => actions.scroll_page(p.direction).await?,
            Message::TypeText(p) => actions.type_text(&p.text).await?,
            Message::PressKey(p) => actions.handle_key_press(&p.key, &p.modifiers).await?,
            Message::GetDevicePixelRatio => {
                return Ok(Value::from(actions.device_pixel_ratio().await?));
            }
            Message::ProcessScreenshot(p) => {
                actions.process_screenshot(&ScreenshotJob::from(p))?.data_url
            }
            Message::ScrollAtPosition(p) => {
                actions.scroll_at_position(p.x, p.y, p.delta_y).await?
            }
        };
        Ok(Value::String(result))
    }

    /// Remove indicators. The page is going away or being replaced.
    pub async fn cleanup(&self) {
        self.actions.cleanup_indicators().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementSpec, MemoryDocument};
    use base64::Engine;
    use image::{DynamicImage, ImageFormat, RgbaImage};
    use serde_json::json;
    use std::io::Cursor;

    fn script() -> (Arc<MemoryDocument>, ContentScript<MemoryDocument>) {
        let doc = Arc::new(MemoryDocument::new());
        let script = ContentScript::new(doc.clone(), Timings::immediate(), ScreenshotFormat::Png);
        (doc, script)
    }

    #[tokio::test]
    async fn test_unknown_type() {
        let (_, mut script) = script();
        let response = script.handle(json!({"type": "FLY_AWAY"})).await;
        assert_eq!(
            response,
            ResponseEnvelope::failure("Unknown message type: FLY_AWAY")
        );

        let response = script.handle(json!({"payload": {}})).await;
        assert_eq!(response.error.as_deref(), Some("Unknown message type: undefined"));
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let (_, mut script) = script();
        let response = script
            .handle(json!({"type": "SIMULATE_CLICK", "payload": {"coordinates": "a:b"}}))
            .await;
        assert!(!response.success);
        let error = response.error.unwrap();
        assert!(error.starts_with("Invalid payload for SIMULATE_CLICK"), "{}", error);
    }

    #[tokio::test]
    async fn test_click_round_trip() {
        let (doc, mut script) = script();
        doc.append(
            doc.body_node(),
            ElementSpec::new("button").id("ok").rect(0.0, 0.0, 50.0, 50.0),
        );
        let response = script
            .handle(json!({"type": "SIMULATE_CLICK", "payload": {"coordinates": "10:20"}}))
            .await;
        assert_eq!(response, ResponseEnvelope::ok("Clicked button#ok at (10, 20)"));
        assert_eq!(script.state(), RouterState::Idle);
    }

    #[tokio::test]
    async fn test_handler_error_becomes_failure() {
        let (_, mut script) = script();
        let response = script
            .handle(json!({"type": "SCROLL_AT_POSITION", "payload": {"x": -5, "y": -5, "deltaY": 10}}))
            .await;
        assert_eq!(
            response,
            ResponseEnvelope::failure("No clickable element found at (-5, -5)")
        );
    }

    #[tokio::test]
    async fn test_handles_released_after_each_dispatch() {
        let (doc, mut script) = script();
        script.handle(json!({"type": "NOPE"})).await;
        assert_eq!(doc.handle_releases(), 0);

        script
            .handle(json!({"type": "PRESS_KEY", "payload": {"key": "a"}}))
            .await;
        script.handle(json!({"type": "GET_DEVICE_PIXEL_RATIO"})).await;
        assert_eq!(doc.handle_releases(), 2);

        doc.panic_on_next_hit_test();
        script
            .handle(json!({"type": "SIMULATE_CLICK", "payload": {"coordinates": "1:1"}}))
            .await;
        assert_eq!(doc.handle_releases(), 3);
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let (doc, mut script) = script();
        doc.panic_on_next_hit_test();
        let response = script
            .handle(json!({"type": "SCROLL_AT_POSITION", "payload": {"x": 1, "y": 1, "deltaY": 10}}))
            .await;
        assert!(!response.success);
        let error = response.error.unwrap();
        assert!(error.starts_with("SCROLL_AT_POSITION handler panicked"), "{}", error);
        assert_eq!(script.state(), RouterState::Idle);

        // The router keeps serving afterwards.
        let response = script
            .handle(json!({"type": "SCROLL_AT_POSITION", "payload": {"x": 1, "y": 1, "deltaY": 10}}))
            .await;
        assert!(response.success);
    }

    #[tokio::test]
    async fn test_device_pixel_ratio_is_a_number() {
        let (_, mut script) = script();
        let response = script.handle(json!({"type": "GET_DEVICE_PIXEL_RATIO"})).await;
        assert_eq!(response.result, Some(json!(1.0)));
    }

    #[tokio::test]
    async fn test_text_handlers() {
        let (doc, mut script) = script();
        let input = doc.append(doc.body_node(), ElementSpec::new("input"));
        doc.focus(&input).await.unwrap();

        let response = script
            .handle(json!({"type": "TYPE_TEXT", "payload": {"text": "hi"}}))
            .await;
        assert_eq!(response.result, Some(json!("Typed text: \"hi\"")));

        let response = script
            .handle(json!({"type": "PRESS_KEY", "payload": {"key": "Enter", "modifiers": ["shift"]}}))
            .await;
        assert_eq!(
            response.result,
            Some(json!("Pressed key: Enter with modifiers: shift"))
        );

        let response = script
            .handle(json!({"type": "SCROLL_PAGE", "payload": {"direction": "down"}}))
            .await;
        assert_eq!(response.result, Some(json!("Scrolled down one page")));
    }

    #[tokio::test]
    async fn test_process_screenshot() {
        let (_, mut script) = script();
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(RgbaImage::new(64, 32))
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        let data_url = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(buffer.into_inner())
        );

        let response = script
            .handle(json!({
                "type": "PROCESS_SCREENSHOT",
                "payload": {"dataUrl": data_url, "zoomFactor": 1.0, "devicePixelRatio": 2.0}
            }))
            .await;
        let result = response.into_result().unwrap();
        assert!(result.as_str().unwrap().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_process_screenshot_bad_scale() {
        let (_, mut script) = script();
        let response = script
            .handle(json!({
                "type": "PROCESS_SCREENSHOT",
                "payload": {"dataUrl": "data:image/png;base64,AAAA", "zoomFactor": 0, "devicePixelRatio": 2}
            }))
            .await;
        assert!(response.error.unwrap().starts_with("Invalid screenshot scale"));
    }
}
