//! Screenshot tool.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pagepilot_protocols::{
    ContentBlock, Message, MessageType, ScreenshotPayload, Tool, ToolContext, ToolDefinition, ToolError,
    ToolName, ToolOutcome,
};
use serde_json::Value;
use tracing::debug;

use super::{relay, relays, resolve_tab};
use crate::host::{TabHost, is_restricted_url};

/// Capture the visible area of the tab, scaled to CSS pixels.
///
/// The outcome's data is the processed image as a data URL; the LLM receives
/// it as an image block.
pub struct ScreenshotTool {
    definition: ToolDefinition,
    host: Arc<dyn TabHost>,
}

impl ScreenshotTool {
    pub fn new(host: Arc<dyn TabHost>) -> Self {
        Self {
            definition: relays(
                ToolDefinition::new(
                    ToolName::TakeScreenshot.as_str(),
                    "Take Screenshot",
                    "Take a screenshot of the visible area of the current tab. \
                     Image pixels map 1:1 to the coordinates other tools accept.",
                )
                .with_parameters_schema(serde_json::json!({
                    "type": "object",
                    "properties": {}
                })),
                MessageType::ProcessScreenshot,
            ),
            host,
        }
    }
}

/// Split `data:<mime>;base64,<data>` into mime type and payload.
pub fn split_data_url(data_url: &str) -> Option<(&str, &str)> {
    let rest = data_url.strip_prefix("data:")?;
    let (mime, data) = rest.split_once(";base64,")?;
    if mime.is_empty() || STANDARD.decode(data).is_err() {
        return None;
    }
    Some((mime, data))
}

#[async_trait]
impl Tool for ScreenshotTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _params: Value, ctx: ToolContext) -> Result<String, ToolError> {
        let host = self.host.as_ref();
        let tab = resolve_tab(host, &ctx).await?;
        if is_restricted_url(&tab.url) {
            return Err(ToolError::RestrictedPage(tab.url));
        }

        let captured = host.capture_visible_tab(&tab.id).await?;
        let device_pixel_ratio = relay(host, &tab.id, Message::GetDevicePixelRatio)
            .await?
            .as_f64()
            .ok_or_else(|| {
                ToolError::ExecutionFailed("Device pixel ratio is not a number".to_string())
            })?;
        let zoom_factor = host.zoom_factor(&tab.id).await?;
        debug!(tab = %tab.id, zoom_factor, device_pixel_ratio, "Processing screenshot");

        let processed = relay(
            host,
            &tab.id,
            Message::ProcessScreenshot(ScreenshotPayload {
                data_url: captured,
                zoom_factor,
                device_pixel_ratio,
            }),
        )
        .await?;
        match processed {
            Value::String(data_url) => Ok(data_url),
            other => Err(ToolError::ExecutionFailed(format!(
                "Unexpected screenshot result: {}",
                other
            ))),
        }
    }

    fn to_result_content(&self, outcome: &ToolOutcome) -> Vec<ContentBlock> {
        match outcome {
            ToolOutcome::Data { data } => match split_data_url(data) {
                Some((mime, payload)) => vec![ContentBlock::image(payload, mime)],
                None => vec![ContentBlock::text("Screenshot data is not a base64 data URL")],
            },
            ToolOutcome::Error { .. } => outcome.to_text_content(),
        }
    }
}
