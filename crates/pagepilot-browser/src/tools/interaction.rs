//! Interaction tools: click, type, key press and scrolling.
//!
//! Each one relays a single message to the tab's content script.

use std::sync::Arc;

use async_trait::async_trait;
use pagepilot_protocols::{
    ClickPayload, ClickType, Coordinate, KeyPayload, Message, MessageType, ScrollAtPositionPayload,
    ScrollDirection, ScrollPagePayload, Tool, ToolContext, ToolDefinition, ToolError, ToolName,
    TypeTextPayload,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{parse_params, relay_text, relays};
use crate::host::TabHost;

// ============================================================================
// Click Tool
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ClickParams {
    pub coordinates: Coordinate,
    #[serde(default, alias = "clickType")]
    pub click_type: ClickType,
}

/// Click at a point in the viewport.
pub struct ClickTool {
    definition: ToolDefinition,
    host: Arc<dyn TabHost>,
}

impl ClickTool {
    pub fn new(host: Arc<dyn TabHost>) -> Self {
        Self {
            definition: relays(
                ToolDefinition::new(
                    ToolName::Click.as_str(),
                    "Click",
                    "Click at a point on the page, in screenshot pixel coordinates.",
                )
                .with_parameters_schema(json!({
                    "type": "object",
                    "properties": {
                        "coordinates": {
                            "type": "string",
                            "description": "Point to click as \"x:y\", e.g. \"120:340\""
                        },
                        "click_type": {
                            "type": "string",
                            "enum": ["single", "double", "triple"],
                            "default": "single"
                        }
                    },
                    "required": ["coordinates"]
                })),
                MessageType::SimulateClick,
            ),
            host,
        }
    }
}

#[async_trait]
impl Tool for ClickTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: Value, ctx: ToolContext) -> Result<String, ToolError> {
        let params: ClickParams = parse_params(params)?;
        let message = Message::SimulateClick(ClickPayload {
            coordinates: params.coordinates,
            click_type: params.click_type,
        });
        relay_text(self.host.as_ref(), &ctx, message).await
    }
}

// ============================================================================
// Type Text Tool
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TypeTextParams {
    pub text: String,
}

/// Type into the focused element.
pub struct TypeTextTool {
    definition: ToolDefinition,
    host: Arc<dyn TabHost>,
}

impl TypeTextTool {
    pub fn new(host: Arc<dyn TabHost>) -> Self {
        Self {
            definition: relays(
                ToolDefinition::new(
                    ToolName::TypeText.as_str(),
                    "Type Text",
                    "Type text into the focused element. Click the field first.",
                )
                .with_parameters_schema(json!({
                    "type": "object",
                    "properties": {
                        "text": { "type": "string" }
                    },
                    "required": ["text"]
                })),
                MessageType::TypeText,
            ),
            host,
        }
    }
}

#[async_trait]
impl Tool for TypeTextTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: Value, ctx: ToolContext) -> Result<String, ToolError> {
        let params: TypeTextParams = parse_params(params)?;
        let message = Message::TypeText(TypeTextPayload { text: params.text });
        relay_text(self.host.as_ref(), &ctx, message).await
    }
}

// ============================================================================
// Press Key Tool
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PressKeyParams {
    pub key: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

/// Press a key, optionally with modifiers.
pub struct PressKeyTool {
    definition: ToolDefinition,
    host: Arc<dyn TabHost>,
}

impl PressKeyTool {
    pub fn new(host: Arc<dyn TabHost>) -> Self {
        Self {
            definition: relays(
                ToolDefinition::new(
                    ToolName::PressKey.as_str(),
                    "Press Key",
                    "Press a key on the focused element, e.g. Enter, Tab, Escape, ArrowDown or a character.",
                )
                .with_parameters_schema(json!({
                    "type": "object",
                    "properties": {
                        "key": {
                            "type": "string",
                            "description": "Key name as in KeyboardEvent.key"
                        },
                        "modifiers": {
                            "type": "array",
                            "items": {
                                "type": "string",
                                "enum": ["ctrl", "alt", "shift", "meta"]
                            }
                        }
                    },
                    "required": ["key"]
                })),
                MessageType::PressKey,
            ),
            host,
        }
    }
}

#[async_trait]
impl Tool for PressKeyTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: Value, ctx: ToolContext) -> Result<String, ToolError> {
        let params: PressKeyParams = parse_params(params)?;
        let message = Message::PressKey(KeyPayload {
            key: params.key,
            modifiers: params.modifiers,
        });
        relay_text(self.host.as_ref(), &ctx, message).await
    }
}

// ============================================================================
// Page Up / Page Down Tools
// ============================================================================

/// Scroll the page by one viewport.
pub struct PageScrollTool {
    definition: ToolDefinition,
    direction: ScrollDirection,
    host: Arc<dyn TabHost>,
}

impl PageScrollTool {
    pub fn up(host: Arc<dyn TabHost>) -> Self {
        Self::new(
            ToolDefinition::new(
                ToolName::PageUp.as_str(),
                "Page Up",
                "Scroll the page up by one screen.",
            ),
            ScrollDirection::Up,
            host,
        )
    }

    pub fn down(host: Arc<dyn TabHost>) -> Self {
        Self::new(
            ToolDefinition::new(
                ToolName::PageDown.as_str(),
                "Page Down",
                "Scroll the page down by one screen.",
            ),
            ScrollDirection::Down,
            host,
        )
    }

    fn new(definition: ToolDefinition, direction: ScrollDirection, host: Arc<dyn TabHost>) -> Self {
        Self {
            definition: relays(
                definition.with_parameters_schema(json!({
                    "type": "object",
                    "properties": {}
                })),
                MessageType::ScrollPage,
            ),
            direction,
            host,
        }
    }
}

#[async_trait]
impl Tool for PageScrollTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _params: Value, ctx: ToolContext) -> Result<String, ToolError> {
        let message = Message::ScrollPage(ScrollPagePayload {
            direction: self.direction,
        });
        relay_text(self.host.as_ref(), &ctx, message).await
    }
}

// ============================================================================
// Scroll At Position Tool
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ScrollAtPositionParams {
    pub x: f64,
    pub y: f64,
    #[serde(alias = "deltaY")]
    pub delta_y: f64,
}

/// Scroll whatever is scrollable under a point.
pub struct ScrollAtPositionTool {
    definition: ToolDefinition,
    host: Arc<dyn TabHost>,
}

impl ScrollAtPositionTool {
    pub fn new(host: Arc<dyn TabHost>) -> Self {
        Self {
            definition: relays(
                ToolDefinition::new(
                    ToolName::ScrollAtPosition.as_str(),
                    "Scroll At Position",
                    "Scroll the element under a point, like a mouse wheel. \
                     Positive delta_y scrolls down.",
                )
                .with_parameters_schema(json!({
                    "type": "object",
                    "properties": {
                        "x": { "type": "number" },
                        "y": { "type": "number" },
                        "delta_y": { "type": "number", "description": "Pixels to scroll" }
                    },
                    "required": ["x", "y", "delta_y"]
                })),
                MessageType::ScrollAtPosition,
            ),
            host,
        }
    }
}

#[async_trait]
impl Tool for ScrollAtPositionTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: Value, ctx: ToolContext) -> Result<String, ToolError> {
        let params: ScrollAtPositionParams = parse_params(params)?;
        let message = Message::ScrollAtPosition(ScrollAtPositionPayload {
            x: params.x,
            y: params.y,
            delta_y: params.delta_y,
        });
        relay_text(self.host.as_ref(), &ctx, message).await
    }
}
