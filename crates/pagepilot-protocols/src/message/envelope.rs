//! Message envelopes sent from the orchestrator to a page's content script.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::input::{ClickType, Coordinate, ScrollDirection};
use crate::error::WireError;

/// Discriminant of a [`Message`], as it appears in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    SimulateClick,
    ScrollPage,
    TypeText,
    PressKey,
    GetDevicePixelRatio,
    ProcessScreenshot,
    ScrollAtPosition,
}

impl MessageType {
    pub const ALL: [MessageType; 7] = [
        MessageType::SimulateClick,
        MessageType::ScrollPage,
        MessageType::TypeText,
        MessageType::PressKey,
        MessageType::GetDevicePixelRatio,
        MessageType::ProcessScreenshot,
        MessageType::ScrollAtPosition,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::SimulateClick => "SIMULATE_CLICK",
            MessageType::ScrollPage => "SCROLL_PAGE",
            MessageType::TypeText => "TYPE_TEXT",
            MessageType::PressKey => "PRESS_KEY",
            MessageType::GetDevicePixelRatio => "GET_DEVICE_PIXEL_RATIO",
            MessageType::ProcessScreenshot => "PROCESS_SCREENSHOT",
            MessageType::ScrollAtPosition => "SCROLL_AT_POSITION",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == raw)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickPayload {
    pub coordinates: Coordinate,
    #[serde(default)]
    pub click_type: ClickType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollPagePayload {
    pub direction: ScrollDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeTextPayload {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPayload {
    pub key: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotPayload {
    pub data_url: String,
    pub zoom_factor: f64,
    pub device_pixel_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollAtPositionPayload {
    pub x: f64,
    pub y: f64,
    pub delta_y: f64,
}

/// A typed request for the content script.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    SimulateClick(ClickPayload),
    ScrollPage(ScrollPagePayload),
    TypeText(TypeTextPayload),
    PressKey(KeyPayload),
    GetDevicePixelRatio,
    ProcessScreenshot(ScreenshotPayload),
    ScrollAtPosition(ScrollAtPositionPayload),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::SimulateClick(_) => MessageType::SimulateClick,
            Message::ScrollPage(_) => MessageType::ScrollPage,
            Message::TypeText(_) => MessageType::TypeText,
            Message::PressKey(_) => MessageType::PressKey,
            Message::GetDevicePixelRatio => MessageType::GetDevicePixelRatio,
            Message::ProcessScreenshot(_) => MessageType::ProcessScreenshot,
            Message::ScrollAtPosition(_) => MessageType::ScrollAtPosition,
        }
    }

    /// Encode as `{type, payload?}`.
    pub fn to_wire(&self) -> Value {
        let payload = match self {
            Message::SimulateClick(p) => serde_json::to_value(p),
            Message::ScrollPage(p) => serde_json::to_value(p),
            Message::TypeText(p) => serde_json::to_value(p),
            Message::PressKey(p) => serde_json::to_value(p),
            Message::GetDevicePixelRatio => Ok(Value::Null),
            Message::ProcessScreenshot(p) => serde_json::to_value(p),
            Message::ScrollAtPosition(p) => serde_json::to_value(p),
        }
        // Payload structs hold only strings, numbers and enums.
        .unwrap_or(Value::Null);

        let mut envelope = json!({ "type": self.message_type().as_str() });
        if !payload.is_null() {
            envelope["payload"] = payload;
        }
        envelope
    }

    /// Decode a raw envelope. The tag is checked before the payload so an
    /// unknown tag is always reported as such.
    pub fn from_wire(value: &Value) -> Result<Self, WireError> {
        let raw_type = match value.get("type") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "undefined".to_string(),
        };
        let message_type =
            MessageType::parse(&raw_type).ok_or_else(|| WireError::UnknownType(raw_type))?;
        let payload = value.get("payload").cloned().unwrap_or(Value::Null);

        Ok(match message_type {
            MessageType::SimulateClick => Message::SimulateClick(decode(message_type, payload)?),
            MessageType::ScrollPage => Message::ScrollPage(decode(message_type, payload)?),
            MessageType::TypeText => Message::TypeText(decode(message_type, payload)?),
            MessageType::PressKey => Message::PressKey(decode(message_type, payload)?),
            MessageType::GetDevicePixelRatio => Message::GetDevicePixelRatio,
            MessageType::ProcessScreenshot => {
                Message::ProcessScreenshot(decode(message_type, payload)?)
            }
            MessageType::ScrollAtPosition => {
                Message::ScrollAtPosition(decode(message_type, payload)?)
            }
        })
    }
}

fn decode<T: DeserializeOwned>(message_type: MessageType, payload: Value) -> Result<T, WireError> {
    let invalid = |reason: String| WireError::InvalidPayload {
        message_type: message_type.as_str().to_string(),
        reason,
    };
    if payload.is_null() {
        return Err(invalid("missing payload".to_string()));
    }
    serde_json::from_value(payload).map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
