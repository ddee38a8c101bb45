//! Tool identifiers and invocations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// The tools the orchestrator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    TakeScreenshot,
    Click,
    Navigate,
    PageUp,
    PageDown,
    ScrollAtPosition,
    TypeText,
    PressKey,
    Refresh,
    CloseTab,
    GoBack,
    GoForward,
}

impl ToolName {
    pub const ALL: [ToolName; 12] = [
        ToolName::TakeScreenshot,
        ToolName::Click,
        ToolName::Navigate,
        ToolName::PageUp,
        ToolName::PageDown,
        ToolName::ScrollAtPosition,
        ToolName::TypeText,
        ToolName::PressKey,
        ToolName::Refresh,
        ToolName::CloseTab,
        ToolName::GoBack,
        ToolName::GoForward,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::TakeScreenshot => "take_screenshot",
            ToolName::Click => "click",
            ToolName::Navigate => "navigate",
            ToolName::PageUp => "page_up",
            ToolName::PageDown => "page_down",
            ToolName::ScrollAtPosition => "scroll_at_position",
            ToolName::TypeText => "type_text",
            ToolName::PressKey => "press_key",
            ToolName::Refresh => "refresh",
            ToolName::CloseTab => "close_tab",
            ToolName::GoBack => "go_back",
            ToolName::GoForward => "go_forward",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ToolError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == raw)
            .ok_or_else(|| ToolError::NotFound(raw.to_string()))
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request from the LLM loop.
///
/// `name` stays a string so an unknown tool is reported as an outcome rather
/// than failing to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default = "empty_arguments")]
    pub arguments: serde_json::Value,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    pub fn tool_name(&self) -> Result<ToolName, ToolError> {
        ToolName::parse(&self.name)
    }
}

fn empty_arguments() -> serde_json::Value {
    serde_json::json!({})
}
