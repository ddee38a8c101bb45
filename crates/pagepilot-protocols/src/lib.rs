//! # PagePilot Protocols
//!
//! Shared protocol definitions for the PagePilot workspace. Contains only
//! data shapes and traits, no browser or DOM access.
//!
//! ## Contents
//!
//! - [`Tool`] - Trait implemented by every orchestrator tool
//! - [`ToolOutcome`] - The `{data}` / `{error}` shape handed to the LLM loop
//! - [`Message`] - Typed message envelope sent to a page's content script
//! - [`ResponseEnvelope`] - The content script's reply
//! - [`Coordinate`], [`ClickType`], [`Modifier`] - Input vocabulary shared by both sides

pub mod error;
pub mod message;
pub mod tool;
pub mod types;

pub use error::{panic_message, ErrorClass, ToolError, TransportError, WireError};
pub use message::{
    ClickPayload, ClickType, Coordinate, KeyPayload, Message, MessageType, Modifier,
    ModifierState, ResponseEnvelope, ScreenshotPayload, ScrollAtPositionPayload,
    ScrollDirection, ScrollPagePayload, TypeTextPayload,
};
pub use tool::{Tool, ToolContext, ToolDefinition, ToolInvocation, ToolName, ToolOutcome};
pub use types::*;
