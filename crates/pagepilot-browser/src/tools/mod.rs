//! The tool catalog.
//!
//! Every tool runs against a [`TabHost`]. Page actions are relayed to the
//! tab's content script as a [`Message`]; tab-level actions call the host
//! directly.

mod interaction;
mod navigation;
mod screenshot;

use std::sync::Arc;
use std::time::Duration;

use pagepilot_protocols::message::result_text;
use pagepilot_protocols::{
    Message, MessageType, ResponseEnvelope, TabId, TabInfo, Tool, ToolContext, ToolDefinition,
    ToolError,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

pub use interaction::*;
pub use navigation::*;
pub use screenshot::*;

use crate::host::TabHost;

/// How long `navigate` waits for the new tab to finish loading.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Build every tool in the catalog.
pub fn default_tools(host: Arc<dyn TabHost>, navigation_timeout: Duration) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ScreenshotTool::new(host.clone())),
        Arc::new(ClickTool::new(host.clone())),
        Arc::new(NavigateTool::new(host.clone(), navigation_timeout)),
        Arc::new(PageScrollTool::up(host.clone())),
        Arc::new(PageScrollTool::down(host.clone())),
        Arc::new(ScrollAtPositionTool::new(host.clone())),
        Arc::new(TypeTextTool::new(host.clone())),
        Arc::new(PressKeyTool::new(host.clone())),
        Arc::new(RefreshTool::new(host.clone())),
        Arc::new(CloseTabTool::new(host.clone())),
        Arc::new(BackTool::new(host.clone())),
        Arc::new(ForwardTool::new(host)),
    ]
}

/// Definition metadata key naming the content-script message a tool relays.
pub const RELAYED_MESSAGE_KEY: &str = "message_type";

/// Mark a definition as relayed to the content script as `message_type`.
pub(crate) fn relays(definition: ToolDefinition, message_type: MessageType) -> ToolDefinition {
    definition.with_metadata(RELAYED_MESSAGE_KEY, Value::from(message_type.as_str()))
}

pub(crate) fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, ToolError> {
    serde_json::from_value(params).map_err(|e| ToolError::InvalidParameters(e.to_string()))
}

/// The tab a call acts on: the one pinned in the context, else the active tab.
pub(crate) async fn resolve_tab(
    host: &dyn TabHost,
    ctx: &ToolContext,
) -> Result<TabInfo, ToolError> {
    match &ctx.target_tab {
        Some(id) => Ok(host.tab(id).await?),
        None => host.active_tab().await?.ok_or(ToolError::NoActiveTab),
    }
}

/// Send `message` to the tab's content script and unwrap its reply.
pub(crate) async fn relay(
    host: &dyn TabHost,
    tab: &TabId,
    message: Message,
) -> Result<Value, ToolError> {
    let message_type = message.message_type();
    debug!(tab = %tab, message_type = message_type.as_str(), "Relaying to content script");
    let raw = host.send_message(tab, &message).await?;
    ResponseEnvelope::from_wire(raw)
        .into_result()
        .map_err(ToolError::PageAction)
}

/// [`relay`], rendering the result as text.
pub(crate) async fn relay_text(
    host: &dyn TabHost,
    ctx: &ToolContext,
    message: Message,
) -> Result<String, ToolError> {
    let tab = resolve_tab(host, ctx).await?;
    let result = relay(host, &tab.id, message).await?;
    Ok(result_text(&result))
}
