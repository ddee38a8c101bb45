//! Navigation tools: navigate, refresh, close tab, back, forward.
//!
//! These act on the tab itself through the host, not on the page.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pagepilot_protocols::{Tool, ToolContext, ToolDefinition, ToolError, ToolName};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{parse_params, resolve_tab};
use crate::host::TabHost;

fn no_params_schema() -> Value {
    json!({
        "type": "object",
        "properties": {}
    })
}

// ============================================================================
// Navigate Tool
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct NavigateParams {
    pub url: String,
}

impl NavigateParams {
    /// Only web pages can be opened.
    pub fn validated_url(&self) -> Result<url::Url, ToolError> {
        let parsed = url::Url::parse(self.url.trim())
            .map_err(|e| ToolError::InvalidParameters(format!("Invalid URL {:?}: {}", self.url, e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            scheme => Err(ToolError::InvalidParameters(format!(
                "Only http and https URLs can be opened, got {}:",
                scheme
            ))),
        }
    }
}

/// Open a URL in a new tab and wait for it to load.
///
/// Waiting never fails: when the load does not finish in time the tool still
/// reports success, saying so.
pub struct NavigateTool {
    definition: ToolDefinition,
    host: Arc<dyn TabHost>,
    timeout: Duration,
}

impl NavigateTool {
    pub fn new(host: Arc<dyn TabHost>, timeout: Duration) -> Self {
        Self {
            definition: ToolDefinition::new(
                ToolName::Navigate.as_str(),
                "Navigate",
                "Open a URL in a new tab and wait for it to load.",
            )
            .with_parameters_schema(json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "Absolute http or https URL"
                    }
                },
                "required": ["url"]
            })),
            host,
            timeout,
        }
    }
}

#[async_trait]
impl Tool for NavigateTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    fn targets_tab(&self) -> bool {
        false
    }

    async fn execute(&self, params: Value, _ctx: ToolContext) -> Result<String, ToolError> {
        let params: NavigateParams = parse_params(params)?;
        let url = params.validated_url()?;

        // Subscribe first so a fast load is not missed.
        let mut updates = self.host.updates().subscribe();
        let tab = self.host.create_tab(url.as_str()).await?;
        info!(tab = %tab.id, url = %url, "Opened tab, waiting for load");

        let loaded = tokio::time::timeout(self.timeout, async {
            while let Some(update) = updates.recv().await {
                if update.is_complete_for(&tab.id) {
                    return Some(update.url.unwrap_or_else(|| url.to_string()));
                }
            }
            None
        })
        .await;
        drop(updates);

        match loaded {
            Ok(Some(final_url)) => {
                debug!(tab = %tab.id, url = %final_url, "Tab loaded");
                Ok(format!("Navigated to {}", final_url))
            }
            Ok(None) | Err(_) => {
                warn!(tab = %tab.id, url = %url, timeout_ms = self.timeout.as_millis() as u64, "Load did not complete in time");
                Ok(format!(
                    "Opened {} but it did not finish loading within {} seconds",
                    url,
                    self.timeout.as_secs_f64()
                ))
            }
        }
    }
}

// ============================================================================
// Refresh / Close / Back / Forward Tools
// ============================================================================

/// Reload the current tab.
pub struct RefreshTool {
    definition: ToolDefinition,
    host: Arc<dyn TabHost>,
}

impl RefreshTool {
    pub fn new(host: Arc<dyn TabHost>) -> Self {
        Self {
            definition: ToolDefinition::new(
                ToolName::Refresh.as_str(),
                "Refresh",
                "Reload the current tab.",
            )
            .with_parameters_schema(no_params_schema()),
            host,
        }
    }
}

#[async_trait]
impl Tool for RefreshTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _params: Value, ctx: ToolContext) -> Result<String, ToolError> {
        let tab = resolve_tab(self.host.as_ref(), &ctx).await?;
        self.host.reload(&tab.id).await?;
        Ok("Page refreshed successfully".to_string())
    }
}

/// Close the current tab.
pub struct CloseTabTool {
    definition: ToolDefinition,
    host: Arc<dyn TabHost>,
}

impl CloseTabTool {
    pub fn new(host: Arc<dyn TabHost>) -> Self {
        Self {
            definition: ToolDefinition::new(
                ToolName::CloseTab.as_str(),
                "Close Tab",
                "Close the current tab.",
            )
            .with_parameters_schema(no_params_schema()),
            host,
        }
    }
}

#[async_trait]
impl Tool for CloseTabTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _params: Value, ctx: ToolContext) -> Result<String, ToolError> {
        let tab = resolve_tab(self.host.as_ref(), &ctx).await?;
        self.host.close_tab(&tab.id).await?;
        Ok("Tab closed".to_string())
    }
}

/// Go back in the current tab's history.
pub struct BackTool {
    definition: ToolDefinition,
    host: Arc<dyn TabHost>,
}

impl BackTool {
    pub fn new(host: Arc<dyn TabHost>) -> Self {
        Self {
            definition: ToolDefinition::new(
                ToolName::GoBack.as_str(),
                "Go Back",
                "Go back to the previous page in the current tab.",
            )
            .with_parameters_schema(no_params_schema()),
            host,
        }
    }
}

#[async_trait]
impl Tool for BackTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _params: Value, ctx: ToolContext) -> Result<String, ToolError> {
        let tab = resolve_tab(self.host.as_ref(), &ctx).await?;
        self.host.go_back(&tab.id).await?;
        Ok("Navigated back".to_string())
    }
}

/// Go forward in the current tab's history.
pub struct ForwardTool {
    definition: ToolDefinition,
    host: Arc<dyn TabHost>,
}

impl ForwardTool {
    pub fn new(host: Arc<dyn TabHost>) -> Self {
        Self {
            definition: ToolDefinition::new(
                ToolName::GoForward.as_str(),
                "Go Forward",
                "Go forward to the next page in the current tab.",
            )
            .with_parameters_schema(no_params_schema()),
            host,
        }
    }
}

#[async_trait]
impl Tool for ForwardTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _params: Value, ctx: ToolContext) -> Result<String, ToolError> {
        let tab = resolve_tab(self.host.as_ref(), &ctx).await?;
        self.host.go_forward(&tab.id).await?;
        Ok("Navigated forward".to_string())
    }
}
