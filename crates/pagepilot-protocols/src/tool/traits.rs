//! Tool trait definition.

use async_trait::async_trait;

use super::{ToolContext, ToolDefinition, ToolOutcome};
use crate::error::ToolError;
use crate::types::ContentBlock;

/// Core trait for tools.
///
/// `execute` returns the `data` string on success. The dispatcher folds both
/// arms into a [`ToolOutcome`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool definition.
    fn definition(&self) -> &ToolDefinition;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: ToolContext,
    ) -> Result<String, ToolError>;

    /// Validate the arguments before execution.
    fn validate(&self, params: &serde_json::Value) -> Result<(), ToolError> {
        let definition = self.definition();
        if definition.parameters_schema.get("type") == Some(&serde_json::json!("object"))
            && !params.is_object()
        {
            return Err(ToolError::InvalidParameters(
                "Parameters must be an object".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the tool acts on an existing tab. The dispatcher resolves and
    /// locks the target tab only for these.
    fn targets_tab(&self) -> bool {
        true
    }

    /// Project an outcome into content blocks for the LLM.
    fn to_result_content(&self, outcome: &ToolOutcome) -> Vec<ContentBlock> {
        outcome.to_text_content()
    }
}
