//! Tool outcome types.

use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::types::ContentBlock;

/// The only shape the LLM loop sees: `{"data": ..}` or `{"error": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolOutcome {
    Data { data: String },
    Error { error: String },
}

impl ToolOutcome {
    pub fn data(data: impl Into<String>) -> Self {
        ToolOutcome::Data { data: data.into() }
    }

    pub fn error(error: impl Into<String>) -> Self {
        ToolOutcome::Error {
            error: error.into(),
        }
    }

    /// Fold an execution result into an outcome.
    pub fn from_result(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(data) => Self::data(data),
            Err(e) => Self::error(e.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Error { .. })
    }

    /// The data or error string.
    pub fn text(&self) -> &str {
        match self {
            ToolOutcome::Data { data } => data,
            ToolOutcome::Error { error } => error,
        }
    }

    /// Project into a single text block.
    pub fn to_text_content(&self) -> Vec<ContentBlock> {
        vec![ContentBlock::text(self.text())]
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
