//! Tool execution context.

use crate::types::TabId;

/// Context for a single tool invocation.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Session the invocation belongs to.
    pub session_id: String,

    /// Correlation ID for tracing.
    pub correlation_id: String,

    /// Tab pinned by the caller. `None` targets the active tab.
    pub target_tab: Option<TabId>,
}

impl ToolContext {
    /// Create a new tool context targeting the active tab.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            correlation_id: uuid::Uuid::new_v4().to_string(),
            target_tab: None,
        }
    }

    /// Pin the invocation to a specific tab.
    pub fn with_tab(mut self, tab: TabId) -> Self {
        self.target_tab = Some(tab);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_targets_active_tab() {
        let ctx = ToolContext::new("session-1");
        assert_eq!(ctx.session_id, "session-1");
        assert!(ctx.target_tab.is_none());
        assert!(uuid::Uuid::parse_str(&ctx.correlation_id).is_ok());
    }

    #[test]
    fn test_correlation_ids_differ() {
        let a = ToolContext::new("s");
        let b = ToolContext::new("s");
        assert_ne!(a.correlation_id, b.correlation_id);
    }

    #[test]
    fn test_with_tab() {
        let ctx = ToolContext::new("s").with_tab(TabId::new("T1"));
        assert_eq!(ctx.target_tab, Some(TabId::new("T1")));
    }
}
