//! Tool registry.

use std::sync::Arc;

use dashmap::DashMap;
use pagepilot_protocols::{Tool, ToolDefinition};

use crate::error::BrowserError;

/// Tools by id.
pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
        }
    }

    /// Register a tool. Ids are unique.
    pub fn register(&self, tool: Arc<dyn Tool>) -> Result<(), BrowserError> {
        let id = tool.definition().id.clone();
        if self.tools.contains_key(&id) {
            return Err(BrowserError::AlreadyRegistered(id));
        }
        self.tools.insert(id, tool);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(id).map(|tool| tool.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tools.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Every definition, ordered by id.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<_> = self
            .tools
            .iter()
            .map(|entry| entry.value().definition().clone())
            .collect();
        definitions.sort_by(|a, b| a.id.cmp(&b.id));
        definitions
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryTabHost, TabHost};
    use crate::tools::{ClickTool, RefreshTool};

    fn host() -> Arc<dyn TabHost> {
        Arc::new(MemoryTabHost::default())
    }

    #[test]
    fn test_register_and_get() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(ClickTool::new(host()))).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("click"));
        assert_eq!(registry.get("click").unwrap().definition().name, "Click");
        assert!(registry.get("teleport").is_none());
    }

    #[test]
    fn test_register_duplicate() {
        let registry = ToolRegistry::default();
        registry.register(Arc::new(ClickTool::new(host()))).unwrap();
        let err = registry
            .register(Arc::new(ClickTool::new(host())))
            .unwrap_err();
        assert!(matches!(err, BrowserError::AlreadyRegistered(ref id) if id == "click"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_definitions_sorted() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(RefreshTool::new(host()))).unwrap();
        registry.register(Arc::new(ClickTool::new(host()))).unwrap();
        let ids: Vec<_> = registry.definitions().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["click", "refresh"]);
    }
}
