//! Browser tab types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque tab identifier assigned by the tab host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TabId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TabId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    #[serde(default)]
    pub title: String,
}

/// Load status reported with a tab update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabUpdate {
    pub tab_id: TabId,
    pub status: TabStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl TabUpdate {
    pub fn is_complete_for(&self, tab: &TabId) -> bool {
        &self.tab_id == tab && self.status == TabStatus::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_id_is_transparent() {
        let json = serde_json::to_value(TabId::new("A1B2")).unwrap();
        assert_eq!(json, serde_json::json!("A1B2"));
        assert_eq!(TabId::from("A1B2").to_string(), "A1B2");
    }

    #[test]
    fn test_is_complete_for() {
        let tab = TabId::new("t1");
        let update = TabUpdate {
            tab_id: tab.clone(),
            status: TabStatus::Complete,
            url: None,
        };
        assert!(update.is_complete_for(&tab));
        assert!(!update.is_complete_for(&TabId::new("t2")));

        let loading = TabUpdate {
            status: TabStatus::Loading,
            ..update
        };
        assert!(!loading.is_complete_for(&tab));
    }
}
