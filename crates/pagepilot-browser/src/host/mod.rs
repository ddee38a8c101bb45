//! The privileged tab API the tools run against.
//!
//! [`TabHost`] is what a browser extension's background context would get
//! from the tabs API: the active tab, capture, create, reload, close,
//! history, update events and a message relay into a tab's content script.
//! [`CdpTabHost`] drives a real Chrome; [`MemoryTabHost`] hosts in-memory
//! pages in-process.

mod cdp;
mod memory;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pagepilot_protocols::{Message, TabId, TabInfo, TabUpdate};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;

pub use cdp::CdpTabHost;
pub use memory::MemoryTabHost;

use crate::error::BrowserError;

/// Tab operations available to tools.
#[async_trait]
pub trait TabHost: Send + Sync + 'static {
    /// The focused tab, if any.
    async fn active_tab(&self) -> Result<Option<TabInfo>, BrowserError>;

    async fn tab(&self, id: &TabId) -> Result<TabInfo, BrowserError>;

    /// Capture the visible area of a tab as a PNG data URL.
    async fn capture_visible_tab(&self, id: &TabId) -> Result<String, BrowserError>;

    /// Browser zoom of the tab, `1.0` at 100%.
    async fn zoom_factor(&self, id: &TabId) -> Result<f64, BrowserError>;

    /// Open `url` in a new, active tab. Returns as soon as the tab exists;
    /// load progress is reported through [`TabHost::updates`].
    async fn create_tab(&self, url: &str) -> Result<TabInfo, BrowserError>;

    async fn reload(&self, id: &TabId) -> Result<(), BrowserError>;

    async fn close_tab(&self, id: &TabId) -> Result<(), BrowserError>;

    async fn go_back(&self, id: &TabId) -> Result<(), BrowserError>;

    async fn go_forward(&self, id: &TabId) -> Result<(), BrowserError>;

    /// Deliver a message to the tab's content script and return its raw
    /// reply.
    async fn send_message(&self, id: &TabId, message: &Message) -> Result<Value, BrowserError>;

    /// Tab load-status notifications.
    fn updates(&self) -> &UpdateListeners;
}

/// URL prefixes of pages that cannot be captured or scripted.
const RESTRICTED_PREFIXES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "chrome-search://",
    "chrome-untrusted://",
    "devtools://",
    "edge://",
    "about:",
    "view-source:",
    "https://chrome.google.com/webstore",
    "https://chromewebstore.google.com",
];

/// Whether `url` is an internal browser page where content scripts do not run.
pub fn is_restricted_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    lower.is_empty() || RESTRICTED_PREFIXES.iter().any(|p| lower.starts_with(p))
}

struct ListenerTable {
    next_id: AtomicU64,
    senders: Mutex<HashMap<u64, mpsc::UnboundedSender<TabUpdate>>>,
}

/// Registry of tab-update listeners.
///
/// Each [`UpdateSubscription`] unregisters itself when dropped, so a waiter
/// is removed exactly once however its wait ends.
#[derive(Clone)]
pub struct UpdateListeners {
    table: Arc<ListenerTable>,
}

impl UpdateListeners {
    pub fn new() -> Self {
        Self {
            table: Arc::new(ListenerTable {
                next_id: AtomicU64::new(1),
                senders: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register a listener. Updates emitted from now on are buffered until
    /// received.
    pub fn subscribe(&self) -> UpdateSubscription {
        let id = self.table.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        self.table.senders.lock().insert(id, tx);
        trace!(listener = id, "Tab update listener added");
        UpdateSubscription {
            id,
            rx,
            table: self.table.clone(),
        }
    }

    /// Deliver an update to every listener.
    pub fn emit(&self, update: TabUpdate) {
        let senders = self.table.senders.lock();
        trace!(tab = %update.tab_id, status = ?update.status, listeners = senders.len(), "Tab update");
        for tx in senders.values() {
            let _ = tx.send(update.clone());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.table.senders.lock().len()
    }
}

impl Default for UpdateListeners {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered listener. Dropping it unregisters it.
pub struct UpdateSubscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<TabUpdate>,
    table: Arc<ListenerTable>,
}

impl UpdateSubscription {
    pub async fn recv(&mut self) -> Option<TabUpdate> {
        self.rx.recv().await
    }
}

impl Drop for UpdateSubscription {
    fn drop(&mut self) {
        self.table.senders.lock().remove(&self.id);
        trace!(listener = self.id, "Tab update listener removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagepilot_protocols::TabStatus;

    fn update(tab: &str, status: TabStatus) -> TabUpdate {
        TabUpdate {
            tab_id: TabId::new(tab),
            status,
            url: None,
        }
    }

    #[test]
    fn test_restricted_urls() {
        assert!(is_restricted_url("chrome://settings"));
        assert!(is_restricted_url("CHROME://extensions/"));
        assert!(is_restricted_url("about:blank"));
        assert!(is_restricted_url("https://chromewebstore.google.com/detail/x"));
        assert!(is_restricted_url(""));
        assert!(!is_restricted_url("https://example.com/chrome://"));
        assert!(!is_restricted_url("http://localhost:3000"));
    }

    #[tokio::test]
    async fn test_subscription_receives_buffered_updates() {
        let listeners = UpdateListeners::new();
        let mut sub = listeners.subscribe();
        listeners.emit(update("t1", TabStatus::Loading));
        listeners.emit(update("t1", TabStatus::Complete));

        assert_eq!(sub.recv().await.unwrap().status, TabStatus::Loading);
        assert_eq!(sub.recv().await.unwrap().status, TabStatus::Complete);
    }

    #[test]
    fn test_drop_unregisters() {
        let listeners = UpdateListeners::new();
        let a = listeners.subscribe();
        let b = listeners.clone().subscribe();
        assert_eq!(listeners.listener_count(), 2);

        drop(a);
        assert_eq!(listeners.listener_count(), 1);
        drop(b);
        assert_eq!(listeners.listener_count(), 0);

        // Emitting with nobody listening is fine.
        listeners.emit(update("t1", TabStatus::Complete));
    }

    #[tokio::test]
    async fn test_updates_before_subscribe_are_not_seen() {
        let listeners = UpdateListeners::new();
        listeners.emit(update("early", TabStatus::Complete));
        let mut sub = listeners.subscribe();
        listeners.emit(update("late", TabStatus::Complete));
        assert_eq!(sub.recv().await.unwrap().tab_id, TabId::new("late"));
    }
}
