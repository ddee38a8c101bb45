//! In-process tab host over [`MemoryDocument`] pages.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pagepilot_config::ScreenshotFormat;
use pagepilot_page::{ContentScript, ContentScriptHandle, MemoryDocument, PageEvent, Timings};
use pagepilot_protocols::{Message, TabId, TabInfo, TabStatus, TabUpdate, TransportError};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use super::{is_restricted_url, TabHost, UpdateListeners};
use crate::error::BrowserError;

/// A 1x1 transparent PNG.
const BLANK_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

struct MemoryTab {
    document: Arc<MemoryDocument>,
    script: ContentScriptHandle,
    history: Vec<String>,
    position: usize,
}

impl MemoryTab {
    fn url(&self) -> &str {
        self.history.get(self.position).map(String::as_str).unwrap_or("")
    }
}

/// [`TabHost`] whose tabs are [`MemoryDocument`]s with real content scripts.
///
/// Every navigation replaces the tab's document and restarts its script.
/// Loads complete immediately unless auto-complete is switched off, in which
/// case [`MemoryTabHost::finish_loading`] reports completion.
pub struct MemoryTabHost {
    tabs: Mutex<BTreeMap<TabId, MemoryTab>>,
    next_id: AtomicU64,
    active: Mutex<Option<TabId>>,
    updates: UpdateListeners,
    timings: Timings,
    screenshot_format: ScreenshotFormat,
    capture: Mutex<String>,
    zoom: Mutex<f64>,
    auto_complete: AtomicBool,
    stub_replies: Mutex<HashMap<TabId, Value>>,
}

impl MemoryTabHost {
    pub fn new(timings: Timings, screenshot_format: ScreenshotFormat) -> Self {
        Self {
            tabs: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            active: Mutex::new(None),
            updates: UpdateListeners::new(),
            timings,
            screenshot_format,
            capture: Mutex::new(BLANK_PNG.to_string()),
            zoom: Mutex::new(1.0),
            auto_complete: AtomicBool::new(true),
            stub_replies: Mutex::new(HashMap::new()),
        }
    }

    /// Open a tab showing `url` without emitting updates and make it active.
    pub fn open_tab(&self, url: &str) -> (TabId, Arc<MemoryDocument>) {
        let id = TabId::new(format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        let (document, script) = self.fresh_page();
        self.tabs.lock().insert(
            id.clone(),
            MemoryTab {
                document: document.clone(),
                script,
                history: vec![url.to_string()],
                position: 0,
            },
        );
        *self.active.lock() = Some(id.clone());
        (id, document)
    }

    /// The document currently shown in a tab.
    pub fn document(&self, id: &TabId) -> Option<Arc<MemoryDocument>> {
        self.tabs.lock().get(id).map(|t| t.document.clone())
    }

    pub fn activate(&self, id: &TabId) {
        *self.active.lock() = Some(id.clone());
    }

    /// Set the data URL returned by captures.
    pub fn set_capture(&self, data_url: impl Into<String>) {
        *self.capture.lock() = data_url.into();
    }

    pub fn set_zoom(&self, zoom: f64) {
        *self.zoom.lock() = zoom;
    }

    /// Whether navigations report `complete` on their own.
    pub fn set_auto_complete(&self, enabled: bool) {
        self.auto_complete.store(enabled, Ordering::SeqCst);
    }

    /// Report a tab as loaded.
    pub fn finish_loading(&self, id: &TabId) {
        let url = self.tabs.lock().get(id).map(|t| t.url().to_string());
        self.updates.emit(TabUpdate {
            tab_id: id.clone(),
            status: TabStatus::Complete,
            url,
        });
    }

    /// Answer the next message to `id` with `reply` instead of running it.
    pub fn stub_reply(&self, id: &TabId, reply: Value) {
        self.stub_replies.lock().insert(id.clone(), reply);
    }

    /// Stop a tab's content script, as if it was never injected.
    pub fn stop_script(&self, id: &TabId) {
        if let Some(tab) = self.tabs.lock().get_mut(id) {
            let (handle, task) = ContentScriptHandle::spawn(ContentScript::new(
                tab.document.clone(),
                self.timings,
                self.screenshot_format,
            ));
            task.abort();
            tab.script = handle;
        }
    }

    fn fresh_page(&self) -> (Arc<MemoryDocument>, ContentScriptHandle) {
        let document = Arc::new(MemoryDocument::new());
        let (script, _task) = ContentScriptHandle::spawn(ContentScript::new(
            document.clone(),
            self.timings,
            self.screenshot_format,
        ));
        (document, script)
    }

    fn info(id: &TabId, tab: &MemoryTab) -> TabInfo {
        TabInfo {
            id: id.clone(),
            url: tab.url().to_string(),
            title: String::new(),
        }
    }

    /// Swap in a new page for `id`, moving its history with `step`.
    async fn load(
        &self,
        id: &TabId,
        step: impl FnOnce(&mut MemoryTab) -> bool,
    ) -> Result<bool, BrowserError> {
        let (document, script) = self.fresh_page();
        let previous = {
            let mut tabs = self.tabs.lock();
            let tab = tabs
                .get_mut(id)
                .ok_or_else(|| BrowserError::TabNotFound(id.to_string()))?;
            if !step(tab) {
                return Ok(false);
            }
            tab.document = document;
            std::mem::replace(&mut tab.script, script)
        };

        if previous.notify(PageEvent::PageHide).await.is_err() {
            debug!(tab = %id, "Previous content script already gone");
        }
        self.updates.emit(TabUpdate {
            tab_id: id.clone(),
            status: TabStatus::Loading,
            url: None,
        });
        if self.auto_complete.load(Ordering::SeqCst) {
            self.finish_loading(id);
        }
        Ok(true)
    }
}

impl Default for MemoryTabHost {
    fn default() -> Self {
        Self::new(Timings::immediate(), ScreenshotFormat::Png)
    }
}

#[async_trait]
impl TabHost for MemoryTabHost {
    async fn active_tab(&self) -> Result<Option<TabInfo>, BrowserError> {
        let active = self.active.lock().clone();
        let tabs = self.tabs.lock();
        Ok(active
            .and_then(|id| tabs.get(&id).map(|t| Self::info(&id, t))))
    }

    async fn tab(&self, id: &TabId) -> Result<TabInfo, BrowserError> {
        self.tabs
            .lock()
            .get(id)
            .map(|t| Self::info(id, t))
            .ok_or_else(|| BrowserError::TabNotFound(id.to_string()))
    }

    async fn capture_visible_tab(&self, id: &TabId) -> Result<String, BrowserError> {
        self.tab(id).await?;
        Ok(self.capture.lock().clone())
    }

    async fn zoom_factor(&self, id: &TabId) -> Result<f64, BrowserError> {
        self.tab(id).await?;
        Ok(*self.zoom.lock())
    }

    async fn create_tab(&self, url: &str) -> Result<TabInfo, BrowserError> {
        let (id, _) = self.open_tab("about:blank");
        let target = url.to_string();
        self.load(&id, move |tab| {
            tab.history = vec![target];
            tab.position = 0;
            true
        })
        .await?;
        self.tab(&id).await
    }

    async fn reload(&self, id: &TabId) -> Result<(), BrowserError> {
        self.load(id, |_| true).await?;
        Ok(())
    }

    async fn close_tab(&self, id: &TabId) -> Result<(), BrowserError> {
        self.tabs
            .lock()
            .remove(id)
            .ok_or_else(|| BrowserError::TabNotFound(id.to_string()))?;
        let mut active = self.active.lock();
        if active.as_ref() == Some(id) {
            *active = None;
        }
        Ok(())
    }

    async fn go_back(&self, id: &TabId) -> Result<(), BrowserError> {
        let moved = self
            .load(id, |tab| {
                if tab.position == 0 {
                    return false;
                }
                tab.position -= 1;
                true
            })
            .await?;
        if !moved {
            return Err(BrowserError::NoHistoryEntry("previous"));
        }
        Ok(())
    }

    async fn go_forward(&self, id: &TabId) -> Result<(), BrowserError> {
        let moved = self
            .load(id, |tab| {
                if tab.position + 1 >= tab.history.len() {
                    return false;
                }
                tab.position += 1;
                true
            })
            .await?;
        if !moved {
            return Err(BrowserError::NoHistoryEntry("next"));
        }
        Ok(())
    }

    async fn send_message(&self, id: &TabId, message: &Message) -> Result<Value, BrowserError> {
        let (url, script) = {
            let tabs = self.tabs.lock();
            let tab = tabs
                .get(id)
                .ok_or_else(|| BrowserError::TabNotFound(id.to_string()))?;
            (tab.url().to_string(), tab.script.clone())
        };
        if is_restricted_url(&url) {
            return Err(TransportError::ReceivingEndMissing.into());
        }
        if let Some(reply) = self.stub_replies.lock().remove(id) {
            return Ok(reply);
        }

        let response = script.send(message.to_wire()).await?;
        serde_json::to_value(response)
            .map_err(|e| BrowserError::Transport(TransportError::Other(e.to_string())))
    }

    fn updates(&self) -> &UpdateListeners {
        &self.updates
    }
}
