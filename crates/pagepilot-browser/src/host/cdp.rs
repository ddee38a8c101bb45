//! Tab host backed by a Chrome DevTools connection.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use pagepilot_config::ScreenshotFormat;
use pagepilot_page::{ContentScript, ContentScriptHandle, PageEvent, Timings};
use pagepilot_protocols::{Message, TabId, TabInfo, TabStatus, TabUpdate, TransportError};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{is_restricted_url, TabHost, UpdateListeners};
use crate::cdp::{CaptureFormat, CdpClient, CdpEvent, PageSession, TargetInfo};
use crate::cdp_dom::CdpDom;
use crate::error::BrowserError;

/// An attached tab: its CDP session, its content script and the task that
/// follows its navigation events.
struct AttachedTab {
    session: Arc<PageSession>,
    script: ContentScriptHandle,
    url: Arc<RwLock<String>>,
    pump: JoinHandle<()>,
}

impl Drop for AttachedTab {
    fn drop(&mut self) {
        self.pump.abort();
        self.session.detach();
    }
}

/// [`TabHost`] over CDP.
///
/// Tabs are attached lazily on first use. Each attached tab runs a Rust
/// content script whose `Dom` is the page itself, reached through
/// `Runtime.callFunctionOn`.
pub struct CdpTabHost {
    client: Arc<CdpClient>,
    tabs: DashMap<TabId, Arc<AttachedTab>>,
    attach_lock: tokio::sync::Mutex<()>,
    active: RwLock<Option<TabId>>,
    updates: UpdateListeners,
    timings: Timings,
    screenshot_format: ScreenshotFormat,
}

impl CdpTabHost {
    pub fn new(client: Arc<CdpClient>, timings: Timings, screenshot_format: ScreenshotFormat) -> Self {
        Self {
            client,
            tabs: DashMap::new(),
            attach_lock: tokio::sync::Mutex::new(()),
            active: RwLock::new(None),
            updates: UpdateListeners::new(),
            timings,
            screenshot_format,
        }
    }

    pub fn client(&self) -> &Arc<CdpClient> {
        &self.client
    }

    /// Look up a page target. A tab that is gone is forgotten here, since
    /// tabs closed from the browser never pass through `close_tab`.
    async fn target(&self, id: &TabId) -> Result<TargetInfo, BrowserError> {
        let found = self
            .client
            .page_targets()
            .await?
            .into_iter()
            .find(|t| t.target_id == id.as_str());
        found.ok_or_else(|| {
            self.forget(id);
            BrowserError::TabNotFound(id.to_string())
        })
    }

    /// Number of tabs with an attached content script.
    pub fn attached_count(&self) -> usize {
        self.tabs.len()
    }

    async fn attached(&self, id: &TabId) -> Result<Arc<AttachedTab>, BrowserError> {
        if let Some(tab) = self.tabs.get(id) {
            return Ok(tab.clone());
        }

        let _guard = self.attach_lock.lock().await;
        if let Some(tab) = self.tabs.get(id) {
            return Ok(tab.clone());
        }
        let target = self.target(id).await?;
        let tab = self.attach(&target).await?;
        self.tabs.insert(id.clone(), tab.clone());
        Ok(tab)
    }

    async fn attach(&self, target: &TargetInfo) -> Result<Arc<AttachedTab>, BrowserError> {
        let session = Arc::new(self.client.attach(&target.target_id).await?);
        let events = session
            .take_events()
            .ok_or_else(|| BrowserError::LaunchFailed("session events already taken".into()))?;

        let dom = Arc::new(CdpDom::new(session.clone()));
        let (script, _task) = ContentScriptHandle::spawn(ContentScript::new(
            dom,
            self.timings,
            self.screenshot_format,
        ));

        let url = Arc::new(RwLock::new(target.url.clone()));
        let pump = tokio::spawn(follow_navigation(
            TabId::new(target.target_id.clone()),
            events,
            script.clone(),
            url.clone(),
            self.updates.clone(),
        ));

        info!(tab = %target.target_id, url = %target.url, "Attached to tab");
        Ok(Arc::new(AttachedTab {
            session,
            script,
            url,
            pump,
        }))
    }

    fn forget(&self, id: &TabId) {
        if self.tabs.remove(id).is_some() {
            debug!(tab = %id, "Detached from closed tab");
        }
        let mut active = self.active.write();
        if active.as_ref() == Some(id) {
            *active = None;
        }
    }
}

/// Turn a tab's `Page` events into tab updates and content-script lifecycle
/// notifications.
async fn follow_navigation(
    tab_id: TabId,
    mut events: mpsc::UnboundedReceiver<CdpEvent>,
    script: ContentScriptHandle,
    url: Arc<RwLock<String>>,
    updates: UpdateListeners,
) {
    while let Some(event) = events.recv().await {
        let main_frame = event.frame_id() == Some(tab_id.as_str());
        match event.method.as_str() {
            "Page.frameStartedLoading" if main_frame => {
                if script.notify(PageEvent::PageHide).await.is_err() {
                    debug!(tab = %tab_id, "Content script already stopped");
                }
                updates.emit(TabUpdate {
                    tab_id: tab_id.clone(),
                    status: TabStatus::Loading,
                    url: None,
                });
            }
            "Page.frameNavigated" if main_frame => {
                if let Some(new_url) = event.params["frame"]["url"].as_str() {
                    *url.write() = new_url.to_string();
                }
            }
            "Page.loadEventFired" => {
                let current = url.read().clone();
                debug!(tab = %tab_id, url = %current, "Tab finished loading");
                updates.emit(TabUpdate {
                    tab_id: tab_id.clone(),
                    status: TabStatus::Complete,
                    url: Some(current),
                });
            }
            _ => {}
        }
    }
    debug!(tab = %tab_id, "Tab event stream ended");
}

fn tab_info(target: TargetInfo) -> TabInfo {
    TabInfo {
        id: TabId::new(target.target_id),
        url: target.url,
        title: target.title,
    }
}

#[async_trait]
impl TabHost for CdpTabHost {
    async fn active_tab(&self) -> Result<Option<TabInfo>, BrowserError> {
        let pages = self.client.page_targets().await?;
        self.tabs
            .retain(|id, _| pages.iter().any(|t| t.target_id == id.as_str()));
        let current = self.active.read().clone();
        let chosen = current
            .and_then(|id| pages.iter().position(|t| t.target_id == id.as_str()))
            .or(if pages.is_empty() { None } else { Some(0) });

        let Some(index) = chosen else {
            *self.active.write() = None;
            return Ok(None);
        };
        let info = tab_info(pages[index].clone());
        *self.active.write() = Some(info.id.clone());
        Ok(Some(info))
    }

    async fn tab(&self, id: &TabId) -> Result<TabInfo, BrowserError> {
        Ok(tab_info(self.target(id).await?))
    }

    async fn capture_visible_tab(&self, id: &TabId) -> Result<String, BrowserError> {
        let tab = self.attached(id).await?;
        tab.session.bring_to_front().await?;
        let format = CaptureFormat::Png;
        let data = tab.session.capture_screenshot(format).await?;
        Ok(format!("data:{};base64,{}", format.mime_type(), data))
    }

    async fn zoom_factor(&self, _id: &TabId) -> Result<f64, BrowserError> {
        // Page zoom is already folded into devicePixelRatio under CDP.
        Ok(1.0)
    }

    async fn create_tab(&self, url: &str) -> Result<TabInfo, BrowserError> {
        // Attach to a blank tab first so the load events of `url` are seen.
        let target_id = self.client.create_target("about:blank").await?;
        let id = TabId::new(target_id.clone());
        let tab = self.attached(&id).await?;
        *self.active.write() = Some(id.clone());

        tab.session.navigate(url).await?;
        *tab.url.write() = url.to_string();
        info!(tab = %id, %url, "Opened tab");
        Ok(TabInfo {
            id,
            url: url.to_string(),
            title: String::new(),
        })
    }

    async fn reload(&self, id: &TabId) -> Result<(), BrowserError> {
        self.attached(id).await?.session.reload().await?;
        Ok(())
    }

    async fn close_tab(&self, id: &TabId) -> Result<(), BrowserError> {
        self.target(id).await?;
        self.client.close_target(id.as_str()).await?;
        self.forget(id);
        info!(tab = %id, "Closed tab");
        Ok(())
    }

    async fn go_back(&self, id: &TabId) -> Result<(), BrowserError> {
        if !self.attached(id).await?.session.go_back().await? {
            return Err(BrowserError::NoHistoryEntry("previous"));
        }
        Ok(())
    }

    async fn go_forward(&self, id: &TabId) -> Result<(), BrowserError> {
        if !self.attached(id).await?.session.go_forward().await? {
            return Err(BrowserError::NoHistoryEntry("next"));
        }
        Ok(())
    }

    async fn send_message(&self, id: &TabId, message: &Message) -> Result<Value, BrowserError> {
        let tab = self.attached(id).await?;
        let url = tab.url.read().clone();
        if is_restricted_url(&url) {
            warn!(tab = %id, %url, "No content script on restricted page");
            return Err(TransportError::ReceivingEndMissing.into());
        }

        let response = tab.script.send(message.to_wire()).await?;
        serde_json::to_value(response)
            .map_err(|e| BrowserError::Transport(TransportError::Other(e.to_string())))
    }

    fn updates(&self) -> &UpdateListeners {
        &self.updates
    }
}
