//! Per-page content-script task.
//!
//! Each page gets one task that owns its [`ContentScript`]. Messages arrive
//! over an mpsc channel and are handled strictly one at a time; each reply
//! goes back over its own oneshot channel. Lifecycle events tear down the
//! indicators without stopping the task. Dropping every handle closes the
//! channel, which cleans up and ends the task.

use pagepilot_protocols::{ResponseEnvelope, TransportError};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::dom::Dom;
use crate::router::ContentScript;

const INBOX_CAPACITY: usize = 32;

/// Page lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    PageHide,
    BeforeUnload,
}

enum Inbound {
    Message {
        raw: Value,
        reply: oneshot::Sender<ResponseEnvelope>,
    },
    Lifecycle(PageEvent),
}

/// Sending side of a running content script.
#[derive(Debug, Clone)]
pub struct ContentScriptHandle {
    tx: mpsc::Sender<Inbound>,
}

impl ContentScriptHandle {
    /// Start the task for `script`.
    pub fn spawn<D: Dom>(script: ContentScript<D>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        let task = tokio::spawn(run(script, rx));
        (Self { tx }, task)
    }

    /// Send a raw message and wait for the reply.
    pub async fn send(&self, raw: Value) -> Result<ResponseEnvelope, TransportError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Inbound::Message { raw, reply })
            .await
            .map_err(|_| TransportError::ReceivingEndMissing)?;
        rx.await.map_err(|_| TransportError::ChannelClosed)
    }

    /// Deliver a lifecycle event.
    pub async fn notify(&self, event: PageEvent) -> Result<(), TransportError> {
        self.tx
            .send(Inbound::Lifecycle(event))
            .await
            .map_err(|_| TransportError::ReceivingEndMissing)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

async fn run<D: Dom>(mut script: ContentScript<D>, mut rx: mpsc::Receiver<Inbound>) {
    info!("Content script started");
    while let Some(inbound) = rx.recv().await {
        match inbound {
            Inbound::Message { raw, reply } => {
                let response = script.handle(raw).await;
                if reply.send(response).is_err() {
                    debug!("Caller went away before the reply");
                }
            }
            Inbound::Lifecycle(event) => {
                info!(?event, "Page lifecycle event, removing indicators");
                script.cleanup().await;
            }
        }
    }
    script.cleanup().await;
    info!("Content script stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementSpec, MemoryDocument};
    use crate::indicators::{CLICK_INDICATOR_ID, KEY_INDICATOR_ID};
    use crate::timings::Timings;
    use pagepilot_config::ScreenshotFormat;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn spawn(doc: &Arc<MemoryDocument>, timings: Timings) -> (ContentScriptHandle, JoinHandle<()>) {
        ContentScriptHandle::spawn(ContentScript::new(doc.clone(), timings, ScreenshotFormat::Png))
    }

    #[tokio::test]
    async fn test_send_and_reply() {
        let doc = Arc::new(MemoryDocument::new());
        let (handle, _task) = spawn(&doc, Timings::immediate());
        let response = handle
            .send(json!({"type": "PRESS_KEY", "payload": {"key": "Escape"}}))
            .await
            .unwrap();
        assert_eq!(response, ResponseEnvelope::ok("Pressed key: Escape"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_messages_are_processed_in_order() {
        let doc = Arc::new(MemoryDocument::new());
        doc.append(doc.body_node(), ElementSpec::new("div").rect(0.0, 0.0, 100.0, 100.0));
        let (handle, _task) = spawn(&doc, Timings::default());

        // The click waits on the settle delay; the key press queued behind
        // it must not overtake it.
        let click = {
            let handle = handle.clone();
            tokio::spawn(async move {
                handle
                    .send(json!({"type": "SIMULATE_CLICK", "payload": {"coordinates": "5:5"}}))
                    .await
            })
        };
        tokio::task::yield_now().await;
        let key = handle
            .send(json!({"type": "PRESS_KEY", "payload": {"key": "x"}}))
            .await
            .unwrap();
        assert!(key.success);
        assert!(click.await.unwrap().unwrap().success);

        let types = doc.event_types();
        let click_at = types.iter().position(|t| t == "click").unwrap();
        let keydown_at = types.iter().position(|t| t == "keydown").unwrap();
        assert!(click_at < keydown_at);
    }

    #[tokio::test]
    async fn test_lifecycle_event_cleans_up_indicators() {
        let doc = Arc::new(MemoryDocument::new());
        let (handle, _task) = spawn(&doc, Timings::immediate());
        handle
            .send(json!({"type": "SIMULATE_CLICK", "payload": {"coordinates": "1:1"}}))
            .await
            .unwrap();
        handle
            .send(json!({"type": "SCROLL_PAGE", "payload": {"direction": "up"}}))
            .await
            .unwrap();
        assert!(doc.find_by_id(CLICK_INDICATOR_ID).is_some());
        assert!(doc.find_by_id(KEY_INDICATOR_ID).is_some());

        handle.notify(PageEvent::PageHide).await.unwrap();
        // A round trip guarantees the lifecycle event was handled.
        handle.send(json!({"type": "GET_DEVICE_PIXEL_RATIO"})).await.unwrap();
        assert!(doc.find_by_id(CLICK_INDICATOR_ID).is_none());
        assert!(doc.find_by_id(KEY_INDICATOR_ID).is_none());

        // Indicators re-mount on the next show.
        handle
            .send(json!({"type": "PRESS_KEY", "payload": {"key": "Tab"}}))
            .await
            .unwrap();
        assert!(doc.find_by_id(KEY_INDICATOR_ID).is_some());
    }

    #[tokio::test]
    async fn test_dropping_handles_stops_task() {
        let doc = Arc::new(MemoryDocument::new());
        let (handle, task) = spawn(&doc, Timings::immediate());
        handle
            .send(json!({"type": "PRESS_KEY", "payload": {"key": "a"}}))
            .await
            .unwrap();
        assert!(doc.find_by_id(KEY_INDICATOR_ID).is_some());

        drop(handle);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(doc.find_by_id(KEY_INDICATOR_ID).is_none());
    }

    #[tokio::test]
    async fn test_send_after_task_ended() {
        let doc = Arc::new(MemoryDocument::new());
        let (handle, task) = spawn(&doc, Timings::immediate());
        task.abort();
        let _ = task.await;
        assert!(handle.is_closed());
        assert_eq!(
            handle.send(json!({"type": "GET_DEVICE_PIXEL_RATIO"})).await,
            Err(TransportError::ReceivingEndMissing)
        );
        assert_eq!(
            handle.notify(PageEvent::BeforeUnload).await,
            Err(TransportError::ReceivingEndMissing)
        );
    }
}
