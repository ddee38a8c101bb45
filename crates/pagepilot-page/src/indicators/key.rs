use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pagepilot_protocols::Modifier;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{remove_overlay, wait_for_body};
use crate::dom::Dom;
use crate::error::DomError;

pub const KEY_INDICATOR_ID: &str = "pagepilot-key-indicator";

const TOAST_STYLES: &[(&str, &str)] = &[
    ("position", "fixed"),
    ("right", "20px"),
    ("bottom", "20px"),
    ("padding", "10px 16px"),
    ("background-color", "rgba(236, 253, 245, 0.9)"),
    ("color", "rgb(6, 95, 70)"),
    ("border", "1px solid rgb(167, 243, 208)"),
    ("border-radius", "10px"),
    ("font-family", "ui-sans-serif, system-ui, sans-serif"),
    ("font-size", "15px"),
    ("line-height", "1"),
    ("z-index", "2147483647"),
    ("opacity", "0"),
    ("transition", "all 0.2s cubic-bezier(0.4, 0, 0.2, 1)"),
    ("transform", "translateY(0)"),
    ("pointer-events", "none"),
];

const KEY_SYMBOLS: [(&str, &str); 14] = [
    ("ArrowUp", "↑"),
    ("ArrowDown", "↓"),
    ("ArrowLeft", "←"),
    ("ArrowRight", "→"),
    ("Enter", "↵"),
    ("Escape", "esc"),
    ("Backspace", "⌫"),
    ("Delete", "⌦"),
    ("Home", "Home"),
    ("End", "End"),
    ("PageUp", "PageUp"),
    ("PageDown", "PageDown"),
    ("Tab", "⇥"),
    (" ", "space"),
];

/// Toast text for a key press, e.g. `⌃⇧+K`.
pub fn format_key_display<S: AsRef<str>>(key: &str, modifiers: &[S]) -> String {
    let mods: String = modifiers
        .iter()
        .map(|m| match Modifier::parse(m.as_ref()) {
            Ok(Modifier::Control) => "⌃".to_string(),
            Ok(Modifier::Alt) => "⌥".to_string(),
            Ok(Modifier::Shift) => "⇧".to_string(),
            Ok(Modifier::Meta) => "⌘".to_string(),
            Err(_) => m.as_ref().to_string(),
        })
        .collect();
    let key = KEY_SYMBOLS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, symbol)| (*symbol).to_string())
        .unwrap_or_else(|| key.to_uppercase());

    if mods.is_empty() {
        key
    } else {
        format!("{}+{}", mods, key)
    }
}

struct Inner<D: Dom> {
    dom: Arc<D>,
    element: Mutex<Option<D::Node>>,
    hide_after: Duration,
    body_wait: Duration,
    timer: parking_lot::Mutex<Option<JoinHandle<()>>>,
    /// Bumped on every show so a stale timer never hides a newer toast.
    generation: AtomicU64,
}

impl<D: Dom> Inner<D> {
    async fn hide(&self) -> Result<(), DomError> {
        let node = self.element.lock().await.clone();
        if let Some(node) = node {
            self.dom.set_style(&node, "opacity", "0").await?;
            self.dom.set_style(&node, "transform", "translateY(10px)").await?;
        }
        Ok(())
    }

    fn cancel_timer(&self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
        }
    }
}

/// A bottom-right toast naming the last key pressed.
pub struct KeyPressIndicator<D: Dom> {
    inner: Arc<Inner<D>>,
}

impl<D: Dom> KeyPressIndicator<D> {
    pub fn new(dom: Arc<D>, hide_after: Duration, body_wait: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                dom,
                element: Mutex::new(None),
                hide_after,
                body_wait,
                timer: parking_lot::Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub async fn is_mounted(&self) -> bool {
        self.inner.element.lock().await.is_some()
    }

    /// Show the toast and restart its hide timer.
    pub async fn show<S: AsRef<str>>(&self, key: &str, modifiers: &[S]) -> Result<(), DomError> {
        let dom = &self.inner.dom;
        let mut slot = self.inner.element.lock().await;
        let node = match slot.as_ref() {
            Some(node) => node.clone(),
            None => {
                wait_for_body(dom.as_ref(), self.inner.body_wait).await?;
                let node = dom.create_overlay(KEY_INDICATOR_ID, TOAST_STYLES).await?;
                debug!("Mounted key press indicator");
                slot.insert(node).clone()
            }
        };
        drop(slot);

        self.inner.cancel_timer();
        dom.set_text_content(&node, &format_key_display(key, modifiers))
            .await?;
        dom.set_style(&node, "opacity", "1").await?;
        dom.set_style(&node, "transform", "translateY(0)").await?;

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(inner.hide_after).await;
            if inner.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            if let Err(e) = inner.hide().await {
                warn!(error = %e, "Failed to hide key press indicator");
            }
        });
        *self.inner.timer.lock() = Some(handle);
        Ok(())
    }

    pub async fn hide(&self) -> Result<(), DomError> {
        self.inner.cancel_timer();
        self.inner.hide().await
    }

    /// Remove the toast and cancel any pending hide.
    pub async fn cleanup(&self) -> Result<(), DomError> {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.cancel_timer();
        let node = self.inner.element.lock().await.take();
        if let Some(node) = node {
            remove_overlay(self.inner.dom.as_ref(), &node).await?;
            debug!("Removed key press indicator");
        }
        Ok(())
    }
}

impl<D: Dom> Drop for KeyPressIndicator<D> {
    fn drop(&mut self) {
        self.inner.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;

    const HIDE: Duration = Duration::from_millis(1000);

    #[test]
    fn test_format_key_display() {
        assert_eq!(format_key_display::<&str>("Enter", &[]), "↵");
        assert_eq!(format_key_display::<&str>(" ", &[]), "space");
        assert_eq!(format_key_display::<&str>("a", &[]), "A");
        assert_eq!(format_key_display::<&str>("F5", &[]), "F5");
        assert_eq!(format_key_display::<&str>("PageDown", &[]), "PageDown");
        assert_eq!(format_key_display("k", &["control", "shift"]), "⌃⇧+K");
        assert_eq!(format_key_display("Tab", &["shift"]), "⇧+⇥");
        assert_eq!(format_key_display("s", &["cmd"]), "⌘+S");
        assert_eq!(format_key_display("x", &["hyper"]), "hyper+X");
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_hide_after_timeout() {
        let doc = Arc::new(MemoryDocument::new());
        let indicator = KeyPressIndicator::new(doc.clone(), HIDE, HIDE);

        indicator.show("Enter", &["meta"]).await.unwrap();
        let node = doc.find_by_id(KEY_INDICATOR_ID).unwrap();
        assert_eq!(doc.value(node), "⌘+↵");
        assert_eq!(doc.style(node, "opacity").as_deref(), Some("1"));

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(doc.style(node, "opacity").as_deref(), Some("1"));

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(doc.style(node, "opacity").as_deref(), Some("0"));
        assert_eq!(doc.style(node, "transform").as_deref(), Some("translateY(10px)"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_restarts_timer() {
        let doc = Arc::new(MemoryDocument::new());
        let indicator = KeyPressIndicator::new(doc.clone(), HIDE, HIDE);

        indicator.show::<&str>("a", &[]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        indicator.show::<&str>("b", &[]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;

        let node = doc.find_by_id(KEY_INDICATOR_ID).unwrap();
        assert_eq!(doc.value(node), "B");
        assert_eq!(doc.style(node, "opacity").as_deref(), Some("1"));

        tokio::time::sleep(Duration::from_millis(401)).await;
        assert_eq!(doc.style(node, "opacity").as_deref(), Some("0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_cancels_timer_and_remounts() {
        let doc = Arc::new(MemoryDocument::new());
        let indicator = KeyPressIndicator::new(doc.clone(), HIDE, HIDE);

        indicator.show::<&str>("Tab", &[]).await.unwrap();
        let first = doc.find_by_id(KEY_INDICATOR_ID).unwrap();
        indicator.cleanup().await.unwrap();
        assert!(!doc.is_connected(first));
        assert!(!indicator.is_mounted().await);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        indicator.show::<&str>("Tab", &[]).await.unwrap();
        let second = doc.find_by_id(KEY_INDICATOR_ID).unwrap();
        assert_ne!(first, second);
        assert_eq!(doc.style(second, "opacity").as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_show_waits_for_body() {
        let doc = Arc::new(MemoryDocument::without_body());
        let indicator = Arc::new(KeyPressIndicator::new(doc.clone(), HIDE, HIDE));

        let pending = {
            let indicator = indicator.clone();
            tokio::spawn(async move { indicator.show::<&str>("Escape", &[]).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!pending.is_finished());

        doc.attach_body();
        pending.await.unwrap().unwrap();
        let node = doc.find_by_id(KEY_INDICATOR_ID).unwrap();
        assert_eq!(doc.value(node), "esc");
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_without_body_times_out() {
        let doc = Arc::new(MemoryDocument::without_body());
        let indicator = KeyPressIndicator::new(doc.clone(), HIDE, Duration::from_millis(250));

        let result = indicator.show::<&str>("a", &[]).await;
        assert_eq!(result, Err(DomError::NoBody));
        assert_eq!(doc.find_by_id(KEY_INDICATOR_ID), None);
    }
}
