use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use super::{remove_overlay, wait_for_body};
use crate::dom::Dom;
use crate::error::DomError;

pub const CLICK_INDICATOR_ID: &str = "pagepilot-click-indicator";

const RING_STYLES: &[(&str, &str)] = &[
    ("position", "fixed"),
    ("pointer-events", "none"),
    ("width", "40px"),
    ("height", "40px"),
    ("border", "2px solid #22c55e"),
    ("background-color", "rgba(34, 197, 94, 0.2)"),
    ("border-radius", "50%"),
    ("z-index", "2147483647"),
    ("transform", "translate(-50%, -50%)"),
    ("transition", "all 0.4s ease-out"),
    ("opacity", "0"),
];

const PULSE_START: &str = "translate(-50%, -50%) scale(1.2)";
const PULSE_END: &str = "translate(-50%, -50%) scale(1)";

/// A ring drawn where a click is about to land.
pub struct ClickIndicator<D: Dom> {
    dom: Arc<D>,
    element: Mutex<Option<D::Node>>,
    body_wait: Duration,
}

impl<D: Dom> ClickIndicator<D> {
    pub fn new(dom: Arc<D>, body_wait: Duration) -> Self {
        Self {
            dom,
            element: Mutex::new(None),
            body_wait,
        }
    }

    pub async fn is_mounted(&self) -> bool {
        self.element.lock().await.is_some()
    }

    /// Center the ring on a viewport point and pulse it in.
    pub async fn show(&self, x: f64, y: f64) -> Result<(), DomError> {
        let mut slot = self.element.lock().await;
        let node = match slot.as_ref() {
            Some(node) => node.clone(),
            None => {
                wait_for_body(self.dom.as_ref(), self.body_wait).await?;
                let node = self.dom.create_overlay(CLICK_INDICATOR_ID, RING_STYLES).await?;
                debug!("Mounted click indicator");
                slot.insert(node).clone()
            }
        };
        drop(slot);

        self.dom.set_style(&node, "left", &format!("{}px", x)).await?;
        self.dom.set_style(&node, "top", &format!("{}px", y)).await?;
        self.dom.set_style(&node, "transform", PULSE_START).await?;
        self.dom.set_style(&node, "opacity", "1").await?;
        self.dom.set_style(&node, "transform", PULSE_END).await
    }

    pub async fn hide(&self) -> Result<(), DomError> {
        let node = self.element.lock().await.clone();
        match node {
            Some(node) => self.dom.set_style(&node, "opacity", "0").await,
            None => Ok(()),
        }
    }

    /// Remove the ring from the page.
    pub async fn cleanup(&self) -> Result<(), DomError> {
        let node = self.element.lock().await.take();
        if let Some(node) = node {
            remove_overlay(self.dom.as_ref(), &node).await?;
            debug!("Removed click indicator");
        }
        Ok(())
    }
}
