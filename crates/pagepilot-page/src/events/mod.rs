//! Native-like input event sequences.

mod keys;

use std::sync::Arc;
use std::time::Duration;

use pagepilot_protocols::{ClickType, ModifierState};
use tracing::{debug, trace};

pub use keys::{describe_key, KeyDescriptor};

use crate::dom::{
    Dom, EventInit, EventInterface, EventTarget, KeyInit, MouseInit, ScrollBehavior,
    SyntheticEvent, Viewport, WheelInit,
};
use crate::error::PageError;
use crate::timings::Timings;

/// One step of the single-click sequence.
struct ClickStep {
    event_type: &'static str,
    interface: EventInterface,
    pressed: bool,
    bubbles: bool,
    cancelable: bool,
}

const fn step(event_type: &'static str, interface: EventInterface, pressed: bool) -> ClickStep {
    ClickStep {
        event_type,
        interface,
        pressed,
        bubbles: true,
        cancelable: true,
    }
}

const CLICK_SEQUENCE: [ClickStep; 10] = [
    step("pointerover", EventInterface::PointerEvent, false),
    ClickStep {
        bubbles: false,
        ..step("pointerenter", EventInterface::PointerEvent, false)
    },
    step("pointermove", EventInterface::PointerEvent, false),
    step("pointerdown", EventInterface::PointerEvent, true),
    step("pointerup", EventInterface::PointerEvent, false),
    step("mousedown", EventInterface::MouseEvent, true),
    ClickStep {
        cancelable: false,
        ..step("focus", EventInterface::FocusEvent, false)
    },
    step("mouseup", EventInterface::MouseEvent, false),
    step("click", EventInterface::MouseEvent, false),
    ClickStep {
        cancelable: false,
        ..step("focus", EventInterface::FocusEvent, false)
    },
];

/// Where a wheel delta is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollContainer<N> {
    Element(N),
    Window,
}

/// Builds and dispatches event sequences against a [`Dom`].
pub struct EventSynthesizer<D: Dom> {
    dom: Arc<D>,
    inter_click_delay: Duration,
}

impl<D: Dom> EventSynthesizer<D> {
    pub fn new(dom: Arc<D>, timings: &Timings) -> Self {
        Self {
            dom,
            inter_click_delay: timings.inter_click_delay,
        }
    }

    /// Simulate a single, double or triple click on `target` at a client point.
    pub async fn dispatch_click_sequence(
        &self,
        target: &D::Node,
        x: f64,
        y: f64,
        click_type: ClickType,
    ) -> Result<(), PageError> {
        let viewport = self.dom.viewport().await?;
        let clicks = click_type.click_count();
        debug!(?target, x, y, click_type = click_type.as_str(), "Dispatching click sequence");

        for n in 1..=clicks {
            self.single_click(target, x, y, &viewport, n).await?;
            if n < clicks || click_type == ClickType::Double {
                tokio::time::sleep(self.inter_click_delay).await;
            }
        }

        match click_type {
            ClickType::Single => {}
            ClickType::Double => {
                let event = SyntheticEvent::new(
                    "dblclick",
                    EventInterface::MouseEvent,
                    EventInit::Mouse(mouse_init(x, y, &viewport, false, 2)),
                )
                .composed(true);
                self.dispatch_checked(target, &event).await?;
            }
            ClickType::Triple => {
                if self.dom.element_info(target).await?.is_text_control() {
                    self.dom.select_all(target).await?;
                }
            }
        }
        Ok(())
    }

    async fn single_click(
        &self,
        target: &D::Node,
        x: f64,
        y: f64,
        viewport: &Viewport,
        detail: u32,
    ) -> Result<(), PageError> {
        for step in &CLICK_SEQUENCE {
            let detail = match step.interface {
                EventInterface::MouseEvent => detail,
                _ => 0,
            };
            let event = SyntheticEvent::new(
                step.event_type,
                step.interface,
                EventInit::Mouse(mouse_init(x, y, viewport, step.pressed, detail)),
            )
            .bubbles(step.bubbles)
            .cancelable(step.cancelable)
            .composed(true);
            self.dispatch_checked(target, &event).await?;
        }
        Ok(())
    }

    async fn dispatch_checked(
        &self,
        target: &D::Node,
        event: &SyntheticEvent,
    ) -> Result<(), PageError> {
        trace!(event = %event.event_type, "dispatch");
        let not_cancelled = self
            .dom
            .dispatch_event(EventTarget::Element(target.clone()), event)
            .await?;
        if !not_cancelled {
            return Err(PageError::EventCancelled(event.event_type.clone()));
        }
        Ok(())
    }

    /// Dispatch keydown, keypress and keyup at document level.
    ///
    /// Returns whether keydown was left un-cancelled.
    pub async fn dispatch_key_sequence(
        &self,
        key: &str,
        modifiers: ModifierState,
    ) -> Result<bool, PageError> {
        let descriptor = describe_key(key);
        let init = KeyInit {
            key: descriptor.key,
            code: descriptor.code,
            key_code: descriptor.key_code,
            which: descriptor.key_code,
            ctrl_key: modifiers.ctrl,
            alt_key: modifiers.alt,
            shift_key: modifiers.shift,
            meta_key: modifiers.meta,
        };
        debug!(key = %init.key, code = %init.code, key_code = init.key_code, "Dispatching key sequence");

        let mut keydown_ok = true;
        for event_type in ["keydown", "keypress", "keyup"] {
            let event = SyntheticEvent::new(
                event_type,
                EventInterface::KeyboardEvent,
                EventInit::Key(init.clone()),
            )
            .composed(true);
            let not_cancelled = self.dom.dispatch_event(EventTarget::Document, &event).await?;
            if event_type == "keydown" {
                keydown_ok = not_cancelled;
            }
        }
        Ok(keydown_ok)
    }

    /// Scroll whatever a wheel at the point would scroll, then fire `wheel`
    /// on the element under the point.
    pub async fn dispatch_wheel(&self, x: f64, y: f64, delta_y: f64) -> Result<(), PageError> {
        let hit = self
            .dom
            .element_from_point(x, y)
            .await?
            .ok_or(PageError::NoElementAtPoint { x, y })?;

        match self.scroll_container(&hit).await? {
            ScrollContainer::Element(node) => {
                debug!(?node, delta_y, "Scrolling container");
                self.dom
                    .scroll_element_by(&node, delta_y, ScrollBehavior::Smooth)
                    .await?;
            }
            ScrollContainer::Window => {
                debug!(delta_y, "Scrolling window");
                self.dom
                    .scroll_window_by(delta_y, ScrollBehavior::Smooth)
                    .await?;
            }
        }

        let event = SyntheticEvent::new(
            "wheel",
            EventInterface::WheelEvent,
            EventInit::Wheel(WheelInit {
                client_x: x,
                client_y: y,
                delta_x: 0.0,
                delta_y,
                delta_mode: 0,
            }),
        )
        .composed(true);
        self.dom
            .dispatch_event(EventTarget::Element(hit), &event)
            .await?;
        Ok(())
    }

    /// Nearest scrollable element from `node` up to, but not including, the
    /// body. Then the body if it scrolls itself, else the window.
    pub async fn scroll_container(
        &self,
        node: &D::Node,
    ) -> Result<ScrollContainer<D::Node>, PageError> {
        let body = self.dom.body().await?;
        let mut current = Some(node.clone());
        while let Some(candidate) = current {
            if Some(&candidate) == body.as_ref() {
                break;
            }
            if self.dom.scroll_metrics(&candidate).await?.is_scrollable() {
                return Ok(ScrollContainer::Element(candidate));
            }
            current = self.dom.parent_element(&candidate).await?;
        }

        if let Some(body) = body {
            if self.dom.scroll_metrics(&body).await?.is_scrollable() {
                return Ok(ScrollContainer::Element(body));
            }
        }
        Ok(ScrollContainer::Window)
    }
}

fn mouse_init(x: f64, y: f64, viewport: &Viewport, pressed: bool, detail: u32) -> MouseInit {
    MouseInit {
        client_x: x,
        client_y: y,
        screen_x: x + viewport.screen_x,
        screen_y: y + viewport.screen_y,
        button: 0,
        buttons: if pressed { 1 } else { 0 },
        detail,
        pointer_id: 1,
        pointer_type: "mouse".to_string(),
        is_primary: true,
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
