//! Page actions behind each content-script message.
//!
//! Every action returns the human-readable result string that ends up in the
//! tool outcome, or a [`PageError`].

mod screenshot;

pub use screenshot::{
    decode_data_url, process_screenshot, scaled_size, ProcessedScreenshot, ScreenshotJob,
    MAX_SCREENSHOT_SIDE,
};

use std::sync::Arc;

use pagepilot_config::ScreenshotFormat;
use pagepilot_protocols::{ClickType, Coordinate, ModifierState, ScrollDirection};
use tracing::{debug, warn};

use crate::dom::{
    Dom, ElementKind, EventInit, EventInterface, EventTarget, InputInit, ScrollBehavior,
    SyntheticEvent,
};
use crate::error::PageError;
use crate::events::EventSynthesizer;
use crate::indicators::{ClickIndicator, KeyPressIndicator};
use crate::timings::Timings;

/// Result of `type_text` when nothing editable has focus. Not an error.
pub const NO_INPUT_ELEMENT: &str = "No suitable input element found";

/// Click, type, key and scroll actions against one page.
pub struct PageActions<D: Dom> {
    dom: Arc<D>,
    events: EventSynthesizer<D>,
    click_indicator: ClickIndicator<D>,
    key_indicator: KeyPressIndicator<D>,
    timings: Timings,
    screenshot_format: ScreenshotFormat,
}

impl<D: Dom> PageActions<D> {
    pub fn new(dom: Arc<D>, timings: Timings, screenshot_format: ScreenshotFormat) -> Self {
        Self {
            events: EventSynthesizer::new(dom.clone(), &timings),
            click_indicator: ClickIndicator::new(dom.clone(), timings.body_wait),
            key_indicator: KeyPressIndicator::new(
                dom.clone(),
                timings.key_indicator_hide,
                timings.body_wait,
            ),
            dom,
            timings,
            screenshot_format,
        }
    }

    pub fn dom(&self) -> &Arc<D> {
        &self.dom
    }

    pub fn click_indicator(&self) -> &ClickIndicator<D> {
        &self.click_indicator
    }

    pub fn key_indicator(&self) -> &KeyPressIndicator<D> {
        &self.key_indicator
    }

    /// Tear down both overlays. Called when the page is hidden or unloads.
    pub async fn cleanup_indicators(&self) {
        if let Err(e) = self.click_indicator.cleanup().await {
            warn!(error = %e, "Failed to remove click indicator");
        }
        if let Err(e) = self.key_indicator.cleanup().await {
            warn!(error = %e, "Failed to remove key press indicator");
        }
    }

    /// Show the ring, let it settle, then click whatever is under the point.
    pub async fn click_at(
        &self,
        point: Coordinate,
        click_type: ClickType,
    ) -> Result<String, PageError> {
        if let Err(e) = self.click_indicator.show(point.x, point.y).await {
            warn!(error = %e, "Failed to show click indicator");
        }
        let result = self.click_inner(point, click_type).await;
        if let Err(e) = self.click_indicator.hide().await {
            warn!(error = %e, "Failed to hide click indicator");
        }
        result
    }

    async fn click_inner(
        &self,
        point: Coordinate,
        click_type: ClickType,
    ) -> Result<String, PageError> {
        tokio::time::sleep(self.timings.settle_delay).await;

        let Coordinate { x, y } = point;
        let element = self
            .dom
            .element_from_point(x, y)
            .await?
            .ok_or(PageError::NoElementAtPoint { x, y })?;
        self.events
            .dispatch_click_sequence(&element, x, y, click_type)
            .await?;

        let info = self.dom.element_info(&element).await?;
        if info.focusable {
            self.dom.focus(&element).await?;
        }

        let mut message = format!("Clicked {} at ({}, {})", info.describe(), x, y);
        if click_type != ClickType::Single {
            message.push_str(&format!(" ({} click)", click_type.as_str()));
        }
        debug!(%message, "Click complete");
        Ok(message)
    }

    /// Insert text at the caret of the focused field.
    pub async fn type_text(&self, text: &str) -> Result<String, PageError> {
        let Some(active) = self.dom.active_element().await? else {
            return Ok(NO_INPUT_ELEMENT.to_string());
        };
        let info = self.dom.element_info(&active).await?;
        debug!(element = %info.describe(), chars = text.chars().count(), "Typing text");

        match info.kind {
            ElementKind::Input | ElementKind::TextArea => {
                let value: Vec<char> = self.dom.text_value(&active).await?.chars().collect();
                let (start, end) = self.dom.selection_range(&active).await?;
                let start = start.min(value.len());
                let end = end.clamp(start, value.len());

                let mut updated: String = value[..start].iter().collect();
                updated.push_str(text);
                updated.extend(&value[end..]);
                self.dom.set_text_value(&active, &updated).await?;

                let caret = start + text.chars().count();
                self.dom.set_selection_range(&active, caret, caret).await?;

                for event_type in ["input", "change"] {
                    self.dom
                        .dispatch_event(
                            EventTarget::Element(active.clone()),
                            &SyntheticEvent::plain(event_type),
                        )
                        .await?;
                }
            }
            ElementKind::ContentEditable => {
                if !self.dom.insert_text_at_selection(&active, text).await? {
                    return Ok(NO_INPUT_ELEMENT.to_string());
                }
                let input = SyntheticEvent::new(
                    "input",
                    EventInterface::InputEvent,
                    EventInit::Input(InputInit {
                        input_type: "insertText".to_string(),
                        data: Some(text.to_string()),
                    }),
                );
                self.dom
                    .dispatch_event(EventTarget::Element(active), &input)
                    .await?;
            }
            ElementKind::Other => return Ok(NO_INPUT_ELEMENT.to_string()),
        }

        Ok(format!("Typed text: \"{}\"", text))
    }

    /// Press a key, with Tab moving focus and Enter submitting forms.
    pub async fn handle_key_press(
        &self,
        key: &str,
        modifiers: &[String],
    ) -> Result<String, PageError> {
        let state = ModifierState::from_names(modifiers)?;
        if let Err(e) = self.key_indicator.show(key, modifiers).await {
            warn!(error = %e, "Failed to show key press indicator");
        }

        if key == "Tab" {
            self.simulate_tab(state.shift).await?;
        } else {
            let keydown_ok = self.events.dispatch_key_sequence(key, state).await?;
            if key == "Enter" && keydown_ok {
                self.handle_enter().await?;
            }
        }

        let mut message = format!("Pressed key: {}", key);
        if !modifiers.is_empty() {
            message.push_str(&format!(" with modifiers: {}", modifiers.join("+")));
        }
        Ok(message)
    }

    /// Move focus along the sequential focus order, wrapping at both ends.
    async fn simulate_tab(&self, backwards: bool) -> Result<(), PageError> {
        let candidates = self.dom.focusable_elements().await?;
        if candidates.is_empty() {
            debug!("No focusable elements for Tab");
            return Ok(());
        }

        let active = self.dom.active_element().await?;
        let current = active
            .as_ref()
            .and_then(|a| candidates.iter().position(|c| c == a));
        let last = candidates.len() - 1;
        let next = if backwards {
            match current {
                Some(i) if i > 0 => i - 1,
                _ => last,
            }
        } else {
            match current {
                Some(i) if i < last => i + 1,
                _ => 0,
            }
        };

        let target = candidates[next].clone();
        debug!(from = ?current, to = next, backwards, "Tab focus move");
        self.dom.focus(&target).await?;
        self.dom
            .dispatch_event(EventTarget::Element(target), &SyntheticEvent::plain("focus"))
            .await?;
        Ok(())
    }

    /// Enter in a text input submits its form or triggers a search box.
    async fn handle_enter(&self) -> Result<(), PageError> {
        let Some(active) = self.dom.active_element().await? else {
            return Ok(());
        };
        let info = self.dom.element_info(&active).await?;
        if info.kind != ElementKind::Input {
            return Ok(());
        }

        if let Some(form) = self.dom.enclosing_form(&active).await? {
            if let Some(control) = self.dom.submit_control(&form).await? {
                debug!("Enter activates submit control");
                self.dom.click_element(&control).await?;
            } else {
                let submit = SyntheticEvent::plain("submit").cancelable(true);
                let not_prevented = self
                    .dom
                    .dispatch_event(EventTarget::Element(form.clone()), &submit)
                    .await?;
                if not_prevented {
                    debug!("Enter submits form");
                    self.dom.submit_form(&form).await?;
                }
            }
        } else if info.is_search_like() {
            debug!(element = %info.describe(), "Enter on search box");
            for event_type in ["input", "change", "search"] {
                self.dom
                    .dispatch_event(
                        EventTarget::Element(active.clone()),
                        &SyntheticEvent::plain(event_type),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Scroll the window by one viewport height.
    pub async fn scroll_page(&self, direction: ScrollDirection) -> Result<String, PageError> {
        let viewport = self.dom.viewport().await?;
        let delta = match direction {
            ScrollDirection::Up => -viewport.inner_height,
            ScrollDirection::Down => viewport.inner_height,
        };
        self.dom.scroll_window_by(delta, ScrollBehavior::Auto).await?;
        if let Err(e) = self.key_indicator.show::<&str>(direction.page_key(), &[]).await {
            warn!(error = %e, "Failed to show key press indicator");
        }
        Ok(format!("Scrolled {} one page", direction.as_str()))
    }

    pub async fn scroll_at_position(
        &self,
        x: f64,
        y: f64,
        delta_y: f64,
    ) -> Result<String, PageError> {
        self.events.dispatch_wheel(x, y, delta_y).await?;
        Ok(format!(
            "Scrolled at position ({}, {}) with delta {}",
            x, y, delta_y
        ))
    }

    pub async fn device_pixel_ratio(&self) -> Result<f64, PageError> {
        Ok(self.dom.viewport().await?.device_pixel_ratio)
    }

    /// Rescale a screenshot using the configured output format.
    pub fn process_screenshot(&self, job: &ScreenshotJob) -> Result<ProcessedScreenshot, PageError> {
        process_screenshot(job, self.screenshot_format)
    }
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
