//! The page abstraction every action runs against.

mod event;
mod memory;

use std::fmt;

use async_trait::async_trait;

pub use event::*;
pub use memory::*;

use crate::error::DomError;

/// A rectangle in viewport (client) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// What kind of editable an element is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Any `<input>`.
    Input,
    TextArea,
    ContentEditable,
    Other,
}

/// A snapshot of the element properties actions branch on.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementInfo {
    /// Lowercase tag name.
    pub tag: String,
    pub id: Option<String>,
    pub kind: ElementKind,
    /// The `type` attribute of an input, lowercased.
    pub input_type: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    /// Whether `.focus()` would move focus here.
    pub focusable: bool,
    /// False for `display: none` and detached elements.
    pub has_layout_box: bool,
}

impl ElementInfo {
    pub fn new(tag: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            kind,
            input_type: None,
            name: None,
            role: None,
            focusable: false,
            has_layout_box: true,
        }
    }

    /// `tag#id`, or just `tag`.
    pub fn describe(&self) -> String {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => format!("{}#{}", self.tag, id),
            _ => self.tag.clone(),
        }
    }

    /// `<input>` or `<textarea>`.
    pub fn is_text_control(&self) -> bool {
        matches!(self.kind, ElementKind::Input | ElementKind::TextArea)
    }

    /// Inputs a site would treat as a search box on Enter.
    pub fn is_search_like(&self) -> bool {
        const SEARCH_NAMES: [&str; 4] = ["q", "query", "search", "s"];
        let named = |v: &Option<String>| {
            v.as_deref()
                .map(|s| SEARCH_NAMES.contains(&s.to_lowercase().as_str()))
                .unwrap_or(false)
        };
        self.input_type.as_deref() == Some("search")
            || self.role.as_deref() == Some("searchbox")
            || named(&self.name)
            || named(&self.id)
    }
}

/// Scroll state of an element.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollMetrics {
    /// Computed `overflow-y`.
    pub overflow_y: String,
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    /// Whether a wheel over this element would scroll it.
    pub fn is_scrollable(&self) -> bool {
        self.overflow_y != "visible"
            && self.overflow_y != "hidden"
            && self.scroll_height > self.client_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub inner_width: f64,
    pub inner_height: f64,
    pub device_pixel_ratio: f64,
    /// Window position on screen, added to client coordinates.
    pub screen_x: f64,
    pub screen_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            inner_width: 1280.0,
            inner_height: 800.0,
            device_pixel_ratio: 1.0,
            screen_x: 0.0,
            screen_y: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBehavior {
    #[default]
    Auto,
    Smooth,
    Instant,
}

impl ScrollBehavior {
    pub fn as_str(self) -> &'static str {
        match self {
            ScrollBehavior::Auto => "auto",
            ScrollBehavior::Smooth => "smooth",
            ScrollBehavior::Instant => "instant",
        }
    }
}

/// Where an event is dispatched.
#[derive(Debug, Clone, PartialEq)]
pub enum EventTarget<N> {
    Document,
    Window,
    Element(N),
}

/// DOM primitives a content script needs.
///
/// Selection offsets are in characters, not UTF-16 code units.
#[async_trait]
pub trait Dom: Send + Sync + 'static {
    /// Handle to a live element.
    type Node: Clone + PartialEq + Send + Sync + fmt::Debug + 'static;

    /// Resolve once `document.body` exists.
    async fn wait_for_body(&self) -> Result<Self::Node, DomError>;

    async fn body(&self) -> Result<Option<Self::Node>, DomError>;

    /// Topmost hit-testable element at a viewport point.
    async fn element_from_point(&self, x: f64, y: f64) -> Result<Option<Self::Node>, DomError>;

    async fn element_info(&self, node: &Self::Node) -> Result<ElementInfo, DomError>;

    async fn parent_element(&self, node: &Self::Node) -> Result<Option<Self::Node>, DomError>;

    /// Dispatch an event. Returns `false` when a listener prevented the default.
    async fn dispatch_event(
        &self,
        target: EventTarget<Self::Node>,
        event: &SyntheticEvent,
    ) -> Result<bool, DomError>;

    async fn focus(&self, node: &Self::Node) -> Result<(), DomError>;

    /// `document.activeElement`, which falls back to the body.
    async fn active_element(&self) -> Result<Option<Self::Node>, DomError>;

    async fn text_value(&self, node: &Self::Node) -> Result<String, DomError>;

    async fn set_text_value(&self, node: &Self::Node, value: &str) -> Result<(), DomError>;

    async fn selection_range(&self, node: &Self::Node) -> Result<(usize, usize), DomError>;

    async fn set_selection_range(
        &self,
        node: &Self::Node,
        start: usize,
        end: usize,
    ) -> Result<(), DomError>;

    /// Native `select()` on an input or textarea.
    async fn select_all(&self, node: &Self::Node) -> Result<(), DomError>;

    /// Replace the document selection with `text` and collapse after it.
    /// Returns `false` when there is no selection range to insert into.
    async fn insert_text_at_selection(
        &self,
        node: &Self::Node,
        text: &str,
    ) -> Result<bool, DomError>;

    async fn scroll_metrics(&self, node: &Self::Node) -> Result<ScrollMetrics, DomError>;

    async fn scroll_element_by(
        &self,
        node: &Self::Node,
        delta_y: f64,
        behavior: ScrollBehavior,
    ) -> Result<(), DomError>;

    async fn scroll_window_by(&self, delta_y: f64, behavior: ScrollBehavior)
        -> Result<(), DomError>;

    async fn viewport(&self) -> Result<Viewport, DomError>;

    async fn enclosing_form(&self, node: &Self::Node) -> Result<Option<Self::Node>, DomError>;

    /// The first submit button of a form.
    async fn submit_control(&self, form: &Self::Node) -> Result<Option<Self::Node>, DomError>;

    /// Native `.click()`.
    async fn click_element(&self, node: &Self::Node) -> Result<(), DomError>;

    /// Native `form.submit()`, which fires no `submit` event.
    async fn submit_form(&self, form: &Self::Node) -> Result<(), DomError>;

    /// Elements matching the sequential focus selector that have a layout
    /// box, in document order.
    async fn focusable_elements(&self) -> Result<Vec<Self::Node>, DomError>;

    /// Append a fixed overlay `<div>` with inline styles to the body.
    async fn create_overlay(
        &self,
        id: &str,
        styles: &[(&str, &str)],
    ) -> Result<Self::Node, DomError>;

    async fn set_style(
        &self,
        node: &Self::Node,
        property: &str,
        value: &str,
    ) -> Result<(), DomError>;

    async fn set_text_content(&self, node: &Self::Node, text: &str) -> Result<(), DomError>;

    async fn remove_node(&self, node: &Self::Node) -> Result<(), DomError>;

    /// Drop the handles taken while handling one message. Overlay handles
    /// stay valid until the overlay is removed.
    async fn release_handles(&self) -> Result<(), DomError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains_is_half_open() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(r.contains(10.0, 10.0));
        assert!(r.contains(29.9, 29.9));
        assert!(!r.contains(30.0, 15.0));
        assert!(!Rect::default().contains(0.0, 0.0));
    }

    #[test]
    fn test_describe() {
        let mut info = ElementInfo::new("button", ElementKind::Other);
        assert_eq!(info.describe(), "button");
        info.id = Some("go".into());
        assert_eq!(info.describe(), "button#go");
        info.id = Some(String::new());
        assert_eq!(info.describe(), "button");
    }

    #[test]
    fn test_search_like() {
        let mut info = ElementInfo::new("input", ElementKind::Input);
        assert!(!info.is_search_like());
        info.name = Some("Q".into());
        assert!(info.is_search_like());

        let mut typed = ElementInfo::new("input", ElementKind::Input);
        typed.input_type = Some("search".into());
        assert!(typed.is_search_like());

        let mut role = ElementInfo::new("div", ElementKind::ContentEditable);
        role.role = Some("searchbox".into());
        assert!(role.is_search_like());
    }

    #[test]
    fn test_scrollable() {
        let mut m = ScrollMetrics {
            overflow_y: "auto".into(),
            scroll_top: 0.0,
            scroll_height: 1000.0,
            client_height: 300.0,
        };
        assert!(m.is_scrollable());
        m.overflow_y = "hidden".into();
        assert!(!m.is_scrollable());
        m.overflow_y = "scroll".into();
        m.scroll_height = 300.0;
        assert!(!m.is_scrollable());
    }
}
