//! In-memory document.
//!
//! A small element tree with layout rectangles, form state, focus, scroll
//! offsets and an event log. Hit-testing walks document order backwards and
//! skips anything with `pointer-events: none`, so later siblings paint on top.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::{
    Dom, ElementInfo, ElementKind, EventTarget, Rect, ScrollBehavior, ScrollMetrics,
    SyntheticEvent, Viewport,
};
use crate::error::DomError;

/// Handle to an element of a [`MemoryDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryNode(usize);

/// Builder for elements appended to a [`MemoryDocument`].
#[derive(Debug, Clone)]
pub struct ElementSpec {
    tag: String,
    attrs: BTreeMap<String, String>,
    rect: Option<Rect>,
    value: String,
    text: String,
    overflow_y: String,
    scroll_height: f64,
    client_height: f64,
}

impl ElementSpec {
    /// A laid-out element with an empty rectangle.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_lowercase(),
            attrs: BTreeMap::new(),
            rect: Some(Rect::default()),
            value: String::new(),
            text: String::new(),
            overflow_y: "visible".to_string(),
            scroll_height: 0.0,
            client_height: 0.0,
        }
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into().to_lowercase(), value.into());
        self
    }

    pub fn input_type(self, input_type: impl Into<String>) -> Self {
        self.attr("type", input_type)
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        self.attr("name", name)
    }

    pub fn rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = Some(Rect::new(x, y, width, height));
        self
    }

    /// No layout box, as with `display: none`.
    pub fn hidden(mut self) -> Self {
        self.rect = None;
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn contenteditable(self) -> Self {
        self.attr("contenteditable", "true")
    }

    pub fn overflow_y(mut self, overflow_y: impl Into<String>) -> Self {
        self.overflow_y = overflow_y.into();
        self
    }

    /// `overflow-y: auto` with the given content and box heights.
    pub fn scrollable(mut self, scroll_height: f64, client_height: f64) -> Self {
        self.overflow_y = "auto".to_string();
        self.scroll_height = scroll_height;
        self.client_height = client_height;
        self
    }
}

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attrs: BTreeMap<String, String>,
    rect: Option<Rect>,
    value: String,
    text: String,
    selection: (usize, usize),
    overflow_y: String,
    scroll_top: f64,
    scroll_height: f64,
    client_height: f64,
    style: BTreeMap<String, String>,
    parent: Option<usize>,
    children: Vec<usize>,
    removed: bool,
}

impl Element {
    fn from_spec(spec: ElementSpec, parent: Option<usize>) -> Self {
        let len = spec.value.chars().count();
        let text_len = spec.text.chars().count();
        let caret = if spec.tag == "input" || spec.tag == "textarea" {
            len
        } else {
            text_len
        };
        Self {
            tag: spec.tag,
            attrs: spec.attrs,
            rect: spec.rect,
            value: spec.value,
            text: spec.text,
            selection: (caret, caret),
            overflow_y: spec.overflow_y,
            scroll_top: 0.0,
            scroll_height: spec.scroll_height,
            client_height: spec.client_height,
            style: BTreeMap::new(),
            parent,
            children: Vec::new(),
            removed: false,
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    fn kind(&self) -> ElementKind {
        match self.tag.as_str() {
            "input" => ElementKind::Input,
            "textarea" => ElementKind::TextArea,
            _ => match self.attr("contenteditable") {
                Some("") | Some("true") | Some("plaintext-only") => ElementKind::ContentEditable,
                _ => ElementKind::Other,
            },
        }
    }

    fn is_text_control(&self) -> bool {
        matches!(self.kind(), ElementKind::Input | ElementKind::TextArea)
    }

    fn text_len(&self) -> usize {
        if self.is_text_control() {
            self.value.chars().count()
        } else {
            self.text.chars().count()
        }
    }

    fn matches_focus_selector(&self) -> bool {
        matches!(self.tag.as_str(), "button" | "input" | "select" | "textarea")
            || self.attrs.contains_key("href")
            || self.attr("tabindex").map(|t| t != "-1").unwrap_or(false)
    }

    fn is_focusable(&self) -> bool {
        if self.attrs.contains_key("disabled") || self.rect.is_none() {
            return false;
        }
        matches!(self.tag.as_str(), "button" | "input" | "select" | "textarea")
            || (self.tag == "a" && self.attrs.contains_key("href"))
            || self.attrs.contains_key("tabindex")
            || self.kind() == ElementKind::ContentEditable
    }

    fn is_submit_control(&self) -> bool {
        match self.tag.as_str() {
            "button" => matches!(self.attr("type"), None | Some("submit")),
            "input" => matches!(self.attr("type"), Some("submit") | Some("image")),
            _ => false,
        }
    }

    fn hit_testable(&self) -> bool {
        self.style.get("pointer-events").map(String::as_str) != Some("none")
    }
}

/// An event as it was dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub target: EventTarget<MemoryNode>,
    pub event: SyntheticEvent,
    /// Whether dispatch reported the default as not prevented.
    pub not_cancelled: bool,
}

#[derive(Debug)]
struct State {
    elements: Vec<Element>,
    root: usize,
    body: usize,
    body_attached: bool,
    active: Option<usize>,
    viewport: Viewport,
    window_scroll_y: f64,
    document_height: f64,
    events: Vec<RecordedEvent>,
    cancel_rules: Vec<(EventTarget<MemoryNode>, String)>,
    submitted_forms: Vec<MemoryNode>,
    native_clicks: Vec<MemoryNode>,
    panic_on_hit_test: bool,
    handle_releases: usize,
}

impl State {
    fn get(&self, node: &MemoryNode) -> Result<&Element, DomError> {
        match self.elements.get(node.0) {
            Some(el) if !el.removed => Ok(el),
            _ => Err(DomError::Detached(format!("{:?}", node))),
        }
    }

    fn get_mut(&mut self, node: &MemoryNode) -> Result<&mut Element, DomError> {
        match self.elements.get_mut(node.0) {
            Some(el) if !el.removed => Ok(el),
            _ => Err(DomError::Detached(format!("{:?}", node))),
        }
    }

    fn is_connected(&self, index: usize) -> bool {
        let mut current = Some(index);
        while let Some(i) = current {
            let el = &self.elements[i];
            if el.removed || (i == self.body && !self.body_attached) {
                return false;
            }
            if i == self.root {
                return true;
            }
            current = el.parent;
        }
        false
    }

    fn ancestors(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut current = self.elements[index].parent;
        while let Some(i) = current {
            out.push(i);
            current = self.elements[i].parent;
        }
        out
    }

    /// Connected elements in document order.
    fn preorder(&self) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(i) = stack.pop() {
            let el = &self.elements[i];
            if el.removed || (i == self.body && !self.body_attached) {
                continue;
            }
            out.push(i);
            stack.extend(el.children.iter().rev());
        }
        out
    }

    fn descendants(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.elements[index].children.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            let el = &self.elements[i];
            if el.removed {
                continue;
            }
            out.push(i);
            stack.extend(el.children.iter().rev());
        }
        out
    }

    fn push_element(&mut self, spec: ElementSpec, parent: usize) -> usize {
        let index = self.elements.len();
        self.elements.push(Element::from_spec(spec, Some(parent)));
        self.elements[parent].children.push(index);
        index
    }

    fn propagation_path(&self, target: &EventTarget<MemoryNode>, bubbles: bool) -> Vec<EventTarget<MemoryNode>> {
        let mut path = vec![target.clone()];
        if !bubbles {
            return path;
        }
        match target {
            EventTarget::Element(node) => {
                path.extend(
                    self.ancestors(node.0)
                        .into_iter()
                        .map(|i| EventTarget::Element(MemoryNode(i))),
                );
                path.push(EventTarget::Document);
                path.push(EventTarget::Window);
            }
            EventTarget::Document => path.push(EventTarget::Window),
            EventTarget::Window => {}
        }
        path
    }

    fn dispatch(&mut self, target: EventTarget<MemoryNode>, event: &SyntheticEvent) -> bool {
        let path = self.propagation_path(&target, event.bubbles);
        let prevented = event.cancelable
            && self.cancel_rules.iter().any(|(rule_target, rule_type)| {
                *rule_type == event.event_type && path.contains(rule_target)
            });
        self.events.push(RecordedEvent {
            target,
            event: event.clone(),
            not_cancelled: !prevented,
        });
        !prevented
    }

    fn enclosing_form(&self, index: usize) -> Option<usize> {
        self.ancestors(index)
            .into_iter()
            .find(|&i| self.elements[i].tag == "form")
    }
}

/// A headless page backing the [`Dom`] trait.
#[derive(Debug)]
pub struct MemoryDocument {
    state: Mutex<State>,
    body_ready: Notify,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// A document with an attached body covering the default viewport.
    pub fn new() -> Self {
        Self::with_viewport(Viewport::default())
    }

    pub fn with_viewport(viewport: Viewport) -> Self {
        let mut root = Element::from_spec(ElementSpec::new("html").hidden(), None);
        let body_spec = ElementSpec::new("body").rect(0.0, 0.0, viewport.inner_width, viewport.inner_height);
        root.children.push(1);
        let body = Element::from_spec(body_spec, Some(0));
        Self {
            state: Mutex::new(State {
                elements: vec![root, body],
                root: 0,
                body: 1,
                body_attached: true,
                active: None,
                viewport,
                window_scroll_y: 0.0,
                document_height: viewport.inner_height * 4.0,
                events: Vec::new(),
                cancel_rules: Vec::new(),
                submitted_forms: Vec::new(),
                native_clicks: Vec::new(),
                panic_on_hit_test: false,
                handle_releases: 0,
            }),
            body_ready: Notify::new(),
        }
    }

    /// A document still being parsed: the body exists but is not attached.
    pub fn without_body() -> Self {
        let doc = Self::new();
        doc.state.lock().body_attached = false;
        doc
    }

    /// Attach the body and wake anything waiting for it.
    pub fn attach_body(&self) {
        self.state.lock().body_attached = true;
        self.body_ready.notify_waiters();
    }

    /// Make the next hit-test panic, like a page hook that throws mid-action.
    pub fn panic_on_next_hit_test(&self) {
        self.state.lock().panic_on_hit_test = true;
    }

    pub fn set_document_height(&self, height: f64) {
        self.state.lock().document_height = height;
    }

    pub fn body_node(&self) -> MemoryNode {
        MemoryNode(self.state.lock().body)
    }

    /// Append a new element under `parent`.
    pub fn append(&self, parent: MemoryNode, spec: ElementSpec) -> MemoryNode {
        let mut state = self.state.lock();
        MemoryNode(state.push_element(spec, parent.0))
    }

    /// Make `event_type` call `preventDefault()` when it reaches `target`.
    pub fn cancel_event(&self, target: EventTarget<MemoryNode>, event_type: impl Into<String>) {
        self.state.lock().cancel_rules.push((target, event_type.into()));
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.state.lock().events.clone()
    }

    pub fn events_of(&self, event_type: &str) -> Vec<RecordedEvent> {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| e.event.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.state
            .lock()
            .events
            .iter()
            .map(|e| e.event.event_type.clone())
            .collect()
    }

    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    pub fn value(&self, node: MemoryNode) -> String {
        let state = self.state.lock();
        let el = &state.elements[node.0];
        if el.is_text_control() {
            el.value.clone()
        } else {
            el.text.clone()
        }
    }

    pub fn selection(&self, node: MemoryNode) -> (usize, usize) {
        self.state.lock().elements[node.0].selection
    }

    pub fn active(&self) -> Option<MemoryNode> {
        self.state.lock().active.map(MemoryNode)
    }

    pub fn scroll_top(&self, node: MemoryNode) -> f64 {
        self.state.lock().elements[node.0].scroll_top
    }

    pub fn window_scroll_y(&self) -> f64 {
        self.state.lock().window_scroll_y
    }

    /// The connected element with the given `id` attribute.
    pub fn find_by_id(&self, id: &str) -> Option<MemoryNode> {
        let state = self.state.lock();
        state
            .preorder()
            .into_iter()
            .find(|&i| state.elements[i].attr("id") == Some(id))
            .map(MemoryNode)
    }

    pub fn style(&self, node: MemoryNode, property: &str) -> Option<String> {
        self.state.lock().elements[node.0].style.get(property).cloned()
    }

    pub fn is_connected(&self, node: MemoryNode) -> bool {
        let state = self.state.lock();
        node.0 < state.elements.len() && state.is_connected(node.0)
    }

    pub fn submitted_forms(&self) -> Vec<MemoryNode> {
        self.state.lock().submitted_forms.clone()
    }

    pub fn native_clicks(&self) -> Vec<MemoryNode> {
        self.state.lock().native_clicks.clone()
    }

    /// How many times per-message handles were released.
    pub fn handle_releases(&self) -> usize {
        self.state.lock().handle_releases
    }
}

#[async_trait]
impl Dom for MemoryDocument {
    type Node = MemoryNode;

    async fn wait_for_body(&self) -> Result<MemoryNode, DomError> {
        loop {
            let notified = self.body_ready.notified();
            {
                let state = self.state.lock();
                if state.body_attached {
                    return Ok(MemoryNode(state.body));
                }
            }
            notified.await;
        }
    }

    async fn body(&self) -> Result<Option<MemoryNode>, DomError> {
        let state = self.state.lock();
        Ok(state.body_attached.then_some(MemoryNode(state.body)))
    }

    async fn element_from_point(&self, x: f64, y: f64) -> Result<Option<MemoryNode>, DomError> {
        let state = {
            let mut state = self.state.lock();
            if std::mem::take(&mut state.panic_on_hit_test) {
                drop(state);
                panic!("hit-test hook failed at ({}, {})", x, y);
            }
            state
        };
        let hit = state.preorder().into_iter().rev().find(|&i| {
            let el = &state.elements[i];
            el.hit_testable() && el.rect.map(|r| r.contains(x, y)).unwrap_or(false)
        });
        Ok(hit.map(MemoryNode))
    }

    async fn element_info(&self, node: &MemoryNode) -> Result<ElementInfo, DomError> {
        let state = self.state.lock();
        let el = state.get(node)?;
        let connected = state.is_connected(node.0);
        Ok(ElementInfo {
            tag: el.tag.clone(),
            id: el.attr("id").map(str::to_string),
            kind: el.kind(),
            input_type: (el.tag == "input")
                .then(|| el.attr("type").unwrap_or("text").to_lowercase()),
            name: el.attr("name").map(str::to_string),
            role: el.attr("role").map(str::to_string),
            focusable: connected && el.is_focusable(),
            has_layout_box: connected && el.rect.is_some(),
        })
    }

    async fn parent_element(&self, node: &MemoryNode) -> Result<Option<MemoryNode>, DomError> {
        let state = self.state.lock();
        Ok(state.get(node)?.parent.map(MemoryNode))
    }

    async fn dispatch_event(
        &self,
        target: EventTarget<MemoryNode>,
        event: &SyntheticEvent,
    ) -> Result<bool, DomError> {
        let mut state = self.state.lock();
        if let EventTarget::Element(node) = &target {
            state.get(node)?;
        }
        Ok(state.dispatch(target, event))
    }

    async fn focus(&self, node: &MemoryNode) -> Result<(), DomError> {
        let mut state = self.state.lock();
        let focusable = state.get(node)?.is_focusable() && state.is_connected(node.0);
        if focusable {
            state.active = Some(node.0);
        }
        Ok(())
    }

    async fn active_element(&self) -> Result<Option<MemoryNode>, DomError> {
        let state = self.state.lock();
        let active = state
            .active
            .filter(|&i| state.is_connected(i))
            .or(state.body_attached.then_some(state.body));
        Ok(active.map(MemoryNode))
    }

    async fn text_value(&self, node: &MemoryNode) -> Result<String, DomError> {
        let state = self.state.lock();
        let el = state.get(node)?;
        Ok(if el.is_text_control() {
            el.value.clone()
        } else {
            el.text.clone()
        })
    }

    async fn set_text_value(&self, node: &MemoryNode, value: &str) -> Result<(), DomError> {
        let mut state = self.state.lock();
        let el = state.get_mut(node)?;
        if el.is_text_control() {
            el.value = value.to_string();
        } else {
            el.text = value.to_string();
        }
        let end = el.text_len();
        el.selection = (end, end);
        Ok(())
    }

    async fn selection_range(&self, node: &MemoryNode) -> Result<(usize, usize), DomError> {
        let state = self.state.lock();
        Ok(state.get(node)?.selection)
    }

    async fn set_selection_range(
        &self,
        node: &MemoryNode,
        start: usize,
        end: usize,
    ) -> Result<(), DomError> {
        let mut state = self.state.lock();
        let el = state.get_mut(node)?;
        let len = el.text_len();
        let end = end.min(len);
        el.selection = (start.min(end), end);
        Ok(())
    }

    async fn select_all(&self, node: &MemoryNode) -> Result<(), DomError> {
        let mut state = self.state.lock();
        let el = state.get_mut(node)?;
        if !el.is_text_control() {
            return Err(DomError::Unsupported(format!("select() on <{}>", el.tag)));
        }
        el.selection = (0, el.text_len());
        Ok(())
    }

    async fn insert_text_at_selection(
        &self,
        node: &MemoryNode,
        text: &str,
    ) -> Result<bool, DomError> {
        let mut state = self.state.lock();
        let el = state.get_mut(node)?;
        if el.kind() != ElementKind::ContentEditable {
            return Err(DomError::Unsupported(format!("insertNode into <{}>", el.tag)));
        }
        let (start, end) = el.selection;
        let chars: Vec<char> = el.text.chars().collect();
        let start = start.min(chars.len());
        let end = end.clamp(start, chars.len());
        let mut updated: String = chars[..start].iter().collect();
        updated.push_str(text);
        updated.extend(&chars[end..]);
        el.text = updated;
        let caret = start + text.chars().count();
        el.selection = (caret, caret);
        Ok(true)
    }

    async fn scroll_metrics(&self, node: &MemoryNode) -> Result<ScrollMetrics, DomError> {
        let state = self.state.lock();
        let el = state.get(node)?;
        Ok(ScrollMetrics {
            overflow_y: el.overflow_y.clone(),
            scroll_top: el.scroll_top,
            scroll_height: el.scroll_height,
            client_height: el.client_height,
        })
    }

    async fn scroll_element_by(
        &self,
        node: &MemoryNode,
        delta_y: f64,
        _behavior: ScrollBehavior,
    ) -> Result<(), DomError> {
        let mut state = self.state.lock();
        let el = state.get_mut(node)?;
        let max = (el.scroll_height - el.client_height).max(0.0);
        el.scroll_top = (el.scroll_top + delta_y).clamp(0.0, max);
        Ok(())
    }

    async fn scroll_window_by(
        &self,
        delta_y: f64,
        _behavior: ScrollBehavior,
    ) -> Result<(), DomError> {
        let mut state = self.state.lock();
        let max = (state.document_height - state.viewport.inner_height).max(0.0);
        state.window_scroll_y = (state.window_scroll_y + delta_y).clamp(0.0, max);
        Ok(())
    }

    async fn viewport(&self) -> Result<Viewport, DomError> {
        Ok(self.state.lock().viewport)
    }

    async fn enclosing_form(&self, node: &MemoryNode) -> Result<Option<MemoryNode>, DomError> {
        let state = self.state.lock();
        state.get(node)?;
        Ok(state.enclosing_form(node.0).map(MemoryNode))
    }

    async fn submit_control(&self, form: &MemoryNode) -> Result<Option<MemoryNode>, DomError> {
        let state = self.state.lock();
        state.get(form)?;
        Ok(state
            .descendants(form.0)
            .into_iter()
            .find(|&i| state.elements[i].is_submit_control())
            .map(MemoryNode))
    }

    async fn click_element(&self, node: &MemoryNode) -> Result<(), DomError> {
        let mut state = self.state.lock();
        let is_submit = state.get(node)?.is_submit_control();
        state.native_clicks.push(*node);
        let click = SyntheticEvent::plain("click").cancelable(true);
        if !state.dispatch(EventTarget::Element(*node), &click) || !is_submit {
            return Ok(());
        }
        // Activation of a submit control submits its form unless the submit
        // event is prevented.
        if let Some(form) = state.enclosing_form(node.0) {
            let submit = SyntheticEvent::plain("submit").cancelable(true);
            if state.dispatch(EventTarget::Element(MemoryNode(form)), &submit) {
                state.submitted_forms.push(MemoryNode(form));
            }
        }
        Ok(())
    }

    async fn submit_form(&self, form: &MemoryNode) -> Result<(), DomError> {
        let mut state = self.state.lock();
        state.get(form)?;
        state.submitted_forms.push(*form);
        Ok(())
    }

    async fn focusable_elements(&self) -> Result<Vec<MemoryNode>, DomError> {
        let state = self.state.lock();
        Ok(state
            .preorder()
            .into_iter()
            .filter(|&i| {
                let el = &state.elements[i];
                el.matches_focus_selector() && el.rect.is_some()
            })
            .map(MemoryNode)
            .collect())
    }

    async fn create_overlay(
        &self,
        id: &str,
        styles: &[(&str, &str)],
    ) -> Result<MemoryNode, DomError> {
        let mut state = self.state.lock();
        if !state.body_attached {
            return Err(DomError::NoBody);
        }
        let body = state.body;
        let index = state.push_element(ElementSpec::new("div").id(id).hidden(), body);
        let el = &mut state.elements[index];
        for (property, value) in styles {
            el.style.insert((*property).to_string(), (*value).to_string());
        }
        Ok(MemoryNode(index))
    }

    async fn set_style(
        &self,
        node: &MemoryNode,
        property: &str,
        value: &str,
    ) -> Result<(), DomError> {
        let mut state = self.state.lock();
        state
            .get_mut(node)?
            .style
            .insert(property.to_string(), value.to_string());
        Ok(())
    }

    async fn set_text_content(&self, node: &MemoryNode, text: &str) -> Result<(), DomError> {
        let mut state = self.state.lock();
        state.get_mut(node)?.text = text.to_string();
        Ok(())
    }

    async fn remove_node(&self, node: &MemoryNode) -> Result<(), DomError> {
        let mut state = self.state.lock();
        let parent = state.get(node)?.parent;
        if let Some(p) = parent {
            state.elements[p].children.retain(|&c| c != node.0);
        }
        let el = &mut state.elements[node.0];
        el.removed = true;
        el.parent = None;
        if state.active == Some(node.0) {
            state.active = None;
        }
        Ok(())
    }

    async fn release_handles(&self) -> Result<(), DomError> {
        self.state.lock().handle_releases += 1;
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
