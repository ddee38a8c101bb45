//! [`Dom`] over a CDP page session.
//!
//! Element handles are `Runtime` remote objects. Every element also gets a
//! per-document numeric key so two handles to the same element compare
//! equal even though their object ids differ.
//!
//! Handles taken while serving a message live in [`MESSAGE_GROUP`] and are
//! released together once the message is answered. Overlay handles outlive
//! messages, so they live in [`OVERLAY_GROUP`] and are released one by one
//! when the overlay is removed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pagepilot_page::{
    Dom, DomError, ElementInfo, ElementKind, EventTarget, ScrollBehavior, ScrollMetrics,
    SyntheticEvent, Viewport,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::cdp::{CallArgument, CdpError, PageSession, PropertyDescriptor, RemoteObject};

const BODY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Object group for handles scoped to one message.
pub const MESSAGE_GROUP: &str = "pagepilot-message";
/// Object group for overlay handles.
pub const OVERLAY_GROUP: &str = "pagepilot-overlay";

const NODE_KEY_FN: &str = r#"function() {
    const w = window;
    if (!w.__pagepilotKeys) { w.__pagepilotKeys = new WeakMap(); w.__pagepilotNextKey = 1; }
    let key = w.__pagepilotKeys.get(this);
    if (!key) { key = w.__pagepilotNextKey++; w.__pagepilotKeys.set(this, key); }
    return key;
}"#;

// Same keys as NODE_KEY_FN, for every element of an array in one call.
const NODE_KEYS_FN: &str = r#"function() {
    const w = window;
    if (!w.__pagepilotKeys) { w.__pagepilotKeys = new WeakMap(); w.__pagepilotNextKey = 1; }
    return this.map((el) => {
        let key = w.__pagepilotKeys.get(el);
        if (!key) { key = w.__pagepilotNextKey++; w.__pagepilotKeys.set(el, key); }
        return key;
    });
}"#;

const ELEMENT_INFO_FN: &str = r#"function() {
    const tag = this.tagName.toLowerCase();
    const kind = tag === 'input' ? 'input'
        : tag === 'textarea' ? 'textarea'
        : this.isContentEditable ? 'contenteditable' : 'other';
    const focusable = typeof this.focus === 'function' && !this.disabled
        && (this.tabIndex >= 0 || this.isContentEditable);
    return {
        tag,
        id: this.id || null,
        kind,
        inputType: tag === 'input' ? (this.getAttribute('type') || 'text').toLowerCase() : null,
        name: this.getAttribute('name'),
        role: this.getAttribute('role'),
        focusable,
        hasLayoutBox: this.getClientRects().length > 0,
    };
}"#;

const DISPATCH_EVENT_FN: &str = r#"function(type, iface, init) {
    const Ctor = (typeof window[iface] === 'function') ? window[iface] : Event;
    return this.dispatchEvent(new Ctor(type, init));
}"#;

// Goes through the prototype setter so framework-controlled inputs see the change.
const SET_VALUE_FN: &str = r#"function(value) {
    const proto = Object.getPrototypeOf(this);
    const desc = Object.getOwnPropertyDescriptor(proto, 'value');
    if (desc && desc.set) { desc.set.call(this, value); } else { this.value = value; }
}"#;

const SELECTION_RANGE_FN: &str = r#"function() {
    const value = this.value || '';
    const chars = (i) => Array.from(value.slice(0, i || 0)).length;
    let start = 0, end = 0;
    try { start = this.selectionStart; end = this.selectionEnd; } catch (_) {}
    return [chars(start), chars(end)];
}"#;

const SET_SELECTION_RANGE_FN: &str = r#"function(start, end) {
    const chars = Array.from(this.value || '');
    const units = (i) => chars.slice(0, i).join('').length;
    try { this.setSelectionRange(units(start), units(end)); } catch (_) {}
}"#;

const INSERT_TEXT_FN: &str = r#"function(text) {
    const sel = window.getSelection();
    if (!sel || sel.rangeCount === 0) return false;
    const range = sel.getRangeAt(0);
    range.deleteContents();
    const node = document.createTextNode(text);
    range.insertNode(node);
    range.setStartAfter(node);
    range.collapse(true);
    sel.removeAllRanges();
    sel.addRange(range);
    return true;
}"#;

const SCROLL_METRICS_FN: &str = r#"function() {
    return {
        overflowY: getComputedStyle(this).overflowY,
        scrollTop: this.scrollTop,
        scrollHeight: this.scrollHeight,
        clientHeight: this.clientHeight,
    };
}"#;

const SUBMIT_CONTROL_FN: &str = r#"function() {
    return this.querySelector('button:not([type]), button[type="submit"], input[type="submit"], input[type="image"]');
}"#;

const FOCUSABLE_SELECTOR: &str =
    r#"button, input, select, textarea, [href], [tabindex]:not([tabindex="-1"])"#;

const CREATE_OVERLAY_FN: &str = r#"function(id, styles) {
    const el = document.createElement('div');
    el.id = id;
    for (const [property, value] of styles) el.style.setProperty(property, value);
    this.appendChild(el);
    return el;
}"#;

const VIEWPORT_EXPR: &str = "({innerWidth: window.innerWidth, innerHeight: window.innerHeight, \
     devicePixelRatio: window.devicePixelRatio, screenX: window.screenX, screenY: window.screenY})";

/// Handle to an element in a CDP-driven page.
#[derive(Debug, Clone)]
pub struct CdpNode {
    key: u64,
    object_id: String,
}

impl CdpNode {
    pub fn object_id(&self) -> &str {
        &self.object_id
    }
}

impl PartialEq for CdpNode {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawElementInfo {
    tag: String,
    id: Option<String>,
    kind: String,
    input_type: Option<String>,
    name: Option<String>,
    role: Option<String>,
    focusable: bool,
    has_layout_box: bool,
}

impl From<RawElementInfo> for ElementInfo {
    fn from(raw: RawElementInfo) -> Self {
        let kind = match raw.kind.as_str() {
            "input" => ElementKind::Input,
            "textarea" => ElementKind::TextArea,
            "contenteditable" => ElementKind::ContentEditable,
            _ => ElementKind::Other,
        };
        let mut info = ElementInfo::new(raw.tag, kind);
        info.id = raw.id;
        info.input_type = raw.input_type;
        info.name = raw.name;
        info.role = raw.role;
        info.focusable = raw.focusable;
        info.has_layout_box = raw.has_layout_box;
        info
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScrollMetrics {
    overflow_y: String,
    scroll_top: f64,
    scroll_height: f64,
    client_height: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawViewport {
    inner_width: f64,
    inner_height: f64,
    device_pixel_ratio: f64,
    screen_x: f64,
    screen_y: f64,
}

fn dom_error(e: CdpError) -> DomError {
    if e.is_stale_reference() {
        return DomError::Detached(e.to_string());
    }
    match e {
        CdpError::JavaScript(text) => DomError::Script(text),
        other => DomError::Bridge(other.to_string()),
    }
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, DomError> {
    serde_json::from_value(value)
        .map_err(|e| DomError::Bridge(format!("Unexpected {} from page: {}", what, e)))
}

/// A page reached through a CDP session.
pub struct CdpDom {
    session: Arc<PageSession>,
}

impl CdpDom {
    pub fn new(session: Arc<PageSession>) -> Self {
        Self { session }
    }

    async fn node_from(&self, remote: RemoteObject) -> Result<Option<CdpNode>, DomError> {
        let Some(object_id) = remote.live_object_id() else {
            return Ok(None);
        };
        let key = self
            .session
            .call_function_on(object_id, NODE_KEY_FN, &[])
            .await
            .map_err(dom_error)?;
        let key = key
            .as_u64()
            .ok_or_else(|| DomError::Bridge(format!("Invalid node key: {}", key)))?;
        Ok(Some(CdpNode {
            key,
            object_id: object_id.to_string(),
        }))
    }

    async fn eval_node(&self, expression: &str) -> Result<Option<CdpNode>, DomError> {
        let remote = self
            .session
            .evaluate_handle(expression, MESSAGE_GROUP)
            .await
            .map_err(dom_error)?;
        self.node_from(remote).await
    }

    async fn call_node(
        &self,
        node: &CdpNode,
        function: &str,
        args: &[CallArgument],
        object_group: &str,
    ) -> Result<Option<CdpNode>, DomError> {
        let remote = self
            .session
            .call_function_on_handle(&node.object_id, function, args, object_group)
            .await
            .map_err(dom_error)?;
        self.node_from(remote).await
    }

    async fn call(
        &self,
        object_id: &str,
        function: &str,
        args: &[CallArgument],
    ) -> Result<Value, DomError> {
        self.session
            .call_function_on(object_id, function, args)
            .await
            .map_err(dom_error)
    }

    async fn global_object_id(&self, expression: &str) -> Result<String, DomError> {
        let remote = self
            .session
            .evaluate_handle(expression, MESSAGE_GROUP)
            .await
            .map_err(dom_error)?;
        remote
            .live_object_id()
            .map(str::to_string)
            .ok_or_else(|| DomError::Bridge(format!("{} is not available", expression)))
    }
}

#[async_trait]
impl Dom for CdpDom {
    type Node = CdpNode;

    async fn wait_for_body(&self) -> Result<CdpNode, DomError> {
        loop {
            if let Some(body) = self.body().await? {
                return Ok(body);
            }
            tokio::time::sleep(BODY_POLL_INTERVAL).await;
        }
    }

    async fn body(&self) -> Result<Option<CdpNode>, DomError> {
        self.eval_node("document.body").await
    }

    async fn element_from_point(&self, x: f64, y: f64) -> Result<Option<CdpNode>, DomError> {
        self.eval_node(&format!("document.elementFromPoint({}, {})", x, y))
            .await
    }

    async fn element_info(&self, node: &CdpNode) -> Result<ElementInfo, DomError> {
        let raw = self.call(&node.object_id, ELEMENT_INFO_FN, &[]).await?;
        Ok(decode::<RawElementInfo>(raw, "element info")?.into())
    }

    async fn parent_element(&self, node: &CdpNode) -> Result<Option<CdpNode>, DomError> {
        self.call_node(
            node,
            "function() { return this.parentElement; }",
            &[],
            MESSAGE_GROUP,
        )
        .await
    }

    async fn dispatch_event(
        &self,
        target: EventTarget<CdpNode>,
        event: &SyntheticEvent,
    ) -> Result<bool, DomError> {
        let object_id = match target {
            EventTarget::Document => self.global_object_id("document").await?,
            EventTarget::Window => self.global_object_id("window").await?,
            EventTarget::Element(node) => node.object_id,
        };
        let args = [
            CallArgument::value(event.event_type.as_str()),
            CallArgument::value(event.interface.as_str()),
            CallArgument::value(event.init_dict()),
        ];
        let not_prevented = self.call(&object_id, DISPATCH_EVENT_FN, &args).await?;
        Ok(not_prevented.as_bool().unwrap_or(true))
    }

    async fn focus(&self, node: &CdpNode) -> Result<(), DomError> {
        self.call(&node.object_id, "function() { this.focus(); }", &[])
            .await?;
        Ok(())
    }

    async fn active_element(&self) -> Result<Option<CdpNode>, DomError> {
        self.eval_node("document.activeElement").await
    }

    async fn text_value(&self, node: &CdpNode) -> Result<String, DomError> {
        let value = self
            .call(
                &node.object_id,
                "function() { return this.value == null ? '' : String(this.value); }",
                &[],
            )
            .await?;
        decode(value, "value")
    }

    async fn set_text_value(&self, node: &CdpNode, value: &str) -> Result<(), DomError> {
        self.call(&node.object_id, SET_VALUE_FN, &[CallArgument::value(value)])
            .await?;
        Ok(())
    }

    async fn selection_range(&self, node: &CdpNode) -> Result<(usize, usize), DomError> {
        let range = self.call(&node.object_id, SELECTION_RANGE_FN, &[]).await?;
        decode(range, "selection range")
    }

    async fn set_selection_range(
        &self,
        node: &CdpNode,
        start: usize,
        end: usize,
    ) -> Result<(), DomError> {
        let args = [CallArgument::value(start), CallArgument::value(end)];
        self.call(&node.object_id, SET_SELECTION_RANGE_FN, &args)
            .await?;
        Ok(())
    }

    async fn select_all(&self, node: &CdpNode) -> Result<(), DomError> {
        self.call(
            &node.object_id,
            "function() { if (typeof this.select === 'function') this.select(); }",
            &[],
        )
        .await?;
        Ok(())
    }

    async fn insert_text_at_selection(
        &self,
        node: &CdpNode,
        text: &str,
    ) -> Result<bool, DomError> {
        let inserted = self
            .call(&node.object_id, INSERT_TEXT_FN, &[CallArgument::value(text)])
            .await?;
        Ok(inserted.as_bool().unwrap_or(false))
    }

    async fn scroll_metrics(&self, node: &CdpNode) -> Result<ScrollMetrics, DomError> {
        let raw: RawScrollMetrics =
            decode(self.call(&node.object_id, SCROLL_METRICS_FN, &[]).await?, "scroll metrics")?;
        Ok(ScrollMetrics {
            overflow_y: raw.overflow_y,
            scroll_top: raw.scroll_top,
            scroll_height: raw.scroll_height,
            client_height: raw.client_height,
        })
    }

    async fn scroll_element_by(
        &self,
        node: &CdpNode,
        delta_y: f64,
        behavior: ScrollBehavior,
    ) -> Result<(), DomError> {
        let args = [
            CallArgument::value(delta_y),
            CallArgument::value(behavior.as_str()),
        ];
        self.call(
            &node.object_id,
            "function(top, behavior) { this.scrollBy({top, behavior}); }",
            &args,
        )
        .await?;
        Ok(())
    }

    async fn scroll_window_by(
        &self,
        delta_y: f64,
        behavior: ScrollBehavior,
    ) -> Result<(), DomError> {
        self.session
            .evaluate(&format!(
                "window.scrollBy({{top: {}, behavior: '{}'}})",
                delta_y,
                behavior.as_str()
            ))
            .await
            .map_err(dom_error)?;
        Ok(())
    }

    async fn viewport(&self) -> Result<Viewport, DomError> {
        let value = self.session.evaluate(VIEWPORT_EXPR).await.map_err(dom_error)?;
        let raw: RawViewport = decode(value, "viewport")?;
        Ok(Viewport {
            inner_width: raw.inner_width,
            inner_height: raw.inner_height,
            device_pixel_ratio: raw.device_pixel_ratio,
            screen_x: raw.screen_x,
            screen_y: raw.screen_y,
        })
    }

    async fn enclosing_form(&self, node: &CdpNode) -> Result<Option<CdpNode>, DomError> {
        self.call_node(
            node,
            "function() { return this.form || this.closest('form'); }",
            &[],
            MESSAGE_GROUP,
        )
        .await
    }

    async fn submit_control(&self, form: &CdpNode) -> Result<Option<CdpNode>, DomError> {
        self.call_node(form, SUBMIT_CONTROL_FN, &[], MESSAGE_GROUP)
            .await
    }

    async fn click_element(&self, node: &CdpNode) -> Result<(), DomError> {
        self.call(&node.object_id, "function() { this.click(); }", &[])
            .await?;
        Ok(())
    }

    async fn submit_form(&self, form: &CdpNode) -> Result<(), DomError> {
        self.call(
            &form.object_id,
            "function() { HTMLFormElement.prototype.submit.call(this); }",
            &[],
        )
        .await?;
        Ok(())
    }

    async fn focusable_elements(&self) -> Result<Vec<CdpNode>, DomError> {
        let list = self
            .global_object_id(&format!(
                "Array.from(document.querySelectorAll('{}')).filter((el) => el.getClientRects().length > 0)",
                FOCUSABLE_SELECTOR.replace('\'', "\\'")
            ))
            .await?;
        let keys: Vec<u64> = decode(self.call(&list, NODE_KEYS_FN, &[]).await?, "node keys")?;
        let properties = self.session.get_properties(&list).await.map_err(dom_error)?;
        Ok(array_nodes(properties, &keys))
    }

    async fn create_overlay(
        &self,
        id: &str,
        styles: &[(&str, &str)],
    ) -> Result<CdpNode, DomError> {
        let body = self.body().await?.ok_or(DomError::NoBody)?;
        let styles: Vec<[&str; 2]> = styles.iter().map(|(p, v)| [*p, *v]).collect();
        let args = [
            CallArgument::value(id),
            CallArgument::value(serde_json::json!(styles)),
        ];
        self.call_node(&body, CREATE_OVERLAY_FN, &args, OVERLAY_GROUP)
            .await?
            .ok_or_else(|| DomError::Bridge("Overlay was not created".to_string()))
    }

    async fn set_style(&self, node: &CdpNode, property: &str, value: &str) -> Result<(), DomError> {
        let args = [CallArgument::value(property), CallArgument::value(value)];
        self.call(
            &node.object_id,
            "function(property, value) { this.style.setProperty(property, value); }",
            &args,
        )
        .await?;
        Ok(())
    }

    async fn set_text_content(&self, node: &CdpNode, text: &str) -> Result<(), DomError> {
        self.call(
            &node.object_id,
            "function(text) { this.textContent = text; }",
            &[CallArgument::value(text)],
        )
        .await?;
        Ok(())
    }

    async fn remove_node(&self, node: &CdpNode) -> Result<(), DomError> {
        self.call(&node.object_id, "function() { this.remove(); }", &[])
            .await?;
        if let Err(e) = self.session.release_object(&node.object_id).await {
            debug!(error = %e, "Failed to release removed node");
        }
        Ok(())
    }

    async fn release_handles(&self) -> Result<(), DomError> {
        self.session
            .release_object_group(MESSAGE_GROUP)
            .await
            .map_err(dom_error)
    }
}

/// Pair the indexed entries of an array's properties with their node keys.
fn array_nodes(properties: Vec<PropertyDescriptor>, keys: &[u64]) -> Vec<CdpNode> {
    let mut entries: Vec<(usize, String)> = properties
        .into_iter()
        .filter_map(|property| {
            let index = property.name.parse::<usize>().ok()?;
            let value = property.value?;
            Some((index, value.live_object_id()?.to_string()))
        })
        .collect();
    entries.sort_by_key(|(index, _)| *index);
    entries
        .into_iter()
        .filter_map(|(index, object_id)| {
            keys.get(index).map(|&key| CdpNode { key, object_id })
        })
        .collect()
}

#[cfg(test)]
#[path = "cdp_dom_tests.rs"]
mod tests;
