//! Synthetic DOM events.

use serde::Serialize;
use serde_json::{Map, Value};

/// The DOM event interface an event is constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventInterface {
    Event,
    PointerEvent,
    MouseEvent,
    FocusEvent,
    KeyboardEvent,
    WheelEvent,
    InputEvent,
}

impl EventInterface {
    pub fn as_str(self) -> &'static str {
        match self {
            EventInterface::Event => "Event",
            EventInterface::PointerEvent => "PointerEvent",
            EventInterface::MouseEvent => "MouseEvent",
            EventInterface::FocusEvent => "FocusEvent",
            EventInterface::KeyboardEvent => "KeyboardEvent",
            EventInterface::WheelEvent => "WheelEvent",
            EventInterface::InputEvent => "InputEvent",
        }
    }
}

/// Pointer and mouse event fields. Pointer-only fields are ignored by
/// `MouseEvent` constructors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MouseInit {
    pub client_x: f64,
    pub client_y: f64,
    pub screen_x: f64,
    pub screen_y: f64,
    pub button: i16,
    pub buttons: u16,
    pub detail: u32,
    pub pointer_id: u32,
    pub pointer_type: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyInit {
    pub key: String,
    pub code: String,
    pub key_code: u32,
    pub which: u32,
    pub ctrl_key: bool,
    pub alt_key: bool,
    pub shift_key: bool,
    pub meta_key: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelInit {
    pub client_x: f64,
    pub client_y: f64,
    pub delta_x: f64,
    pub delta_y: f64,
    pub delta_mode: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputInit {
    pub input_type: String,
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventInit {
    Plain,
    Mouse(MouseInit),
    Key(KeyInit),
    Wheel(WheelInit),
    Input(InputInit),
}

/// An event to construct and dispatch in the page.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticEvent {
    pub event_type: String,
    pub interface: EventInterface,
    pub bubbles: bool,
    pub cancelable: bool,
    pub composed: bool,
    pub init: EventInit,
}

impl SyntheticEvent {
    /// A plain `Event` that bubbles and cannot be cancelled.
    pub fn plain(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            interface: EventInterface::Event,
            bubbles: true,
            cancelable: false,
            composed: false,
            init: EventInit::Plain,
        }
    }

    pub fn new(event_type: impl Into<String>, interface: EventInterface, init: EventInit) -> Self {
        Self {
            event_type: event_type.into(),
            interface,
            bubbles: true,
            cancelable: true,
            composed: false,
            init,
        }
    }

    pub fn bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    pub fn cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    pub fn composed(mut self, composed: bool) -> Self {
        self.composed = composed;
        self
    }

    pub fn mouse(&self) -> Option<&MouseInit> {
        match &self.init {
            EventInit::Mouse(m) => Some(m),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<&KeyInit> {
        match &self.init {
            EventInit::Key(k) => Some(k),
            _ => None,
        }
    }

    pub fn wheel(&self) -> Option<&WheelInit> {
        match &self.init {
            EventInit::Wheel(w) => Some(w),
            _ => None,
        }
    }

    pub fn input(&self) -> Option<&InputInit> {
        match &self.init {
            EventInit::Input(i) => Some(i),
            _ => None,
        }
    }

    /// The init dictionary passed to the event constructor in the page.
    pub fn init_dict(&self) -> Value {
        let mut dict = match serde_json::to_value(&self.init) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        dict.insert("bubbles".into(), Value::Bool(self.bubbles));
        dict.insert("cancelable".into(), Value::Bool(self.cancelable));
        dict.insert("composed".into(), Value::Bool(self.composed));
        Value::Object(dict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_event_defaults() {
        let e = SyntheticEvent::plain("change");
        assert!(e.bubbles);
        assert!(!e.cancelable);
        assert_eq!(e.interface, EventInterface::Event);
        assert!(e.mouse().is_none());
    }

    #[test]
    fn test_init_dict_merges_flags() {
        let e = SyntheticEvent::new(
            "wheel",
            EventInterface::WheelEvent,
            EventInit::Wheel(WheelInit {
                client_x: 1.0,
                client_y: 2.0,
                delta_x: 0.0,
                delta_y: 100.0,
                delta_mode: 0,
            }),
        )
        .composed(true);
        let dict = e.init_dict();
        assert_eq!(dict["deltaY"], 100.0);
        assert_eq!(dict["deltaMode"], 0);
        assert_eq!(dict["bubbles"], true);
        assert_eq!(dict["cancelable"], true);
        assert_eq!(dict["composed"], true);
    }

    #[test]
    fn test_plain_init_dict_has_only_flags() {
        let dict = SyntheticEvent::plain("input").init_dict();
        assert_eq!(dict.as_object().map(|m| m.len()), Some(3));
    }

    #[test]
    fn test_key_init_camel_case() {
        let e = SyntheticEvent::new(
            "keydown",
            EventInterface::KeyboardEvent,
            EventInit::Key(KeyInit {
                key: "a".into(),
                code: "KeyA".into(),
                key_code: 65,
                which: 65,
                ctrl_key: true,
                alt_key: false,
                shift_key: false,
                meta_key: false,
            }),
        );
        let dict = e.init_dict();
        assert_eq!(dict["keyCode"], 65);
        assert_eq!(dict["ctrlKey"], true);
    }
}
