//! Input vocabulary shared by the orchestrator and the content script.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::WireError;

/// A page-relative point in CSS pixels.
///
/// Crosses the messaging boundary as the colon-joined string `"x:y"`. Decoding
/// also accepts `{"x": .., "y": ..}` and `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting NaN and infinite components.
    pub fn new(x: f64, y: f64) -> Result<Self, WireError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(WireError::InvalidCoordinates(format!("{}:{}", x, y)));
        }
        Ok(Self { x, y })
    }

    /// Parse the `"x:y"` form.
    pub fn parse(raw: &str) -> Result<Self, WireError> {
        let invalid = || WireError::InvalidCoordinates(raw.to_string());
        let (x, y) = raw.trim().split_once(':').ok_or_else(invalid)?;
        let x: f64 = x.trim().parse().map_err(|_| invalid())?;
        let y: f64 = y.trim().parse().map_err(|_| invalid())?;
        Self::new(x, y).map_err(|_| invalid())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

impl FromStr for Coordinate {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Coordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Coordinate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Joined(String),
            Pair { x: f64, y: f64 },
            Tuple(f64, f64),
        }

        let coordinate = match Repr::deserialize(deserializer)? {
            Repr::Joined(raw) => Coordinate::parse(&raw),
            Repr::Pair { x, y } | Repr::Tuple(x, y) => Coordinate::new(x, y),
        };
        coordinate.map_err(serde::de::Error::custom)
    }
}

/// Number of clicks in a simulated click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickType {
    #[default]
    Single,
    Double,
    Triple,
}

impl ClickType {
    pub fn click_count(self) -> u32 {
        match self {
            ClickType::Single => 1,
            ClickType::Double => 2,
            ClickType::Triple => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClickType::Single => "single",
            ClickType::Double => "double",
            ClickType::Triple => "triple",
        }
    }
}

/// Direction of a whole-page scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            ScrollDirection::Up => "up",
            ScrollDirection::Down => "down",
        }
    }

    /// The key a human would press to scroll this way.
    pub fn page_key(self) -> &'static str {
        match self {
            ScrollDirection::Up => "PageUp",
            ScrollDirection::Down => "PageDown",
        }
    }
}

/// A keyboard modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Control,
    Alt,
    Shift,
    Meta,
}

impl Modifier {
    /// Parse a modifier name, accepting the usual aliases case-insensitively.
    pub fn parse(raw: &str) -> Result<Self, WireError> {
        match raw.trim().to_lowercase().as_str() {
            "control" | "ctrl" => Ok(Modifier::Control),
            "alt" | "option" => Ok(Modifier::Alt),
            "shift" => Ok(Modifier::Shift),
            "meta" | "cmd" | "command" | "super" => Ok(Modifier::Meta),
            _ => Err(WireError::UnknownModifier(raw.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Modifier::Control => "control",
            Modifier::Alt => "alt",
            Modifier::Shift => "shift",
            Modifier::Meta => "meta",
        }
    }
}

/// Flags carried by a synthetic keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModifierState {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl ModifierState {
    /// Build the state from modifier names, failing on the first unknown one.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, WireError> {
        let mut state = Self::default();
        for name in names {
            match Modifier::parse(name.as_ref())? {
                Modifier::Control => state.ctrl = true,
                Modifier::Alt => state.alt = true,
                Modifier::Shift => state.shift = true,
                Modifier::Meta => state.meta = true,
            }
        }
        Ok(state)
    }

    pub fn is_empty(&self) -> bool {
        !(self.ctrl || self.alt || self.shift || self.meta)
    }
}
