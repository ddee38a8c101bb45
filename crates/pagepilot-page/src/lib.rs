//! # PagePilot Page
//!
//! The content-script half of PagePilot. Everything here runs against a
//! single page through the [`Dom`] trait, so the same action code drives a
//! real Chrome tab (via a CDP-backed `Dom`) and the in-memory
//! [`MemoryDocument`] used in tests.
//!
//! Layers, bottom up:
//!
//! - [`dom`] - the page abstraction and the in-memory document
//! - [`events`] - native-like pointer, mouse, keyboard and wheel sequences
//! - [`indicators`] - click ring and key-press toast overlays
//! - [`actions`] - click, type, key press, scroll, screenshot processing
//! - [`router`] / [`runtime`] - message decoding, dispatch and the per-page task

pub mod actions;
pub mod dom;
pub mod error;
pub mod events;
pub mod indicators;
pub mod router;
pub mod runtime;
pub mod timings;

pub use actions::{PageActions, ProcessedScreenshot, ScreenshotJob};
pub use dom::{
    Dom, ElementInfo, ElementKind, ElementSpec, EventInterface, EventTarget, MemoryDocument,
    MemoryNode, Rect, ScrollBehavior, ScrollMetrics, SyntheticEvent, Viewport,
};
pub use error::{DomError, PageError};
pub use events::EventSynthesizer;
pub use indicators::{ClickIndicator, KeyPressIndicator};
pub use router::{ContentScript, RouterState};
pub use runtime::{ContentScriptHandle, PageEvent};
pub use timings::Timings;
