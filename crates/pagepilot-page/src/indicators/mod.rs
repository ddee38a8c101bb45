//! On-page visual feedback.
//!
//! Both overlays are owned by one content script for the lifetime of a page.
//! They mount lazily on first `show`, once the body exists, and `cleanup`
//! returns them to the unmounted state so the next `show` mounts again.

mod click;
mod key;

pub use click::{ClickIndicator, CLICK_INDICATOR_ID};
pub use key::{format_key_display, KeyPressIndicator, KEY_INDICATOR_ID};

use std::time::Duration;

use crate::dom::Dom;
use crate::error::DomError;

/// Wait for the body to mount an overlay into, giving up after `limit`.
async fn wait_for_body<D: Dom>(dom: &D, limit: Duration) -> Result<D::Node, DomError> {
    tokio::time::timeout(limit, dom.wait_for_body())
        .await
        .map_err(|_| DomError::NoBody)?
}

/// Remove an overlay, treating an already detached node as removed.
async fn remove_overlay<D: Dom>(dom: &D, node: &D::Node) -> Result<(), DomError> {
    match dom.remove_node(node).await {
        Ok(()) | Err(DomError::Detached(_)) => Ok(()),
        Err(e) => Err(e),
    }
}
