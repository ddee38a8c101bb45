//! # PagePilot Browser
//!
//! The privileged half of PagePilot: everything that runs outside the page.
//!
//! - [`cdp`] - Chrome DevTools Protocol client and page sessions
//! - [`CdpDom`] - the page's DOM seen through CDP, for the content script
//! - [`host`] - the tab API tools run against, over CDP or in memory
//! - [`launcher`] - finding and starting a local Chrome
//! - [`tools`] - the tool catalog
//! - [`ToolDispatcher`] - tool lookup, tab resolution, per-tab ordering
//!
//! ```rust,ignore
//! let client = Arc::new(CdpClient::connect("http://127.0.0.1:9222").await?);
//! let host = Arc::new(CdpTabHost::new(client, Timings::default(), ScreenshotFormat::Webp));
//! let dispatcher = ToolDispatcher::with_default_tools(host, DEFAULT_NAVIGATION_TIMEOUT)?;
//! let outcome = dispatcher
//!     .invoke(&ToolInvocation::new("page_down", json!({})), ToolContext::new("cli"))
//!     .await;
//! ```

pub mod cdp;
mod cdp_dom;
mod dispatcher;
mod error;
pub mod host;
pub mod launcher;
mod registry;
pub mod tools;

pub use cdp::{CdpClient, CdpError, PageSession};
pub use cdp_dom::{CdpDom, CdpNode};
pub use dispatcher::ToolDispatcher;
pub use error::BrowserError;
pub use host::{CdpTabHost, MemoryTabHost, TabHost, UpdateListeners, UpdateSubscription};
pub use launcher::ChromeLauncher;
pub use registry::ToolRegistry;
pub use tools::{DEFAULT_NAVIGATION_TIMEOUT, default_tools};
