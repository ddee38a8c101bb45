//! Chrome DevTools Protocol (CDP) client.
//!
//! One WebSocket to the browser carries every command. Page targets are
//! attached as flattened sessions on that socket; responses are matched by
//! request id and events are routed by session id.
//!
//! ```rust,ignore
//! let client = CdpClient::connect("http://127.0.0.1:9222").await?;
//! let target = client.create_target("about:blank").await?;
//! let page = client.attach(&target).await?;
//! page.navigate("https://example.com").await?;
//! ```

mod client;
mod error;
mod protocol;
mod session;

pub use client::{CdpClient, COMMAND_TIMEOUT};
pub use error::CdpError;
pub use protocol::*;
pub use session::PageSession;
