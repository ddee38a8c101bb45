//! Error types for the PagePilot protocol layer.

mod panic;
mod tool;
mod transport;
mod wire;

pub use panic::panic_message;
pub use tool::*;
pub use transport::*;
pub use wire::*;
