//! Common types shared across the PagePilot workspace.

mod common;
mod content;
mod tab;

pub use common::*;
pub use content::*;
pub use tab::*;
