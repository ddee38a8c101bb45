//! The content-script messaging contract.

mod envelope;
mod input;
mod response;

pub use envelope::*;
pub use input::*;
pub use response::*;
