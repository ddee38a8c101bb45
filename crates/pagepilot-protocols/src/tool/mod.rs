//! Tool protocol definitions.
//!
//! Tools are the only surface the LLM loop sees. Each one relays a single
//! page action or tab operation and reports a [`ToolOutcome`].

mod context;
mod definition;
mod name;
mod result;
mod traits;

pub use context::*;
pub use definition::*;
pub use name::*;
pub use result::*;
pub use traits::*;
