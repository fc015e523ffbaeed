//! Helper functions for rendering
//!
//! Date formatting and URL building shared by the generator and the server.

mod date;
mod url;

pub use date::*;
pub use url::*;
