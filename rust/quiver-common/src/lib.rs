//! Core definitions (error type, result alias and verification helpers),
//! relied upon by all quiver-* crates.

pub mod error;
pub mod macros;
pub mod result;

pub use error::{Error, ErrorKind};
pub use result::Result;
