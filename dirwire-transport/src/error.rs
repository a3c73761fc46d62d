//! Error types shared with the rest of the stack

pub use dirwire_core::error::{DirError, DirResult};
