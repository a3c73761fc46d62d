//! Core types and utilities for the dirwire protocol stack
//!
//! This crate provides the error taxonomy and configuration shared by
//! the ASN.1 reader and the transport layer.

pub mod error;
pub mod settings;

pub use error::{DirError, DirResult, ErrorKind};
pub use settings::ReaderSettings;
