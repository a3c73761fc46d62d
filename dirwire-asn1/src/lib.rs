//! ASN.1 processing module for the dirwire protocol stack
//!
//! This crate provides an incremental BER reader that decodes protocol
//! elements out of a byte stream arriving in arbitrary fragments, without
//! blocking the task that services the connection.
//!
//! - [`ber`]: TLV state machine, scope tracking and header types
//! - [`source`]: the byte source contract and an in-memory implementation
//! - [`pool`]: reader reuse across connections
//! - [`trace`]: observers for decoded elements

pub mod ber;
pub mod error;
pub mod pool;
pub mod source;
pub mod trace;

pub use ber::{tags, Asn1StreamReader, Header, ReadState, Step};
pub use error::{DirError, DirResult, ErrorKind};
pub use pool::{Poolable, PooledReader, ReaderPool};
pub use source::{BufferedSource, ByteSource};
pub use trace::{LogObserver, NoopObserver, ReadEvent, ReadObserver};
