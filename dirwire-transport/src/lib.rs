//! Transport layer module for the dirwire protocol stack
//!
//! This crate owns the connection side of decoding: it reads whatever the
//! peer has sent, feeds it into the reader's buffered source and reports
//! once a complete element can be decoded.

pub mod error;
pub mod pump;
pub mod stream;
pub mod tcp;

pub use error::{DirError, DirResult};
pub use pump::ElementPump;
pub use stream::{StreamAccessor, TransportSettings};
pub use tcp::{StreamTransport, TcpTransport};
