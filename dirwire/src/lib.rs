//! dirwire - wire decoding layer of a directory server network stack
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `dirwire-core`: Error taxonomy and reader settings
//! - `dirwire-asn1`: Incremental BER stream reader, byte sources, pooling
//! - `dirwire-transport`: Async transports and the element pump feeding readers
//!
//! # Usage
//!
//! ```rust
//! use dirwire::asn1::{tags, Asn1StreamReader, BufferedSource};
//! use dirwire::ReaderSettings;
//!
//! let mut reader = Asn1StreamReader::new(ReaderSettings::default());
//! reader.bind(BufferedSource::from_bytes(&[0x02, 0x01, 0xFF]));
//! assert!(reader.element_available().unwrap());
//! assert_eq!(reader.read_integer(tags::INTEGER).unwrap(), -1);
//! ```

// Re-export core types
pub use dirwire_core::{DirError, DirResult, ErrorKind, ReaderSettings};

// Re-export the ASN.1 reader API
pub mod asn1 {
    pub use dirwire_asn1::*;
}

// Re-export the transport API
pub mod transport {
    pub use dirwire_transport::*;
}
