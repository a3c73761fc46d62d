//! BER (Basic Encoding Rules) stream decoding
//!
//! Each ASN.1 value is a TLV (Tag-Length-Value) triplet:
//!
//! ```text
//! [Tag] [Length] [Value]
//! ```
//!
//! ## Tag
//!
//! A single octet, compared by raw equality against the tag the caller
//! expects. No tag class interpretation happens at this layer.
//!
//! ## Length
//!
//! Definite form only:
//! - **Short form** (1 byte): bit 7 clear, length 0-127
//! - **Long form**: first byte `0x81`-`0x84` gives the number of big-endian
//!   length octets that follow
//!
//! The indefinite form (`0x80`) and long forms with 5 or more octets are
//! rejected.
//!
//! ## Value
//!
//! Primitive values (BOOLEAN, INTEGER, ENUMERATED, NULL, OCTET STRING) are
//! decoded directly. Constructed values (SEQUENCE, SET) open a bounded scope
//! in which their children are read as ordinary elements.

pub mod limiter;
pub mod reader;
pub mod types;

pub use limiter::{Scope, ScopeStack};
pub use reader::{Asn1StreamReader, ReadState, Step};
pub use types::{tags, ElementKind, Header, LengthOctet};
