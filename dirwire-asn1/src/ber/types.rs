//! BER header types (tags, lengths, element kinds)

use crate::error::{DirError, DirResult};

/// Universal tag bytes used as defaults by protocol decoders
///
/// The reader compares tags by raw byte equality; these constants carry the
/// class and constructed bits already folded in.
pub mod tags {
    /// BOOLEAN (universal, primitive, 1)
    pub const BOOLEAN: u8 = 0x01;
    /// INTEGER (universal, primitive, 2)
    pub const INTEGER: u8 = 0x02;
    /// OCTET STRING (universal, primitive, 4)
    pub const OCTET_STRING: u8 = 0x04;
    /// NULL (universal, primitive, 5)
    pub const NULL: u8 = 0x05;
    /// ENUMERATED (universal, primitive, 10)
    pub const ENUMERATED: u8 = 0x0A;
    /// SEQUENCE (universal, constructed, 16)
    pub const SEQUENCE: u8 = 0x30;
    /// SET (universal, constructed, 17)
    pub const SET: u8 = 0x31;
}

/// Maximum number of octets in a long form length
pub const MAX_LENGTH_BYTES: u8 = 4;

/// A fully parsed element header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Tag byte
    pub tag: u8,
    /// Declared value length in bytes
    pub length: usize,
}

/// Decoded first length octet
///
/// BER length can be encoded in two forms:
/// - **Short form**: bit 7 clear, bits 6-0 hold the length (0-127)
/// - **Long form**: bit 7 set, bits 6-0 hold the number of big-endian
///   length octets that follow
///
/// Only definite lengths with at most [`MAX_LENGTH_BYTES`] following octets
/// are accepted. The indefinite form (`0x80`) is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthOctet {
    /// Short form: the length itself
    Short(u8),
    /// Long form: number of length octets still to read (1-4)
    Long(u8),
}

impl LengthOctet {
    /// Classify the first length octet
    ///
    /// # Error Handling
    /// Returns `MalformedLength` for the indefinite form or for more than
    /// four length octets, before any following octet is looked at.
    pub fn parse(byte: u8) -> DirResult<Self> {
        if byte & 0x80 == 0 {
            return Ok(LengthOctet::Short(byte));
        }

        let length_bytes = byte & 0x7F;
        if length_bytes == 0 || length_bytes > MAX_LENGTH_BYTES {
            return Err(DirError::MalformedLength { length_bytes });
        }
        Ok(LengthOctet::Long(length_bytes))
    }
}

/// Kind of element reported to a [`ReadObserver`](crate::trace::ReadObserver)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// BOOLEAN value
    Boolean,
    /// INTEGER value
    Integer,
    /// ENUMERATED value
    Enumerated,
    /// NULL element
    Null,
    /// OCTET STRING value
    OctetString,
    /// Opening header of a SEQUENCE or SET
    StartSequence,
    /// Close of a SEQUENCE or SET, with the discarded trailing bytes as length
    EndSequence,
    /// Element skipped without decoding
    Skipped,
}

impl ElementKind {
    /// Get human-readable element name
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Boolean => "BOOLEAN",
            ElementKind::Integer => "INTEGER",
            ElementKind::Enumerated => "ENUMERATED",
            ElementKind::Null => "NULL",
            ElementKind::OctetString => "OCTETSTRING",
            ElementKind::StartSequence => "SEQUENCE",
            ElementKind::EndSequence => "END SEQUENCE",
            ElementKind::Skipped => "SKIPPED",
        }
    }
}

/// Decode a big-endian two's complement integer of 1 to 8 bytes
///
/// The sign is taken from the most significant bit of the first byte.
pub(crate) fn decode_signed(bytes: &[u8]) -> i64 {
    let init: i64 = match bytes.first() {
        Some(first) if first & 0x80 != 0 => -1,
        _ => 0,
    };
    bytes
        .iter()
        .fold(init, |acc, &byte| (acc << 8) | i64::from(byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_octet_short() {
        assert_eq!(LengthOctet::parse(0x00).unwrap(), LengthOctet::Short(0));
        assert_eq!(LengthOctet::parse(0x7F).unwrap(), LengthOctet::Short(127));
    }

    #[test]
    fn test_length_octet_long() {
        assert_eq!(LengthOctet::parse(0x81).unwrap(), LengthOctet::Long(1));
        assert_eq!(LengthOctet::parse(0x84).unwrap(), LengthOctet::Long(4));
    }

    #[test]
    fn test_length_octet_rejects_indefinite() {
        assert!(matches!(
            LengthOctet::parse(0x80),
            Err(DirError::MalformedLength { length_bytes: 0 })
        ));
    }

    #[test]
    fn test_length_octet_rejects_five_bytes() {
        assert!(matches!(
            LengthOctet::parse(0x85),
            Err(DirError::MalformedLength { length_bytes: 5 })
        ));
        assert!(matches!(
            LengthOctet::parse(0xFF),
            Err(DirError::MalformedLength { length_bytes: 127 })
        ));
    }

    #[test]
    fn test_decode_signed() {
        assert_eq!(decode_signed(&[0x00]), 0);
        assert_eq!(decode_signed(&[0xFF]), -1);
        assert_eq!(decode_signed(&[0x7F]), 127);
        assert_eq!(decode_signed(&[0x00, 0x80]), 128);
        assert_eq!(decode_signed(&[0x80]), -128);
        assert_eq!(decode_signed(&[0x7F, 0xFF, 0xFF, 0xFF]), i64::from(i32::MAX));
        assert_eq!(decode_signed(&[0x80, 0x00, 0x00, 0x00]), i64::from(i32::MIN));
        assert_eq!(decode_signed(&[0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]), i64::MAX);
        assert_eq!(decode_signed(&[0x80, 0, 0, 0, 0, 0, 0, 0]), i64::MIN);
    }
}
