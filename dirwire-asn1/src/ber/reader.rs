//! Incremental BER stream reader
//!
//! The reader pulls TLV elements out of a [`ByteSource`] that is filled by a
//! connection's I/O loop. Header parsing advances through
//! `NeedType -> NeedFirstLengthByte -> NeedAdditionalLengthBytes -> NeedValueBytes`
//! using only the bytes currently buffered, so a probe that runs out of
//! input simply returns and the next probe resumes at the same state.
//!
//! # Usage Example
//!
//! ```rust
//! use dirwire_asn1::ber::{tags, Asn1StreamReader};
//! use dirwire_asn1::source::BufferedSource;
//! use dirwire_core::ReaderSettings;
//!
//! let mut reader = Asn1StreamReader::new(ReaderSettings::default());
//! reader.bind(BufferedSource::new());
//!
//! reader.source_mut().unwrap().feed(&[0x30, 0x03, 0x02]);
//! assert!(!reader.element_available().unwrap());
//!
//! reader.source_mut().unwrap().feed(&[0x01, 0x2A]);
//! assert!(reader.element_available().unwrap());
//!
//! reader.read_start_sequence(tags::SEQUENCE).unwrap();
//! assert_eq!(reader.read_integer(tags::INTEGER).unwrap(), 42);
//! reader.read_end_sequence().unwrap();
//! ```

use crate::ber::limiter::ScopeStack;
use crate::ber::types::{decode_signed, tags, ElementKind, Header, LengthOctet, MAX_LENGTH_BYTES};
use crate::error::{DirError, DirResult};
use crate::source::ByteSource;
use crate::trace::{LogObserver, ReadEvent, ReadObserver};
use bytes::{Bytes, BytesMut};
use dirwire_core::ReaderSettings;
use std::fmt;
use std::sync::Arc;

/// Header parsing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadState {
    /// Waiting for the tag byte
    #[default]
    NeedType,
    /// Tag read, waiting for the first length octet
    NeedFirstLengthByte,
    /// Long form length announced, waiting for the length octets
    NeedAdditionalLengthBytes,
    /// Header complete, value not yet consumed
    NeedValueBytes,
}

/// Outcome of a non-blocking probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<T> {
    /// Not enough bytes buffered yet; progress so far is kept
    Pending,
    /// The requested item is available
    Ready(T),
}

/// Incremental ASN.1 BER reader bound to one byte source at a time
///
/// # Element Consumption
/// Every `read_*` call checks the tag, completes the header if needed,
/// validates the length for the element type, then consumes exactly the
/// declared number of value bytes through the scope stack. A consuming read
/// never blocks: if the bytes are not buffered it fails with `Underflow`, so
/// callers probe with [`element_available`](Self::element_available) first.
///
/// # Containers
/// [`read_start_sequence`](Self::read_start_sequence) opens a bounded scope
/// sized to the declared length. Reads inside it may not cross its end.
/// [`read_end_sequence`](Self::read_end_sequence) discards whatever the
/// caller did not read and returns to the enclosing scope.
///
/// # Error Handling
/// Errors are fatal to the stream. After an error the reader must be
/// released or dropped, not read from again.
pub struct Asn1StreamReader<S> {
    state: ReadState,
    peek_type: u8,
    /// Declared length, or the partial length while reading long form octets
    peek_length: usize,
    length_bytes_needed: u8,
    settings: ReaderSettings,
    source: Option<S>,
    scopes: ScopeStack,
    scratch: Vec<u8>,
    observer: Arc<dyn ReadObserver>,
}

impl<S: ByteSource> Asn1StreamReader<S> {
    /// Create an unbound reader that traces through the `log` facade
    pub fn new(settings: ReaderSettings) -> Self {
        Self::with_observer(settings, Arc::new(LogObserver))
    }

    /// Create an unbound reader reporting reads to `observer`
    pub fn with_observer(settings: ReaderSettings, observer: Arc<dyn ReadObserver>) -> Self {
        Self {
            state: ReadState::NeedType,
            peek_type: 0,
            peek_length: 0,
            length_bytes_needed: 0,
            settings,
            source: None,
            scopes: ScopeStack::new(),
            scratch: vec![0; settings.scratch_buffer_size],
            observer,
        }
    }

    /// Attach a byte source, returning the previously bound one if any
    ///
    /// Rebinding a bound reader first discards all parse state of the old
    /// stream, so the new source is read as by a fresh reader.
    pub fn bind(&mut self, source: S) -> Option<S> {
        let previous = if self.source.is_some() {
            log::warn!("ASN.1 reader rebound while another source was attached");
            self.detach()
        } else {
            None
        };
        self.source = Some(source);
        previous
    }

    /// Reset every piece of parse state and detach the source
    ///
    /// Afterwards the reader is indistinguishable from a new one built with
    /// the same settings and observer.
    pub fn detach(&mut self) -> Option<S> {
        self.state = ReadState::NeedType;
        self.peek_type = 0;
        self.peek_length = 0;
        self.length_bytes_needed = 0;
        self.scopes.reset();
        self.source.take()
    }

    /// Check if a source is bound
    pub fn is_bound(&self) -> bool {
        self.source.is_some()
    }

    /// Bound source, for the I/O loop to feed
    pub fn source_mut(&mut self) -> Option<&mut S> {
        self.source.as_mut()
    }

    /// Bound source
    pub fn source(&self) -> Option<&S> {
        self.source.as_ref()
    }

    /// Current header parsing state
    pub fn state(&self) -> ReadState {
        self.state
    }

    /// Number of open SEQUENCE/SET containers
    pub fn element_depth(&self) -> usize {
        self.scopes.depth()
    }

    /// Bytes left in the innermost open container, `None` at the top level
    pub fn container_remaining(&self) -> Option<usize> {
        self.scopes.remaining()
    }

    /// Reader settings
    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    fn bound_source(&mut self) -> DirResult<&mut S> {
        self.source.as_mut().ok_or(DirError::NotBound)
    }

    fn available(&self) -> DirResult<usize> {
        self.source
            .as_ref()
            .map(ByteSource::available)
            .ok_or(DirError::NotBound)
    }

    /// Check whether `size` bytes may be read now
    ///
    /// Fails if the bytes would cross an open container, returns `false` if
    /// they are simply not buffered yet.
    fn readable(&self, size: usize) -> DirResult<bool> {
        self.scopes.check_limit(size)?;
        Ok(self.available()? >= size)
    }

    /// Charge `size` bytes to the scopes ahead of a consuming read
    fn reserve(&mut self, size: usize) -> DirResult<()> {
        if !self.readable(size)? {
            return Err(DirError::Underflow {
                needed: size,
                available: self.available()?,
            });
        }
        self.scopes.consume(size)
    }

    /// Error for a consuming call that found its header bytes missing
    fn pending_error(&self) -> DirError {
        let needed = match self.state {
            ReadState::NeedAdditionalLengthBytes => usize::from(self.length_bytes_needed),
            _ => 1,
        };
        if let Some(remaining) = self.scopes.remaining() {
            if needed > remaining {
                return DirError::NestedOverflow {
                    length: needed,
                    remaining,
                };
            }
        }
        match self.available() {
            Ok(available) => DirError::Underflow { needed, available },
            Err(e) => e,
        }
    }

    /// Read the tag byte if it is buffered
    fn poll_type(&mut self) -> DirResult<Step<u8>> {
        if self.state != ReadState::NeedType {
            return Ok(Step::Ready(self.peek_type));
        }
        // An exhausted container has no next element, which is not an error
        if self.scopes.remaining() == Some(0) || self.available()? == 0 {
            return Ok(Step::Pending);
        }

        self.scopes.consume(1)?;
        self.peek_type = self.bound_source()?.read_byte()?;
        self.state = ReadState::NeedFirstLengthByte;
        Ok(Step::Ready(self.peek_type))
    }

    /// Advance header parsing as far as the buffered bytes allow
    ///
    /// # Returns
    /// `Step::Ready(header)` once tag and length are known. The value may
    /// still be incomplete; see [`element_available`](Self::element_available).
    ///
    /// # Error Handling
    /// - `MalformedLength` for the indefinite form or more than 4 length octets
    /// - `SizeLimitExceeded` if the length is above the configured maximum
    /// - `NestedOverflow` if the header or the value would cross the end of
    ///   an open container
    pub fn poll_header(&mut self) -> DirResult<Step<Header>> {
        if let Step::Pending = self.poll_type()? {
            return Ok(Step::Pending);
        }

        if self.state == ReadState::NeedFirstLengthByte {
            if !self.readable(1)? {
                return Ok(Step::Pending);
            }
            self.scopes.consume(1)?;
            let octet = self.bound_source()?.read_byte()?;
            match LengthOctet::parse(octet)? {
                LengthOctet::Short(length) => self.complete_length(usize::from(length))?,
                LengthOctet::Long(count) => {
                    self.peek_length = 0;
                    self.length_bytes_needed = count;
                    self.state = ReadState::NeedAdditionalLengthBytes;
                }
            }
        }

        if self.state == ReadState::NeedAdditionalLengthBytes {
            let needed = usize::from(self.length_bytes_needed);
            if !self.readable(needed)? {
                return Ok(Step::Pending);
            }
            self.scopes.consume(needed)?;
            let mut octets = [0u8; MAX_LENGTH_BYTES as usize];
            let octets = &mut octets[..needed];
            self.bound_source()?.read_into(octets)?;
            let length = octets
                .iter()
                .fold(self.peek_length, |acc, &byte| (acc << 8) | usize::from(byte));
            self.length_bytes_needed = 0;
            self.complete_length(length)?;
        }

        Ok(Step::Ready(Header {
            tag: self.peek_type,
            length: self.peek_length,
        }))
    }

    fn complete_length(&mut self, length: usize) -> DirResult<()> {
        if !self.settings.permits(length) {
            return Err(DirError::SizeLimitExceeded {
                length,
                max: self.settings.max_element_size,
            });
        }
        self.scopes.check_limit(length)?;
        self.peek_length = length;
        self.state = ReadState::NeedValueBytes;
        Ok(())
    }

    fn require_type(&mut self) -> DirResult<u8> {
        match self.poll_type()? {
            Step::Ready(tag) => Ok(tag),
            Step::Pending => Err(self.pending_error()),
        }
    }

    fn require_header(&mut self) -> DirResult<Header> {
        match self.poll_header()? {
            Step::Ready(header) => Ok(header),
            Step::Pending => Err(self.pending_error()),
        }
    }

    /// Check if a complete element (header and value) is buffered
    ///
    /// Never blocks. Returns `false` without losing any header progress if
    /// more bytes are needed.
    pub fn element_available(&mut self) -> DirResult<bool> {
        match self.poll_header()? {
            Step::Pending => Ok(false),
            Step::Ready(header) => self.readable(header.length),
        }
    }

    /// Check if at least the tag byte of another element is available
    ///
    /// Inside a container whose bytes are all consumed this is `false`.
    pub fn has_next_element(&mut self) -> DirResult<bool> {
        Ok(matches!(self.poll_type()?, Step::Ready(_)))
    }

    /// Tag of the next element, reading it if necessary
    pub fn peek_type(&mut self) -> DirResult<u8> {
        self.require_type()
    }

    /// Declared length of the next element, parsing the header if necessary
    pub fn peek_length(&mut self) -> DirResult<usize> {
        Ok(self.require_header()?.length)
    }

    fn expect_tag(&mut self, expected: u8) -> DirResult<Header> {
        let actual = self.require_type()?;
        if actual != expected {
            return Err(DirError::UnexpectedTag { expected, actual });
        }
        self.require_header()
    }

    fn finish(&mut self, kind: ElementKind, header: Header) {
        self.state = ReadState::NeedType;
        self.observer.on_read(&ReadEvent {
            kind,
            tag: header.tag,
            length: header.length,
        });
    }

    /// Read a BOOLEAN
    ///
    /// Any non-zero value octet decodes as `true`.
    pub fn read_boolean(&mut self, expected_tag: u8) -> DirResult<bool> {
        let header = self.expect_tag(expected_tag)?;
        if header.length != 1 {
            return Err(DirError::InvalidLength {
                element: "boolean",
                length: header.length,
            });
        }

        self.reserve(1)?;
        let value = self.bound_source()?.read_byte()?;
        self.finish(ElementKind::Boolean, header);
        Ok(value != 0x00)
    }

    /// Read an INTEGER of 1 to 8 octets
    pub fn read_integer(&mut self, expected_tag: u8) -> DirResult<i64> {
        let header = self.expect_tag(expected_tag)?;
        if !(1..=8).contains(&header.length) {
            return Err(DirError::InvalidLength {
                element: "integer",
                length: header.length,
            });
        }

        let value = self.read_integer_value(header.length)?;
        self.finish(ElementKind::Integer, header);
        Ok(value)
    }

    /// Read an ENUMERATED of 1 to 4 octets
    pub fn read_enumerated(&mut self, expected_tag: u8) -> DirResult<i32> {
        let header = self.expect_tag(expected_tag)?;
        if !(1..=4).contains(&header.length) {
            return Err(DirError::InvalidLength {
                element: "enumerated",
                length: header.length,
            });
        }

        // At most four octets, so the sign-extended value fits in an i32
        let value = self.read_integer_value(header.length)? as i32;
        self.finish(ElementKind::Enumerated, header);
        Ok(value)
    }

    fn read_integer_value(&mut self, length: usize) -> DirResult<i64> {
        self.reserve(length)?;
        let mut octets = [0u8; 8];
        let octets = &mut octets[..length];
        self.bound_source()?.read_into(octets)?;
        Ok(decode_signed(octets))
    }

    /// Read a NULL
    pub fn read_null(&mut self, expected_tag: u8) -> DirResult<()> {
        let header = self.expect_tag(expected_tag)?;
        if header.length != 0 {
            return Err(DirError::InvalidLength {
                element: "null",
                length: header.length,
            });
        }

        self.finish(ElementKind::Null, header);
        Ok(())
    }

    /// Read an OCTET STRING into a new buffer
    pub fn read_octet_string(&mut self, expected_tag: u8) -> DirResult<Bytes> {
        let header = self.expect_tag(expected_tag)?;
        if header.length == 0 {
            self.finish(ElementKind::OctetString, header);
            return Ok(Bytes::new());
        }

        self.reserve(header.length)?;
        let mut value = BytesMut::zeroed(header.length);
        self.bound_source()?.read_into(&mut value)?;
        self.finish(ElementKind::OctetString, header);
        Ok(value.freeze())
    }

    /// Read an OCTET STRING, appending its value to `buffer`
    pub fn read_octet_string_into(
        &mut self,
        expected_tag: u8,
        buffer: &mut BytesMut,
    ) -> DirResult<()> {
        let header = self.expect_tag(expected_tag)?;
        if header.length > 0 {
            self.reserve(header.length)?;
            let start = buffer.len();
            buffer.resize(start + header.length, 0);
            self.bound_source()?.read_into(&mut buffer[start..])?;
        }

        self.finish(ElementKind::OctetString, header);
        Ok(())
    }

    /// Read an OCTET STRING holding UTF-8 text
    ///
    /// Values that fit in the scratch buffer are decoded from it without
    /// allocating an intermediate buffer.
    pub fn read_octet_string_as_string(&mut self, expected_tag: u8) -> DirResult<String> {
        let header = self.expect_tag(expected_tag)?;
        if header.length == 0 {
            self.finish(ElementKind::OctetString, header);
            return Ok(String::new());
        }

        self.reserve(header.length)?;
        let mut spill;
        let buffer: &mut [u8] = if header.length <= self.scratch.len() {
            &mut self.scratch[..header.length]
        } else {
            spill = vec![0u8; header.length];
            &mut spill
        };
        self.source
            .as_mut()
            .ok_or(DirError::NotBound)?
            .read_into(buffer)?;
        let text = std::str::from_utf8(buffer)
            .map(str::to_owned)
            .map_err(|_| DirError::InvalidUtf8);

        self.finish(ElementKind::OctetString, header);
        text
    }

    /// Open a SEQUENCE and make its contents the current scope
    ///
    /// # Error Handling
    /// Returns `NestedOverflow` if the declared length does not fit in the
    /// enclosing container.
    pub fn read_start_sequence(&mut self, expected_tag: u8) -> DirResult<()> {
        let header = self.expect_tag(expected_tag)?;
        self.scopes.push(header.length)?;
        self.finish(ElementKind::StartSequence, header);
        Ok(())
    }

    /// Open a SET; identical to [`read_start_sequence`](Self::read_start_sequence)
    pub fn read_start_set(&mut self, expected_tag: u8) -> DirResult<()> {
        self.read_start_sequence(expected_tag)
    }

    /// Read a BOOLEAN with the universal tag
    pub fn read_boolean_universal(&mut self) -> DirResult<bool> {
        self.read_boolean(tags::BOOLEAN)
    }

    /// Read an INTEGER with the universal tag
    pub fn read_integer_universal(&mut self) -> DirResult<i64> {
        self.read_integer(tags::INTEGER)
    }

    /// Read an ENUMERATED with the universal tag
    pub fn read_enumerated_universal(&mut self) -> DirResult<i32> {
        self.read_enumerated(tags::ENUMERATED)
    }

    /// Read a NULL with the universal tag
    pub fn read_null_universal(&mut self) -> DirResult<()> {
        self.read_null(tags::NULL)
    }

    /// Read an OCTET STRING with the universal tag
    pub fn read_octet_string_universal(&mut self) -> DirResult<Bytes> {
        self.read_octet_string(tags::OCTET_STRING)
    }

    /// Read a UTF-8 OCTET STRING with the universal tag
    pub fn read_octet_string_as_string_universal(&mut self) -> DirResult<String> {
        self.read_octet_string_as_string(tags::OCTET_STRING)
    }

    /// Open a SEQUENCE with the universal tag
    pub fn read_start_sequence_universal(&mut self) -> DirResult<()> {
        self.read_start_sequence(tags::SEQUENCE)
    }

    /// Open a SET with the universal tag
    pub fn read_start_set_universal(&mut self) -> DirResult<()> {
        self.read_start_set(tags::SET)
    }

    /// Close the innermost SEQUENCE
    ///
    /// Unread bytes left in the container are discarded so the next read
    /// starts at the following sibling. Those bytes must already be
    /// buffered.
    ///
    /// # Error Handling
    /// - `UnbalancedSequence` if no container is open
    /// - `Underflow` if the unread remainder is not buffered
    pub fn read_end_sequence(&mut self) -> DirResult<()> {
        let trailing = self.scopes.remaining().ok_or(DirError::UnbalancedSequence)?;
        self.reserve(trailing)?;
        self.bound_source()?.skip(trailing)?;
        self.scopes.pop()?;

        self.state = ReadState::NeedType;
        self.observer.on_read(&ReadEvent {
            kind: ElementKind::EndSequence,
            tag: 0,
            length: trailing,
        });
        Ok(())
    }

    /// Close the innermost SET; identical to [`read_end_sequence`](Self::read_end_sequence)
    pub fn read_end_set(&mut self) -> DirResult<()> {
        self.read_end_sequence()
    }

    /// Discard the next element without decoding its value
    pub fn skip_element(&mut self) -> DirResult<()> {
        let header = self.require_header()?;
        self.reserve(header.length)?;
        self.bound_source()?.skip(header.length)?;
        self.finish(ElementKind::Skipped, header);
        Ok(())
    }

    /// Close the bound byte source
    pub fn close(&mut self) -> DirResult<()> {
        self.bound_source()?.close()?;
        Ok(())
    }
}

impl<S> fmt::Debug for Asn1StreamReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asn1StreamReader")
            .field("state", &self.state)
            .field("peek_type", &self.peek_type)
            .field("peek_length", &self.peek_length)
            .field("depth", &self.scopes.depth())
            .field("bound", &self.source.is_some())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
