//! Byte sources feeding the ASN.1 reader

use bytes::{Buf, BytesMut};
use std::io;

/// Non-blocking supply of bytes for an ASN.1 reader
///
/// A source is owned by exactly one reader while bound. The reader only
/// calls the consuming methods after checking [`available`](Self::available),
/// so implementations may treat a short buffer as an error.
#[cfg_attr(test, mockall::automock)]
pub trait ByteSource {
    /// Consume exactly one byte
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Fill `buf` completely
    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<()>;

    /// Discard `count` bytes
    fn skip(&mut self, count: usize) -> io::Result<()> {
        for _ in 0..count {
            self.read_byte()?;
        }
        Ok(())
    }

    /// Number of bytes buffered and readable without further I/O
    fn available(&self) -> usize;

    /// Close the source
    fn close(&mut self) -> io::Result<()>;
}

/// In-memory byte source filled by the connection's I/O loop
///
/// # Usage Example
/// ```rust
/// use dirwire_asn1::source::{BufferedSource, ByteSource};
///
/// let mut source = BufferedSource::new();
/// source.feed(&[0x01, 0x01]);
/// assert_eq!(source.available(), 2);
/// ```
#[derive(Debug, Default)]
pub struct BufferedSource {
    buffer: BytesMut,
    closed: bool,
}

impl BufferedSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty source with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            closed: false,
        }
    }

    /// Create a source already holding `data`
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut source = Self::with_capacity(data.len());
        source.feed(data);
        source
    }

    /// Append received bytes
    ///
    /// Bytes fed after [`close`](ByteSource::close) are dropped.
    pub fn feed(&mut self, data: &[u8]) {
        if self.closed {
            log::warn!("Dropping {} bytes fed to a closed source", data.len());
            return;
        }
        self.buffer.extend_from_slice(data);
    }

    /// Check if the source has been closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn underflow(&self, needed: usize) -> io::Error {
        io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "Buffer exhausted: need {} bytes, have {}",
                needed,
                self.buffer.len()
            ),
        )
    }
}

impl ByteSource for BufferedSource {
    fn read_byte(&mut self) -> io::Result<u8> {
        if !self.buffer.has_remaining() {
            return Err(self.underflow(1));
        }
        Ok(self.buffer.get_u8())
    }

    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<()> {
        if self.buffer.len() < buf.len() {
            return Err(self.underflow(buf.len()));
        }
        self.buffer.copy_to_slice(buf);
        Ok(())
    }

    fn skip(&mut self, count: usize) -> io::Result<()> {
        if self.buffer.len() < count {
            return Err(self.underflow(count));
        }
        self.buffer.advance(count);
        Ok(())
    }

    fn available(&self) -> usize {
        self.buffer.len()
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        self.buffer.clear();
        Ok(())
    }
}
