//! Stream accessor trait for transport layer

use crate::error::DirResult;
use async_trait::async_trait;
use std::time::Duration;

/// Default read timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of bytes requested per read
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4096;

/// Transport layer settings
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// Timeout for a single read. `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// Size of the buffer handed to each read
    pub read_chunk_size: usize,
}

impl TransportSettings {
    /// Create settings with the default timeout and chunk size
    pub fn new() -> Self {
        Self {
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }

    /// Create settings with a read timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            read_timeout: Some(timeout),
            ..Self::new()
        }
    }

    /// Set the read chunk size (at least one byte)
    pub fn with_chunk_size(mut self, read_chunk_size: usize) -> Self {
        self.read_chunk_size = read_chunk_size.max(1);
        self
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream accessor interface to the peer of one connection
#[async_trait]
pub trait StreamAccessor: Send {
    /// Set the read timeout
    ///
    /// # Arguments
    ///
    /// * `timeout` - The timeout duration. None means infinite timeout.
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> DirResult<()>;

    /// Read data from the stream
    ///
    /// # Arguments
    ///
    /// * `buf` - Buffer to read into
    ///
    /// # Returns
    ///
    /// Number of bytes read, or 0 if EOF
    async fn read(&mut self, buf: &mut [u8]) -> DirResult<usize>;

    /// Check if the stream is closed
    fn is_closed(&self) -> bool;

    /// Close the stream
    async fn close(&mut self) -> DirResult<()>;
}
