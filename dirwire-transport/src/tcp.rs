//! Stream transport implementation (TCP and generic async streams)

use crate::error::{DirError, DirResult};
use crate::stream::{StreamAccessor, TransportSettings};
use async_trait::async_trait;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Transport over any bidirectional async stream
pub struct StreamTransport<T> {
    stream: Option<T>,
    settings: TransportSettings,
    closed: bool,
}

/// TCP transport layer
pub type TcpTransport = StreamTransport<TcpStream>;

impl<T> fmt::Debug for StreamTransport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamTransport")
            .field("settings", &self.settings)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<T> StreamTransport<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already-connected stream (for server use)
    ///
    /// # Arguments
    /// * `stream` - The connected stream
    /// * `settings` - Read timeout and chunk size
    pub fn from_connected_stream(stream: T, settings: TransportSettings) -> Self {
        Self {
            stream: Some(stream),
            settings,
            closed: false,
        }
    }

    /// Transport settings
    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    fn not_connected() -> DirError {
        DirError::Io(std::io::Error::new(
            std::io::ErrorKind::NotConnected,
            "Stream not connected",
        ))
    }
}

impl TcpTransport {
    /// Connect to `address`, bounded by the read timeout if one is set
    pub async fn connect(address: SocketAddr, settings: TransportSettings) -> DirResult<Self> {
        let stream = match settings.read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, TcpStream::connect(address))
                .await
                .map_err(|_| DirError::Timeout)??,
            None => TcpStream::connect(address).await?,
        };
        log::debug!("Connected to {}", address);
        Ok(Self::from_connected_stream(stream, settings))
    }
}

#[async_trait]
impl<T> StreamAccessor for StreamTransport<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> DirResult<()> {
        self.settings.read_timeout = timeout;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> DirResult<usize> {
        let stream = self.stream.as_mut().ok_or_else(Self::not_connected)?;

        let result = match self.settings.read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, stream.read(buf))
                .await
                .map_err(|_| DirError::Timeout)?
                .map_err(DirError::Io),
            None => stream.read(buf).await.map_err(DirError::Io),
        };

        match result {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.closed = true;
                Err(e)
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> DirResult<()> {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                log::debug!("Ignoring error while shutting down stream: {}", e);
            }
        }
        self.closed = true;
        Ok(())
    }
}
