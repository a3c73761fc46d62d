//! Feeding received bytes into an ASN.1 reader

use crate::error::{DirError, DirResult};
use crate::stream::{StreamAccessor, TransportSettings};
use dirwire_asn1::{Asn1StreamReader, BufferedSource, ByteSource, ReadState};

/// Drives one connection: reads from the transport into the reader's
/// buffered source until a complete element is available
///
/// # Usage Example
/// ```rust,no_run
/// use dirwire_asn1::{tags, Asn1StreamReader, BufferedSource};
/// use dirwire_core::ReaderSettings;
/// use dirwire_transport::{ElementPump, TcpTransport, TransportSettings};
///
/// # async fn run(transport: TcpTransport) -> dirwire_core::DirResult<()> {
/// let settings = TransportSettings::new();
/// let mut pump = ElementPump::new(transport, &settings);
/// let mut reader = Asn1StreamReader::new(ReaderSettings::default());
/// reader.bind(BufferedSource::new());
///
/// while pump.fill(&mut reader).await? {
///     reader.read_start_sequence(tags::SEQUENCE)?;
///     let _message_id = reader.read_integer(tags::INTEGER)?;
///     reader.read_end_sequence()?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ElementPump<T> {
    transport: T,
    chunk: Vec<u8>,
    bytes_received: u64,
}

impl<T: StreamAccessor> ElementPump<T> {
    /// Create a pump reading `settings.read_chunk_size` bytes at a time
    pub fn new(transport: T, settings: &TransportSettings) -> Self {
        Self {
            transport,
            chunk: vec![0; settings.read_chunk_size.max(1)],
            bytes_received: 0,
        }
    }

    /// Read until the reader has a complete element buffered
    ///
    /// # Returns
    /// - `Ok(true)` once `reader.element_available()` holds
    /// - `Ok(false)` if no further element can arrive: the peer closed the
    ///   stream between elements, or the innermost open container has been
    ///   read to its end
    ///
    /// # Error Handling
    /// - `Io(UnexpectedEof)` if the peer closed in the middle of an element
    /// - Any decoding error raised while probing the reader
    pub async fn fill(&mut self, reader: &mut Asn1StreamReader<BufferedSource>) -> DirResult<bool> {
        loop {
            if reader.element_available()? {
                return Ok(true);
            }
            if reader.state() == ReadState::NeedType && reader.container_remaining() == Some(0) {
                return Ok(false);
            }

            let n = self.transport.read(&mut self.chunk).await?;
            if n == 0 {
                return self.end_of_stream(reader);
            }

            self.bytes_received += n as u64;
            log::trace!("Received {} bytes ({} total)", n, self.bytes_received);
            reader
                .source_mut()
                .ok_or(DirError::NotBound)?
                .feed(&self.chunk[..n]);
        }
    }

    fn end_of_stream(&self, reader: &Asn1StreamReader<BufferedSource>) -> DirResult<bool> {
        let buffered = reader.source().map_or(0, ByteSource::available);
        if buffered == 0 && reader.state() == ReadState::NeedType {
            log::debug!("Peer closed the stream after {} bytes", self.bytes_received);
            return Ok(false);
        }

        log::debug!(
            "Peer closed the stream inside an element ({} bytes buffered)",
            buffered
        );
        Err(DirError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!(
                "Stream closed with an incomplete element ({} bytes buffered)",
                buffered
            ),
        )))
    }

    /// Total number of bytes read from the transport
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Underlying transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Close the transport
    pub async fn close(&mut self) -> DirResult<()> {
        self.transport.close().await
    }

    /// Give back the transport
    pub fn into_inner(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tcp::StreamTransport;
    use dirwire_asn1::{tags, NoopObserver, ReaderPool};
    use dirwire_core::ReaderSettings;
    use std::sync::Arc;
    use tokio::io::AsyncWriteExt;
    use tokio::net::{TcpListener, TcpStream};

    fn reader() -> Asn1StreamReader<BufferedSource> {
        let mut reader =
            Asn1StreamReader::with_observer(ReaderSettings::default(), Arc::new(NoopObserver));
        reader.bind(BufferedSource::new());
        reader
    }

    fn pump(mock: tokio_test::io::Mock) -> ElementPump<StreamTransport<tokio_test::io::Mock>> {
        let settings = TransportSettings::new().with_chunk_size(16);
        ElementPump::new(StreamTransport::from_connected_stream(mock, settings.clone()), &settings)
    }

    #[tokio::test]
    async fn test_fill_across_fragments() {
        // SEQUENCE { INTEGER 7, OCTET STRING "cn" } followed by NULL
        let mock = tokio_test::io::Builder::new()
            .read(&[0x30])
            .read(&[0x07, 0x02])
            .read(&[0x01, 0x07, 0x04, 0x02, b'c'])
            .read(&[b'n', 0x05])
            .read(&[0x00])
            .build();
        let mut pump = pump(mock);
        let mut reader = reader();

        assert!(pump.fill(&mut reader).await.unwrap());
        reader.read_start_sequence(tags::SEQUENCE).unwrap();
        assert!(pump.fill(&mut reader).await.unwrap());
        assert_eq!(reader.read_integer(tags::INTEGER).unwrap(), 7);
        assert!(pump.fill(&mut reader).await.unwrap());
        assert_eq!(&reader.read_octet_string(tags::OCTET_STRING).unwrap()[..], b"cn");
        // Container exhausted
        assert!(!pump.fill(&mut reader).await.unwrap());
        reader.read_end_sequence().unwrap();

        assert!(pump.fill(&mut reader).await.unwrap());
        reader.read_null(tags::NULL).unwrap();
        assert!(!pump.fill(&mut reader).await.unwrap());
        assert_eq!(pump.bytes_received(), 11);
    }

    #[tokio::test]
    async fn test_close_inside_element() {
        let mock = tokio_test::io::Builder::new().read(&[0x04, 0x05, b'a']).build();
        let mut pump = pump(mock);
        let mut reader = reader();

        match pump.fill(&mut reader).await {
            Err(DirError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("expected unexpected EOF, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_decoding_error_surfaces() {
        let mock = tokio_test::io::Builder::new().read(&[0x30, 0x85]).build();
        let mut pump = pump(mock);
        let mut reader = reader();

        assert!(matches!(
            pump.fill(&mut reader).await,
            Err(DirError::MalformedLength { length_bytes: 5 })
        ));
    }

    #[tokio::test]
    async fn test_pooled_readers_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let client = tokio::spawn(async move {
            for id in 1u8..=2 {
                let mut stream = TcpStream::connect(address).await.unwrap();
                let message = [0x30, 0x06, 0x02, 0x01, id, 0x01, 0x01, 0xFF];
                for byte in message {
                    stream.write_all(&[byte]).await.unwrap();
                    stream.flush().await.unwrap();
                }
                stream.shutdown().await.unwrap();
            }
        });

        let pool: ReaderPool<BufferedSource> =
            ReaderPool::with_observer(ReaderSettings::default(), Arc::new(NoopObserver));
        let settings = TransportSettings::new();
        for expected in 1i64..=2 {
            let (stream, _) = listener.accept().await.unwrap();
            let transport = StreamTransport::from_connected_stream(stream, settings.clone());
            let mut pump = ElementPump::new(transport, &settings);
            let mut reader = pool.checkout(BufferedSource::new());

            assert!(pump.fill(&mut reader).await.unwrap());
            reader.read_start_sequence(tags::SEQUENCE).unwrap();
            assert_eq!(reader.read_integer(tags::INTEGER).unwrap(), expected);
            assert!(reader.read_boolean(tags::BOOLEAN).unwrap());
            reader.read_end_sequence().unwrap();
            assert!(!pump.fill(&mut reader).await.unwrap());

            pump.close().await.unwrap();
            assert!(pool.put(reader).is_some());
        }
        client.await.unwrap();
        assert_eq!(pool.hit_count(), 1);
    }
}
