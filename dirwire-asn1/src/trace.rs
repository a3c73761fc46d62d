//! Observability hooks for element reads

use crate::ber::types::ElementKind;

/// A completed read reported by the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadEvent {
    /// What was read
    pub kind: ElementKind,
    /// Tag byte of the element, 0 for an end of container
    pub tag: u8,
    /// Value length in bytes
    pub length: usize,
}

/// Sink for [`ReadEvent`]s
///
/// Observers are shared between pooled readers, so they must be
/// thread-safe.
pub trait ReadObserver: Send + Sync {
    /// Called once for every element the reader has fully consumed
    fn on_read(&self, event: &ReadEvent);
}

/// Observer writing each event to the `log` facade at trace level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ReadObserver for LogObserver {
    fn on_read(&self, event: &ReadEvent) {
        log::trace!(
            "READ ASN.1 {}(type=0x{:x}, length={})",
            event.kind.as_str(),
            event.tag,
            event.length
        );
    }
}

/// Observer discarding every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ReadObserver for NoopObserver {
    fn on_read(&self, _event: &ReadEvent) {}
}
