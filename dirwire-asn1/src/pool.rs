//! Reader pooling
//!
//! Connections borrow a reader for as long as they live and hand it back
//! when they close. Returned readers are detached from their source and
//! reset, so the next borrower sees a reader indistinguishable from a new
//! one.

use crate::ber::reader::Asn1StreamReader;
use crate::source::ByteSource;
use crate::trace::{LogObserver, ReadObserver};
use dirwire_core::ReaderSettings;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Default number of idle readers kept by a [`ReaderPool`]
pub const DEFAULT_POOL_CAPACITY: usize = 64;

/// Object that can be parked in a pool between uses
pub trait Poolable {
    /// Called right before the object is handed out again
    fn prepare(&mut self) {}

    /// Drop all per-use state
    fn release(&mut self);
}

impl<S: ByteSource> Poolable for Asn1StreamReader<S> {
    fn prepare(&mut self) {
        // `release` already leaves nothing to reset
    }

    fn release(&mut self) {
        self.detach();
    }
}

/// Pool of ASN.1 readers sharing settings and an observer
///
/// # Usage Example
/// ```rust
/// use dirwire_asn1::ber::tags;
/// use dirwire_asn1::pool::ReaderPool;
/// use dirwire_asn1::source::BufferedSource;
/// use dirwire_core::ReaderSettings;
///
/// let pool = ReaderPool::new(ReaderSettings::default());
/// {
///     let mut reader = pool.acquire(BufferedSource::from_bytes(&[0x05, 0x00]));
///     reader.read_null(tags::NULL).unwrap();
/// }
/// assert_eq!(pool.idle(), 1);
/// ```
pub struct ReaderPool<S> {
    readers: Mutex<Vec<Asn1StreamReader<S>>>,
    settings: ReaderSettings,
    observer: Arc<dyn ReadObserver>,
    capacity: usize,
    /// Number of acquire calls
    acquire_count: AtomicUsize,
    /// Number of acquire calls served by an idle reader
    hit_count: AtomicUsize,
}

impl<S: ByteSource> ReaderPool<S> {
    /// Create an empty pool whose readers trace through the `log` facade
    pub fn new(settings: ReaderSettings) -> Self {
        Self::with_observer(settings, Arc::new(LogObserver))
    }

    /// Create an empty pool whose readers report to `observer`
    pub fn with_observer(settings: ReaderSettings, observer: Arc<dyn ReadObserver>) -> Self {
        Self {
            readers: Mutex::new(Vec::new()),
            settings,
            observer,
            capacity: DEFAULT_POOL_CAPACITY,
            acquire_count: AtomicUsize::new(0),
            hit_count: AtomicUsize::new(0),
        }
    }

    /// Set the maximum number of idle readers kept
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Asn1StreamReader<S>>> {
        // Readers are reset before being stored, so a poisoned list is
        // still consistent.
        self.readers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Borrow a reader bound to `source`, returned to the pool on drop
    pub fn acquire(&self, source: S) -> PooledReader<'_, S> {
        PooledReader {
            pool: self,
            reader: Some(self.checkout(source)),
        }
    }

    /// Take a reader bound to `source` out of the pool
    ///
    /// Unlike [`acquire`](Self::acquire) the reader is owned by the caller,
    /// which can move it into a connection task and hand it back with
    /// [`put`](Self::put) once the connection ends.
    pub fn checkout(&self, source: S) -> Asn1StreamReader<S> {
        self.acquire_count.fetch_add(1, Ordering::Relaxed);
        let idle = self.lock().pop();
        let mut reader = match idle {
            Some(reader) => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                reader
            }
            None => Asn1StreamReader::with_observer(self.settings, self.observer.clone()),
        };
        reader.prepare();
        reader.bind(source);
        reader
    }

    /// Reset `reader` and keep it for a later borrower
    ///
    /// # Returns
    /// The source the reader was bound to, if any
    pub fn put(&self, mut reader: Asn1StreamReader<S>) -> Option<S> {
        let source = reader.detach();
        let mut readers = self.lock();
        if readers.len() < self.capacity {
            readers.push(reader);
        } else {
            log::debug!("Reader pool full ({} idle), dropping reader", readers.len());
        }
        source
    }

    /// Number of idle readers
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    /// Number of acquire calls so far
    pub fn acquire_count(&self) -> usize {
        self.acquire_count.load(Ordering::Relaxed)
    }

    /// Number of acquire calls served from the pool
    pub fn hit_count(&self) -> usize {
        self.hit_count.load(Ordering::Relaxed)
    }
}

/// Reader borrowed from a [`ReaderPool`], returned to it on drop
///
/// `reader` is `Some` for the whole life of the guard. It is only taken by
/// [`take_source`](Self::take_source), which consumes the guard, and by
/// `drop`, so `Deref` never observes `None`.
pub struct PooledReader<'a, S: ByteSource> {
    pool: &'a ReaderPool<S>,
    reader: Option<Asn1StreamReader<S>>,
}

impl<S: ByteSource> PooledReader<'_, S> {
    /// Return the reader to the pool now, recovering its source
    pub fn take_source(mut self) -> Option<S> {
        self.reader.take().and_then(|reader| self.pool.put(reader))
    }
}

impl<S: ByteSource> Deref for PooledReader<'_, S> {
    type Target = Asn1StreamReader<S>;

    fn deref(&self) -> &Self::Target {
        self.reader
            .as_ref()
            .expect("reader present until the guard is consumed")
    }
}

impl<S: ByteSource> DerefMut for PooledReader<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.reader
            .as_mut()
            .expect("reader present until the guard is consumed")
    }
}

impl<S: ByteSource> Drop for PooledReader<'_, S> {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            self.pool.put(reader);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::reader::ReadState;
    use crate::ber::types::tags;
    use crate::source::BufferedSource;
    use crate::trace::NoopObserver;

    fn pool() -> ReaderPool<BufferedSource> {
        ReaderPool::with_observer(ReaderSettings::default(), Arc::new(NoopObserver))
    }

    #[test]
    fn test_reader_is_reused() {
        let pool = pool();
        {
            let mut reader = pool.acquire(BufferedSource::from_bytes(&[0x02, 0x01, 0x05]));
            assert_eq!(reader.read_integer(tags::INTEGER).unwrap(), 5);
        }
        assert_eq!(pool.idle(), 1);

        let reader = pool.acquire(BufferedSource::new());
        assert_eq!(pool.idle(), 0);
        assert_eq!(pool.acquire_count(), 2);
        assert_eq!(pool.hit_count(), 1);
        assert!(reader.is_bound());
    }

    #[test]
    fn test_abandoned_reader_comes_back_clean() {
        let pool = pool();
        {
            // Abandon the reader inside a container, mid-header
            let mut reader = pool.acquire(BufferedSource::from_bytes(&[0x30, 0x06, 0x04, 0x82]));
            reader.read_start_sequence(tags::SEQUENCE).unwrap();
            assert!(!reader.element_available().unwrap());
            assert_eq!(reader.element_depth(), 1);
        }

        let mut reader = pool.acquire(BufferedSource::from_bytes(&[0x01, 0x01, 0xFF]));
        assert_eq!(reader.state(), ReadState::NeedType);
        assert_eq!(reader.element_depth(), 0);
        assert!(reader.element_available().unwrap());
        assert!(reader.read_boolean(tags::BOOLEAN).unwrap());
    }

    #[test]
    fn test_take_source() {
        let pool = pool();
        let mut reader = pool.acquire(BufferedSource::from_bytes(&[0x05, 0x00, 0x05]));
        assert!(reader.is_bound());
        reader.read_null(tags::NULL).unwrap();
        assert_eq!(reader.state(), ReadState::NeedType);
        let source = reader.take_source().unwrap();
        assert_eq!(source.available(), 1);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_capacity_bound() {
        let pool = pool().with_capacity(1);
        let first = pool.acquire(BufferedSource::new());
        let second = pool.acquire(BufferedSource::new());
        drop(first);
        drop(second);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_poolable_release() {
        let mut reader: Asn1StreamReader<BufferedSource> =
            Asn1StreamReader::new(ReaderSettings::default());
        reader.bind(BufferedSource::from_bytes(&[0x30]));
        assert!(reader.has_next_element().unwrap());
        Poolable::release(&mut reader);
        assert!(!reader.is_bound());
        assert_eq!(reader.state(), ReadState::NeedType);
    }
}
