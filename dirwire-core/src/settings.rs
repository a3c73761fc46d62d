//! Reader configuration

use serde::{Deserialize, Serialize};

/// Default maximum BER element size (5 MiB)
pub const DEFAULT_MAX_ELEMENT_SIZE: usize = 5 * 1024 * 1024;

/// Default size of the scratch buffer used to materialize strings
pub const DEFAULT_SCRATCH_BUFFER_SIZE: usize = 1024;

/// ASN.1 stream reader settings
///
/// # Fields
/// * `max_element_size` - Largest declared element length accepted, `0` for no limit
/// * `scratch_buffer_size` - Capacity of the reusable buffer for string reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderSettings {
    pub max_element_size: usize,
    pub scratch_buffer_size: usize,
}

impl ReaderSettings {
    /// Create settings with the given maximum element size
    pub fn new(max_element_size: usize) -> Self {
        Self {
            max_element_size,
            ..Self::default()
        }
    }

    /// Create settings without an element size limit
    pub fn unlimited() -> Self {
        Self::new(0)
    }

    /// Set the maximum element size (`0` disables the check)
    pub fn with_max_element_size(mut self, max_element_size: usize) -> Self {
        self.max_element_size = max_element_size;
        self
    }

    /// Set the scratch buffer size
    pub fn with_scratch_buffer_size(mut self, scratch_buffer_size: usize) -> Self {
        self.scratch_buffer_size = scratch_buffer_size;
        self
    }

    /// Check a declared length against the maximum element size
    ///
    /// # Returns
    /// `true` if the length is acceptable
    pub fn permits(&self, length: usize) -> bool {
        self.max_element_size == 0 || length <= self.max_element_size
    }
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            max_element_size: DEFAULT_MAX_ELEMENT_SIZE,
            scratch_buffer_size: DEFAULT_SCRATCH_BUFFER_SIZE,
        }
    }
}
