use thiserror::Error;

/// Main error type for dirwire operations
///
/// Every variant is fatal to the stream it was raised on: the owner of the
/// connection is expected to drop the reader (or the whole connection) rather
/// than keep reading in the hope of resynchronizing.
#[derive(Error, Debug)]
pub enum DirError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The first length octet announced the indefinite form (`0x80`, zero
    /// following octets) or more than four length octets.
    #[error("Invalid number of length bytes: {length_bytes} (expected 1 to 4)")]
    MalformedLength { length_bytes: u8 },

    #[error("Element length {length} exceeds the maximum element size of {max} bytes")]
    SizeLimitExceeded { length: usize, max: usize },

    #[error("Element length {length} exceeds the {remaining} bytes remaining in the enclosing sequence")]
    NestedOverflow { length: usize, remaining: usize },

    #[error("Expected tag 0x{expected:02X}, but read 0x{actual:02X}")]
    UnexpectedTag { expected: u8, actual: u8 },

    #[error("Invalid {element} length: {length}")]
    InvalidLength { element: &'static str, length: usize },

    #[error("Cannot end a sequence that was never started")]
    UnbalancedSequence,

    #[error("Buffer underflow: need {needed} bytes, have {available}")]
    Underflow { needed: usize, available: usize },

    #[error("Reader is not bound to a byte source")]
    NotBound,

    #[error("Octet string is not valid UTF-8")]
    InvalidUtf8,

    #[error("Timeout")]
    Timeout,
}

/// Broad classification of a [`DirError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The peer sent an encoding this layer cannot accept
    Malformed,
    /// An element was larger than the configured maximum or its container
    SizeLimit,
    /// The byte source or transport failed
    Io,
    /// The reader was driven outside of its contract
    Usage,
}

impl DirError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            DirError::MalformedLength { .. }
            | DirError::UnexpectedTag { .. }
            | DirError::InvalidLength { .. }
            | DirError::UnbalancedSequence
            | DirError::InvalidUtf8 => ErrorKind::Malformed,
            DirError::SizeLimitExceeded { .. } | DirError::NestedOverflow { .. } => {
                ErrorKind::SizeLimit
            }
            DirError::Io(_) | DirError::Timeout => ErrorKind::Io,
            DirError::Underflow { .. } | DirError::NotBound => ErrorKind::Usage,
        }
    }
}

/// Result type alias for dirwire operations
pub type DirResult<T> = Result<T, DirError>;
