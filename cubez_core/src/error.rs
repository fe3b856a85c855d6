use thiserror::Error;

/// The five error kinds this crate's write/read paths can raise, matching
/// the distinct failure classes the format distinguishes: a caller can
/// `match` on kind instead of grepping a message string.
#[derive(Debug, Error)]
pub enum CubezError {
    /// Codec or entropy-backend name stored in the archive does not match
    /// what the runtime was configured with. Fatal on read.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Underlying file I/O failed, or a buffer could not be grown to the
    /// size a write demands. Fatal on write.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive stream is truncated, a length prefix is invalid, or
    /// chunk offsets are not strictly increasing. Fatal on read.
    #[error("corruption: {0}")]
    Corruption(String),

    /// A buffer could not hold the bytes a compression or encode step
    /// produced.
    #[error("resource exhausted: {0}")]
    Resource(String),

    /// One of this crate's documented invariants was violated by caller
    /// input. Indicates a bug in the caller, not bad data.
    #[error("precondition violated: {0}")]
    Precondition(String),
}

pub type Result<T> = std::result::Result<T, CubezError>;
