//! Error types shared across the demuxio crates.

use thiserror::Error;

/// Top-level error type for demuxing operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Container format errors (structure, probing, seeking).
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// Bitstream parsing errors (codec configuration records).
    #[error("Bitstream error: {0}")]
    Bitstream(#[from] BitstreamError),

    /// I/O errors from the underlying byte source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid parameter provided by the caller.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Unsupported feature or format.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// An allocation or buffer request exceeded the configured limits.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The operation was cancelled by the consumer.
    #[error("Operation cancelled")]
    Cancelled,

    /// Clean end of stream. Distinct from `Io`: queued frames are drained
    /// before this is surfaced to the consumer.
    #[error("End of stream")]
    EndOfStream,
}

/// Container format errors.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// Invalid or corrupted container structure.
    #[error("Invalid container structure: {0}")]
    InvalidStructure(String),

    /// The byte stream is not a format this library recognizes.
    #[error("Unknown container format")]
    UnknownFormat,

    /// Missing required element (metadata tag, codec configuration, ...).
    #[error("Missing required element: {0}")]
    MissingElement(String),

    /// A declared size field disagrees with the surrounding structure.
    #[error("Invalid element size at offset {offset}: {message}")]
    InvalidSize {
        /// Byte offset of the offending size field.
        offset: u64,
        /// Description of the disagreement.
        message: String,
    },

    /// Recursion limit exceeded while parsing nested structures.
    #[error("Recursion limit exceeded at depth {depth}")]
    RecursionLimit {
        /// Depth at which the limit was hit.
        depth: u32,
    },

    /// Stream not found in container.
    #[error("Stream {index} not found")]
    StreamNotFound {
        /// Requested stream index.
        index: u32,
    },

    /// Seek operation failed.
    #[error("Seek failed: {0}")]
    SeekFailed(String),

    /// Generic container error message.
    #[error("{0}")]
    Other(String),
}

impl From<String> for ContainerError {
    fn from(s: String) -> Self {
        ContainerError::Other(s)
    }
}

impl From<&str> for ContainerError {
    fn from(s: &str) -> Self {
        ContainerError::Other(s.to_string())
    }
}

/// Bitstream parsing errors.
#[derive(Error, Debug)]
pub enum BitstreamError {
    /// Unexpected end of bitstream.
    #[error("Unexpected end of bitstream")]
    UnexpectedEnd,

    /// Invalid syntax element value.
    #[error("Invalid syntax element: {element} = {value}")]
    InvalidSyntax {
        /// Name of the syntax element.
        element: String,
        /// Decoded value.
        value: i64,
    },

    /// Exp-Golomb decoding error.
    #[error("Exp-Golomb decoding error: value too large")]
    ExpGolombOverflow,

    /// Generic bitstream error message.
    #[error("{0}")]
    Other(String),
}

impl From<String> for BitstreamError {
    fn from(s: String) -> Self {
        BitstreamError::Other(s)
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    /// Create an unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Check if this is an end-of-stream error.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidParameter("capacity".into());
        assert_eq!(err.to_string(), "Invalid parameter: capacity");
    }

    #[test]
    fn test_container_error_conversion() {
        let err: Error = ContainerError::UnknownFormat.into();
        assert!(matches!(err, Error::Container(ContainerError::UnknownFormat)));
    }

    #[test]
    fn test_is_eof() {
        assert!(Error::EndOfStream.is_eof());
        assert!(!Error::Cancelled.is_eof());
    }
}
