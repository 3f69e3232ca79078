//! FLV-specific error types.

use thiserror::Error;

/// FLV-specific error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlvError {
    /// Invalid FLV signature (expected "FLV"). Non-fatal at the probe
    /// stage: this is how format sniffing rejects foreign files.
    #[error("Invalid FLV signature: expected 'FLV', got '{0}'")]
    InvalidSignature(String),

    /// Invalid FLV version.
    #[error("Invalid FLV version: {0}")]
    InvalidVersion(u8),

    /// Invalid tag type.
    #[error("Invalid tag type: {0}")]
    InvalidTagType(u8),

    /// A declared tag size disagrees with the surrounding structure.
    #[error("Invalid tag size at offset {offset}: {message}")]
    InvalidTagSize {
        /// Byte offset where the invalid size was found.
        offset: u64,
        /// Description of the size error.
        message: String,
    },

    /// The trailing previous-tag-size field does not match the tag just
    /// read. For AVC/HEVC video this triggers resynchronization before
    /// it becomes fatal.
    #[error("Previous tag size mismatch at offset {offset}: expected {expected}, got {actual}")]
    TagSizeMismatch {
        /// Byte offset of the trailer field.
        offset: u64,
        /// Expected value (payload size + 11).
        expected: u32,
        /// Value actually present in the stream.
        actual: u32,
    },

    /// Resynchronization scanned its whole window without finding a
    /// plausible tag boundary.
    #[error("Resynchronization failed after {attempts} attempts at offset {offset}")]
    ResyncFailed {
        /// Offset where the scan started.
        offset: u64,
        /// Number of resync attempts spent.
        attempts: u32,
    },

    /// Invalid or unsupported audio format nibble.
    #[error("Invalid or unsupported audio format: {0}")]
    InvalidAudioFormat(u8),

    /// Invalid or unsupported video codec nibble.
    #[error("Invalid or unsupported video codec: {0}")]
    InvalidVideoCodec(u8),

    /// Invalid video frame type.
    #[error("Invalid video frame type: {0}")]
    InvalidFrameType(u8),

    /// Invalid AVC packet type.
    #[error("Invalid AVC packet type: {0}")]
    InvalidAvcPacketType(u8),

    /// Invalid AAC packet type.
    #[error("Invalid AAC packet type: {0}")]
    InvalidAacPacketType(u8),

    /// Invalid AMF data.
    #[error("Invalid AMF data: {0}")]
    InvalidAmf(String),

    /// Invalid AMF type marker.
    #[error("Invalid AMF type marker: {0}")]
    InvalidAmfType(u8),

    /// AMF recursion limit exceeded.
    #[error("AMF nesting too deep: {0}")]
    AmfTooDeep(u32),

    /// A codec that requires out-of-band configuration never delivered it.
    #[error("Missing {codec} sequence header")]
    MissingSequenceHeader {
        /// The codec that is missing its configuration.
        codec: String,
    },

    /// Invalid codec configuration record.
    #[error("Invalid {codec} sequence header: {message}")]
    InvalidSequenceHeader {
        /// The codec with the invalid configuration.
        codec: String,
        /// Description of the error.
        message: String,
    },

    /// Unexpected end of data mid-structure.
    #[error("Unexpected end of data at offset {offset}")]
    UnexpectedEnd {
        /// Byte offset where the end was encountered.
        offset: u64,
    },

    /// Seek failed.
    #[error("Seek failed: {0}")]
    SeekFailed(String),

    /// No usable audio or video streams found.
    #[error("No audio or video streams found in FLV")]
    NoStreamsFound,

    /// I/O error (short read counts as an error, never partial success).
    #[error("I/O error: {0}")]
    Io(String),

    /// Clean end of stream.
    #[error("End of stream")]
    Eof,
}

impl From<std::io::Error> for FlvError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            FlvError::Eof
        } else {
            FlvError::Io(err.to_string())
        }
    }
}

/// Result type for FLV operations.
pub type Result<T> = std::result::Result<T, FlvError>;

impl FlvError {
    /// Check whether this is the clean end-of-stream condition (as
    /// opposed to an I/O failure).
    pub fn is_eof(&self) -> bool {
        matches!(self, FlvError::Eof)
    }
}

/// Convert FlvError to demuxio_core::Error.
impl From<FlvError> for demuxio_core::Error {
    fn from(err: FlvError) -> Self {
        use demuxio_core::error::ContainerError;
        match &err {
            FlvError::Eof => demuxio_core::Error::EndOfStream,
            FlvError::Io(msg) => {
                demuxio_core::Error::Io(std::io::Error::other(msg.clone()))
            }
            FlvError::InvalidSignature(_) | FlvError::InvalidVersion(_) => {
                demuxio_core::Error::Container(ContainerError::UnknownFormat)
            }
            FlvError::MissingSequenceHeader { .. } => {
                demuxio_core::Error::Container(ContainerError::MissingElement(err.to_string()))
            }
            FlvError::InvalidTagSize { offset, message } => {
                demuxio_core::Error::Container(ContainerError::InvalidSize {
                    offset: *offset,
                    message: message.clone(),
                })
            }
            FlvError::TagSizeMismatch { offset, .. } => {
                demuxio_core::Error::Container(ContainerError::InvalidSize {
                    offset: *offset,
                    message: err.to_string(),
                })
            }
            FlvError::AmfTooDeep(depth) => {
                demuxio_core::Error::Container(ContainerError::RecursionLimit { depth: *depth })
            }
            FlvError::SeekFailed(msg) => {
                demuxio_core::Error::Container(ContainerError::SeekFailed(msg.clone()))
            }
            _ => demuxio_core::Error::Container(ContainerError::InvalidStructure(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlvError::InvalidSignature("ABC".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid FLV signature: expected 'FLV', got 'ABC'"
        );
    }

    #[test]
    fn test_tag_size_mismatch_display() {
        let err = FlvError::TagSizeMismatch {
            offset: 128,
            expected: 111,
            actual: 47,
        };
        assert_eq!(
            err.to_string(),
            "Previous tag size mismatch at offset 128: expected 111, got 47"
        );
    }

    #[test]
    fn test_eof_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: FlvError = io_err.into();
        assert!(err.is_eof());

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: FlvError = io_err.into();
        assert!(matches!(err, FlvError::Io(_)));
    }

    #[test]
    fn test_conversion_to_core_error() {
        let err: demuxio_core::Error = FlvError::InvalidSignature("ABC".into()).into();
        assert!(matches!(err, demuxio_core::Error::Container(_)));

        let err: demuxio_core::Error = FlvError::Eof.into();
        assert!(err.is_eof());
    }
}
