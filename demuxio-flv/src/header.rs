//! FLV file header parsing.
//!
//! The FLV header is the first 9 bytes of the file:
//! - Signature: "FLV" (3 bytes)
//! - Version: 1 (1 byte)
//! - Flags: audio/video presence (1 byte)
//! - Header size (4 bytes, big-endian)
//!
//! The header is followed by a 4-byte always-zero "previous tag size"
//! field; the data region starts after that.

use crate::error::{FlvError, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// FLV file signature.
pub const FLV_SIGNATURE: &[u8; 3] = b"FLV";

/// Current FLV version.
pub const FLV_VERSION: u8 = 1;

/// Standard FLV header size.
pub const FLV_HEADER_SIZE: u32 = 9;

/// Flag indicating audio is present.
pub const FLV_FLAG_AUDIO: u8 = 0x04;

/// Flag indicating video is present.
pub const FLV_FLAG_VIDEO: u8 = 0x01;

/// FLV file header. Parsed once at offset 0, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlvHeader {
    /// FLV version (should be 1).
    pub version: u8,
    /// Whether the file claims to contain audio.
    pub has_audio: bool,
    /// Whether the file claims to contain video.
    pub has_video: bool,
    /// Header size (at least 9; larger values carry reserved bytes).
    pub header_size: u32,
}

impl Default for FlvHeader {
    fn default() -> Self {
        Self {
            version: FLV_VERSION,
            has_audio: false,
            has_video: false,
            header_size: FLV_HEADER_SIZE,
        }
    }
}

impl FlvHeader {
    /// Create a new FLV header with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a header claiming both audio and video.
    pub fn audio_video() -> Self {
        Self {
            has_audio: true,
            has_video: true,
            ..Self::default()
        }
    }

    /// Set whether audio is present.
    pub fn with_audio(mut self, has_audio: bool) -> Self {
        self.has_audio = has_audio;
        self
    }

    /// Set whether video is present.
    pub fn with_video(mut self, has_video: bool) -> Self {
        self.has_video = has_video;
        self
    }

    /// Offset of the first tag: past the header and the leading
    /// always-zero previous-tag-size field.
    pub fn data_start(&self) -> u64 {
        self.header_size as u64 + 4
    }

    /// Parse an FLV header from a reader.
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        let mut signature = [0u8; 3];
        reader.read_exact(&mut signature)?;

        if &signature != FLV_SIGNATURE {
            return Err(FlvError::InvalidSignature(
                String::from_utf8_lossy(&signature).to_string(),
            ));
        }

        let version = reader.read_u8()?;
        if version != FLV_VERSION {
            return Err(FlvError::InvalidVersion(version));
        }

        let flags = reader.read_u8()?;
        let has_audio = (flags & FLV_FLAG_AUDIO) != 0;
        let has_video = (flags & FLV_FLAG_VIDEO) != 0;

        let header_size = reader.read_u32::<BigEndian>()?;
        if header_size < FLV_HEADER_SIZE {
            return Err(FlvError::InvalidTagSize {
                offset: 5,
                message: format!(
                    "Header size {} is less than minimum {}",
                    header_size, FLV_HEADER_SIZE
                ),
            });
        }

        Ok(Self {
            version,
            has_audio,
            has_video,
            header_size,
        })
    }

    /// Write the FLV header to a writer.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<usize> {
        writer.write_all(FLV_SIGNATURE)?;
        writer.write_u8(self.version)?;
        writer.write_u8(self.flags())?;
        writer.write_u32::<BigEndian>(self.header_size)?;
        Ok(FLV_HEADER_SIZE as usize)
    }

    /// Get the flags byte.
    pub fn flags(&self) -> u8 {
        let mut flags = 0u8;
        if self.has_audio {
            flags |= FLV_FLAG_AUDIO;
        }
        if self.has_video {
            flags |= FLV_FLAG_VIDEO;
        }
        flags
    }
}

/// Check if data starts with a valid FLV signature.
pub fn is_flv_signature(data: &[u8]) -> bool {
    data.len() >= 3 && &data[0..3] == FLV_SIGNATURE
}
