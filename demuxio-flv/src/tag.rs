//! FLV tag types and the tag reading layer.
//!
//! FLV files contain tags of three types:
//! - Audio tags (type 8)
//! - Video tags (type 9)
//! - Script data tags (type 18)
//!
//! Each tag is an 11-byte header, the payload, and a trailing 4-byte
//! "previous tag size" field that must equal `payload + 11`. The reader
//! here validates that trailer on every tag; for AVC/HEVC video tags a
//! mismatch triggers a bounded resynchronization scan instead of a fatal
//! error, since a plausible keyframe boundary can usually be found a
//! short distance ahead in a damaged stream.

use crate::error::{FlvError, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::{debug, warn};

/// Audio tag type.
pub const TAG_TYPE_AUDIO: u8 = 8;

/// Video tag type.
pub const TAG_TYPE_VIDEO: u8 = 9;

/// Script data tag type.
pub const TAG_TYPE_SCRIPT_DATA: u8 = 18;

/// FLV tag header size.
pub const TAG_HEADER_SIZE: usize = 11;

/// Maximum tag payload size (24-bit field).
pub const MAX_TAG_DATA_SIZE: u32 = 0x00FF_FFFF;

/// Forward window scanned when resynchronizing after a trailer mismatch.
pub const RESYNC_WINDOW: usize = 1 << 20;

/// Resync attempts allowed within a single tag read.
pub const MAX_RESYNC_ATTEMPTS: u32 = 3;

/// FLV tag type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TagType {
    /// Audio data.
    Audio = TAG_TYPE_AUDIO,
    /// Video data.
    Video = TAG_TYPE_VIDEO,
    /// Script data (metadata).
    ScriptData = TAG_TYPE_SCRIPT_DATA,
}

impl TagType {
    /// Create a TagType from a raw byte value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            TAG_TYPE_AUDIO => Some(Self::Audio),
            TAG_TYPE_VIDEO => Some(Self::Video),
            TAG_TYPE_SCRIPT_DATA => Some(Self::ScriptData),
            _ => None,
        }
    }

    /// Convert to raw byte value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this is a video tag.
    pub fn is_video(self) -> bool {
        self == Self::Video
    }

    /// Check if this is an audio tag.
    pub fn is_audio(self) -> bool {
        self == Self::Audio
    }
}

/// FLV tag header.
///
/// The wire format stores the timestamp as 3 big-endian bytes plus a
/// separate extension byte that lands in bits 24..31 of the composed
/// value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagHeader {
    /// Tag type.
    pub tag_type: TagType,
    /// Payload size (not including header or trailer).
    pub data_size: u32,
    /// Timestamp in milliseconds (lower 24 bits).
    pub timestamp: u32,
    /// Timestamp extension (upper 8 bits).
    pub timestamp_extended: u8,
    /// Stream ID (always 0 in files).
    pub stream_id: u32,
}

impl TagHeader {
    /// Create a new tag header.
    pub fn new(tag_type: TagType, data_size: u32, timestamp_ms: u32) -> Self {
        Self {
            tag_type,
            data_size,
            timestamp: timestamp_ms & 0x00FF_FFFF,
            timestamp_extended: ((timestamp_ms >> 24) & 0xFF) as u8,
            stream_id: 0,
        }
    }

    /// Get the full 32-bit timestamp.
    pub fn timestamp_ms(&self) -> u32 {
        ((self.timestamp_extended as u32) << 24) | self.timestamp
    }

    /// Total on-disk size including header and trailer.
    pub fn total_size(&self) -> u32 {
        TAG_HEADER_SIZE as u32 + self.data_size + 4
    }

    /// Parse a tag header from a reader.
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        let tag_type_byte = reader.read_u8()?;
        let tag_type =
            TagType::from_u8(tag_type_byte).ok_or(FlvError::InvalidTagType(tag_type_byte))?;

        let mut size_bytes = [0u8; 3];
        reader.read_exact(&mut size_bytes)?;
        let data_size =
            ((size_bytes[0] as u32) << 16) | ((size_bytes[1] as u32) << 8) | (size_bytes[2] as u32);

        let mut ts_bytes = [0u8; 3];
        reader.read_exact(&mut ts_bytes)?;
        let timestamp =
            ((ts_bytes[0] as u32) << 16) | ((ts_bytes[1] as u32) << 8) | (ts_bytes[2] as u32);
        let timestamp_extended = reader.read_u8()?;

        let mut stream_id_bytes = [0u8; 3];
        reader.read_exact(&mut stream_id_bytes)?;
        let stream_id = ((stream_id_bytes[0] as u32) << 16)
            | ((stream_id_bytes[1] as u32) << 8)
            | (stream_id_bytes[2] as u32);

        Ok(Self {
            tag_type,
            data_size,
            timestamp,
            timestamp_extended,
            stream_id,
        })
    }

    /// Write the tag header to a writer.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<usize> {
        writer.write_u8(self.tag_type.as_u8())?;

        writer.write_u8(((self.data_size >> 16) & 0xFF) as u8)?;
        writer.write_u8(((self.data_size >> 8) & 0xFF) as u8)?;
        writer.write_u8((self.data_size & 0xFF) as u8)?;

        writer.write_u8(((self.timestamp >> 16) & 0xFF) as u8)?;
        writer.write_u8(((self.timestamp >> 8) & 0xFF) as u8)?;
        writer.write_u8((self.timestamp & 0xFF) as u8)?;
        writer.write_u8(self.timestamp_extended)?;

        writer.write_u8(0)?;
        writer.write_u8(0)?;
        writer.write_u8(0)?;

        Ok(TAG_HEADER_SIZE)
    }
}

/// A complete FLV tag: header, owned payload, and the file offset the
/// tag started at (seek-table entries record this offset).
#[derive(Debug, Clone)]
pub struct FlvTag {
    /// Tag header.
    pub header: TagHeader,
    /// Tag payload.
    pub data: Vec<u8>,
    /// File offset of the tag's first header byte.
    pub offset: u64,
}

impl FlvTag {
    /// Create a new FLV tag (offset 0, for synthesized tags).
    pub fn new(tag_type: TagType, timestamp_ms: u32, data: Vec<u8>) -> Self {
        Self {
            header: TagHeader::new(tag_type, data.len() as u32, timestamp_ms),
            data,
            offset: 0,
        }
    }

    /// Get the tag type.
    pub fn tag_type(&self) -> TagType {
        self.header.tag_type
    }

    /// Get the timestamp in milliseconds.
    pub fn timestamp_ms(&self) -> u32 {
        self.header.timestamp_ms()
    }

    /// Write the tag (header + payload + trailer) to a writer.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let header_size = self.header.write(writer)?;
        writer.write_all(&self.data)?;
        let trailer = TAG_HEADER_SIZE as u32 + self.data.len() as u32;
        writer.write_u32::<BigEndian>(trailer)?;
        Ok(header_size + self.data.len() + 4)
    }
}

/// Read the 4-byte previous-tag-size field.
pub fn read_previous_tag_size<R: Read>(reader: &mut R) -> Result<u32> {
    Ok(reader.read_u32::<BigEndian>()?)
}

/// Write a previous-tag-size field.
pub fn write_previous_tag_size<W: Write>(writer: &mut W, size: u32) -> Result<()> {
    writer.write_u32::<BigEndian>(size)?;
    Ok(())
}

/// Check whether a video tag payload is AVC or HEVC coded.
///
/// Covers both the legacy codec-id nibble and the enhanced (FourCC)
/// layout.
pub fn is_avc_or_hevc_payload(data: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }
    let first = data[0];
    if first & 0x80 != 0 {
        // Enhanced layout: FourCC follows the first byte.
        return data.len() >= 5 && matches!(&data[1..5], b"avc1" | b"avc3" | b"hvc1" | b"hev1");
    }
    matches!(first & 0x0F, 7 | 12)
}

/// Scan a window for a plausible AVC keyframe tag start.
///
/// The match is a heuristic, not a parse: tag type byte, in-range payload
/// size, zero stream id, a keyframe+AVC first payload byte, a NALU packet
/// type, and a NAL length prefix whose leading zero run and NAL-type
/// nibble look like an IDR slice or parameter set. Callers must treat a
/// hit as a hint and confirm it with a full tag read (including the
/// trailer cross-check) before trusting it.
pub fn scan_for_keyframe_tag(window: &[u8]) -> Option<usize> {
    // Minimum bytes to apply every check below.
    const PROBE_LEN: usize = TAG_HEADER_SIZE + 10;
    if window.len() < PROBE_LEN {
        return None;
    }

    for i in 0..=window.len() - PROBE_LEN {
        if window[i] != TAG_TYPE_VIDEO {
            continue;
        }

        let size = ((window[i + 1] as u32) << 16)
            | ((window[i + 2] as u32) << 8)
            | (window[i + 3] as u32);
        if size == 0 {
            continue;
        }

        // Stream id bytes are always zero in a file.
        if window[i + 8] != 0 || window[i + 9] != 0 || window[i + 10] != 0 {
            continue;
        }

        let p = i + TAG_HEADER_SIZE;
        // Keyframe + AVC codec nibble, then a NALU (not config) packet.
        if window[p] != 0x17 || window[p + 1] != 0x01 {
            continue;
        }

        // 4-byte NAL length: real lengths leave the high byte zero
        // (payloads are capped at 16 MB), giving the zero run.
        if window[p + 5] != 0 {
            continue;
        }

        // NAL header: forbidden bit clear, type an IDR slice or SPS/PPS.
        let nal = window[p + 9];
        if nal & 0x80 != 0 {
            continue;
        }
        if !matches!(nal & 0x1F, 5 | 7 | 8) {
            continue;
        }

        return Some(i);
    }

    None
}

/// Tag-level reading layer over a random-access byte source.
///
/// Owns the stream cursor: every component above it performs reads and
/// seeks exclusively through this type. Short reads are surfaced as
/// errors/EOF, never as partial success.
#[derive(Debug)]
pub struct TagReader<R> {
    reader: R,
    position: u64,
    file_size: Option<u64>,
}

impl<R: Read + Seek> TagReader<R> {
    /// Create a tag reader, measuring the stream length.
    pub fn new(mut reader: R) -> Result<Self> {
        let file_size = reader.seek(SeekFrom::End(0)).ok();
        reader.seek(SeekFrom::Start(0))?;
        Ok(Self {
            reader,
            position: 0,
            file_size,
        })
    }

    /// Current byte offset.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Total stream length, when the source could report it.
    pub fn file_size(&self) -> Option<u64> {
        self.file_size
    }

    /// Reposition the cursor.
    pub fn seek_to(&mut self, offset: u64) -> Result<u64> {
        let pos = self.reader.seek(SeekFrom::Start(offset))?;
        self.position = pos;
        Ok(pos)
    }

    /// Read exactly `buf.len()` bytes at the current position.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf)?;
        self.position += buf.len() as u64;
        Ok(())
    }

    /// Read up to `buf.len()` bytes at `offset` without the usual
    /// all-or-nothing contract; used for bounded probe windows where a
    /// short window near EOF is still useful. The cursor is left at the
    /// end of the bytes read.
    pub fn read_window_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.seek_to(offset)?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.position += filled as u64;
        Ok(filled)
    }

    /// Access the inner reader mutably (header parse during open).
    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Record bytes consumed through `inner_mut`.
    pub fn advance(&mut self, n: u64) {
        self.position += n;
    }

    /// Read one complete tag at the current position.
    ///
    /// Returns `Ok(None)` at clean end of stream. The trailing
    /// previous-tag-size field is validated; a mismatch on an AVC/HEVC
    /// video tag engages the resynchronization scan, bounded by
    /// [`MAX_RESYNC_ATTEMPTS`] and [`RESYNC_WINDOW`]. A mismatch on any
    /// other tag is fatal to this read.
    pub fn read_tag(&mut self) -> Result<Option<FlvTag>> {
        let mut attempts = 0u32;

        loop {
            let tag_start = self.position;

            if let Some(size) = self.file_size {
                if tag_start + TAG_HEADER_SIZE as u64 > size {
                    return Ok(None);
                }
            }

            let header = match TagHeader::parse(&mut self.reader) {
                Ok(h) => h,
                Err(FlvError::Eof) => return Ok(None),
                Err(e) => return Err(e),
            };
            self.position += TAG_HEADER_SIZE as u64;

            if header.data_size > MAX_TAG_DATA_SIZE {
                return Err(FlvError::InvalidTagSize {
                    offset: tag_start,
                    message: format!("payload size {} exceeds format maximum", header.data_size),
                });
            }

            let mut data = vec![0u8; header.data_size as usize];
            match self.reader.read_exact(&mut data) {
                Ok(()) => self.position += header.data_size as u64,
                Err(_) => return Ok(None),
            }

            let trailer = match read_previous_tag_size(&mut self.reader) {
                Ok(t) => t,
                Err(FlvError::Eof) => return Ok(None),
                Err(e) => return Err(e),
            };
            self.position += 4;

            let expected = header.data_size + TAG_HEADER_SIZE as u32;
            if trailer == expected {
                return Ok(Some(FlvTag {
                    header,
                    data,
                    offset: tag_start,
                }));
            }

            // Damaged stream. Only AVC/HEVC video is worth rescanning:
            // those streams have a recognizable keyframe tag pattern.
            let resyncable = header.tag_type.is_video() && is_avc_or_hevc_payload(&data);
            if !resyncable {
                return Err(FlvError::TagSizeMismatch {
                    offset: self.position - 4,
                    expected,
                    actual: trailer,
                });
            }

            attempts += 1;
            if attempts > MAX_RESYNC_ATTEMPTS {
                return Err(FlvError::ResyncFailed {
                    offset: tag_start,
                    attempts: attempts - 1,
                });
            }

            warn!(
                offset = tag_start,
                expected, actual = trailer, "tag trailer mismatch, resynchronizing"
            );

            match self.resync_from(tag_start + 1)? {
                Some(next) => {
                    debug!(offset = next, "resync found candidate tag");
                    self.seek_to(next)?;
                }
                None => {
                    return Err(FlvError::ResyncFailed {
                        offset: tag_start,
                        attempts,
                    });
                }
            }
        }
    }

    /// Scan forward from `from` for the next plausible keyframe tag.
    fn resync_from(&mut self, from: u64) -> Result<Option<u64>> {
        let mut window = vec![0u8; RESYNC_WINDOW];
        let got = self.read_window_at(from, &mut window)?;
        window.truncate(got);

        Ok(scan_for_keyframe_tag(&window).map(|idx| from + idx as u64))
    }
}
