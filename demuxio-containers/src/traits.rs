//! Container format traits for demuxing.

use bitflags::bitflags;
use demuxio_core::error::Result;
use demuxio_core::packet::Packet;
use demuxio_core::rational::Rational;
use std::io::Read;

/// Seek target for demuxing operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekTarget {
    /// Seek to a timestamp in microseconds.
    /// The demuxer lands on the nearest keyframe at or before this timestamp.
    Timestamp(i64),
    /// Seek to a byte offset in the file (resume from a known position).
    ByteOffset(u64),
}

impl SeekTarget {
    /// Create a timestamp-based seek target from microseconds.
    pub fn from_micros(micros: i64) -> Self {
        SeekTarget::Timestamp(micros)
    }

    /// Create a timestamp-based seek target from milliseconds.
    pub fn from_millis(millis: i64) -> Self {
        SeekTarget::Timestamp(millis.saturating_mul(1000))
    }

    /// Create a byte offset seek target.
    pub fn from_byte_offset(offset: u64) -> Self {
        SeekTarget::ByteOffset(offset)
    }
}

/// Seek mode options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeekMode {
    /// Land on the nearest keyframe at or before the target (default).
    #[default]
    Backward,
    /// Land on the nearest keyframe at or after the target.
    Forward,
}

/// Result of a seek operation: where we actually landed.
#[derive(Debug, Clone)]
pub struct SeekResult {
    /// The timestamp we landed on (microseconds).
    pub timestamp_us: i64,
    /// Whether we landed on a keyframe.
    pub is_keyframe: bool,
}

/// Track type in a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackType {
    /// Video track.
    Video,
    /// Audio track.
    Audio,
    /// Data track (script/metadata).
    Data,
    /// Unknown track type.
    Unknown,
}

/// Codec identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecId {
    /// H.264/AVC.
    H264,
    /// H.265/HEVC.
    H265,
    /// Sorenson H.263.
    SorensonH263,
    /// On2 VP6.
    Vp6,
    /// AAC.
    Aac,
    /// MP3.
    Mp3,
    /// Linear PCM.
    Pcm,
    /// Unknown codec.
    Unknown(String),
}

impl CodecId {
    /// MIME type for the codec's elementary stream.
    pub fn mime(&self) -> &str {
        match self {
            CodecId::H264 => "video/avc",
            CodecId::H265 => "video/hevc",
            CodecId::SorensonH263 => "video/x-flv-sorenson",
            CodecId::Vp6 => "video/x-vp6",
            CodecId::Aac => "audio/mp4a-latm",
            CodecId::Mp3 => "audio/mpeg",
            CodecId::Pcm => "audio/raw",
            CodecId::Unknown(_) => "application/octet-stream",
        }
    }
}

bitflags! {
    /// Capability flags reported by a demuxer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DemuxerFlags: u32 {
        /// Time-based seeking is supported.
        const CAN_SEEK = 0x0001;
        /// Playback can pause and resume without reopening.
        const CAN_PAUSE = 0x0002;
        /// Seeking backward from the current position is supported.
        const CAN_SEEK_BACKWARD = 0x0004;
        /// Seeking forward from the current position is supported.
        const CAN_SEEK_FORWARD = 0x0008;
    }
}

/// Overall container classification.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// Container MIME type (video-flavored, audio-only, or generic).
    pub mime: &'static str,
    /// A video stream exists but its codec is not supported; the
    /// container is exposed as audio-only or generic in that case.
    pub has_unsupported_video: bool,
}

/// Stream information.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    /// Stream index.
    pub index: usize,
    /// Track type.
    pub track_type: TrackType,
    /// Codec ID.
    pub codec_id: CodecId,
    /// Duration in microseconds.
    pub duration_us: Option<i64>,
    /// Hint for the largest access unit the consumer should expect.
    pub max_packet_size: Option<usize>,
    /// Codec-specific configuration (out-of-band, never a stream packet).
    pub extra_data: Option<Vec<u8>>,
    /// Video-specific info.
    pub video: Option<VideoStreamInfo>,
    /// Audio-specific info.
    pub audio: Option<AudioStreamInfo>,
}

/// Video stream information.
#[derive(Debug, Clone)]
pub struct VideoStreamInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frame rate.
    pub frame_rate: Option<Rational>,
}

/// Audio stream information.
#[derive(Debug, Clone)]
pub struct AudioStreamInfo {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u8,
    /// Bits per sample.
    pub bits_per_sample: u8,
}

/// Demuxer trait for reading container formats.
pub trait Demuxer {
    /// Get container format name.
    fn format_name(&self) -> &str;

    /// Get duration in microseconds.
    fn duration(&self) -> Option<i64>;

    /// Get number of usable streams. Streams whose codec is unsupported or
    /// whose required configuration never arrived are not counted.
    fn num_streams(&self) -> usize;

    /// Get stream information.
    fn stream_info(&self, index: usize) -> Option<&StreamInfo>;

    /// Get the overall container classification.
    fn container_info(&self) -> ContainerInfo;

    /// Get the demuxer's capability flags.
    fn flags(&self) -> DemuxerFlags;

    /// Read the next packet, interleaved across tracks.
    ///
    /// Returns `Ok(None)` at clean end of stream, after any buffered
    /// frames have been drained.
    fn read_packet(&mut self) -> Result<Option<Packet<'static>>>;

    /// Seek to a timestamp (in microseconds).
    fn seek(&mut self, timestamp_us: i64) -> Result<()> {
        self.seek_to(SeekTarget::Timestamp(timestamp_us), SeekMode::Backward)?;
        Ok(())
    }

    /// Seek to a specific target with the given mode.
    fn seek_to(&mut self, target: SeekTarget, mode: SeekMode) -> Result<SeekResult>;

    /// Check if seeking is supported for this particular stream.
    fn can_seek(&self) -> bool {
        true
    }

    /// Get the current position as a byte offset.
    fn position(&self) -> Option<u64>;
}

/// Probe result for container format detection.
#[derive(Debug)]
pub struct ProbeResult {
    /// Format name.
    pub format_name: String,
    /// Confidence score (0.0 - 1.0).
    pub score: f32,
}

/// Sniff a byte source for a known container format.
///
/// Reads at most `size` bytes (capped at 4 KiB) and checks signatures.
pub fn probe<R: Read>(reader: &mut R, size: usize) -> Result<Option<ProbeResult>> {
    let mut buffer = vec![0u8; size.min(4096)];
    let bytes_read = reader.read(&mut buffer)?;
    buffer.truncate(bytes_read);

    // FLV: "FLV" signature + version 1. Fixed confidence, matching the
    // score used when the same check runs as the first parse step.
    if bytes_read >= 4 && &buffer[0..3] == b"FLV" && buffer[3] == 1 {
        return Ok(Some(ProbeResult {
            format_name: "flv".to_string(),
            score: 0.8,
        }));
    }

    // Bare MP3 elementary stream (sync word), so audio-only files that
    // lost their container are still classified.
    if bytes_read >= 2 && buffer[0] == 0xFF && (buffer[1] & 0xE0) == 0xE0 {
        return Ok(Some(ProbeResult {
            format_name: "mp3".to_string(),
            score: 0.7,
        }));
    }

    Ok(None)
}
