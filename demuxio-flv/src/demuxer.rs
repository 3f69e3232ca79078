//! FLV demuxer: pulls codec-ready access units out of an FLV byte stream.
//!
//! The pipeline is a single forward pass: read a tag, classify it, and
//! either consume it (metadata, codec configuration) or append it to the
//! per-track frame queue it belongs to. Consumers pull from the queues;
//! when a queue runs low the demuxer reads more tags on demand. Seeks
//! reposition the underlying cursor and clear both queues.
//!
//! Video keyframes observed during the forward pass feed the seek table,
//! unless the file's metadata already supplied an explicit index.

use crate::audio::{AacConfig, AudioTagHeader, Mp3FrameHeader, SoundFormat};
use crate::error::Result;
use crate::header::FlvHeader;
use crate::metadata::Metadata;
use crate::seek::{SeekTable, DEFAULT_TABLE_CAPACITY};
use crate::tag::{scan_for_keyframe_tag, FlvTag, TagReader, TagType};
use crate::video::{
    length_prefixed_to_annexb, next_nal_range, AvcConfig, HevcConfig, VideoCodec, VideoTagHeader,
    START_CODE,
};
use demuxio_containers::{
    AudioStreamInfo, CodecId, ContainerInfo, Demuxer, DemuxerFlags, SeekMode, SeekResult,
    SeekTarget, StreamInfo, TrackType, VideoStreamInfo,
};
use demuxio_core::error::Result as CoreResult;
use demuxio_core::packet::{Packet, PacketFlags};
use demuxio_core::rational::Rational;
use demuxio_core::timestamp::{TimeBase, Timestamp};
use std::collections::VecDeque;
use std::io::{Read, Seek};
use tracing::{debug, warn};

/// Queue depth below which a track read pulls more tags.
pub const LOW_WATERMARK: usize = 2;

/// Queue depth at which a track read stops pulling and just dequeues.
pub const HIGH_WATERMARK: usize = 10;

/// Playable frames buffered before the initial probe may stop.
const MIN_PROBE_TAGS: usize = 5;

/// Tag ceiling for the initial probe, bounding the "header claims
/// streams that never appear" detection pass.
const PROBE_TAG_CEILING: usize = 1000;

/// Gap beyond which the interpolating direct seek is attempted (3 min).
const DIRECT_SEEK_GAP_MS: u64 = 180_000;

/// Probe window size for direct-seek reads.
const DIRECT_SEEK_WINDOW: usize = 64 * 1024;

/// Iteration budget for the direct-seek binary search.
const DIRECT_SEEK_MAX_ITERATIONS: u32 = 20;

/// Above this size the closest direct-seek hit is accepted even when it
/// never converged within one granularity of the target.
const LARGE_FILE_BYTES: u64 = 3 << 30;

/// Hint for the largest video access unit a consumer should expect.
const VIDEO_MAX_PACKET_HINT: usize = 1 << 20;

/// Hint for the largest audio access unit a consumer should expect.
const AUDIO_MAX_PACKET_HINT: usize = 64 * 1024;

/// How coded AVC payloads are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NalOutputMode {
    /// Reassemble every NAL unit in a tag into one Annex-B access unit.
    #[default]
    AccessUnit,
    /// Emit one Annex-B NAL unit per read; a tag stays queued until its
    /// payload cursor reaches the end.
    SingleNal,
}

/// Demuxer configuration, read once at parse time.
#[derive(Debug, Clone)]
pub struct FlvDemuxerConfig {
    /// Force-disable audio demuxing regardless of detected codecs.
    pub disable_audio: bool,
    /// Force-disable video demuxing regardless of detected codecs.
    pub disable_video: bool,
    /// AVC payload emission mode.
    pub nal_output: NalOutputMode,
    /// Allow the interpolating direct seek for far-ahead AVC targets.
    pub enable_direct_seek: bool,
    /// Seek table capacity.
    pub seek_table_capacity: usize,
}

impl Default for FlvDemuxerConfig {
    fn default() -> Self {
        Self {
            disable_audio: false,
            disable_video: false,
            nal_output: NalOutputMode::AccessUnit,
            enable_direct_seek: true,
            seek_table_capacity: DEFAULT_TABLE_CAPACITY,
        }
    }
}

/// Cache-fill mode for `cache_more`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheMode {
    /// Respect the resolved has-audio/has-video flags.
    Playback,
    /// Initial probe: accept tags regardless of the header's claims so
    /// codecs and configs can be discovered.
    Anyhow,
}

/// One buffered access unit awaiting dequeue.
#[derive(Debug)]
struct QueuedFrame {
    /// Wraparound-corrected timestamp in milliseconds.
    timestamp_ms: u64,
    /// Composition-time offset (video only).
    composition_ms: i32,
    /// Full tag payload, owned by the queue entry.
    data: Vec<u8>,
    /// Sync-sample flag (video only).
    keyframe: bool,
    /// Cursor into the payload body for NAL-at-a-time dequeue.
    cursor: usize,
}

/// Per-track wraparound state for the 32-bit tag timestamp.
#[derive(Debug, Default)]
struct TimestampTracker {
    last: u32,
    offset: u64,
}

impl TimestampTracker {
    fn correct(&mut self, raw: u32) -> u64 {
        if raw < self.last && self.last - raw > 0x8000_0000 {
            self.offset += 0x1_0000_0000;
        }
        self.last = raw;
        self.offset + raw as u64
    }
}

/// FLV demuxer over a random-access byte source.
pub struct FlvDemuxer<R> {
    reader: TagReader<R>,
    header: FlvHeader,
    config: FlvDemuxerConfig,

    metadata: Option<Metadata>,
    seek_table: SeekTable,
    data_start: u64,
    /// Reconciled stream length: the actual source length when known,
    /// otherwise the container's claimed size.
    file_size: u64,
    duration_ms: u64,

    has_video: bool,
    has_audio: bool,
    unsupported_video: bool,
    video_codec: Option<VideoCodec>,
    audio_format: Option<SoundFormat>,

    avc_config: Option<AvcConfig>,
    hevc_config: Option<HevcConfig>,
    aac_config: Option<AacConfig>,
    hevc_param_nals: Vec<Vec<u8>>,
    video_config_sent: bool,
    audio_config_sent: bool,

    audio_sample_rate: u32,
    audio_channels: u8,
    audio_bits: u8,

    video_queue: VecDeque<QueuedFrame>,
    audio_queue: VecDeque<QueuedFrame>,
    video_ts: TimestampTracker,
    audio_ts: TimestampTracker,

    streams: Vec<StreamInfo>,
    video_stream_index: Option<u32>,
    audio_stream_index: Option<u32>,

    seek_target_ms: Option<u64>,
    eof: bool,
}

impl<R: Read + Seek> FlvDemuxer<R> {
    /// Open an FLV stream with the default configuration.
    pub fn new(reader: R) -> Result<Self> {
        Self::with_config(reader, FlvDemuxerConfig::default())
    }

    /// Open an FLV stream.
    ///
    /// Parses the file header, the leading metadata tag when present,
    /// and probes forward until codec configuration for every claimed
    /// track has been seen (or ruled out), buffering the first playable
    /// frames along the way.
    pub fn with_config(reader: R, config: FlvDemuxerConfig) -> Result<Self> {
        let mut tag_reader = TagReader::new(reader)?;

        let header = FlvHeader::parse(tag_reader.inner_mut())?;
        tag_reader.advance(9);

        // Skip reserved header bytes and the leading zero trailer.
        let data_start = header.data_start();
        tag_reader.seek_to(data_start)?;

        let actual_size = tag_reader.file_size().unwrap_or(0);

        let mut demuxer = Self {
            reader: tag_reader,
            has_video: header.has_video,
            has_audio: header.has_audio,
            header,
            metadata: None,
            seek_table: SeekTable::synthesized(config.seek_table_capacity, 0),
            data_start,
            file_size: actual_size,
            duration_ms: 0,
            unsupported_video: false,
            video_codec: None,
            audio_format: None,
            avc_config: None,
            hevc_config: None,
            aac_config: None,
            hevc_param_nals: Vec::new(),
            video_config_sent: false,
            audio_config_sent: false,
            audio_sample_rate: 0,
            audio_channels: 0,
            audio_bits: 0,
            video_queue: VecDeque::new(),
            audio_queue: VecDeque::new(),
            video_ts: TimestampTracker::default(),
            audio_ts: TimestampTracker::default(),
            streams: Vec::new(),
            video_stream_index: None,
            audio_stream_index: None,
            seek_target_ms: None,
            eof: false,
            config,
        };

        demuxer.initial_parse()?;
        Ok(demuxer)
    }

    /// Header parse follow-up: metadata, codec discovery, first frames.
    fn initial_parse(&mut self) -> Result<()> {
        // The first tag decides whether we have metadata; the seek table
        // mode is fixed right after.
        match self.reader.read_tag()? {
            Some(tag) if tag.header.tag_type == TagType::ScriptData => {
                self.consume_script_tag(&tag);
                self.build_seek_table();
            }
            Some(tag) => {
                self.build_seek_table();
                self.classify_tag(tag, CacheMode::Anyhow)?;
            }
            None => {
                self.eof = true;
            }
        }

        let mut probed = 1usize;
        while probed < PROBE_TAG_CEILING && !self.eof && !self.probe_satisfied() {
            if !self.cache_more(CacheMode::Anyhow)? {
                break;
            }
            probed += 1;
        }

        self.resolve_tracks();
        self.build_streams();
        Ok(())
    }

    fn probe_satisfied(&self) -> bool {
        let buffered = self.video_queue.len() + self.audio_queue.len();
        if buffered < MIN_PROBE_TAGS {
            return false;
        }
        // Each claimed track must have resolved its codec (and config,
        // for codecs that need one) before probing may stop.
        let video_ready = !self.header.has_video
            || self.config.disable_video
            || match self.video_codec {
                None => false,
                Some(VideoCodec::Avc) => self.avc_config.is_some(),
                Some(VideoCodec::Hevc) => self.hevc_config.is_some(),
                Some(_) => true,
            };
        let audio_ready = !self.header.has_audio
            || self.config.disable_audio
            || match self.audio_format {
                None => false,
                Some(SoundFormat::Aac) => self.aac_config.is_some(),
                Some(_) => true,
            };
        video_ready && audio_ready
    }

    fn consume_script_tag(&mut self, tag: &FlvTag) {
        match crate::amf::parse_on_metadata(&tag.data) {
            Ok(props) => {
                let meta = Metadata::from_amf(&props);
                self.duration_ms = meta.duration_ms;
                // The container's claimed size may be wrong; only use it
                // when the source could not report its length.
                if self.file_size == 0 {
                    self.file_size = meta.file_size;
                }
                self.metadata = Some(meta);
            }
            Err(e) => {
                // Recovered locally: proceed without metadata and
                // synthesize seek data during demuxing.
                debug!(error = %e, "metadata parse abandoned");
            }
        }
    }

    fn build_seek_table(&mut self) {
        let capacity = self.config.seek_table_capacity;
        self.seek_table = match self.metadata.as_ref() {
            Some(meta) => SeekTable::from_metadata(meta, capacity)
                .unwrap_or_else(|| SeekTable::synthesized(capacity, meta.duration_ms)),
            None => SeekTable::synthesized(capacity, 0),
        };
    }

    /// Read one tag and route it. Returns false at end of stream.
    ///
    /// A resynchronization that exhausts its window ends the stream
    /// early (buffered frames still drain) instead of failing the read.
    fn cache_more(&mut self, mode: CacheMode) -> Result<bool> {
        let tag = match self.reader.read_tag() {
            Ok(Some(tag)) => tag,
            Ok(None) => {
                self.eof = true;
                return Ok(false);
            }
            Err(e @ crate::error::FlvError::ResyncFailed { .. }) => {
                warn!(error = %e, "tag stream unrecoverable, ending early");
                self.eof = true;
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        self.classify_tag(tag, mode)?;
        Ok(true)
    }

    fn classify_tag(&mut self, tag: FlvTag, mode: CacheMode) -> Result<()> {
        match tag.header.tag_type {
            TagType::ScriptData => {
                // Only the leading onMetaData tag matters; later script
                // tags are skipped.
                if self.metadata.is_none() && mode == CacheMode::Anyhow {
                    self.consume_script_tag(&tag);
                    if self.metadata.is_some() {
                        self.build_seek_table();
                    }
                }
                Ok(())
            }
            TagType::Video => self.cache_video_tag(tag, mode),
            TagType::Audio => self.cache_audio_tag(tag, mode),
        }
    }

    fn cache_video_tag(&mut self, tag: FlvTag, mode: CacheMode) -> Result<()> {
        if self.config.disable_video {
            return Ok(());
        }
        if mode == CacheMode::Playback && !self.has_video {
            return Ok(());
        }
        if tag.data.is_empty() {
            return Ok(());
        }

        let mut cursor = std::io::Cursor::new(tag.data.as_slice());
        let vh = match VideoTagHeader::parse(&mut cursor) {
            Ok(vh) => vh,
            Err(e) => {
                debug!(error = %e, offset = tag.offset, "skipping unparseable video tag");
                return Ok(());
            }
        };

        if self.video_codec.is_none() {
            self.video_codec = Some(vh.codec_id);
            if !vh.codec_id.is_supported() {
                warn!(codec = vh.codec_id.name(), "unsupported video codec");
                self.unsupported_video = true;
            }
        }

        let timestamp_ms = self.video_ts.correct(tag.header.timestamp_ms());

        // Sequence configuration is routed to config assembly exactly
        // once; streams that repeat their config tag afterwards get the
        // repeats queued like ordinary frames (dequeue recognizes and
        // flags them).
        if vh.is_sequence_header() && !self.video_config_sent {
            self.absorb_video_config(&vh, &tag.data);
            return Ok(());
        }

        if vh.is_keyframe() && !vh.is_sequence_header() {
            self.seek_table.observe_keyframe(timestamp_ms, tag.offset);
        }

        self.video_queue.push_back(QueuedFrame {
            timestamp_ms,
            composition_ms: vh.composition_time,
            data: tag.data,
            keyframe: vh.is_keyframe(),
            cursor: 0,
        });
        Ok(())
    }

    fn absorb_video_config(&mut self, vh: &VideoTagHeader, data: &[u8]) {
        let body = &data[vh.size().min(data.len())..];
        match vh.codec_id {
            VideoCodec::Avc => match AvcConfig::parse(body) {
                Ok(config) => {
                    self.avc_config = Some(config);
                    self.video_config_sent = true;
                }
                Err(e) => debug!(error = %e, "bad AVC configuration record"),
            },
            VideoCodec::Hevc => {
                // Either a complete configuration record, or one bare
                // parameter-set NAL per tag (up to three tags).
                if let Ok(config) = HevcConfig::parse(body) {
                    self.hevc_config = Some(config);
                    self.video_config_sent = true;
                    return;
                }
                if self.hevc_param_nals.len() < 3 {
                    self.hevc_param_nals.push(body.to_vec());
                }
                if let Ok(config) = HevcConfig::from_nal_units(&self.hevc_param_nals) {
                    self.hevc_config = Some(config);
                    self.video_config_sent = true;
                }
            }
            _ => {}
        }
    }

    fn cache_audio_tag(&mut self, tag: FlvTag, mode: CacheMode) -> Result<()> {
        if self.config.disable_audio {
            return Ok(());
        }
        if mode == CacheMode::Playback && !self.has_audio {
            return Ok(());
        }
        if tag.data.is_empty() {
            return Ok(());
        }

        let mut cursor = std::io::Cursor::new(tag.data.as_slice());
        let ah = match AudioTagHeader::parse(&mut cursor) {
            Ok(ah) => ah,
            Err(e) => {
                debug!(error = %e, offset = tag.offset, "skipping unparseable audio tag");
                return Ok(());
            }
        };

        if self.audio_format.is_none() {
            self.audio_format = Some(ah.sound_format);
            if !ah.sound_format.is_supported() {
                warn!(format = ah.sound_format.name(), "unsupported audio codec");
            }
        }

        if ah.is_aac_sequence_header() && !self.audio_config_sent {
            match AacConfig::parse(&tag.data[ah.size().min(tag.data.len())..]) {
                Ok(config) => {
                    self.audio_sample_rate = config.sample_rate();
                    self.audio_channels = config.channels();
                    self.audio_bits = 16;
                    self.aac_config = Some(config);
                    self.audio_config_sent = true;
                }
                Err(e) => debug!(error = %e, "bad AudioSpecificConfig"),
            }
            return Ok(());
        }

        // First playable frame fixes the track parameters: MP3 frames
        // carry their own header, PCM trusts the tag bitfield.
        if self.audio_sample_rate == 0 {
            self.discover_audio_params(&ah, &tag.data);
        }

        let timestamp_ms = self.audio_ts.correct(tag.header.timestamp_ms());
        self.audio_queue.push_back(QueuedFrame {
            timestamp_ms,
            composition_ms: 0,
            data: tag.data,
            keyframe: false,
            cursor: 0,
        });
        Ok(())
    }

    fn discover_audio_params(&mut self, ah: &AudioTagHeader, data: &[u8]) {
        if matches!(ah.sound_format, SoundFormat::Mp3 | SoundFormat::Mp38k) && data.len() > 1 {
            if let Ok(mp3) = Mp3FrameHeader::parse(&data[1..]) {
                self.audio_sample_rate = mp3.sample_rate;
                self.audio_channels = mp3.channels;
                self.audio_bits = 16;
                return;
            }
        }
        self.audio_sample_rate = ah.sound_rate.hz();
        self.audio_channels = ah.sound_type.channels();
        self.audio_bits = ah.sound_size.bits();
    }

    /// Post-probe reconciliation: claimed tracks that never materialized
    /// or lack required configuration are dropped, not errored.
    fn resolve_tracks(&mut self) {
        if self.config.disable_video {
            self.has_video = false;
        }
        if self.config.disable_audio {
            self.has_audio = false;
        }

        if self.has_video {
            let usable = match self.video_codec {
                None => false,
                Some(codec) if !codec.is_supported() => false,
                Some(VideoCodec::Avc) => self.avc_config.is_some(),
                Some(VideoCodec::Hevc) => self.hevc_config.is_some(),
                Some(_) => true,
            };
            if !usable {
                if self.video_codec.is_some() {
                    warn!("dropping video track (unsupported codec or missing config)");
                }
                self.has_video = false;
                self.video_queue.clear();
            }
        }

        if self.has_audio {
            let usable = match self.audio_format {
                None => false,
                Some(format) if !format.is_supported() => false,
                Some(SoundFormat::Aac) => self.aac_config.is_some(),
                Some(_) => true,
            };
            if !usable {
                if self.audio_format.is_some() {
                    warn!("dropping audio track (unsupported codec or missing config)");
                }
                self.has_audio = false;
                self.audio_queue.clear();
            }
        }
    }

    fn build_streams(&mut self) {
        let meta = self.metadata.clone().unwrap_or_default();
        let duration_us = if self.duration_ms > 0 {
            Some(self.duration_ms as i64 * 1000)
        } else {
            None
        };

        if let (true, Some(codec)) = (self.has_video, self.video_codec) {
            let codec_id = match codec {
                VideoCodec::Avc => CodecId::H264,
                VideoCodec::Hevc => CodecId::H265,
                VideoCodec::Sorenson => CodecId::SorensonH263,
                VideoCodec::Vp6 | VideoCodec::Vp6Alpha => CodecId::Vp6,
                other => CodecId::Unknown(other.name().to_string()),
            };

            let (mut width, mut height) = (meta.width, meta.height);
            if let Some(hevc) = &self.hevc_config {
                width = hevc.width.unwrap_or(width);
                height = hevc.height.unwrap_or(height);
            }

            let extra_data = match codec {
                VideoCodec::Avc => self.avc_config.as_ref().map(|c| c.raw.clone()),
                VideoCodec::Hevc => self.hevc_config.as_ref().map(|c| c.raw.clone()),
                _ => None,
            };

            let index = self.streams.len();
            self.video_stream_index = Some(index as u32);
            self.streams.push(StreamInfo {
                index,
                track_type: TrackType::Video,
                codec_id,
                duration_us,
                max_packet_size: Some(VIDEO_MAX_PACKET_HINT),
                extra_data,
                video: Some(VideoStreamInfo {
                    width,
                    height,
                    frame_rate: if meta.frame_rate > 0.0 {
                        Some(Rational::new((meta.frame_rate * 1000.0) as i64, 1000))
                    } else {
                        None
                    },
                }),
                audio: None,
            });
        }

        if let (true, Some(format)) = (self.has_audio, self.audio_format) {
            let codec_id = match format {
                SoundFormat::Aac => CodecId::Aac,
                SoundFormat::Mp3 | SoundFormat::Mp38k => CodecId::Mp3,
                SoundFormat::LinearPcmPe | SoundFormat::LinearPcmLe => CodecId::Pcm,
                other => CodecId::Unknown(other.name().to_string()),
            };

            let index = self.streams.len();
            self.audio_stream_index = Some(index as u32);
            self.streams.push(StreamInfo {
                index,
                track_type: TrackType::Audio,
                codec_id,
                duration_us,
                max_packet_size: Some(AUDIO_MAX_PACKET_HINT),
                extra_data: self.aac_config.as_ref().map(|c| c.raw.clone()),
                video: None,
                audio: Some(AudioStreamInfo {
                    sample_rate: if self.audio_sample_rate > 0 {
                        self.audio_sample_rate
                    } else {
                        meta.audio_sample_rate
                    },
                    channels: if self.audio_channels > 0 {
                        self.audio_channels
                    } else if meta.stereo {
                        2
                    } else {
                        1
                    },
                    bits_per_sample: if self.audio_bits > 0 {
                        self.audio_bits
                    } else {
                        meta.audio_sample_size
                    },
                }),
            });
        }
    }

    /// Whether time-based seeking can work for this stream: either an
    /// imported index exists or a video track can synthesize one.
    pub fn is_seekable(&self) -> bool {
        (self.seek_table.is_imported() && !self.seek_table.is_empty()) || self.has_video
    }

    /// The parsed file header.
    pub fn header(&self) -> &FlvHeader {
        &self.header
    }

    /// Parsed metadata, when the file carried a usable onMetaData tag.
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Reconciled stream length in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Duration in milliseconds (0 when unknown).
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Whether a usable video track is exposed.
    pub fn has_video(&self) -> bool {
        self.has_video
    }

    /// Whether a usable audio track is exposed.
    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    /// The seek table (for inspection).
    pub fn seek_table(&self) -> &SeekTable {
        &self.seek_table
    }

    /// Drop the video track mid-stream: the video queue is discarded and
    /// audio-only consumption continues.
    pub fn cancel_video(&mut self) {
        self.has_video = false;
        self.video_queue.clear();
    }

    /// Pull the next frame for one track, maintaining the queue
    /// watermarks: a queue below the low watermark pulls more tags
    /// before dequeuing; at or above the high watermark it dequeues
    /// immediately. Returns `None` at end of stream once the track's
    /// queue has drained.
    pub fn read_frame(&mut self, track: TrackType) -> Result<Option<Packet<'static>>> {
        loop {
            let queue_len = match track {
                TrackType::Video if self.has_video => self.video_queue.len(),
                TrackType::Audio if self.has_audio => self.audio_queue.len(),
                _ => return Ok(None),
            };

            if queue_len >= LOW_WATERMARK || self.eof {
                break;
            }
            self.cache_more(CacheMode::Playback)?;
        }

        match track {
            TrackType::Video => self.dequeue_video(),
            TrackType::Audio => self.dequeue_audio(),
            _ => Ok(None),
        }
    }

    /// Whether a queued video payload is a (redundant) sequence config
    /// rather than coded frames. Those ride the queue but must not go
    /// through the NAL rewrite.
    fn is_config_payload(data: &[u8]) -> bool {
        data.len() >= 2 && data[0] & 0x80 == 0 && data[1] == 0
    }

    fn dequeue_video(&mut self) -> Result<Option<Packet<'static>>> {
        let codec = match self.video_codec {
            Some(c) => c,
            None => return Ok(None),
        };

        let nal_output = self.config.nal_output;
        let length_size = self
            .avc_config
            .as_ref()
            .map(|c| c.nalu_length_size())
            .unwrap_or(4);

        let frame = match self.video_queue.front_mut() {
            Some(f) => f,
            None => return Ok(None),
        };

        let dts_ms = frame.timestamp_ms as i64;
        let pts_ms = dts_ms + frame.composition_ms as i64;
        let keyframe = frame.keyframe;

        let mut flags = PacketFlags::empty();
        if keyframe {
            flags |= PacketFlags::KEYFRAME;
        }

        let (data, finished) = match codec {
            VideoCodec::Avc | VideoCodec::Hevc if Self::is_config_payload(&frame.data) => {
                // A repeated sequence header that was queued as a frame.
                flags |= PacketFlags::CONFIG;
                let strip = 5.min(frame.data.len());
                (frame.data[strip..].to_vec(), true)
            }
            VideoCodec::Avc => {
                let header_size = 5.min(frame.data.len());
                let body = &frame.data[header_size..];

                match nal_output {
                    NalOutputMode::AccessUnit => {
                        (length_prefixed_to_annexb(body, length_size)?, true)
                    }
                    NalOutputMode::SingleNal => {
                        let (start, end) = next_nal_range(body, frame.cursor, length_size)?;
                        let mut out = Vec::with_capacity(START_CODE.len() + (end - start));
                        out.extend_from_slice(&START_CODE);
                        out.extend_from_slice(&body[start..end]);
                        frame.cursor = end;
                        (out, end >= body.len())
                    }
                }
            }
            VideoCodec::Hevc => {
                let strip = 5.min(frame.data.len());
                (frame.data[strip..].to_vec(), true)
            }
            other => {
                let strip = other.frame_header_size().min(frame.data.len());
                (frame.data[strip..].to_vec(), true)
            }
        };

        if finished {
            self.video_queue.pop_front();
        }

        Ok(Some(self.emit(
            data,
            pts_ms,
            dts_ms,
            self.video_stream_index.unwrap_or(0),
            flags,
        )))
    }

    fn dequeue_audio(&mut self) -> Result<Option<Packet<'static>>> {
        let format = match self.audio_format {
            Some(f) => f,
            None => return Ok(None),
        };

        let frame = match self.audio_queue.pop_front() {
            Some(f) => f,
            None => return Ok(None),
        };

        let strip = match format {
            SoundFormat::Aac => 2,
            _ => 1,
        }
        .min(frame.data.len());

        let pts_ms = frame.timestamp_ms as i64;
        Ok(Some(self.emit(
            frame.data[strip..].to_vec(),
            pts_ms,
            pts_ms,
            self.audio_stream_index.unwrap_or(0),
            PacketFlags::empty(),
        )))
    }

    fn emit(
        &self,
        data: Vec<u8>,
        pts_ms: i64,
        dts_ms: i64,
        stream_index: u32,
        flags: PacketFlags,
    ) -> Packet<'static> {
        let mut packet = Packet::new(data)
            .with_timestamps(
                Timestamp::from_millis(pts_ms),
                Timestamp::from_millis(dts_ms),
            )
            .with_stream_index(stream_index)
            .with_flags(flags)
            .with_seek_target(
                self.seek_target_ms
                    .map(|ms| Timestamp::from_millis(ms as i64)),
            );
        packet.pos = Some(self.reader.position());
        // The consumer boundary runs in microseconds.
        packet.rescale(TimeBase::MICROSECONDS);
        packet
    }

    /// Seek to a millisecond timestamp. Returns the timestamp actually
    /// landed on.
    ///
    /// Strategy, in order: table lookup (imported, or entries already
    /// synthesized), the interpolating direct seek for far-ahead AVC
    /// targets, and the guaranteed-correct forward linear scan that
    /// grows the synthesized table as it reads.
    pub fn seek_ms(&mut self, target_ms: i64) -> Result<u64> {
        self.clear_queues();
        self.eof = false;
        let target = target_ms.max(0) as u64;
        self.seek_target_ms = Some(target);

        if target_ms <= 0 {
            self.reader.seek_to(self.data_start)?;
            return Ok(0);
        }

        if self.seek_table.is_imported() {
            return match self.seek_table.lookup(target) {
                Some(entry) => {
                    let (time_ms, offset) = (entry.time_ms, entry.offset);
                    self.reader.seek_to(offset)?;
                    Ok(time_ms)
                }
                None => {
                    self.reader.seek_to(self.data_start)?;
                    Ok(0)
                }
            };
        }

        if !self.has_video {
            // No table, no video: seeking is unsupported. Rewind.
            self.reader.seek_to(self.data_start)?;
            return Ok(0);
        }

        // Synthesized mode. An entry bracketing the target inside the
        // covered range (or a full table) answers directly.
        let covered = self
            .seek_table
            .last()
            .map(|last| last.time_ms >= target)
            .unwrap_or(false);
        if covered || self.seek_table.is_full() {
            return match self.seek_table.lookup(target) {
                Some(entry) => {
                    let (time_ms, offset) = (entry.time_ms, entry.offset);
                    self.reader.seek_to(offset)?;
                    Ok(time_ms)
                }
                None => {
                    self.reader.seek_to(self.data_start)?;
                    Ok(0)
                }
            };
        }

        if self.should_direct_seek(target) {
            match self.direct_seek(target) {
                Ok(Some((time_ms, offset))) => {
                    self.clear_queues();
                    self.reader.seek_to(offset)?;
                    return Ok(time_ms);
                }
                Ok(None) => {
                    debug!(target_ms = target, "direct seek missed, falling back to linear scan")
                }
                Err(e) => debug!(target_ms = target, error = %e, "direct seek failed, falling back"),
            }
        }

        self.linear_scan_to(target)
    }

    fn clear_queues(&mut self) {
        self.video_queue.clear();
        self.audio_queue.clear();
    }

    fn should_direct_seek(&self, target: u64) -> bool {
        if !self.config.enable_direct_seek
            || self.video_codec != Some(VideoCodec::Avc)
            || self.duration_ms == 0
            || self.file_size == 0
        {
            return false;
        }
        let known = self.seek_table.last().map(|e| e.time_ms).unwrap_or(0);
        target > known && target - known > DIRECT_SEEK_GAP_MS
    }

    /// Forward linear scan: position at the last known keyframe (or the
    /// data start) and read tags until the growing table reaches the
    /// target or the stream ends.
    fn linear_scan_to(&mut self, target: u64) -> Result<u64> {
        let start = self
            .seek_table
            .last()
            .map(|e| e.offset)
            .unwrap_or(self.data_start);
        self.reader.seek_to(start)?;
        self.clear_queues();

        loop {
            let reached = self
                .seek_table
                .last()
                .map(|e| e.time_ms >= target)
                .unwrap_or(false);
            if reached || self.seek_table.is_full() {
                break;
            }
            if !self.cache_more(CacheMode::Playback)? {
                break;
            }
            // The scan only needs the table side effects; keep the
            // queues from ballooning over a long scan.
            if self.video_queue.len() + self.audio_queue.len() > HIGH_WATERMARK * 8 {
                self.clear_queues();
            }
        }

        let landed = match self.seek_table.lookup(target) {
            Some(entry) => {
                let (time_ms, offset) = (entry.time_ms, entry.offset);
                self.reader.seek_to(offset)?;
                time_ms
            }
            None => {
                self.reader.seek_to(self.data_start)?;
                0
            }
        };
        self.clear_queues();
        self.eof = false;
        Ok(landed)
    }

    /// Interpolating binary search for a far-ahead target: estimate a
    /// byte offset from the time fraction, probe a window there for a
    /// plausible keyframe tag, cross-check the hit with a full tag read,
    /// and narrow on its timestamp. Failure is non-fatal; the caller
    /// falls back to the linear scan.
    fn direct_seek(&mut self, target: u64) -> Result<Option<(u64, u64)>> {
        let (known_ms, known_off) = self
            .seek_table
            .last()
            .map(|e| (e.time_ms, e.offset))
            .unwrap_or((0, self.data_start));

        let mut lo = known_off;
        let mut hi = self.file_size;
        let mut estimate = known_off.saturating_add(
            ((target - known_ms) as u128 * self.file_size as u128 / self.duration_ms as u128)
                as u64,
        );
        let granularity = self.seek_table.granularity_ms();
        let mut best: Option<(u64, u64)> = None;

        let mut window = vec![0u8; DIRECT_SEEK_WINDOW];
        for _ in 0..DIRECT_SEEK_MAX_ITERATIONS {
            if hi <= lo + 1 {
                break;
            }
            estimate = estimate.clamp(lo + 1, hi - 1);

            let got = self.reader.read_window_at(estimate, &mut window)?;
            let candidate =
                scan_for_keyframe_tag(&window[..got]).map(|idx| estimate + idx as u64);

            // The pattern hit is only a hint: a full tag read with its
            // trailer cross-check decides whether to trust it.
            let confirmed = match candidate {
                Some(offset) => {
                    self.reader.seek_to(offset)?;
                    match self.reader.read_tag() {
                        Ok(Some(tag)) if tag.header.tag_type == TagType::Video => {
                            Some((tag.header.timestamp_ms() as u64, offset))
                        }
                        _ => None,
                    }
                }
                None => None,
            };

            match confirmed {
                Some((ts, offset)) => {
                    if ts <= target {
                        if best.map(|(b, _)| target - ts < target - b).unwrap_or(true) {
                            best = Some((ts, offset));
                        }
                        if target - ts <= granularity {
                            return Ok(Some((ts, offset)));
                        }
                        lo = offset;
                    } else {
                        hi = offset;
                    }
                    estimate = lo + (hi - lo) / 2;
                }
                None => {
                    // Nothing plausible in this window; bisect backward.
                    hi = estimate;
                    estimate = lo + (hi - lo) / 2;
                }
            }
        }

        // Very large files accept the closest confirmed keyframe rather
        // than failing outright.
        if self.file_size > LARGE_FILE_BYTES {
            return Ok(best);
        }
        Ok(None)
    }
}

impl<R: Read + Seek> Demuxer for FlvDemuxer<R> {
    fn format_name(&self) -> &str {
        "flv"
    }

    fn duration(&self) -> Option<i64> {
        if self.duration_ms > 0 {
            Some(self.duration_ms as i64 * 1000)
        } else {
            None
        }
    }

    fn num_streams(&self) -> usize {
        self.streams.len()
    }

    fn stream_info(&self, index: usize) -> Option<&StreamInfo> {
        self.streams.get(index)
    }

    fn container_info(&self) -> ContainerInfo {
        let mime = if self.has_video {
            "video/x-flv"
        } else if self.has_audio {
            "audio/x-flv"
        } else {
            "application/octet-stream"
        };
        ContainerInfo {
            mime,
            has_unsupported_video: self.unsupported_video,
        }
    }

    fn flags(&self) -> DemuxerFlags {
        let mut flags = DemuxerFlags::CAN_PAUSE;
        if self.is_seekable() {
            flags |= DemuxerFlags::CAN_SEEK
                | DemuxerFlags::CAN_SEEK_BACKWARD
                | DemuxerFlags::CAN_SEEK_FORWARD;
        }
        flags
    }

    /// Interleaved pull: the queue whose head is oldest emits first.
    fn read_packet(&mut self) -> CoreResult<Option<Packet<'static>>> {
        loop {
            let video_head = if self.has_video {
                self.video_queue.front().map(|f| f.timestamp_ms)
            } else {
                None
            };
            let audio_head = if self.has_audio {
                self.audio_queue.front().map(|f| f.timestamp_ms)
            } else {
                None
            };

            match (video_head, audio_head) {
                (Some(v), Some(a)) => {
                    return if v <= a {
                        Ok(self.dequeue_video()?)
                    } else {
                        Ok(self.dequeue_audio()?)
                    };
                }
                (Some(_), None) => {
                    // The audio side may just be momentarily dry.
                    if self.has_audio && !self.eof {
                        self.cache_more(CacheMode::Playback)?;
                        continue;
                    }
                    return Ok(self.dequeue_video()?);
                }
                (None, Some(_)) => {
                    if self.has_video && !self.eof {
                        self.cache_more(CacheMode::Playback)?;
                        continue;
                    }
                    return Ok(self.dequeue_audio()?);
                }
                (None, None) => {
                    if self.eof || (!self.has_video && !self.has_audio) {
                        return Ok(None);
                    }
                    self.cache_more(CacheMode::Playback)?;
                }
            }
        }
    }

    fn seek_to(&mut self, target: SeekTarget, mode: SeekMode) -> CoreResult<SeekResult> {
        let landed_ms = match target {
            SeekTarget::Timestamp(us) => {
                let target_ms = us / 1000;
                let mut landed = self.seek_ms(target_ms)?;
                if mode == SeekMode::Forward && (landed as i64) < target_ms {
                    // Land on the next entry instead, when one exists.
                    if let Some(next) = self
                        .seek_table
                        .entries()
                        .iter()
                        .find(|e| e.time_ms as i64 >= target_ms)
                        .copied()
                    {
                        self.reader.seek_to(next.offset)?;
                        self.clear_queues();
                        landed = next.time_ms;
                    }
                }
                landed
            }
            SeekTarget::ByteOffset(offset) => {
                self.clear_queues();
                self.eof = false;
                self.reader.seek_to(offset.max(self.data_start))?;
                0
            }
        };

        Ok(SeekResult {
            timestamp_us: landed_ms as i64 * 1000,
            is_keyframe: true,
        })
    }

    fn can_seek(&self) -> bool {
        self.is_seekable()
    }

    fn position(&self) -> Option<u64> {
        Some(self.reader.position())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::amf::MetadataBuilder;
    use crate::error::FlvError;
    use crate::header::FlvHeader;
    use crate::tag::FlvTag;
    use std::io::Cursor;

    pub(crate) fn avc_sequence_tag(ts: u32) -> FlvTag {
        let avcc = [
            0x01, 0x64, 0x00, 0x1F, 0xFF, 0xE1, 0x00, 0x04, 0x67, 0x64, 0x00, 0x1F, 0x01, 0x00,
            0x02, 0x68, 0xEF,
        ];
        let mut payload = vec![0x17, 0x00, 0x00, 0x00, 0x00];
        payload.extend_from_slice(&avcc);
        FlvTag::new(TagType::Video, ts, payload)
    }

    pub(crate) fn avc_frame_tag(ts: u32, keyframe: bool, body: &[u8]) -> FlvTag {
        let first = if keyframe { 0x17 } else { 0x27 };
        let mut payload = vec![first, 0x01, 0x00, 0x00, 0x00];
        payload.extend_from_slice(&((body.len() + 1) as u32).to_be_bytes());
        payload.push(if keyframe { 0x65 } else { 0x41 });
        payload.extend_from_slice(body);
        FlvTag::new(TagType::Video, ts, payload)
    }

    pub(crate) fn aac_sequence_tag(ts: u32) -> FlvTag {
        FlvTag::new(TagType::Audio, ts, vec![0xAF, 0x00, 0x12, 0x10])
    }

    pub(crate) fn aac_frame_tag(ts: u32, body: &[u8]) -> FlvTag {
        let mut payload = vec![0xAF, 0x01];
        payload.extend_from_slice(body);
        FlvTag::new(TagType::Audio, ts, payload)
    }

    /// Byte-level builder for synthetic FLV files.
    pub(crate) struct FileBuilder {
        buf: Vec<u8>,
    }

    impl FileBuilder {
        pub(crate) fn new(has_video: bool, has_audio: bool) -> Self {
            let mut buf = Vec::new();
            FlvHeader::new()
                .with_video(has_video)
                .with_audio(has_audio)
                .write(&mut buf)
                .unwrap();
            buf.extend_from_slice(&[0, 0, 0, 0]);
            Self { buf }
        }

        pub(crate) fn script(mut self, builder: MetadataBuilder) -> Self {
            let tag = FlvTag::new(TagType::ScriptData, 0, builder.build_script_data());
            tag.write(&mut self.buf).unwrap();
            self
        }

        pub(crate) fn tag(mut self, tag: FlvTag) -> Self {
            tag.write(&mut self.buf).unwrap();
            self
        }

        pub(crate) fn build(self) -> Vec<u8> {
            self.buf
        }
    }

    fn simple_av_file() -> Vec<u8> {
        FileBuilder::new(true, true)
            .script(
                MetadataBuilder::new()
                    .duration(10.0)
                    .width(1920)
                    .height(1080)
                    .frame_rate(30.0)
                    .video_codec_id(7)
                    .audio_codec_id(10),
            )
            .tag(avc_sequence_tag(0))
            .tag(aac_sequence_tag(0))
            .tag(avc_frame_tag(0, true, &[0xAA; 64]))
            .tag(aac_frame_tag(0, &[0xCD; 32]))
            .tag(avc_frame_tag(33, false, &[0xBB; 48]))
            .tag(aac_frame_tag(23, &[0xCE; 32]))
            .tag(avc_frame_tag(66, false, &[0xBC; 48]))
            .tag(aac_frame_tag(46, &[0xCF; 32]))
            .build()
    }

    #[test]
    fn test_open_and_stream_info() {
        let demuxer = FlvDemuxer::new(Cursor::new(simple_av_file())).unwrap();

        assert!(demuxer.has_video());
        assert!(demuxer.has_audio());
        assert_eq!(demuxer.num_streams(), 2);

        let video = demuxer.stream_info(0).unwrap();
        assert_eq!(video.codec_id, CodecId::H264);
        assert_eq!(video.video.as_ref().unwrap().width, 1920);
        assert!(video.extra_data.is_some());

        let audio = demuxer.stream_info(1).unwrap();
        assert_eq!(audio.codec_id, CodecId::Aac);
        assert_eq!(audio.audio.as_ref().unwrap().sample_rate, 44100);
        assert_eq!(audio.audio.as_ref().unwrap().channels, 2);

        assert_eq!(demuxer.duration(), Some(10_000_000));
        assert_eq!(demuxer.container_info().mime, "video/x-flv");
        assert!(demuxer.flags().contains(DemuxerFlags::CAN_SEEK));
    }

    #[test]
    fn test_read_packets_interleaved_and_annexb() {
        let mut demuxer = FlvDemuxer::new(Cursor::new(simple_av_file())).unwrap();

        let mut video = 0;
        let mut audio = 0;
        let mut last_ts = 0i64;
        while let Some(packet) = demuxer.read_packet().unwrap() {
            if packet.stream_index == 0 {
                video += 1;
                // Every video packet starts with a start code after the
                // Annex-B rewrite.
                assert_eq!(&packet.data()[..4], &[0, 0, 0, 1]);
            } else {
                audio += 1;
            }
            // Interleaving emits in non-decreasing dts order.
            assert!(packet.dts.value >= last_ts);
            last_ts = packet.dts.value;
        }

        assert_eq!(video, 3);
        assert_eq!(audio, 3);
    }

    #[test]
    fn test_first_video_packet_is_keyframe_with_us_timestamps() {
        let mut demuxer = FlvDemuxer::new(Cursor::new(simple_av_file())).unwrap();

        let packet = demuxer.read_frame(TrackType::Video).unwrap().unwrap();
        assert!(packet.is_keyframe());
        assert_eq!(packet.pts.value, 0);

        let packet = demuxer.read_frame(TrackType::Video).unwrap().unwrap();
        assert!(!packet.is_keyframe());
        assert_eq!(packet.pts.value, 33_000);
    }

    #[test]
    fn test_audio_only_consumption_after_cancel_video() {
        let mut demuxer = FlvDemuxer::new(Cursor::new(simple_av_file())).unwrap();
        demuxer.cancel_video();

        assert!(!demuxer.has_video());
        assert!(demuxer.read_frame(TrackType::Video).unwrap().is_none());

        let mut audio = 0;
        while demuxer.read_frame(TrackType::Audio).unwrap().is_some() {
            audio += 1;
        }
        assert_eq!(audio, 3);
    }

    #[test]
    fn test_disable_toggles() {
        let config = FlvDemuxerConfig {
            disable_video: true,
            ..Default::default()
        };
        let demuxer = FlvDemuxer::with_config(Cursor::new(simple_av_file()), config).unwrap();

        assert!(!demuxer.has_video());
        assert!(demuxer.has_audio());
        assert_eq!(demuxer.num_streams(), 1);
        assert_eq!(demuxer.container_info().mime, "audio/x-flv");
    }

    #[test]
    fn test_missing_config_drops_track() {
        // AVC frames but no sequence header: video track must vanish,
        // audio must survive.
        let data = FileBuilder::new(true, true)
            .tag(aac_sequence_tag(0))
            .tag(avc_frame_tag(0, true, &[0xAA; 32]))
            .tag(aac_frame_tag(0, &[0xCD; 16]))
            .tag(aac_frame_tag(23, &[0xCE; 16]))
            .tag(aac_frame_tag(46, &[0xCF; 16]))
            .tag(aac_frame_tag(69, &[0xD0; 16]))
            .build();

        let demuxer = FlvDemuxer::new(Cursor::new(data)).unwrap();
        assert!(!demuxer.has_video());
        assert!(demuxer.has_audio());
        assert_eq!(demuxer.num_streams(), 1);
    }

    #[test]
    fn test_no_usable_tracks_zero_streams() {
        // Speex audio only: unsupported, zero streams, no error.
        let mut payload = vec![0xBF, 0x00];
        payload.extend_from_slice(&[0x55; 16]);
        let data = FileBuilder::new(false, true)
            .tag(FlvTag::new(TagType::Audio, 0, payload))
            .build();

        let demuxer = FlvDemuxer::new(Cursor::new(data)).unwrap();
        assert_eq!(demuxer.num_streams(), 0);
        assert_eq!(demuxer.container_info().mime, "application/octet-stream");
    }

    #[test]
    fn test_not_flv_rejected() {
        let result = FlvDemuxer::new(Cursor::new(b"MKV\x01\x05\x00\x00\x00\x09".to_vec()));
        assert!(matches!(result, Err(FlvError::InvalidSignature(_))));
    }

    #[test]
    fn test_redundant_config_tag_rides_queue_flagged() {
        let data = FileBuilder::new(true, false)
            .tag(avc_sequence_tag(0))
            .tag(avc_frame_tag(0, true, &[0xAA; 16]))
            .tag(avc_sequence_tag(100)) // repeated config
            .tag(avc_frame_tag(133, false, &[0xBB; 16]))
            .tag(avc_frame_tag(166, false, &[0xBC; 16]))
            .tag(avc_frame_tag(200, false, &[0xBD; 16]))
            .build();

        let mut demuxer = FlvDemuxer::new(Cursor::new(data)).unwrap();
        let mut frames = 0;
        let mut configs = 0;
        while let Some(packet) = demuxer.read_frame(TrackType::Video).unwrap() {
            if packet.is_config() {
                configs += 1;
            } else {
                frames += 1;
            }
        }
        assert_eq!(frames, 4);
        assert_eq!(configs, 1);
    }

    #[test]
    fn test_single_nal_mode_cursor() {
        // One tag with two NALs must come out as two reads.
        let mut payload = vec![0x17, 0x01, 0x00, 0x00, 0x00];
        payload.extend_from_slice(&2u32.to_be_bytes());
        payload.extend_from_slice(&[0x65, 0x01]);
        payload.extend_from_slice(&3u32.to_be_bytes());
        payload.extend_from_slice(&[0x41, 0x02, 0x03]);

        let data = FileBuilder::new(true, false)
            .tag(avc_sequence_tag(0))
            .tag(FlvTag::new(TagType::Video, 0, payload))
            .tag(avc_frame_tag(33, false, &[0xBB; 8]))
            .tag(avc_frame_tag(66, false, &[0xBC; 8]))
            .tag(avc_frame_tag(99, false, &[0xBD; 8]))
            .build();

        let config = FlvDemuxerConfig {
            nal_output: NalOutputMode::SingleNal,
            ..Default::default()
        };
        let mut demuxer = FlvDemuxer::with_config(Cursor::new(data), config).unwrap();

        let first = demuxer.read_frame(TrackType::Video).unwrap().unwrap();
        assert_eq!(first.data(), &[0, 0, 0, 1, 0x65, 0x01]);
        let second = demuxer.read_frame(TrackType::Video).unwrap().unwrap();
        assert_eq!(second.data(), &[0, 0, 0, 1, 0x41, 0x02, 0x03]);
        // Both reads carry the same tag timestamp.
        assert_eq!(first.pts.value, second.pts.value);
    }

    #[test]
    fn test_composition_time_shifts_pts() {
        let mut payload = vec![0x27, 0x01, 0x00, 0x00, 0x21]; // CTS = 33
        payload.extend_from_slice(&2u32.to_be_bytes());
        payload.extend_from_slice(&[0x41, 0x00]);

        let data = FileBuilder::new(true, false)
            .tag(avc_sequence_tag(0))
            .tag(avc_frame_tag(0, true, &[0xAA; 8]))
            .tag(FlvTag::new(TagType::Video, 100, payload))
            .build();

        let mut demuxer = FlvDemuxer::new(Cursor::new(data)).unwrap();
        let _first = demuxer.read_frame(TrackType::Video).unwrap().unwrap();
        let second = demuxer.read_frame(TrackType::Video).unwrap().unwrap();
        // 100 ms tag time + 33 ms composition offset, in microseconds.
        assert_eq!(second.pts.value, 133_000);
        assert_eq!(second.dts.value, 100_000);
    }

    #[test]
    fn test_seek_target_annotation() {
        let mut demuxer = FlvDemuxer::new(Cursor::new(simple_av_file())).unwrap();

        let packet = demuxer.read_frame(TrackType::Video).unwrap().unwrap();
        assert!(packet.seek_target.is_none());

        demuxer.seek_ms(0).unwrap();
        let packet = demuxer.read_frame(TrackType::Video).unwrap().unwrap();
        assert_eq!(packet.seek_target.unwrap().value, 0);
    }
}
