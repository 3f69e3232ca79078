//! # demuxio-flv
//!
//! FLV (Flash Video) container demuxing for the demuxio library.
//!
//! This crate reads FLV files and extracts codec-ready elementary
//! streams from their interleaved tags.
//!
//! ## Features
//!
//! - **FLV header parsing**: signature, version, stream flags
//! - **Tag parsing**: audio, video, and script tags, with trailer
//!   validation and bounded resynchronization over damaged AVC streams
//! - **AMF0 metadata**: `onMetaData` parsing into typed fields
//! - **Seek tables**: imported from metadata keyframe indexes or
//!   synthesized from observed keyframes, plus an interpolating direct
//!   seek for far targets in AVC files
//! - **Audio codecs**: AAC (AudioSpecificConfig), MP3 (frame-header
//!   parameter discovery), PCM
//! - **Video codecs**: H.264/AVC (length-prefix to Annex-B rewrite),
//!   H.265/HEVC (configuration synthesis with SPS dimensions),
//!   Sorenson H.263, VP6
//!
//! ## Example
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use demuxio_flv::FlvDemuxer;
//! use demuxio_containers::{Demuxer, TrackType};
//!
//! let file = File::open("input.flv").unwrap();
//! let mut demuxer = FlvDemuxer::new(BufReader::new(file)).unwrap();
//!
//! for i in 0..demuxer.num_streams() {
//!     let info = demuxer.stream_info(i).unwrap();
//!     println!("stream {}: {:?} {:?}", i, info.track_type, info.codec_id);
//! }
//!
//! // Pull frames for one track.
//! while let Ok(Some(packet)) = demuxer.read_frame(TrackType::Video) {
//!     println!("video: pts={}us keyframe={}", packet.pts.value, packet.is_keyframe());
//! }
//!
//! // Seek to 5 seconds and keep reading.
//! demuxer.seek_ms(5000).unwrap();
//! ```
//!
//! ## FLV file structure
//!
//! ```text
//! FLV File
//! ├── Header (9 bytes)
//! │   ├── Signature: "FLV"
//! │   ├── Version: 1
//! │   ├── Flags: has audio, has video
//! │   └── Header size: 9
//! ├── Previous Tag Size 0 (4 bytes, always 0)
//! └── Tags (repeating)
//!     ├── Tag Header (11 bytes)
//!     │   ├── Tag type (8=audio, 9=video, 18=script)
//!     │   ├── Data size (3 bytes)
//!     │   ├── Timestamp (3 bytes + 1 extended)
//!     │   └── Stream ID (3 bytes, always 0)
//!     ├── Tag Data
//!     │   ├── Audio: 1-2 byte header + data
//!     │   ├── Video: 1-5 byte header + data
//!     │   └── Script: AMF0 encoded data
//!     └── Previous Tag Size (4 bytes)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod amf;
pub mod audio;
pub mod demuxer;
pub mod error;
pub mod header;
pub mod metadata;
pub mod seek;
pub mod source;
pub mod tag;
pub mod video;

// Re-export main types
pub use amf::{parse_on_metadata, AmfValue, MetadataBuilder};
pub use audio::{
    AacConfig, AacPacketType, AudioTagHeader, Mp3FrameHeader, SoundFormat, SoundRate, SoundSize,
    SoundType,
};
pub use demuxer::{FlvDemuxer, FlvDemuxerConfig, NalOutputMode};
pub use error::{FlvError, Result};
pub use header::{is_flv_signature, FlvHeader, FLV_HEADER_SIZE, FLV_SIGNATURE};
pub use metadata::Metadata;
pub use seek::{SeekEntry, SeekTable, DEFAULT_TABLE_CAPACITY};
pub use source::{FlvTrackSource, SharedFlvDemuxer};
pub use tag::{
    read_previous_tag_size, write_previous_tag_size, FlvTag, TagHeader, TagReader, TagType,
    MAX_TAG_DATA_SIZE, TAG_HEADER_SIZE,
};
pub use video::{
    decode_composition_time, length_prefixed_to_annexb, AvcConfig, AvcPacketType, FrameType,
    HevcConfig, VideoCodec, VideoTagHeader, CODEC_ID_AVC, CODEC_ID_HEVC,
};
