//! Container demuxer traits for the demuxio library.
//!
//! This crate defines the media-source abstraction container backends
//! implement: stream enumeration, packet pulling, and time-based seeking,
//! plus byte-signature probing for format detection.

pub mod traits;

pub use traits::{
    probe, AudioStreamInfo, CodecId, ContainerInfo, Demuxer, DemuxerFlags, ProbeResult, SeekMode,
    SeekResult, SeekTarget, StreamInfo, TrackType, VideoStreamInfo,
};
