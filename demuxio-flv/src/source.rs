//! Shared access to one demuxer from multiple track consumers.
//!
//! A video consumer and an audio consumer pull from the same extractor
//! instance and the same underlying stream cursor. All state — queues,
//! cursor, seek table — is protected as a unit by a single mutex per
//! extractor; every pull, seek, and cancellation runs its I/O
//! synchronously under that lock, so queue clearing on seek can never
//! interleave with a cache fill. There are no background threads.

use crate::demuxer::FlvDemuxer;
use crate::error::Result;
use demuxio_containers::TrackType;
use demuxio_core::packet::Packet;
use parking_lot::Mutex;
use std::io::{Read, Seek};
use std::sync::Arc;

/// A demuxer shared between track sources.
pub struct SharedFlvDemuxer<R> {
    inner: Arc<Mutex<FlvDemuxer<R>>>,
}

impl<R> Clone for SharedFlvDemuxer<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Read + Seek> SharedFlvDemuxer<R> {
    /// Wrap a demuxer for shared consumption.
    pub fn new(demuxer: FlvDemuxer<R>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(demuxer)),
        }
    }

    /// Create a pull handle for the video track, when one is exposed.
    pub fn video_source(&self) -> Option<FlvTrackSource<R>> {
        if self.inner.lock().has_video() {
            Some(FlvTrackSource {
                shared: self.clone(),
                track: TrackType::Video,
            })
        } else {
            None
        }
    }

    /// Create a pull handle for the audio track, when one is exposed.
    pub fn audio_source(&self) -> Option<FlvTrackSource<R>> {
        if self.inner.lock().has_audio() {
            Some(FlvTrackSource {
                shared: self.clone(),
                track: TrackType::Audio,
            })
        } else {
            None
        }
    }

    /// Seek both tracks to a millisecond timestamp; returns the
    /// timestamp landed on.
    pub fn seek_ms(&self, target_ms: i64) -> Result<u64> {
        self.inner.lock().seek_ms(target_ms)
    }

    /// Drop the video track; audio-only consumption continues.
    pub fn cancel_video(&self) {
        self.inner.lock().cancel_video();
    }

    /// Run a closure against the locked demuxer (queries).
    pub fn with<T>(&self, f: impl FnOnce(&mut FlvDemuxer<R>) -> T) -> T {
        f(&mut self.inner.lock())
    }
}

/// A per-track pull handle over a shared demuxer.
pub struct FlvTrackSource<R> {
    shared: SharedFlvDemuxer<R>,
    track: TrackType,
}

impl<R: Read + Seek> FlvTrackSource<R> {
    /// The track this handle pulls from.
    pub fn track_type(&self) -> TrackType {
        self.track
    }

    /// Pull the next access unit for this track. `None` at end of
    /// stream, after buffered frames have drained.
    pub fn read_frame(&self) -> Result<Option<Packet<'static>>> {
        self.shared.with(|demuxer| demuxer.read_frame(self.track))
    }
}
