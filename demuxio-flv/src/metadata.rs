//! Typed `onMetaData` fields.
//!
//! The AMF parser in `amf.rs` produces a generic value tree; this module
//! is the flat pass that walks that tree once and fills in the typed
//! fields the demuxer actually consumes. Unknown keys are ignored;
//! missing keys leave the field at its "unknown" value.

use crate::amf::AmfValue;
use std::collections::HashMap;
use tracing::debug;

/// Typed metadata recovered from the `onMetaData` script tag.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// Duration in milliseconds (scaled from the seconds value on the
    /// wire). Zero when the file does not declare one.
    pub duration_ms: u64,
    /// Declared file size in bytes. May disagree with the actual stream
    /// length; the actual length wins.
    pub file_size: u64,
    /// Video width in pixels.
    pub width: u32,
    /// Video height in pixels.
    pub height: u32,
    /// Declared frame rate.
    pub frame_rate: f64,
    /// Audio sample rate in Hz.
    pub audio_sample_rate: u32,
    /// Audio sample size in bits.
    pub audio_sample_size: u8,
    /// Stereo flag.
    pub stereo: bool,
    /// Declared video codec id (FLV codec nibble).
    pub video_codec_id: Option<u8>,
    /// Declared audio codec id (FLV format nibble).
    pub audio_codec_id: Option<u8>,
    /// Whether the encoder claims seeking to the end works.
    pub can_seek_to_end: bool,
    /// Keyframe byte offsets, parallel to `times_ms`.
    pub file_positions: Vec<u64>,
    /// Keyframe timestamps in milliseconds (scaled from seconds on the
    /// wire), parallel to `file_positions`.
    pub times_ms: Vec<u64>,
}

impl Metadata {
    /// Map a parsed `onMetaData` property tree onto typed fields.
    pub fn from_amf(props: &HashMap<String, AmfValue>) -> Self {
        let mut meta = Metadata::default();

        for (key, value) in props {
            match key.as_str() {
                "duration" => {
                    if let Some(secs) = value.as_number() {
                        if secs.is_finite() && secs > 0.0 {
                            meta.duration_ms = (secs * 1000.0) as u64;
                        }
                    }
                }
                "filesize" => meta.file_size = number_as_u64(value),
                "width" => meta.width = number_as_u64(value) as u32,
                "height" => meta.height = number_as_u64(value) as u32,
                "framerate" => meta.frame_rate = value.as_number().unwrap_or(0.0),
                "audiosamplerate" => meta.audio_sample_rate = number_as_u64(value) as u32,
                "audiosamplesize" => meta.audio_sample_size = number_as_u64(value) as u8,
                "stereo" => meta.stereo = value.as_boolean().unwrap_or(false),
                "videocodecid" => {
                    meta.video_codec_id = value.as_number().map(|n| n as u8);
                }
                "audiocodecid" => {
                    meta.audio_codec_id = value.as_number().map(|n| n as u8);
                }
                "canseektoend" => meta.can_seek_to_end = value.as_boolean().unwrap_or(false),
                "keyframes" => {
                    if let Some(index) = value.as_object() {
                        meta.load_keyframe_index(index);
                    }
                }
                // Some encoders emit the index arrays at top level.
                "filepositions" => meta.file_positions = number_array(value, 1.0),
                "times" => meta.times_ms = number_array(value, 1000.0),
                _ => {}
            }
        }

        meta.reconcile_keyframe_index();
        meta
    }

    /// Whether the metadata carried an explicit seek index.
    pub fn has_seek_index(&self) -> bool {
        !self.file_positions.is_empty() && !self.times_ms.is_empty()
    }

    fn load_keyframe_index(&mut self, index: &HashMap<String, AmfValue>) {
        if let Some(positions) = index.get("filepositions") {
            self.file_positions = number_array(positions, 1.0);
        }
        if let Some(times) = index.get("times") {
            self.times_ms = number_array(times, 1000.0);
        }
    }

    /// The two index arrays are populated independently on the wire and
    /// nothing guarantees equal lengths. Clamp both to the shorter one so
    /// every retained entry has both a time and an offset.
    fn reconcile_keyframe_index(&mut self) {
        let n = self.file_positions.len().min(self.times_ms.len());
        if self.file_positions.len() != self.times_ms.len() {
            debug!(
                filepositions = self.file_positions.len(),
                times = self.times_ms.len(),
                "keyframe index arrays disagree in length, clamping to {}",
                n
            );
            self.file_positions.truncate(n);
            self.times_ms.truncate(n);
        }
    }
}

fn number_as_u64(value: &AmfValue) -> u64 {
    match value.as_number() {
        Some(n) if n.is_finite() && n > 0.0 => n as u64,
        _ => 0,
    }
}

/// Collect a strict array of numbers, scaling each element.
fn number_array(value: &AmfValue, scale: f64) -> Vec<u64> {
    match value.as_array() {
        Some(items) => items
            .iter()
            .filter_map(|v| v.as_number())
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| (n * scale) as u64)
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amf::{parse_on_metadata, MetadataBuilder};

    fn parse(builder: MetadataBuilder) -> Metadata {
        let data = builder.build_script_data();
        Metadata::from_amf(&parse_on_metadata(&data).unwrap())
    }

    #[test]
    fn test_basic_fields() {
        let meta = parse(
            MetadataBuilder::new()
                .duration(10.5)
                .width(1280)
                .height(720)
                .frame_rate(25.0)
                .video_codec_id(7)
                .audio_codec_id(10)
                .audio_sample_rate(44100)
                .audio_sample_size(16)
                .stereo(true)
                .file_size(123456),
        );

        assert_eq!(meta.duration_ms, 10500);
        assert_eq!(meta.width, 1280);
        assert_eq!(meta.height, 720);
        assert_eq!(meta.frame_rate, 25.0);
        assert_eq!(meta.video_codec_id, Some(7));
        assert_eq!(meta.audio_codec_id, Some(10));
        assert_eq!(meta.audio_sample_rate, 44100);
        assert_eq!(meta.audio_sample_size, 16);
        assert!(meta.stereo);
        assert_eq!(meta.file_size, 123456);
    }

    #[test]
    fn test_keyframe_index_scaled_to_ms() {
        let meta = parse(
            MetadataBuilder::new().keyframes(&[0.0, 1000.0, 2000.0], &[0.0, 3.0, 7.0]),
        );

        assert!(meta.has_seek_index());
        assert_eq!(meta.file_positions, vec![0, 1000, 2000]);
        assert_eq!(meta.times_ms, vec![0, 3000, 7000]);
    }

    #[test]
    fn test_mismatched_index_arrays_clamped() {
        let meta = parse(
            MetadataBuilder::new().keyframes(&[0.0, 1000.0, 2000.0, 3000.0], &[0.0, 3.0]),
        );

        assert_eq!(meta.file_positions.len(), 2);
        assert_eq!(meta.times_ms.len(), 2);
        assert!(meta.has_seek_index());
    }

    #[test]
    fn test_missing_fields_default() {
        let meta = parse(MetadataBuilder::new());
        assert_eq!(meta.duration_ms, 0);
        assert_eq!(meta.video_codec_id, None);
        assert!(!meta.has_seek_index());
    }

    #[test]
    fn test_negative_duration_ignored() {
        let meta = parse(MetadataBuilder::new().duration(-5.0));
        assert_eq!(meta.duration_ms, 0);
    }
}
