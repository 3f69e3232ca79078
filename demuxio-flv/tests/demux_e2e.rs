//! End-to-end demuxing tests over synthetic FLV files.

use demuxio_containers::{Demuxer, TrackType};
use demuxio_flv::{
    FlvDemuxer, FlvHeader, FlvTag, MetadataBuilder, TagHeader, TagReader, TagType,
};
use std::io::Cursor;

/// Byte-level builder for synthetic FLV files that records tag offsets.
struct FlvFileBuilder {
    buf: Vec<u8>,
}

impl FlvFileBuilder {
    fn new(has_video: bool, has_audio: bool) -> Self {
        let mut buf = Vec::new();
        FlvHeader::new()
            .with_video(has_video)
            .with_audio(has_audio)
            .write(&mut buf)
            .unwrap();
        buf.extend_from_slice(&[0, 0, 0, 0]);
        Self { buf }
    }

    fn script(mut self, builder: MetadataBuilder) -> Self {
        FlvTag::new(TagType::ScriptData, 0, builder.build_script_data())
            .write(&mut self.buf)
            .unwrap();
        self
    }

    fn tag(mut self, tag: FlvTag) -> Self {
        tag.write(&mut self.buf).unwrap();
        self
    }

    /// Current length: the offset the next tag will land at.
    fn mark(&self) -> u64 {
        self.buf.len() as u64
    }

    fn corrupt_last_trailer(mut self) -> Self {
        let len = self.buf.len();
        self.buf[len - 2] ^= 0x5A;
        self
    }

    fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    fn build(self) -> Vec<u8> {
        self.buf
    }
}

fn avc_sequence_tag(ts: u32) -> FlvTag {
    let avcc = [
        0x01, 0x64, 0x00, 0x1F, 0xFF, 0xE1, 0x00, 0x04, 0x67, 0x64, 0x00, 0x1F, 0x01, 0x00, 0x02,
        0x68, 0xEF,
    ];
    let mut payload = vec![0x17, 0x00, 0x00, 0x00, 0x00];
    payload.extend_from_slice(&avcc);
    FlvTag::new(TagType::Video, ts, payload)
}

fn avc_frame_tag(ts: u32, keyframe: bool, body: &[u8]) -> FlvTag {
    let first = if keyframe { 0x17 } else { 0x27 };
    let mut payload = vec![first, 0x01, 0x00, 0x00, 0x00];
    payload.extend_from_slice(&((body.len() + 1) as u32).to_be_bytes());
    payload.push(if keyframe { 0x65 } else { 0x41 });
    payload.extend_from_slice(body);
    FlvTag::new(TagType::Video, ts, payload)
}

fn mp3_frame_tag(ts: u32) -> FlvTag {
    // MP3 format nibble + 44kHz/16-bit/stereo bits, then a valid MPEG1
    // Layer III header (128 kbps, 44100 Hz, stereo).
    let mut payload = vec![0x2F];
    payload.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
    payload.extend_from_slice(&[0x00; 28]);
    FlvTag::new(TagType::Audio, ts, payload)
}

/// Well-formed files account for every byte: header, leading trailer,
/// and the per-tag header + payload + trailer chain.
#[test]
fn tag_size_accounting_round_trip() {
    let data = FlvFileBuilder::new(true, false)
        .tag(avc_sequence_tag(0))
        .tag(avc_frame_tag(0, true, &[0xAA; 100]))
        .tag(avc_frame_tag(33, false, &[0xBB; 77]))
        .build();

    let file_size = data.len() as u64;
    let mut reader = TagReader::new(Cursor::new(data)).unwrap();
    reader.seek_to(9 + 4).unwrap();

    let mut accounted = 9u64 + 4;
    while let Some(tag) = reader.read_tag().unwrap() {
        accounted += TagHeader::new(tag.tag_type(), tag.data.len() as u32, 0).total_size() as u64;
    }

    assert_eq!(accounted, file_size);
}

/// Scenario: metadata carries an explicit keyframe index. Seeking to
/// 5000 ms falls in the [3000, 7000) bracket and must land exactly on
/// the bracket's byte offset.
#[test]
fn imported_table_bracket_seek() {
    let data = FlvFileBuilder::new(true, false)
        .script(
            MetadataBuilder::new()
                .duration(10.0)
                .video_codec_id(7)
                .keyframes(&[0.0, 1000.0, 2000.0], &[0.0, 3.0, 7.0]),
        )
        .tag(avc_sequence_tag(0))
        .tag(avc_frame_tag(0, true, &[0xAA; 32]))
        .tag(avc_frame_tag(33, false, &[0xBB; 32]))
        .tag(avc_frame_tag(66, false, &[0xBC; 32]))
        .tag(avc_frame_tag(99, false, &[0xBD; 32]))
        .tag(avc_frame_tag(133, false, &[0xBE; 32]))
        .build();

    let mut demuxer = FlvDemuxer::new(Cursor::new(data)).unwrap();
    assert!(demuxer.seek_table().is_imported());
    assert!(demuxer.can_seek());

    let landed = demuxer.seek_ms(5000).unwrap();
    assert_eq!(landed, 3000);
    assert_eq!(demuxer.position(), Some(1000));

    // Past the last bracket clamps to the last entry.
    let landed = demuxer.seek_ms(60_000).unwrap();
    assert_eq!(landed, 7000);
    assert_eq!(demuxer.position(), Some(2000));
}

/// Seeking to zero repositions to the data-region start and reports 0,
/// whatever state the table is in.
#[test]
fn seek_to_zero_for_any_table_state() {
    // Imported.
    let data = FlvFileBuilder::new(true, false)
        .script(MetadataBuilder::new().keyframes(&[0.0, 500.0], &[0.0, 5.0]))
        .tag(avc_sequence_tag(0))
        .tag(avc_frame_tag(0, true, &[0xAA; 16]))
        .tag(avc_frame_tag(33, false, &[0xBB; 16]))
        .tag(avc_frame_tag(66, false, &[0xBC; 16]))
        .tag(avc_frame_tag(99, false, &[0xBD; 16]))
        .tag(avc_frame_tag(133, false, &[0xBE; 16]))
        .build();
    let mut demuxer = FlvDemuxer::new(Cursor::new(data)).unwrap();
    assert_eq!(demuxer.seek_ms(0).unwrap(), 0);
    assert_eq!(demuxer.position(), Some(13));

    // Synthesized (no metadata).
    let data = FlvFileBuilder::new(true, false)
        .tag(avc_sequence_tag(0))
        .tag(avc_frame_tag(0, true, &[0xAA; 16]))
        .tag(avc_frame_tag(33, false, &[0xBB; 16]))
        .tag(avc_frame_tag(66, false, &[0xBC; 16]))
        .tag(avc_frame_tag(99, false, &[0xBD; 16]))
        .tag(avc_frame_tag(133, false, &[0xBE; 16]))
        .build();
    let mut demuxer = FlvDemuxer::new(Cursor::new(data)).unwrap();
    assert_eq!(demuxer.seek_ms(0).unwrap(), 0);
    assert_eq!(demuxer.position(), Some(13));

    // Empty table, audio only: seeking is unsupported and degrades to
    // the same rewind.
    let data = FlvFileBuilder::new(false, true)
        .tag(mp3_frame_tag(0))
        .tag(mp3_frame_tag(26))
        .build();
    let mut demuxer = FlvDemuxer::new(Cursor::new(data)).unwrap();
    assert!(!demuxer.can_seek());
    assert_eq!(demuxer.seek_ms(0).unwrap(), 0);
    assert_eq!(demuxer.seek_ms(4000).unwrap(), 0);
    assert_eq!(demuxer.position(), Some(13));
}

/// Scenario: no metadata; the table grows from observed keyframes while
/// the file demuxes, then answers a seek from those entries.
#[test]
fn synthesized_table_seek_after_full_demux() {
    let mut builder = FlvFileBuilder::new(true, false).tag(avc_sequence_tag(0));

    let mut key_offsets = Vec::new();
    for second in 0..=10u32 {
        let ts = second * 1000;
        if second % 5 == 0 {
            key_offsets.push((ts as u64, builder.mark()));
            builder = builder.tag(avc_frame_tag(ts, true, &[0xAA; 48]));
        } else {
            builder = builder.tag(avc_frame_tag(ts, false, &[0xBB; 48]));
        }
    }
    let data = builder.build();

    let mut demuxer = FlvDemuxer::new(Cursor::new(data)).unwrap();
    assert!(!demuxer.seek_table().is_imported());

    // Demux the whole file once; keyframes at 0, 5000, 10000 ms land in
    // the table.
    while demuxer.read_frame(TrackType::Video).unwrap().is_some() {}
    assert_eq!(demuxer.seek_table().len(), 3);

    let landed = demuxer.seek_ms(6000).unwrap();
    assert!(landed <= 6000);
    assert_eq!(landed, 5000);
    let expected = key_offsets
        .iter()
        .find(|(ts, _)| *ts == 5000)
        .map(|(_, off)| *off)
        .unwrap();
    assert_eq!(demuxer.position(), Some(expected));

    // And frames flow again from the landing point.
    let packet = demuxer.read_frame(TrackType::Video).unwrap().unwrap();
    assert_eq!(packet.pts.value, 5_000_000);
    assert!(packet.is_keyframe());
}

/// A seek target not yet covered by the synthesized table triggers the
/// forward scan, which grows the table on the way.
#[test]
fn synthesized_table_forward_scan() {
    let mut builder = FlvFileBuilder::new(true, false).tag(avc_sequence_tag(0));
    for second in 0..=20u32 {
        let ts = second * 1000;
        builder = builder.tag(avc_frame_tag(ts, second % 2 == 0, &[0xCC; 40]));
    }
    let data = builder.build();

    let mut demuxer = FlvDemuxer::new(Cursor::new(data)).unwrap();
    let before = demuxer.seek_table().len();

    let landed = demuxer.seek_ms(14_000).unwrap();
    assert!(landed <= 14_000);
    assert!(demuxer.seek_table().len() > before);

    let packet = demuxer.read_frame(TrackType::Video).unwrap().unwrap();
    assert!(packet.pts.value <= 14_000_000);
    assert_eq!(packet.seek_target.unwrap().value, 14_000_000);
}

/// Scenario: MP3 track parameters come from the first frame's own
/// header, not the unreliable tag bitfield.
#[test]
fn mp3_parameters_from_frame_header() {
    let data = FlvFileBuilder::new(false, true)
        .tag(mp3_frame_tag(0))
        .tag(mp3_frame_tag(26))
        .tag(mp3_frame_tag(52))
        .tag(mp3_frame_tag(78))
        .tag(mp3_frame_tag(104))
        .build();

    let demuxer = FlvDemuxer::new(Cursor::new(data)).unwrap();
    assert_eq!(demuxer.num_streams(), 1);

    let audio = demuxer.stream_info(0).unwrap().audio.as_ref().unwrap();
    assert_eq!(audio.sample_rate, 44100);
    assert_eq!(audio.channels, 2);
}

/// Scenario: a trailer mismatch on an AVC tag resynchronizes onto the
/// next plausible keyframe tag and demuxing continues without error.
#[test]
fn resync_recovers_when_pattern_exists() {
    let data = FlvFileBuilder::new(true, false)
        .tag(avc_sequence_tag(0))
        .tag(avc_frame_tag(0, true, &[0xAA; 32]))
        .corrupt_last_trailer()
        .tag(avc_frame_tag(1000, true, &[0xBB; 32]))
        .tag(avc_frame_tag(1033, false, &[0xBC; 32]))
        .tag(avc_frame_tag(1066, false, &[0xBD; 32]))
        .tag(avc_frame_tag(1100, false, &[0xBE; 32]))
        .build();

    let mut demuxer = FlvDemuxer::new(Cursor::new(data)).unwrap();
    assert!(demuxer.has_video());

    // The corrupted tag is dropped; the stream resumes at 1000 ms.
    let packet = demuxer.read_frame(TrackType::Video).unwrap().unwrap();
    assert_eq!(packet.pts.value, 1_000_000);
    assert!(packet.is_keyframe());

    let mut rest = 0;
    while demuxer.read_frame(TrackType::Video).unwrap().is_some() {
        rest += 1;
    }
    assert_eq!(rest, 3);
}

/// Scenario: a trailer mismatch with no recovery point in the window
/// ends the stream early instead of looping or crashing.
#[test]
fn resync_exhaustion_ends_stream() {
    let data = FlvFileBuilder::new(true, false)
        .tag(avc_sequence_tag(0))
        .tag(avc_frame_tag(0, true, &[0xAA; 32]))
        .tag(avc_frame_tag(33, false, &[0xBB; 32]))
        .corrupt_last_trailer()
        .raw(&[0u8; 512])
        .build();

    let mut demuxer = FlvDemuxer::new(Cursor::new(data)).unwrap();

    let mut frames = 0;
    while let Some(_packet) = demuxer.read_frame(TrackType::Video).unwrap() {
        frames += 1;
        assert!(frames < 100, "demuxing must terminate");
    }
    // Only the intact keyframe survives.
    assert_eq!(frames, 1);
}

/// A far-ahead target in a long AVC file takes the interpolating direct
/// seek (or its linear-scan fallback) and still lands at or before the
/// target, on a keyframe.
#[test]
fn direct_seek_far_target() {
    // ~400 seconds at 25 fps, keyframe every second, duration declared
    // in metadata so the byte-offset interpolation has something to
    // work with.
    let mut builder = FlvFileBuilder::new(true, false)
        .script(MetadataBuilder::new().duration(400.0).video_codec_id(7))
        .tag(avc_sequence_tag(0));

    for frame in 0..(400 * 25u32) {
        let ts = frame * 40;
        let keyframe = frame % 25 == 0;
        builder = builder.tag(avc_frame_tag(ts, keyframe, &[0xEE; 32]));
    }
    let data = builder.build();

    let mut demuxer = FlvDemuxer::new(Cursor::new(data)).unwrap();
    assert_eq!(demuxer.duration_ms(), 400_000);

    let landed = demuxer.seek_ms(300_000).unwrap();
    assert!(landed <= 300_000);
    assert!(landed >= 250_000, "landed {} too far from target", landed);

    let packet = demuxer.read_frame(TrackType::Video).unwrap().unwrap();
    assert!(packet.is_keyframe());
    assert_eq!(packet.pts.value, landed as i64 * 1000);
}

/// The whole-file pull loop via the trait object surface.
#[test]
fn trait_surface_end_to_end() {
    let data = FlvFileBuilder::new(true, false)
        .script(MetadataBuilder::new().duration(2.0).video_codec_id(7))
        .tag(avc_sequence_tag(0))
        .tag(avc_frame_tag(0, true, &[0x11; 24]))
        .tag(avc_frame_tag(33, false, &[0x22; 24]))
        .tag(avc_frame_tag(66, false, &[0x33; 24]))
        .tag(avc_frame_tag(99, false, &[0x44; 24]))
        .tag(avc_frame_tag(133, true, &[0x55; 24]))
        .build();

    let mut demuxer = FlvDemuxer::new(Cursor::new(data)).unwrap();
    assert_eq!(demuxer.format_name(), "flv");
    assert_eq!(demuxer.num_streams(), 1);
    assert_eq!(demuxer.duration(), Some(2_000_000));

    let mut count = 0;
    while let Some(packet) = demuxer.read_packet().unwrap() {
        assert_eq!(packet.stream_index, 0);
        count += 1;
    }
    assert_eq!(count, 5);
}
