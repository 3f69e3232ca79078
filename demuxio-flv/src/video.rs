//! FLV video codec support.
//!
//! FLV video tags carry a one-byte header followed by codec data:
//! - Frame type (4 bits, high nibble)
//! - Codec ID (4 bits, low nibble)
//!
//! AVC and HEVC tags additionally carry a packet-type byte (sequence
//! config vs. coded frames) and a 3-byte signed composition-time offset.
//! Enhanced FLV replaces the codec nibble with a FourCC after the first
//! byte; both layouts are accepted.
//!
//! Coded AVC payloads are sequences of length-prefixed NAL units; the
//! helpers at the bottom rewrite them into Annex-B form (4-byte start
//! codes) or walk them one NAL at a time.

use crate::error::{FlvError, Result};
use byteorder::{ReadBytesExt, WriteBytesExt};
use demuxio_core::bitstream::{remove_emulation_prevention, BitReader};
use std::io::{Read, Write};

/// Codec ID: Sorenson H.263.
pub const CODEC_ID_SORENSON: u8 = 2;
/// Codec ID: Screen video.
pub const CODEC_ID_SCREEN_VIDEO: u8 = 3;
/// Codec ID: VP6.
pub const CODEC_ID_VP6: u8 = 4;
/// Codec ID: VP6 with alpha.
pub const CODEC_ID_VP6_ALPHA: u8 = 5;
/// Codec ID: Screen video version 2.
pub const CODEC_ID_SCREEN_VIDEO_2: u8 = 6;
/// Codec ID: AVC (H.264).
pub const CODEC_ID_AVC: u8 = 7;
/// Codec ID: HEVC (H.265).
pub const CODEC_ID_HEVC: u8 = 12;

/// AVC/HEVC packet type: sequence configuration record.
pub const AVC_PACKET_SEQUENCE_HEADER: u8 = 0;
/// AVC/HEVC packet type: coded NAL units.
pub const AVC_PACKET_NALU: u8 = 1;
/// AVC/HEVC packet type: end of sequence.
pub const AVC_PACKET_END_OF_SEQUENCE: u8 = 2;

/// Annex-B start code used when rewriting length-prefixed NAL units.
pub const START_CODE: [u8; 4] = [0, 0, 0, 1];

/// Video codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VideoCodec {
    /// Sorenson H.263.
    Sorenson = CODEC_ID_SORENSON,
    /// Screen video.
    ScreenVideo = CODEC_ID_SCREEN_VIDEO,
    /// VP6.
    Vp6 = CODEC_ID_VP6,
    /// VP6 with alpha.
    Vp6Alpha = CODEC_ID_VP6_ALPHA,
    /// Screen video version 2.
    ScreenVideo2 = CODEC_ID_SCREEN_VIDEO_2,
    /// AVC (H.264).
    Avc = CODEC_ID_AVC,
    /// HEVC (H.265).
    Hevc = CODEC_ID_HEVC,
}

impl VideoCodec {
    /// Create from raw nibble value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            CODEC_ID_SORENSON => Some(Self::Sorenson),
            CODEC_ID_SCREEN_VIDEO => Some(Self::ScreenVideo),
            CODEC_ID_VP6 => Some(Self::Vp6),
            CODEC_ID_VP6_ALPHA => Some(Self::Vp6Alpha),
            CODEC_ID_SCREEN_VIDEO_2 => Some(Self::ScreenVideo2),
            CODEC_ID_AVC => Some(Self::Avc),
            CODEC_ID_HEVC => Some(Self::Hevc),
            _ => None,
        }
    }

    /// Convert to raw nibble value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get the codec name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sorenson => "Sorenson H.263",
            Self::ScreenVideo => "Screen Video",
            Self::Vp6 => "VP6",
            Self::Vp6Alpha => "VP6 Alpha",
            Self::ScreenVideo2 => "Screen Video 2",
            Self::Avc => "H.264/AVC",
            Self::Hevc => "H.265/HEVC",
        }
    }

    /// Check if this codec carries packet-type and composition-time bytes.
    pub fn has_avc_packet(self) -> bool {
        matches!(self, Self::Avc | Self::Hevc)
    }

    /// Codecs the demuxer can emit as elementary streams. Anything else
    /// drops the video track rather than failing the parse.
    pub fn is_supported(self) -> bool {
        matches!(self, Self::Avc | Self::Hevc | Self::Sorenson | Self::Vp6)
    }

    /// Per-codec payload header size to strip for verbatim-copy codecs.
    pub fn frame_header_size(self) -> usize {
        match self {
            Self::Avc | Self::Hevc => 5,
            // VP6 carries an extra adjustment byte after the tag header.
            Self::Vp6 | Self::Vp6Alpha => 2,
            _ => 1,
        }
    }
}

/// Video frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    /// Keyframe (for AVC, IDR frame).
    Keyframe = 1,
    /// Inter frame.
    Inter = 2,
    /// Disposable inter frame (H.263 only).
    Disposable = 3,
    /// Generated keyframe (server use only).
    GeneratedKeyframe = 4,
    /// Video info/command frame.
    Info = 5,
}

impl FrameType {
    /// Create from raw 4-bit value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value & 0x0F {
            1 => Some(Self::Keyframe),
            2 => Some(Self::Inter),
            3 => Some(Self::Disposable),
            4 => Some(Self::GeneratedKeyframe),
            5 => Some(Self::Info),
            _ => None,
        }
    }

    /// Convert to raw 4-bit value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this is a sync sample.
    pub fn is_keyframe(self) -> bool {
        matches!(self, Self::Keyframe | Self::GeneratedKeyframe)
    }
}

/// AVC/HEVC packet type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AvcPacketType {
    /// Sequence header (decoder configuration record).
    SequenceHeader = AVC_PACKET_SEQUENCE_HEADER,
    /// One or more coded NAL units.
    Nalu = AVC_PACKET_NALU,
    /// End of sequence.
    EndOfSequence = AVC_PACKET_END_OF_SEQUENCE,
}

impl AvcPacketType {
    /// Create from raw byte value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            AVC_PACKET_SEQUENCE_HEADER => Some(Self::SequenceHeader),
            AVC_PACKET_NALU => Some(Self::Nalu),
            AVC_PACKET_END_OF_SEQUENCE => Some(Self::EndOfSequence),
            _ => None,
        }
    }

    /// Convert to raw byte value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Decode the 3-byte composition-time offset: a signed 24-bit value,
/// sign-extended from bit 23.
pub fn decode_composition_time(bytes: [u8; 3]) -> i32 {
    let ct = ((bytes[0] as i32) << 16) | ((bytes[1] as i32) << 8) | (bytes[2] as i32);
    if ct & 0x80_0000 != 0 {
        ct | !0xFF_FFFF
    } else {
        ct
    }
}

/// FLV video tag header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTagHeader {
    /// Frame type.
    pub frame_type: FrameType,
    /// Video codec.
    pub codec_id: VideoCodec,
    /// Packet type (AVC/HEVC only).
    pub avc_packet_type: Option<AvcPacketType>,
    /// Composition time offset in milliseconds (AVC/HEVC only).
    pub composition_time: i32,
    /// Whether this tag uses the enhanced (FourCC) layout.
    pub is_enhanced: bool,
}

impl VideoTagHeader {
    /// Create a standard-layout header.
    pub fn new(frame_type: FrameType, codec_id: VideoCodec) -> Self {
        Self {
            frame_type,
            codec_id,
            avc_packet_type: None,
            composition_time: 0,
            is_enhanced: false,
        }
    }

    /// Create an AVC sequence header.
    pub fn avc_sequence_header() -> Self {
        Self {
            frame_type: FrameType::Keyframe,
            codec_id: VideoCodec::Avc,
            avc_packet_type: Some(AvcPacketType::SequenceHeader),
            composition_time: 0,
            is_enhanced: false,
        }
    }

    /// Create an AVC coded-frame header.
    pub fn avc_nalu(frame_type: FrameType, composition_time: i32) -> Self {
        Self {
            frame_type,
            codec_id: VideoCodec::Avc,
            avc_packet_type: Some(AvcPacketType::Nalu),
            composition_time,
            is_enhanced: false,
        }
    }

    /// Create an HEVC sequence header (legacy codec-id layout).
    pub fn hevc_sequence_header() -> Self {
        Self {
            frame_type: FrameType::Keyframe,
            codec_id: VideoCodec::Hevc,
            avc_packet_type: Some(AvcPacketType::SequenceHeader),
            composition_time: 0,
            is_enhanced: false,
        }
    }

    /// Create an HEVC coded-frame header (legacy codec-id layout).
    pub fn hevc_nalu(frame_type: FrameType, composition_time: i32) -> Self {
        Self {
            frame_type,
            codec_id: VideoCodec::Hevc,
            avc_packet_type: Some(AvcPacketType::Nalu),
            composition_time,
            is_enhanced: false,
        }
    }

    /// Header size in bytes within the tag payload.
    pub fn size(&self) -> usize {
        if self.is_enhanced {
            if self.composition_time != 0 || self.avc_packet_type == Some(AvcPacketType::Nalu) {
                1 + 4 + 3
            } else {
                1 + 4
            }
        } else if self.codec_id.has_avc_packet() {
            5
        } else {
            1
        }
    }

    /// Parse from a reader.
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        let first_byte = reader.read_u8()?;

        let frame_type_value = (first_byte >> 4) & 0x0F;
        let low_nibble = first_byte & 0x0F;

        // Enhanced layout sets bit 7 of the frame-type nibble.
        if frame_type_value & 0x08 != 0 {
            let mut fourcc = [0u8; 4];
            reader.read_exact(&mut fourcc)?;

            let codec_id = match &fourcc {
                b"hvc1" | b"hev1" => VideoCodec::Hevc,
                b"avc1" | b"avc3" => VideoCodec::Avc,
                _ => return Err(FlvError::InvalidVideoCodec(low_nibble)),
            };

            // Packet type 1 = coded frames with composition time.
            let (avc_packet_type, composition_time) = match low_nibble {
                0 => (Some(AvcPacketType::SequenceHeader), 0),
                1 => {
                    let ct_bytes = [reader.read_u8()?, reader.read_u8()?, reader.read_u8()?];
                    (Some(AvcPacketType::Nalu), decode_composition_time(ct_bytes))
                }
                2 => (Some(AvcPacketType::EndOfSequence), 0),
                3 => (Some(AvcPacketType::Nalu), 0),
                other => return Err(FlvError::InvalidAvcPacketType(other)),
            };

            let frame_type = if frame_type_value & 0x01 != 0 {
                FrameType::Keyframe
            } else {
                FrameType::Inter
            };

            return Ok(Self {
                frame_type,
                codec_id,
                avc_packet_type,
                composition_time,
                is_enhanced: true,
            });
        }

        let frame_type = FrameType::from_u8(frame_type_value)
            .ok_or(FlvError::InvalidFrameType(frame_type_value))?;
        let codec_id =
            VideoCodec::from_u8(low_nibble).ok_or(FlvError::InvalidVideoCodec(low_nibble))?;

        let (avc_packet_type, composition_time) = if codec_id.has_avc_packet() {
            let packet_type_byte = reader.read_u8()?;
            let avc_packet_type = AvcPacketType::from_u8(packet_type_byte)
                .ok_or(FlvError::InvalidAvcPacketType(packet_type_byte))?;

            let ct_bytes = [reader.read_u8()?, reader.read_u8()?, reader.read_u8()?];
            (Some(avc_packet_type), decode_composition_time(ct_bytes))
        } else {
            (None, 0)
        };

        Ok(Self {
            frame_type,
            codec_id,
            avc_packet_type,
            composition_time,
            is_enhanced: false,
        })
    }

    /// Write to a writer (standard layout only).
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let first_byte = (self.frame_type.as_u8() << 4) | self.codec_id.as_u8();
        writer.write_u8(first_byte)?;

        if self.codec_id.has_avc_packet() {
            let packet_type = self.avc_packet_type.unwrap_or(AvcPacketType::Nalu);
            writer.write_u8(packet_type.as_u8())?;

            let ct = self.composition_time;
            writer.write_u8(((ct >> 16) & 0xFF) as u8)?;
            writer.write_u8(((ct >> 8) & 0xFF) as u8)?;
            writer.write_u8((ct & 0xFF) as u8)?;

            Ok(5)
        } else {
            Ok(1)
        }
    }

    /// Check if this tag carries a sequence configuration record.
    pub fn is_sequence_header(&self) -> bool {
        self.avc_packet_type == Some(AvcPacketType::SequenceHeader)
    }

    /// Check if this is a keyframe.
    pub fn is_keyframe(&self) -> bool {
        self.frame_type.is_keyframe()
    }
}

/// AVC decoder configuration record (SPS/PPS).
#[derive(Debug, Clone)]
pub struct AvcConfig {
    /// Configuration version (always 1).
    pub configuration_version: u8,
    /// AVC profile (from SPS).
    pub avc_profile: u8,
    /// Profile compatibility (from SPS).
    pub profile_compatibility: u8,
    /// AVC level (from SPS).
    pub avc_level: u8,
    /// NAL length-prefix size minus one (typically 3).
    pub length_size_minus_one: u8,
    /// Sequence Parameter Sets.
    pub sps: Vec<Vec<u8>>,
    /// Picture Parameter Sets.
    pub pps: Vec<Vec<u8>>,
    /// Raw configuration record bytes.
    pub raw: Vec<u8>,
}

impl AvcConfig {
    /// Parse from raw record bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 7 {
            return Err(FlvError::InvalidSequenceHeader {
                codec: "AVC".to_string(),
                message: "configuration record too short".to_string(),
            });
        }

        let configuration_version = data[0];
        let avc_profile = data[1];
        let profile_compatibility = data[2];
        let avc_level = data[3];
        let length_size_minus_one = data[4] & 0x03;

        let num_sps = (data[5] & 0x1F) as usize;
        let mut offset = 6;
        let mut sps = Vec::with_capacity(num_sps);

        for _ in 0..num_sps {
            let (unit, next) = read_u16_prefixed(data, offset, "AVC", "SPS")?;
            sps.push(unit);
            offset = next;
        }

        if offset >= data.len() {
            return Err(FlvError::InvalidSequenceHeader {
                codec: "AVC".to_string(),
                message: "missing PPS count".to_string(),
            });
        }

        let num_pps = data[offset] as usize;
        offset += 1;
        let mut pps = Vec::with_capacity(num_pps);

        for _ in 0..num_pps {
            let (unit, next) = read_u16_prefixed(data, offset, "AVC", "PPS")?;
            pps.push(unit);
            offset = next;
        }

        Ok(Self {
            configuration_version,
            avc_profile,
            profile_compatibility,
            avc_level,
            length_size_minus_one,
            sps,
            pps,
            raw: data.to_vec(),
        })
    }

    /// NAL length-prefix size in bytes (1, 2, or 4).
    pub fn nalu_length_size(&self) -> usize {
        (self.length_size_minus_one + 1) as usize
    }

    /// All parameter sets as one Annex-B blob (start code before each).
    pub fn parameter_sets_annexb(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for unit in self.sps.iter().chain(self.pps.iter()) {
            out.extend_from_slice(&START_CODE);
            out.extend_from_slice(unit);
        }
        out
    }
}

fn read_u16_prefixed(
    data: &[u8],
    offset: usize,
    codec: &str,
    what: &str,
) -> Result<(Vec<u8>, usize)> {
    if offset + 2 > data.len() {
        return Err(FlvError::InvalidSequenceHeader {
            codec: codec.to_string(),
            message: format!("{} length truncated", what),
        });
    }
    let len = u16::from_be_bytes([data[offset], data[offset + 1]]) as usize;
    let start = offset + 2;

    if start + len > data.len() {
        return Err(FlvError::InvalidSequenceHeader {
            codec: codec.to_string(),
            message: format!("{} data truncated", what),
        });
    }
    Ok((data[start..start + len].to_vec(), start + len))
}

/// HEVC decoder configuration record.
#[derive(Debug, Clone)]
pub struct HevcConfig {
    /// Configuration version.
    pub configuration_version: u8,
    /// General profile IDC.
    pub general_profile_idc: u8,
    /// General level IDC.
    pub general_level_idc: u8,
    /// NAL length-prefix size minus one.
    pub length_size_minus_one: u8,
    /// Coded width from the SPS, when it could be parsed.
    pub width: Option<u32>,
    /// Coded height from the SPS, when it could be parsed.
    pub height: Option<u32>,
    /// Raw configuration record bytes.
    pub raw: Vec<u8>,
}

/// HEVC NAL unit types for parameter sets.
const HEVC_NAL_VPS: u8 = 32;
const HEVC_NAL_SPS: u8 = 33;
const HEVC_NAL_PPS: u8 = 34;

impl HevcConfig {
    /// Parse from raw record bytes, recovering dimensions from the
    /// embedded SPS when present.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 23 {
            return Err(FlvError::InvalidSequenceHeader {
                codec: "HEVC".to_string(),
                message: "configuration record too short".to_string(),
            });
        }

        let configuration_version = data[0];
        if configuration_version != 1 {
            // Also rules out bare parameter-set NALs being mistaken for
            // a complete record.
            return Err(FlvError::InvalidSequenceHeader {
                codec: "HEVC".to_string(),
                message: format!("bad configuration version {}", configuration_version),
            });
        }
        let general_profile_idc = data[1] & 0x1F;
        let general_level_idc = data[12];
        let length_size_minus_one = data[21] & 0x03;

        let mut width = None;
        let mut height = None;

        // Walk the parameter-set arrays looking for the SPS.
        let num_arrays = data[22] as usize;
        let mut offset = 23;
        'arrays: for _ in 0..num_arrays {
            if offset + 3 > data.len() {
                break;
            }
            let nal_type = data[offset] & 0x3F;
            let num_nalus = u16::from_be_bytes([data[offset + 1], data[offset + 2]]) as usize;
            offset += 3;

            for _ in 0..num_nalus {
                if offset + 2 > data.len() {
                    break 'arrays;
                }
                let len = u16::from_be_bytes([data[offset], data[offset + 1]]) as usize;
                offset += 2;
                if offset + len > data.len() {
                    break 'arrays;
                }
                if nal_type == HEVC_NAL_SPS {
                    if let Ok((w, h)) = parse_hevc_sps_dimensions(&data[offset..offset + len]) {
                        width = Some(w);
                        height = Some(h);
                    }
                }
                offset += len;
            }
        }

        Ok(Self {
            configuration_version,
            general_profile_idc,
            general_level_idc,
            length_size_minus_one,
            width,
            height,
            raw: data.to_vec(),
        })
    }

    /// Synthesize a configuration record from bare parameter-set NAL
    /// units (streams that ship VPS/SPS/PPS as separate config tags).
    pub fn from_nal_units(nals: &[Vec<u8>]) -> Result<Self> {
        let mut vps: Option<&[u8]> = None;
        let mut sps: Option<&[u8]> = None;
        let mut pps: Option<&[u8]> = None;

        for nal in nals {
            if nal.len() < 2 {
                continue;
            }
            match (nal[0] >> 1) & 0x3F {
                HEVC_NAL_VPS => vps = Some(nal),
                HEVC_NAL_SPS => sps = Some(nal),
                HEVC_NAL_PPS => pps = Some(nal),
                _ => {}
            }
        }

        let sps = sps.ok_or_else(|| FlvError::InvalidSequenceHeader {
            codec: "HEVC".to_string(),
            message: "no SPS among parameter sets".to_string(),
        })?;

        let dims = parse_hevc_sps_dimensions(sps).ok();
        let (profile_idc, level_idc) = if sps.len() >= 3 {
            // profile_tier_level starts right after the 2-byte NAL
            // header and the 8 bits of sps ids/flags.
            (sps.get(3).map(|b| b & 0x1F).unwrap_or(1), *sps.last().unwrap_or(&0))
        } else {
            (1, 0)
        };

        let mut raw = Vec::with_capacity(64);
        raw.push(1); // configurationVersion
        raw.push(profile_idc); // profile_space(0)/tier(0)/profile_idc
        raw.extend_from_slice(&[0x60, 0, 0, 0]); // compatibility flags
        raw.extend_from_slice(&[0x90, 0, 0, 0, 0, 0]); // constraint flags
        raw.push(level_idc);
        raw.extend_from_slice(&[0xF0, 0]); // min_spatial_segmentation_idc
        raw.push(0xFC); // parallelismType
        raw.push(0xFD); // chromaFormat (4:2:0)
        raw.push(0xF8); // bitDepthLumaMinus8
        raw.push(0xF8); // bitDepthChromaMinus8
        raw.extend_from_slice(&[0, 0]); // avgFrameRate
        raw.push(0x03); // lengthSizeMinusOne = 3, one temporal layer
        let mut arrays: Vec<(u8, &[u8])> = Vec::new();
        if let Some(v) = vps {
            arrays.push((HEVC_NAL_VPS, v));
        }
        arrays.push((HEVC_NAL_SPS, sps));
        if let Some(p) = pps {
            arrays.push((HEVC_NAL_PPS, p));
        }
        raw.push(arrays.len() as u8);
        for (nal_type, nal) in &arrays {
            raw.push(0x80 | nal_type); // array_completeness set
            raw.extend_from_slice(&1u16.to_be_bytes());
            raw.extend_from_slice(&(nal.len() as u16).to_be_bytes());
            raw.extend_from_slice(nal);
        }

        Ok(Self {
            configuration_version: 1,
            general_profile_idc: profile_idc,
            general_level_idc: level_idc,
            length_size_minus_one: 3,
            width: dims.map(|(w, _)| w),
            height: dims.map(|(_, h)| h),
            raw,
        })
    }

    /// NAL length-prefix size in bytes.
    pub fn nalu_length_size(&self) -> usize {
        (self.length_size_minus_one + 1) as usize
    }
}

/// Extract `pic_width/height_in_luma_samples` (conformance-cropped) from
/// an HEVC SPS NAL unit.
pub fn parse_hevc_sps_dimensions(nal: &[u8]) -> Result<(u32, u32)> {
    if nal.len() < 4 {
        return Err(FlvError::InvalidSequenceHeader {
            codec: "HEVC".to_string(),
            message: "SPS too short".to_string(),
        });
    }

    // Skip the 2-byte NAL header, then unescape the RBSP.
    let rbsp = remove_emulation_prevention(&nal[2..]);
    let mut r = BitReader::new(&rbsp);

    let map_err = |_: demuxio_core::Error| FlvError::InvalidSequenceHeader {
        codec: "HEVC".to_string(),
        message: "SPS bitstream truncated".to_string(),
    };

    r.skip(4).map_err(map_err)?; // sps_video_parameter_set_id
    let max_sub_layers_minus1 = r.read_bits(3).map_err(map_err)?;
    r.skip(1).map_err(map_err)?; // sps_temporal_id_nesting_flag

    // profile_tier_level: 2 + 1 + 5 bits, 32 compatibility bits,
    // 48 constraint bits, 8 level bits.
    r.skip(8 + 32 + 48 + 8).map_err(map_err)?;

    if max_sub_layers_minus1 > 0 {
        let mut profile_present = [false; 8];
        let mut level_present = [false; 8];
        for i in 0..max_sub_layers_minus1 as usize {
            profile_present[i] = r.read_bit().map_err(map_err)?;
            level_present[i] = r.read_bit().map_err(map_err)?;
        }
        // Reserved alignment bits up to 8 sub-layers.
        r.skip(2 * (8 - max_sub_layers_minus1 as usize)).map_err(map_err)?;
        for i in 0..max_sub_layers_minus1 as usize {
            if profile_present[i] {
                r.skip(8 + 32 + 48).map_err(map_err)?;
            }
            if level_present[i] {
                r.skip(8).map_err(map_err)?;
            }
        }
    }

    let _sps_id = r.read_ue().map_err(map_err)?;
    let chroma_format_idc = r.read_ue().map_err(map_err)?;
    if chroma_format_idc == 3 {
        r.skip(1).map_err(map_err)?; // separate_colour_plane_flag
    }

    let width = r.read_ue().map_err(map_err)?;
    let height = r.read_ue().map_err(map_err)?;

    let conformance_window = r.read_bit().map_err(map_err)?;
    if !conformance_window {
        return Ok((width, height));
    }

    let left = r.read_ue().map_err(map_err)?;
    let right = r.read_ue().map_err(map_err)?;
    let top = r.read_ue().map_err(map_err)?;
    let bottom = r.read_ue().map_err(map_err)?;

    let (sub_w, sub_h) = match chroma_format_idc {
        1 => (2, 2),
        2 => (2, 1),
        _ => (1, 1),
    };

    Ok((
        width.saturating_sub(left.saturating_add(right).saturating_mul(sub_w)),
        height.saturating_sub(top.saturating_add(bottom).saturating_mul(sub_h)),
    ))
}

/// Rewrite a length-prefixed NAL sequence into one Annex-B buffer.
///
/// Each NAL keeps its payload; the `length_size`-byte prefix is replaced
/// by a 4-byte start code. The transform is a pure function of its
/// inputs, so repeated application to the same payload yields identical
/// output.
pub fn length_prefixed_to_annexb(data: &[u8], length_size: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() + 16);
    let mut cursor = 0usize;

    while cursor < data.len() {
        let (nal_start, nal_end) = next_nal_range(data, cursor, length_size)?;
        out.extend_from_slice(&START_CODE);
        out.extend_from_slice(&data[nal_start..nal_end]);
        cursor = nal_end;
    }

    Ok(out)
}

/// Bounds of the next length-prefixed NAL at `cursor`.
///
/// Returns the payload range (prefix excluded); the end doubles as the
/// next cursor. Used both by the whole-buffer rewrite above and by the
/// one-NAL-per-call dequeue path.
pub fn next_nal_range(data: &[u8], cursor: usize, length_size: usize) -> Result<(usize, usize)> {
    if !(1..=4).contains(&length_size) {
        return Err(FlvError::InvalidSequenceHeader {
            codec: "AVC".to_string(),
            message: format!("bad NAL length size {}", length_size),
        });
    }
    if cursor + length_size > data.len() {
        return Err(FlvError::UnexpectedEnd {
            offset: cursor as u64,
        });
    }

    let mut len = 0usize;
    for &b in &data[cursor..cursor + length_size] {
        len = (len << 8) | b as usize;
    }

    let start = cursor + length_size;
    let end = start + len;
    if len == 0 || end > data.len() {
        return Err(FlvError::InvalidTagSize {
            offset: cursor as u64,
            message: format!("NAL length {} exceeds payload", len),
        });
    }

    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_video_codec() {
        assert_eq!(VideoCodec::from_u8(7), Some(VideoCodec::Avc));
        assert_eq!(VideoCodec::from_u8(12), Some(VideoCodec::Hevc));
        assert_eq!(VideoCodec::from_u8(9), None);

        assert!(VideoCodec::Avc.has_avc_packet());
        assert!(VideoCodec::Avc.is_supported());
        assert!(!VideoCodec::ScreenVideo.is_supported());
    }

    #[test]
    fn test_frame_type() {
        assert!(FrameType::Keyframe.is_keyframe());
        assert!(FrameType::GeneratedKeyframe.is_keyframe());
        assert!(!FrameType::Inter.is_keyframe());
    }

    #[test]
    fn test_composition_time_sign_extension() {
        assert_eq!(decode_composition_time([0x80, 0x00, 0x00]), -8_388_608);
        assert_eq!(decode_composition_time([0x00, 0x00, 0x01]), 1);
        assert_eq!(decode_composition_time([0xFF, 0xFF, 0xFF]), -1);
        assert_eq!(decode_composition_time([0x00, 0x00, 0x00]), 0);
        assert_eq!(decode_composition_time([0x7F, 0xFF, 0xFF]), 8_388_607);
    }

    #[test]
    fn test_video_tag_header_roundtrip() {
        let original = VideoTagHeader::avc_nalu(FrameType::Keyframe, 100);

        let mut buffer = Vec::new();
        original.write(&mut buffer).unwrap();
        assert_eq!(buffer.len(), 5);

        let parsed = VideoTagHeader::parse(&mut Cursor::new(&buffer)).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_negative_composition_time_roundtrip() {
        let original = VideoTagHeader::avc_nalu(FrameType::Inter, -50);

        let mut buffer = Vec::new();
        original.write(&mut buffer).unwrap();

        let parsed = VideoTagHeader::parse(&mut Cursor::new(&buffer)).unwrap();
        assert_eq!(parsed.composition_time, -50);
    }

    #[test]
    fn test_enhanced_header_parse() {
        // Enhanced keyframe, coded frames, hvc1, CTS = 2.
        let data = [0x91u8, b'h', b'v', b'c', b'1', 0x00, 0x00, 0x02];
        let parsed = VideoTagHeader::parse(&mut Cursor::new(&data)).unwrap();

        assert!(parsed.is_enhanced);
        assert_eq!(parsed.codec_id, VideoCodec::Hevc);
        assert_eq!(parsed.frame_type, FrameType::Keyframe);
        assert_eq!(parsed.composition_time, 2);
    }

    #[test]
    fn test_avc_sequence_header_flag() {
        let header = VideoTagHeader::avc_sequence_header();
        assert!(header.is_sequence_header());
        assert!(header.is_keyframe());
        assert_eq!(header.size(), 5);
    }

    const AVCC: [u8; 17] = [
        0x01, 0x64, 0x00, 0x1F, 0xFF, 0xE1, 0x00, 0x04, 0x67, 0x64, 0x00, 0x1F, 0x01, 0x00, 0x02,
        0x68, 0xEF,
    ];

    #[test]
    fn test_avc_config_parse() {
        let config = AvcConfig::parse(&AVCC).unwrap();
        assert_eq!(config.configuration_version, 1);
        assert_eq!(config.avc_profile, 0x64);
        assert_eq!(config.avc_level, 0x1F);
        assert_eq!(config.sps.len(), 1);
        assert_eq!(config.pps.len(), 1);
        assert_eq!(config.nalu_length_size(), 4);
    }

    #[test]
    fn test_avc_parameter_sets_annexb() {
        let config = AvcConfig::parse(&AVCC).unwrap();
        let blob = config.parameter_sets_annexb();
        assert_eq!(
            blob,
            vec![0, 0, 0, 1, 0x67, 0x64, 0x00, 0x1F, 0, 0, 0, 1, 0x68, 0xEF]
        );
    }

    #[test]
    fn test_avc_config_truncated() {
        assert!(AvcConfig::parse(&AVCC[..6]).is_err());
        assert!(AvcConfig::parse(&AVCC[..12]).is_err());
    }

    #[test]
    fn test_length_prefixed_to_annexb() {
        // Two NALs with 4-byte prefixes.
        let mut data = Vec::new();
        data.extend_from_slice(&3u32.to_be_bytes());
        data.extend_from_slice(&[0x65, 0xAA, 0xBB]);
        data.extend_from_slice(&2u32.to_be_bytes());
        data.extend_from_slice(&[0x41, 0xCC]);

        let out = length_prefixed_to_annexb(&data, 4).unwrap();
        assert_eq!(
            out,
            vec![0, 0, 0, 1, 0x65, 0xAA, 0xBB, 0, 0, 0, 1, 0x41, 0xCC]
        );
    }

    #[test]
    fn test_annexb_transform_is_idempotent_per_input() {
        let mut data = Vec::new();
        data.extend_from_slice(&5u32.to_be_bytes());
        data.extend_from_slice(&[0x65, 1, 2, 3, 4]);

        let first = length_prefixed_to_annexb(&data, 4).unwrap();
        let second = length_prefixed_to_annexb(&data, 4).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_annexb_rejects_overrun() {
        let mut data = Vec::new();
        data.extend_from_slice(&200u32.to_be_bytes());
        data.extend_from_slice(&[0x65, 1, 2]);

        assert!(length_prefixed_to_annexb(&data, 4).is_err());
    }

    #[test]
    fn test_next_nal_range_cursor_walk() {
        let mut data = Vec::new();
        data.extend_from_slice(&1u32.to_be_bytes());
        data.push(0x65);
        data.extend_from_slice(&2u32.to_be_bytes());
        data.extend_from_slice(&[0x41, 0x99]);

        let (s1, e1) = next_nal_range(&data, 0, 4).unwrap();
        assert_eq!(&data[s1..e1], &[0x65]);
        let (s2, e2) = next_nal_range(&data, e1, 4).unwrap();
        assert_eq!(&data[s2..e2], &[0x41, 0x99]);
        assert_eq!(e2, data.len());
    }

    /// Build a minimal HEVC SPS NAL with the given dimensions.
    fn build_test_sps(width: u32, height: u32) -> Vec<u8> {
        use demuxio_core::bitstream::BitWriter;

        let mut w = BitWriter::new();
        w.write_bits(0, 4); // sps_video_parameter_set_id
        w.write_bits(0, 3); // sps_max_sub_layers_minus1
        w.write_bit(true); // sps_temporal_id_nesting_flag
        w.write_bits(0, 8); // profile space/tier/idc
        w.write_bits(0x6000_0000, 32); // compatibility
        for _ in 0..6 {
            w.write_bits(0, 8); // constraint flags
        }
        w.write_bits(93, 8); // level
        w.write_ue(0); // sps_seq_parameter_set_id
        w.write_ue(1); // chroma_format_idc (4:2:0)
        w.write_ue(width);
        w.write_ue(height);
        w.write_bit(false); // conformance_window_flag
        w.write_bit(true); // rbsp stop bit
        w.align_to_byte();

        let mut nal = vec![(HEVC_NAL_SPS << 1), 0x01];
        nal.extend_from_slice(w.data());
        nal
    }

    #[test]
    fn test_hevc_sps_dimensions() {
        let sps = build_test_sps(1920, 1080);
        let (w, h) = parse_hevc_sps_dimensions(&sps).unwrap();
        assert_eq!((w, h), (1920, 1080));
    }

    #[test]
    fn test_hevc_config_from_nal_units() {
        let sps = build_test_sps(1280, 720);
        let vps = vec![(HEVC_NAL_VPS << 1), 0x01, 0x00];
        let pps = vec![(HEVC_NAL_PPS << 1), 0x01, 0x00];

        let config = HevcConfig::from_nal_units(&[vps, sps, pps]).unwrap();
        assert_eq!(config.width, Some(1280));
        assert_eq!(config.height, Some(720));
        assert_eq!(config.nalu_length_size(), 4);
        assert_eq!(config.raw[0], 1);

        // The synthesized record parses back with the same dimensions.
        let reparsed = HevcConfig::parse(&config.raw).unwrap();
        assert_eq!(reparsed.width, Some(1280));
        assert_eq!(reparsed.height, Some(720));
    }

    #[test]
    fn test_hevc_config_requires_sps() {
        let vps = vec![(HEVC_NAL_VPS << 1), 0x01, 0x00];
        assert!(HevcConfig::from_nal_units(&[vps]).is_err());
    }
}
