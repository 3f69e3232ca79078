//! FLV audio codec support.
//!
//! FLV audio tags carry a one-byte header followed by codec data:
//! - Sound format (4 bits, high nibble)
//! - Sound rate (2 bits)
//! - Sound size (1 bit)
//! - Sound type (1 bit)
//!
//! For AAC, a second byte distinguishes the AudioSpecificConfig sequence
//! header from raw frames. MP3 carries no in-container parameters worth
//! trusting, so the first frame's own header is decoded (ISO/IEC 11172-3
//! tables) to recover sample rate, channel count, and frame size.

use crate::error::{FlvError, Result};
use std::io::{Read, Write};

/// Sound format: Linear PCM, platform endian.
pub const SOUND_FORMAT_LINEAR_PCM_PE: u8 = 0;
/// Sound format: ADPCM.
pub const SOUND_FORMAT_ADPCM: u8 = 1;
/// Sound format: MP3.
pub const SOUND_FORMAT_MP3: u8 = 2;
/// Sound format: Linear PCM, little endian.
pub const SOUND_FORMAT_LINEAR_PCM_LE: u8 = 3;
/// Sound format: Nellymoser 16kHz mono.
pub const SOUND_FORMAT_NELLYMOSER_16K: u8 = 4;
/// Sound format: Nellymoser 8kHz mono.
pub const SOUND_FORMAT_NELLYMOSER_8K: u8 = 5;
/// Sound format: Nellymoser.
pub const SOUND_FORMAT_NELLYMOSER: u8 = 6;
/// Sound format: G.711 A-law.
pub const SOUND_FORMAT_G711_ALAW: u8 = 7;
/// Sound format: G.711 mu-law.
pub const SOUND_FORMAT_G711_MULAW: u8 = 8;
/// Sound format: AAC.
pub const SOUND_FORMAT_AAC: u8 = 10;
/// Sound format: Speex.
pub const SOUND_FORMAT_SPEEX: u8 = 11;
/// Sound format: MP3 8kHz.
pub const SOUND_FORMAT_MP3_8K: u8 = 14;
/// Sound format: Device-specific.
pub const SOUND_FORMAT_DEVICE_SPECIFIC: u8 = 15;

/// AAC packet type: Sequence header (AudioSpecificConfig).
pub const AAC_PACKET_SEQUENCE_HEADER: u8 = 0;
/// AAC packet type: Raw AAC frame.
pub const AAC_PACKET_RAW: u8 = 1;

/// Audio codec/format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SoundFormat {
    /// Linear PCM, platform endian.
    LinearPcmPe = SOUND_FORMAT_LINEAR_PCM_PE,
    /// ADPCM.
    Adpcm = SOUND_FORMAT_ADPCM,
    /// MP3.
    Mp3 = SOUND_FORMAT_MP3,
    /// Linear PCM, little endian.
    LinearPcmLe = SOUND_FORMAT_LINEAR_PCM_LE,
    /// Nellymoser 16kHz mono.
    Nellymoser16k = SOUND_FORMAT_NELLYMOSER_16K,
    /// Nellymoser 8kHz mono.
    Nellymoser8k = SOUND_FORMAT_NELLYMOSER_8K,
    /// Nellymoser.
    Nellymoser = SOUND_FORMAT_NELLYMOSER,
    /// G.711 A-law.
    G711Alaw = SOUND_FORMAT_G711_ALAW,
    /// G.711 mu-law.
    G711Mulaw = SOUND_FORMAT_G711_MULAW,
    /// AAC.
    Aac = SOUND_FORMAT_AAC,
    /// Speex.
    Speex = SOUND_FORMAT_SPEEX,
    /// MP3 8kHz.
    Mp38k = SOUND_FORMAT_MP3_8K,
    /// Device-specific.
    DeviceSpecific = SOUND_FORMAT_DEVICE_SPECIFIC,
}

impl SoundFormat {
    /// Create from raw nibble value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            SOUND_FORMAT_LINEAR_PCM_PE => Some(Self::LinearPcmPe),
            SOUND_FORMAT_ADPCM => Some(Self::Adpcm),
            SOUND_FORMAT_MP3 => Some(Self::Mp3),
            SOUND_FORMAT_LINEAR_PCM_LE => Some(Self::LinearPcmLe),
            SOUND_FORMAT_NELLYMOSER_16K => Some(Self::Nellymoser16k),
            SOUND_FORMAT_NELLYMOSER_8K => Some(Self::Nellymoser8k),
            SOUND_FORMAT_NELLYMOSER => Some(Self::Nellymoser),
            SOUND_FORMAT_G711_ALAW => Some(Self::G711Alaw),
            SOUND_FORMAT_G711_MULAW => Some(Self::G711Mulaw),
            SOUND_FORMAT_AAC => Some(Self::Aac),
            SOUND_FORMAT_SPEEX => Some(Self::Speex),
            SOUND_FORMAT_MP3_8K => Some(Self::Mp38k),
            SOUND_FORMAT_DEVICE_SPECIFIC => Some(Self::DeviceSpecific),
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
            Self::LinearPcmPe | Self::LinearPcmLe => "PCM",
            Self::Adpcm => "ADPCM",
            Self::Mp3 | Self::Mp38k => "MP3",
            Self::Nellymoser16k | Self::Nellymoser8k | Self::Nellymoser => "Nellymoser",
            Self::G711Alaw => "G.711 A-law",
            Self::G711Mulaw => "G.711 mu-law",
            Self::Aac => "AAC",
            Self::Speex => "Speex",
            Self::DeviceSpecific => "Device-specific",
        }
    }

    /// Check if this format carries an AAC packet type byte.
    pub fn has_packet_type(self) -> bool {
        self == Self::Aac
    }

    /// Formats the demuxer can emit as elementary streams. Anything else
    /// drops the audio track rather than failing the parse.
    pub fn is_supported(self) -> bool {
        matches!(
            self,
            Self::Aac | Self::Mp3 | Self::Mp38k | Self::LinearPcmPe | Self::LinearPcmLe
        )
    }
}

/// Sound sample rate field (2 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SoundRate {
    /// 5.5 kHz.
    Rate5500Hz = 0,
    /// 11 kHz.
    Rate11000Hz = 1,
    /// 22 kHz.
    Rate22000Hz = 2,
    /// 44 kHz.
    Rate44000Hz = 3,
}

impl SoundRate {
    /// Create from raw 2-bit value.
    pub fn from_u8(value: u8) -> Self {
        match value & 0x03 {
            0 => Self::Rate5500Hz,
            1 => Self::Rate11000Hz,
            2 => Self::Rate22000Hz,
            _ => Self::Rate44000Hz,
        }
    }

    /// Convert to raw 2-bit value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get the sample rate in Hz.
    pub fn hz(self) -> u32 {
        match self {
            Self::Rate5500Hz => 5500,
            Self::Rate11000Hz => 11025,
            Self::Rate22000Hz => 22050,
            Self::Rate44000Hz => 44100,
        }
    }

    /// Create from a sample rate in Hz (nearest field value).
    pub fn from_hz(hz: u32) -> Self {
        if hz <= 5500 {
            Self::Rate5500Hz
        } else if hz <= 11025 {
            Self::Rate11000Hz
        } else if hz <= 22050 {
            Self::Rate22000Hz
        } else {
            Self::Rate44000Hz
        }
    }
}

/// Sound sample size field (1 bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SoundSize {
    /// 8-bit samples.
    Bits8 = 0,
    /// 16-bit samples.
    Bits16 = 1,
}

impl SoundSize {
    /// Create from raw 1-bit value.
    pub fn from_u8(value: u8) -> Self {
        if value & 0x01 == 0 {
            Self::Bits8
        } else {
            Self::Bits16
        }
    }

    /// Convert to raw 1-bit value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get the bit depth.
    pub fn bits(self) -> u8 {
        match self {
            Self::Bits8 => 8,
            Self::Bits16 => 16,
        }
    }
}

/// Sound channel field (1 bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SoundType {
    /// Mono.
    Mono = 0,
    /// Stereo.
    Stereo = 1,
}

impl SoundType {
    /// Create from raw 1-bit value.
    pub fn from_u8(value: u8) -> Self {
        if value & 0x01 == 0 {
            Self::Mono
        } else {
            Self::Stereo
        }
    }

    /// Convert to raw 1-bit value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get the number of channels.
    pub fn channels(self) -> u8 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

/// AAC packet type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AacPacketType {
    /// AAC sequence header (AudioSpecificConfig).
    SequenceHeader = AAC_PACKET_SEQUENCE_HEADER,
    /// Raw AAC frame data.
    Raw = AAC_PACKET_RAW,
}

impl AacPacketType {
    /// Create from raw byte value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            AAC_PACKET_SEQUENCE_HEADER => Some(Self::SequenceHeader),
            AAC_PACKET_RAW => Some(Self::Raw),
            _ => None,
        }
    }

    /// Convert to raw byte value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// FLV audio tag header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioTagHeader {
    /// Sound format/codec.
    pub sound_format: SoundFormat,
    /// Sample rate field.
    pub sound_rate: SoundRate,
    /// Sample size field.
    pub sound_size: SoundSize,
    /// Channel field.
    pub sound_type: SoundType,
    /// AAC packet type (AAC only).
    pub aac_packet_type: Option<AacPacketType>,
}

impl AudioTagHeader {
    /// Create a new audio tag header.
    pub fn new(
        sound_format: SoundFormat,
        sound_rate: SoundRate,
        sound_size: SoundSize,
        sound_type: SoundType,
    ) -> Self {
        Self {
            sound_format,
            sound_rate,
            sound_size,
            sound_type,
            aac_packet_type: None,
        }
    }

    /// Create an AAC audio tag header.
    pub fn aac(packet_type: AacPacketType) -> Self {
        Self {
            sound_format: SoundFormat::Aac,
            sound_rate: SoundRate::Rate44000Hz,
            sound_size: SoundSize::Bits16,
            sound_type: SoundType::Stereo,
            aac_packet_type: Some(packet_type),
        }
    }

    /// Create an MP3 audio tag header.
    pub fn mp3(sample_rate: u32, stereo: bool) -> Self {
        Self {
            sound_format: SoundFormat::Mp3,
            sound_rate: SoundRate::from_hz(sample_rate),
            sound_size: SoundSize::Bits16,
            sound_type: if stereo {
                SoundType::Stereo
            } else {
                SoundType::Mono
            },
            aac_packet_type: None,
        }
    }

    /// Header size in bytes (1, or 2 for AAC).
    pub fn size(&self) -> usize {
        if self.sound_format.has_packet_type() {
            2
        } else {
            1
        }
    }

    /// Parse from a reader.
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        let mut first_byte = [0u8; 1];
        reader
            .read_exact(&mut first_byte)
            .map_err(|_| FlvError::UnexpectedEnd { offset: 0 })?;
        let byte = first_byte[0];

        let format_value = (byte >> 4) & 0x0F;
        let sound_format =
            SoundFormat::from_u8(format_value).ok_or(FlvError::InvalidAudioFormat(format_value))?;
        let sound_rate = SoundRate::from_u8((byte >> 2) & 0x03);
        let sound_size = SoundSize::from_u8((byte >> 1) & 0x01);
        let sound_type = SoundType::from_u8(byte & 0x01);

        let aac_packet_type = if sound_format.has_packet_type() {
            let mut packet_type_byte = [0u8; 1];
            reader.read_exact(&mut packet_type_byte)?;
            Some(
                AacPacketType::from_u8(packet_type_byte[0])
                    .ok_or(FlvError::InvalidAacPacketType(packet_type_byte[0]))?,
            )
        } else {
            None
        };

        Ok(Self {
            sound_format,
            sound_rate,
            sound_size,
            sound_type,
            aac_packet_type,
        })
    }

    /// Write to a writer.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let byte = (self.sound_format.as_u8() << 4)
            | (self.sound_rate.as_u8() << 2)
            | (self.sound_size.as_u8() << 1)
            | self.sound_type.as_u8();

        writer.write_all(&[byte])?;

        if let Some(aac_type) = self.aac_packet_type {
            writer.write_all(&[aac_type.as_u8()])?;
            Ok(2)
        } else {
            Ok(1)
        }
    }

    /// Check if this is an AAC sequence header.
    pub fn is_aac_sequence_header(&self) -> bool {
        self.aac_packet_type == Some(AacPacketType::SequenceHeader)
    }
}

/// AAC AudioSpecificConfig, the out-of-band configuration delivered as
/// the AAC sequence header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AacConfig {
    /// Audio object type (2 = AAC-LC, 5 = HE-AAC, ...).
    pub audio_object_type: u8,
    /// Sample rate index (0-12, or 15 for explicit).
    pub sample_rate_index: u8,
    /// Explicit sample rate (if sample_rate_index == 15).
    pub sample_rate: Option<u32>,
    /// Channel configuration.
    pub channel_config: u8,
    /// Raw AudioSpecificConfig bytes.
    pub raw: Vec<u8>,
}

impl AacConfig {
    /// Standard AAC sample rates by index.
    pub const SAMPLE_RATES: [u32; 13] = [
        96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
    ];

    /// Parse from raw AudioSpecificConfig bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 2 {
            return Err(FlvError::InvalidSequenceHeader {
                codec: "AAC".to_string(),
                message: "AudioSpecificConfig too short".to_string(),
            });
        }

        let audio_object_type = (data[0] >> 3) & 0x1F;
        let sample_rate_index = ((data[0] & 0x07) << 1) | ((data[1] >> 7) & 0x01);

        let (sample_rate, channel_config) = if sample_rate_index == 15 {
            if data.len() < 5 {
                return Err(FlvError::InvalidSequenceHeader {
                    codec: "AAC".to_string(),
                    message: "AudioSpecificConfig too short for explicit sample rate".to_string(),
                });
            }
            let rate = ((data[1] as u32 & 0x7F) << 17)
                | ((data[2] as u32) << 9)
                | ((data[3] as u32) << 1)
                | ((data[4] as u32) >> 7);
            let channels = (data[4] >> 3) & 0x0F;
            (Some(rate), channels)
        } else {
            let channels = (data[1] >> 3) & 0x0F;
            (None, channels)
        };

        Ok(Self {
            audio_object_type,
            sample_rate_index,
            sample_rate,
            channel_config,
            raw: data.to_vec(),
        })
    }

    /// Get the sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        if let Some(rate) = self.sample_rate {
            rate
        } else if (self.sample_rate_index as usize) < Self::SAMPLE_RATES.len() {
            Self::SAMPLE_RATES[self.sample_rate_index as usize]
        } else {
            44100
        }
    }

    /// Get the number of channels.
    pub fn channels(&self) -> u8 {
        match self.channel_config {
            0 => 0, // Defined in stream
            1..=6 => self.channel_config,
            7 => 8,
            _ => 2,
        }
    }
}

/// MPEG audio version, from the frame header version field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    /// MPEG 1 (ISO/IEC 11172-3).
    Mpeg1,
    /// MPEG 2 (ISO/IEC 13818-3).
    Mpeg2,
    /// MPEG 2.5 (unofficial low-rate extension).
    Mpeg25,
}

/// MPEG audio layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegLayer {
    /// Layer I.
    Layer1,
    /// Layer II.
    Layer2,
    /// Layer III.
    Layer3,
}

/// Bitrates in kbps, indexed by [version/layer class][bitrate index].
/// Index 0 is "free format" and index 15 is forbidden; both decode to 0.
const MP3_BITRATES_KBPS: [[u32; 16]; 5] = [
    // MPEG1 Layer I
    [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 0],
    // MPEG1 Layer II
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 0],
    // MPEG1 Layer III
    [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0],
    // MPEG2/2.5 Layer I
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, 0],
    // MPEG2/2.5 Layer II & III
    [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
];

/// Sampling rates in Hz, indexed by [version][rate index].
const MP3_SAMPLE_RATES: [[u32; 4]; 3] = [
    [44100, 48000, 32000, 0], // MPEG1
    [22050, 24000, 16000, 0], // MPEG2
    [11025, 12000, 8000, 0],  // MPEG2.5
];

/// Decoded MPEG audio frame header (first 4 bytes of an MP3 frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mp3FrameHeader {
    /// MPEG version.
    pub version: MpegVersion,
    /// Layer.
    pub layer: MpegLayer,
    /// Bitrate in bits per second (0 for free format).
    pub bitrate: u32,
    /// Sampling rate in Hz.
    pub sample_rate: u32,
    /// Padding slot present.
    pub padding: bool,
    /// Channel count (1 or 2).
    pub channels: u8,
    /// Whole frame size in bytes, header included.
    pub frame_size: u32,
    /// PCM samples per frame.
    pub samples_per_frame: u32,
}

impl Mp3FrameHeader {
    /// Decode a frame header from the first bytes of an MP3 frame.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(FlvError::UnexpectedEnd { offset: 0 });
        }

        let word = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);

        // 11-bit sync run.
        if word & 0xFFE0_0000 != 0xFFE0_0000 {
            return Err(FlvError::InvalidAudioFormat(data[0]));
        }

        let version = match (word >> 19) & 0x03 {
            0 => MpegVersion::Mpeg25,
            2 => MpegVersion::Mpeg2,
            3 => MpegVersion::Mpeg1,
            _ => return Err(FlvError::InvalidAudioFormat(data[1])),
        };

        let layer = match (word >> 17) & 0x03 {
            1 => MpegLayer::Layer3,
            2 => MpegLayer::Layer2,
            3 => MpegLayer::Layer1,
            _ => return Err(FlvError::InvalidAudioFormat(data[1])),
        };

        let bitrate_index = ((word >> 12) & 0x0F) as usize;
        let rate_index = ((word >> 10) & 0x03) as usize;
        let padding = (word >> 9) & 0x01 != 0;
        let channel_mode = (word >> 6) & 0x03;

        let table = match (version, layer) {
            (MpegVersion::Mpeg1, MpegLayer::Layer1) => 0,
            (MpegVersion::Mpeg1, MpegLayer::Layer2) => 1,
            (MpegVersion::Mpeg1, MpegLayer::Layer3) => 2,
            (_, MpegLayer::Layer1) => 3,
            (_, _) => 4,
        };
        let bitrate = MP3_BITRATES_KBPS[table][bitrate_index] * 1000;

        let version_row = match version {
            MpegVersion::Mpeg1 => 0,
            MpegVersion::Mpeg2 => 1,
            MpegVersion::Mpeg25 => 2,
        };
        let sample_rate = MP3_SAMPLE_RATES[version_row][rate_index];
        if sample_rate == 0 || bitrate == 0 {
            return Err(FlvError::InvalidAudioFormat(data[2]));
        }

        let samples_per_frame = match (version, layer) {
            (_, MpegLayer::Layer1) => 384,
            (_, MpegLayer::Layer2) => 1152,
            (MpegVersion::Mpeg1, MpegLayer::Layer3) => 1152,
            (_, MpegLayer::Layer3) => 576,
        };

        // Layer I counts in 4-byte slots; II/III in bytes.
        let frame_size = match layer {
            MpegLayer::Layer1 => (12 * bitrate / sample_rate + padding as u32) * 4,
            _ => samples_per_frame / 8 * bitrate / sample_rate + padding as u32,
        };

        let channels = if channel_mode == 3 { 1 } else { 2 };

        Ok(Self {
            version,
            layer,
            bitrate,
            sample_rate,
            padding,
            channels,
            frame_size,
            samples_per_frame,
        })
    }
}
