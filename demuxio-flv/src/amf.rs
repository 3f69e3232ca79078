//! AMF0 parsing and encoding for FLV script data.
//!
//! AMF (Action Message Format) is the tag-length-value serialization FLV
//! uses for script tags, in particular the `onMetaData` event. Parsing
//! produces an [`AmfValue`] tree; mapping the tree onto typed metadata
//! fields is a separate pass in `metadata.rs`, so structural correctness
//! and field semantics stay decoupled.
//!
//! ## Supported types
//!
//! Number (f64), Boolean, String (short and long), Object, ECMA Array,
//! Strict Array, Date, Null, Undefined. Any other marker aborts the
//! parse; the demuxer treats an aborted metadata parse as "no metadata"
//! and synthesizes seek data instead.

use crate::error::{FlvError, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::collections::HashMap;
use std::io::{Read, Write};

/// Nesting depth cap for the recursive parser.
pub const MAX_AMF_DEPTH: u32 = 32;

/// AMF0 type markers.
pub mod markers {
    /// Number type (f64, big-endian IEEE 754).
    pub const NUMBER: u8 = 0x00;
    /// Boolean type.
    pub const BOOLEAN: u8 = 0x01;
    /// String type (2-byte length prefix).
    pub const STRING: u8 = 0x02;
    /// Object type.
    pub const OBJECT: u8 = 0x03;
    /// Null type.
    pub const NULL: u8 = 0x05;
    /// Undefined type.
    pub const UNDEFINED: u8 = 0x06;
    /// ECMA Array type (count-prefixed associative array).
    pub const ECMA_ARRAY: u8 = 0x08;
    /// Object end marker.
    pub const OBJECT_END: u8 = 0x09;
    /// Strict Array type (count-prefixed, no keys).
    pub const STRICT_ARRAY: u8 = 0x0A;
    /// Date type.
    pub const DATE: u8 = 0x0B;
    /// Long String type (4-byte length prefix).
    pub const LONG_STRING: u8 = 0x0C;
}

/// AMF0 value.
#[derive(Debug, Clone, PartialEq)]
pub enum AmfValue {
    /// Number (f64).
    Number(f64),
    /// Boolean.
    Boolean(bool),
    /// String.
    String(String),
    /// Object (key-value pairs).
    Object(HashMap<String, AmfValue>),
    /// Null.
    Null,
    /// Undefined.
    Undefined,
    /// ECMA Array (associative array).
    EcmaArray(HashMap<String, AmfValue>),
    /// Strict Array (indexed array).
    StrictArray(Vec<AmfValue>),
    /// Date (milliseconds since epoch + timezone offset).
    Date {
        /// Milliseconds since Unix epoch.
        milliseconds: f64,
        /// Timezone offset in minutes.
        timezone: i16,
    },
}

impl AmfValue {
    /// Get as a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as a boolean.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as an object or ECMA array.
    pub fn as_object(&self) -> Option<&HashMap<String, AmfValue>> {
        match self {
            Self::Object(o) | Self::EcmaArray(o) => Some(o),
            _ => None,
        }
    }

    /// Get as a strict array.
    pub fn as_array(&self) -> Option<&[AmfValue]> {
        match self {
            Self::StrictArray(a) => Some(a),
            _ => None,
        }
    }

    /// Parse an AMF0 value from a reader.
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        Self::parse_at_depth(reader, 0)
    }

    fn parse_at_depth<R: Read>(reader: &mut R, depth: u32) -> Result<Self> {
        if depth > MAX_AMF_DEPTH {
            return Err(FlvError::AmfTooDeep(depth));
        }

        let marker = reader.read_u8()?;

        match marker {
            markers::NUMBER => {
                let value = reader.read_f64::<BigEndian>()?;
                Ok(Self::Number(value))
            }
            markers::BOOLEAN => {
                let value = reader.read_u8()? != 0;
                Ok(Self::Boolean(value))
            }
            markers::STRING => {
                let value = read_string(reader)?;
                Ok(Self::String(value))
            }
            markers::OBJECT => {
                let properties = read_object_properties(reader, depth)?;
                Ok(Self::Object(properties))
            }
            markers::NULL => Ok(Self::Null),
            markers::UNDEFINED => Ok(Self::Undefined),
            markers::ECMA_ARRAY => {
                // The count prefix is advisory; the body is still
                // terminated by the end marker.
                let _count = reader.read_u32::<BigEndian>()?;
                let properties = read_object_properties(reader, depth)?;
                Ok(Self::EcmaArray(properties))
            }
            markers::STRICT_ARRAY => {
                let count = reader.read_u32::<BigEndian>()? as usize;
                let mut values = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    values.push(Self::parse_at_depth(reader, depth + 1)?);
                }
                Ok(Self::StrictArray(values))
            }
            markers::DATE => {
                let milliseconds = reader.read_f64::<BigEndian>()?;
                let timezone = reader.read_i16::<BigEndian>()?;
                Ok(Self::Date {
                    milliseconds,
                    timezone,
                })
            }
            markers::LONG_STRING => {
                let value = read_long_string(reader)?;
                Ok(Self::String(value))
            }
            _ => Err(FlvError::InvalidAmfType(marker)),
        }
    }

    /// Write an AMF0 value to a writer.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<usize> {
        match self {
            Self::Number(value) => {
                writer.write_u8(markers::NUMBER)?;
                writer.write_f64::<BigEndian>(*value)?;
                Ok(9)
            }
            Self::Boolean(value) => {
                writer.write_u8(markers::BOOLEAN)?;
                writer.write_u8(if *value { 1 } else { 0 })?;
                Ok(2)
            }
            Self::String(value) => {
                if value.len() > 65535 {
                    writer.write_u8(markers::LONG_STRING)?;
                    writer.write_u32::<BigEndian>(value.len() as u32)?;
                    writer.write_all(value.as_bytes())?;
                    Ok(5 + value.len())
                } else {
                    writer.write_u8(markers::STRING)?;
                    write_string(writer, value)?;
                    Ok(3 + value.len())
                }
            }
            Self::Object(properties) => {
                writer.write_u8(markers::OBJECT)?;
                let size = write_object_properties(writer, properties)?;
                Ok(1 + size)
            }
            Self::Null => {
                writer.write_u8(markers::NULL)?;
                Ok(1)
            }
            Self::Undefined => {
                writer.write_u8(markers::UNDEFINED)?;
                Ok(1)
            }
            Self::EcmaArray(properties) => {
                writer.write_u8(markers::ECMA_ARRAY)?;
                writer.write_u32::<BigEndian>(properties.len() as u32)?;
                let size = write_object_properties(writer, properties)?;
                Ok(5 + size)
            }
            Self::StrictArray(values) => {
                writer.write_u8(markers::STRICT_ARRAY)?;
                writer.write_u32::<BigEndian>(values.len() as u32)?;
                let mut size = 5;
                for value in values {
                    size += value.write(writer)?;
                }
                Ok(size)
            }
            Self::Date {
                milliseconds,
                timezone,
            } => {
                writer.write_u8(markers::DATE)?;
                writer.write_f64::<BigEndian>(*milliseconds)?;
                writer.write_i16::<BigEndian>(*timezone)?;
                Ok(11)
            }
        }
    }
}

/// Read a short string (2-byte length prefix).
fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let length = reader.read_u16::<BigEndian>()? as usize;
    let mut buffer = vec![0u8; length];
    reader.read_exact(&mut buffer)?;
    String::from_utf8(buffer).map_err(|e| FlvError::InvalidAmf(format!("Invalid UTF-8: {}", e)))
}

/// Read a long string (4-byte length prefix).
///
/// AMF data lives inside a tag payload, so the length can never exceed
/// the tag payload maximum; larger claims are malformed.
fn read_long_string<R: Read>(reader: &mut R) -> Result<String> {
    let length = reader.read_u32::<BigEndian>()? as usize;
    if length > crate::tag::MAX_TAG_DATA_SIZE as usize {
        return Err(FlvError::InvalidAmf(format!(
            "long string of {} bytes cannot fit a tag",
            length
        )));
    }
    let mut buffer = vec![0u8; length];
    reader.read_exact(&mut buffer)?;
    String::from_utf8(buffer).map_err(|e| FlvError::InvalidAmf(format!("Invalid UTF-8: {}", e)))
}

/// Write a short string.
fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<usize> {
    if value.len() > 65535 {
        return Err(FlvError::InvalidAmf(format!(
            "string too long for short form: {} bytes",
            value.len()
        )));
    }
    writer.write_u16::<BigEndian>(value.len() as u16)?;
    writer.write_all(value.as_bytes())?;
    Ok(2 + value.len())
}

/// Read object properties until the end marker.
fn read_object_properties<R: Read>(
    reader: &mut R,
    depth: u32,
) -> Result<HashMap<String, AmfValue>> {
    let mut properties = HashMap::new();

    loop {
        let key = read_string(reader)?;
        if key.is_empty() {
            let end_marker = reader.read_u8()?;
            if end_marker != markers::OBJECT_END {
                return Err(FlvError::InvalidAmf(
                    "Expected object end marker".to_string(),
                ));
            }
            break;
        }

        let value = AmfValue::parse_at_depth(reader, depth + 1)?;
        properties.insert(key, value);
    }

    Ok(properties)
}

/// Write object properties with the end marker.
fn write_object_properties<W: Write>(
    writer: &mut W,
    properties: &HashMap<String, AmfValue>,
) -> Result<usize> {
    let mut size = 0;

    for (key, value) in properties {
        size += write_string(writer, key)?;
        size += value.write(writer)?;
    }

    writer.write_u16::<BigEndian>(0)?;
    writer.write_u8(markers::OBJECT_END)?;
    size += 3;

    Ok(size)
}

/// Parse an `onMetaData` script tag payload into its property map.
pub fn parse_on_metadata(data: &[u8]) -> Result<HashMap<String, AmfValue>> {
    let mut cursor = std::io::Cursor::new(data);

    let event = AmfValue::parse(&mut cursor)?;
    if event.as_str() != Some("onMetaData") {
        return Err(FlvError::InvalidAmf("Expected onMetaData".to_string()));
    }

    let metadata = AmfValue::parse(&mut cursor)?;

    match metadata {
        AmfValue::Object(props) | AmfValue::EcmaArray(props) => Ok(props),
        _ => Err(FlvError::InvalidAmf(
            "Expected object or ECMA array".to_string(),
        )),
    }
}

/// Builder for `onMetaData` script payloads.
///
/// Used to construct synthetic files in tests and tools; the demuxer
/// itself only reads.
#[derive(Debug, Default)]
pub struct MetadataBuilder {
    properties: HashMap<String, AmfValue>,
}

impl MetadataBuilder {
    /// Create a new metadata builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a number property.
    pub fn number(mut self, key: &str, value: f64) -> Self {
        self.properties
            .insert(key.to_string(), AmfValue::Number(value));
        self
    }

    /// Set a boolean property.
    pub fn boolean(mut self, key: &str, value: bool) -> Self {
        self.properties
            .insert(key.to_string(), AmfValue::Boolean(value));
        self
    }

    /// Set a string property.
    pub fn string(mut self, key: &str, value: &str) -> Self {
        self.properties
            .insert(key.to_string(), AmfValue::String(value.to_string()));
        self
    }

    /// Set duration in seconds.
    pub fn duration(self, seconds: f64) -> Self {
        self.number("duration", seconds)
    }

    /// Set video width.
    pub fn width(self, width: u32) -> Self {
        self.number("width", width as f64)
    }

    /// Set video height.
    pub fn height(self, height: u32) -> Self {
        self.number("height", height as f64)
    }

    /// Set video codec id.
    pub fn video_codec_id(self, codec_id: u8) -> Self {
        self.number("videocodecid", codec_id as f64)
    }

    /// Set audio codec id.
    pub fn audio_codec_id(self, codec_id: u8) -> Self {
        self.number("audiocodecid", codec_id as f64)
    }

    /// Set frame rate.
    pub fn frame_rate(self, fps: f64) -> Self {
        self.number("framerate", fps)
    }

    /// Set audio sample rate.
    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.number("audiosamplerate", rate as f64)
    }

    /// Set audio sample size.
    pub fn audio_sample_size(self, bits: u8) -> Self {
        self.number("audiosamplesize", bits as f64)
    }

    /// Set stereo flag.
    pub fn stereo(self, stereo: bool) -> Self {
        self.boolean("stereo", stereo)
    }

    /// Set file size.
    pub fn file_size(self, size: u64) -> Self {
        self.number("filesize", size as f64)
    }

    /// Set the canSeekToEnd flag.
    pub fn can_seek_to_end(self, value: bool) -> Self {
        self.boolean("canseektoend", value)
    }

    /// Set the keyframe index: parallel `filepositions` (byte offsets)
    /// and `times` (seconds) arrays under a `keyframes` object.
    pub fn keyframes(mut self, filepositions: &[f64], times: &[f64]) -> Self {
        let mut index = HashMap::new();
        index.insert(
            "filepositions".to_string(),
            AmfValue::StrictArray(filepositions.iter().map(|&v| AmfValue::Number(v)).collect()),
        );
        index.insert(
            "times".to_string(),
            AmfValue::StrictArray(times.iter().map(|&v| AmfValue::Number(v)).collect()),
        );
        self.properties
            .insert("keyframes".to_string(), AmfValue::Object(index));
        self
    }

    /// Build the metadata as an ECMA array.
    pub fn build(self) -> AmfValue {
        AmfValue::EcmaArray(self.properties)
    }

    /// Build a complete onMetaData script tag payload.
    pub fn build_script_data(self) -> Vec<u8> {
        let mut data = Vec::new();

        AmfValue::String("onMetaData".to_string())
            .write(&mut data)
            .unwrap();
        self.build().write(&mut data).unwrap();

        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(value: &AmfValue) -> AmfValue {
        let mut buffer = Vec::new();
        value.write(&mut buffer).unwrap();
        AmfValue::parse(&mut Cursor::new(&buffer)).unwrap()
    }

    #[test]
    fn test_number_roundtrip() {
        let value = AmfValue::Number(123.456);
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn test_boolean_roundtrip() {
        for &b in &[true, false] {
            let value = AmfValue::Boolean(b);
            assert_eq!(roundtrip(&value), value);
        }
    }

    #[test]
    fn test_string_roundtrip() {
        let value = AmfValue::String("Hello, World!".to_string());
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn test_strict_array_roundtrip() {
        let value = AmfValue::StrictArray(vec![
            AmfValue::Number(1.0),
            AmfValue::String("two".to_string()),
            AmfValue::Boolean(true),
        ]);
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn test_ecma_array_roundtrip() {
        let mut props = HashMap::new();
        props.insert("width".to_string(), AmfValue::Number(1920.0));
        props.insert("height".to_string(), AmfValue::Number(1080.0));

        let parsed = roundtrip(&AmfValue::EcmaArray(props));
        let obj = parsed.as_object().unwrap();
        assert_eq!(obj.get("width").unwrap().as_number(), Some(1920.0));
        assert_eq!(obj.get("height").unwrap().as_number(), Some(1080.0));
    }

    #[test]
    fn test_date_roundtrip() {
        let value = AmfValue::Date {
            milliseconds: 1609459200000.0,
            timezone: 0,
        };
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn test_unsupported_marker_fails_whole_parse() {
        // 0x0D is the "unsupported" marker.
        let data = [0x0Du8];
        let result = AmfValue::parse(&mut Cursor::new(&data));
        assert!(matches!(result, Err(FlvError::InvalidAmfType(0x0D))));
    }

    #[test]
    fn test_depth_cap() {
        // Strict arrays nested past the cap: each level is
        // marker 0x0A + count 1.
        let mut data = Vec::new();
        for _ in 0..=MAX_AMF_DEPTH {
            data.push(markers::STRICT_ARRAY);
            data.extend_from_slice(&1u32.to_be_bytes());
        }
        data.push(markers::NULL);

        let result = AmfValue::parse(&mut Cursor::new(&data));
        assert!(matches!(result, Err(FlvError::AmfTooDeep(_))));
    }

    #[test]
    fn test_metadata_builder() {
        let metadata = MetadataBuilder::new()
            .duration(60.0)
            .width(1920)
            .height(1080)
            .frame_rate(30.0)
            .build();

        let props = metadata.as_object().unwrap();
        assert_eq!(props.get("duration").unwrap().as_number(), Some(60.0));
        assert_eq!(props.get("width").unwrap().as_number(), Some(1920.0));
        assert_eq!(props.get("framerate").unwrap().as_number(), Some(30.0));
    }

    #[test]
    fn test_build_script_data() {
        let script_data = MetadataBuilder::new().duration(10.0).build_script_data();

        let metadata = parse_on_metadata(&script_data).unwrap();
        assert_eq!(metadata.get("duration").unwrap().as_number(), Some(10.0));
    }

    #[test]
    fn test_keyframes_builder() {
        let script_data = MetadataBuilder::new()
            .keyframes(&[0.0, 1000.0, 2000.0], &[0.0, 3.0, 7.0])
            .build_script_data();

        let metadata = parse_on_metadata(&script_data).unwrap();
        let keyframes = metadata.get("keyframes").unwrap().as_object().unwrap();
        let times = keyframes.get("times").unwrap().as_array().unwrap();
        assert_eq!(times.len(), 3);
        assert_eq!(times[2].as_number(), Some(7.0));
    }

    #[test]
    fn test_parse_on_metadata_rejects_other_events() {
        let mut data = Vec::new();
        AmfValue::String("onCuePoint".to_string())
            .write(&mut data)
            .unwrap();
        AmfValue::EcmaArray(HashMap::new()).write(&mut data).unwrap();

        assert!(parse_on_metadata(&data).is_err());
    }
}
