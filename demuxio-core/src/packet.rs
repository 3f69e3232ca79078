//! Packet abstractions for demuxed access units.
//!
//! A packet is one codec-ready access unit pulled out of a container: the
//! payload bytes plus the timing and keyframe information the consumer
//! needs to schedule it.

use crate::timestamp::{Duration, TimeBase, Timestamp};
use bitflags::bitflags;
use std::borrow::Cow;
use std::fmt;

bitflags! {
    /// Flags for packet properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PacketFlags: u32 {
        /// This packet contains a keyframe (sync sample).
        const KEYFRAME = 0x0001;
        /// This packet carries codec configuration rather than a frame.
        const CONFIG = 0x0002;
        /// Packet data is suspect (recovered after a resynchronization).
        const CORRUPT = 0x0004;
    }
}

/// An encoded media packet.
///
/// Packets can own their data or borrow it (zero-copy within a parse pass).
#[derive(Clone)]
pub struct Packet<'a> {
    /// The packet data.
    data: Cow<'a, [u8]>,
    /// Presentation timestamp.
    pub pts: Timestamp,
    /// Decode timestamp.
    pub dts: Timestamp,
    /// Duration of the packet.
    pub duration: Duration,
    /// Stream index this packet belongs to.
    pub stream_index: u32,
    /// Packet flags.
    pub flags: PacketFlags,
    /// Byte position in the input stream.
    pub pos: Option<u64>,
    /// The originally requested seek position, echoed on packets emitted
    /// after a seek so downstream A/V sync can line both tracks up on it.
    pub seek_target: Option<Timestamp>,
}

impl<'a> Packet<'a> {
    /// Create a new packet with owned data.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Cow::Owned(data),
            pts: Timestamp::none(),
            dts: Timestamp::none(),
            duration: Duration::zero(),
            stream_index: 0,
            flags: PacketFlags::empty(),
            pos: None,
            seek_target: None,
        }
    }

    /// Create a new packet referencing external data.
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self {
            data: Cow::Borrowed(data),
            pts: Timestamp::none(),
            dts: Timestamp::none(),
            duration: Duration::zero(),
            stream_index: 0,
            flags: PacketFlags::empty(),
            pos: None,
            seek_target: None,
        }
    }

    /// Create an empty packet.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Get the packet data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the size of the packet data.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Check if this packet is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if this is a keyframe packet.
    pub fn is_keyframe(&self) -> bool {
        self.flags.contains(PacketFlags::KEYFRAME)
    }

    /// Set the keyframe flag.
    pub fn set_keyframe(&mut self, keyframe: bool) {
        if keyframe {
            self.flags.insert(PacketFlags::KEYFRAME);
        } else {
            self.flags.remove(PacketFlags::KEYFRAME);
        }
    }

    /// Check if this packet carries codec configuration.
    pub fn is_config(&self) -> bool {
        self.flags.contains(PacketFlags::CONFIG)
    }

    /// Make the packet own its data.
    pub fn into_owned(self) -> Packet<'static> {
        Packet {
            data: Cow::Owned(self.data.into_owned()),
            pts: self.pts,
            dts: self.dts,
            duration: self.duration,
            stream_index: self.stream_index,
            flags: self.flags,
            pos: self.pos,
            seek_target: self.seek_target,
        }
    }

    /// Rescale timestamps to a new time base.
    pub fn rescale(&mut self, target: TimeBase) {
        self.pts = self.pts.rescale(target);
        self.dts = self.dts.rescale(target);
        self.duration = self.duration.rescale(target);
        if let Some(st) = self.seek_target {
            self.seek_target = Some(st.rescale(target));
        }
    }

    /// Builder: set pts and dts.
    pub fn with_timestamps(mut self, pts: Timestamp, dts: Timestamp) -> Self {
        self.pts = pts;
        self.dts = dts;
        self
    }

    /// Builder: set the stream index.
    pub fn with_stream_index(mut self, index: u32) -> Self {
        self.stream_index = index;
        self
    }

    /// Builder: set the flags.
    pub fn with_flags(mut self, flags: PacketFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Builder: set the seek-target annotation.
    pub fn with_seek_target(mut self, target: Option<Timestamp>) -> Self {
        self.seek_target = target;
        self
    }
}

impl fmt::Debug for Packet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("size", &self.size())
            .field("pts", &self.pts)
            .field("dts", &self.dts)
            .field("stream_index", &self.stream_index)
            .field("flags", &self.flags)
            .finish()
    }
}

impl Default for Packet<'_> {
    fn default() -> Self {
        Self::empty()
    }
}

/// An owned packet suitable for storage across calls.
pub type OwnedPacket = Packet<'static>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_creation() {
        let packet = Packet::new(vec![0u8; 100]);
        assert_eq!(packet.size(), 100);
        assert!(!packet.is_empty());
    }

    #[test]
    fn test_packet_from_slice() {
        let data = [1u8, 2, 3, 4, 5];
        let packet = Packet::from_slice(&data);
        assert_eq!(packet.data(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_packet_keyframe() {
        let mut packet = Packet::empty();
        assert!(!packet.is_keyframe());
        packet.set_keyframe(true);
        assert!(packet.is_keyframe());
    }

    #[test]
    fn test_packet_into_owned() {
        let data = [1u8, 2, 3];
        let packet = Packet::from_slice(&data);
        let owned: Packet<'static> = packet.into_owned();
        assert_eq!(owned.data(), &[1, 2, 3]);
    }

    #[test]
    fn test_packet_rescale_carries_seek_target() {
        let mut packet = Packet::empty()
            .with_timestamps(Timestamp::from_millis(40), Timestamp::from_millis(40))
            .with_seek_target(Some(Timestamp::from_millis(5000)));
        packet.rescale(TimeBase::MICROSECONDS);

        assert_eq!(packet.pts.value, 40_000);
        assert_eq!(packet.seek_target.unwrap().value, 5_000_000);
    }
}
