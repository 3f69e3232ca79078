//! Property-based tests for bitstream operations.
//!
//! Uses proptest to verify round-trip correctness of BitReader/BitWriter
//! and the emulation-prevention helpers.

use proptest::prelude::*;
use demuxio_core::bitstream::{
    add_emulation_prevention, remove_emulation_prevention, BitReader, BitWriter,
};

proptest! {
    /// Writing and reading back a byte-wide value is lossless.
    #[test]
    fn roundtrip_bits_u8(value in 0u8..=255) {
        let mut writer = BitWriter::new();
        writer.write_bits(value as u32, 8);

        let mut reader = BitReader::new(writer.data());
        prop_assert_eq!(reader.read_bits(8).unwrap() as u8, value);
    }

    /// Arbitrary bit widths round-trip.
    #[test]
    fn roundtrip_bits_variable_width(value in 0u32..=0xFFFF, width in 1u8..=16) {
        let masked = value & ((1u32 << width) - 1);

        let mut writer = BitWriter::new();
        writer.write_bits(masked, width);
        writer.align_to_byte();

        let mut reader = BitReader::new(writer.data());
        prop_assert_eq!(reader.read_bits(width).unwrap(), masked);
    }

    /// Unsigned Exp-Golomb values round-trip.
    #[test]
    fn roundtrip_ue(value in 0u32..=100_000) {
        let mut writer = BitWriter::new();
        writer.write_ue(value);
        writer.align_to_byte();

        let mut reader = BitReader::new(writer.data());
        prop_assert_eq!(reader.read_ue().unwrap(), value);
    }

    /// Signed Exp-Golomb values round-trip.
    #[test]
    fn roundtrip_se(value in -50_000i32..=50_000) {
        let mut writer = BitWriter::new();
        writer.write_se(value);
        writer.align_to_byte();

        let mut reader = BitReader::new(writer.data());
        prop_assert_eq!(reader.read_se().unwrap(), value);
    }

    /// Escaping then unescaping RBSP data is the identity.
    #[test]
    fn roundtrip_emulation_prevention(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let escaped = add_emulation_prevention(&data);
        let clean = remove_emulation_prevention(&escaped);
        prop_assert_eq!(clean, data);
    }

    /// Sequential mixed reads never panic and stop exactly at the end.
    #[test]
    fn reader_never_reads_past_end(data in proptest::collection::vec(any::<u8>(), 0..64)) {
        let mut reader = BitReader::new(&data);
        let total = data.len() * 8;
        let mut consumed = 0usize;
        while consumed + 3 <= total {
            reader.read_bits(3).unwrap();
            consumed += 3;
        }
        prop_assert!(reader.read_bits((total - consumed + 1) as u8).is_err()
            || total == consumed);
    }
}
