#![no_main]

//! Fuzz target for AMF0 parsing.
//!
//! Arbitrary bytes must never panic or recurse unboundedly; valid
//! values must survive a write/parse round trip.

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

use demuxio_flv::{parse_on_metadata, AmfValue, Metadata};

fuzz_target!(|data: &[u8]| {
    if data.len() > 1 << 20 {
        return;
    }

    // Raw value parse.
    if let Ok(value) = AmfValue::parse(&mut Cursor::new(data)) {
        // Round trip what we accepted.
        let mut buf = Vec::new();
        if value.write(&mut buf).is_ok() {
            let reparsed = AmfValue::parse(&mut Cursor::new(&buf));
            assert!(reparsed.is_ok());
        }
    }

    // Full onMetaData path, including the typed mapping pass.
    if let Ok(props) = parse_on_metadata(data) {
        let _ = Metadata::from_amf(&props);
    }
});
