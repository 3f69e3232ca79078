#![no_main]

//! Fuzz target for FLV header and tag parsing.
//!
//! Feeds arbitrary bytes through the file-header parser, the tag-header
//! parser, and the full tag reader (trailer validation + resync path).

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

use demuxio_flv::{FlvHeader, TagHeader, TagReader};

#[derive(Arbitrary, Debug)]
struct TagInput {
    data: Vec<u8>,
    test_mode: TagTestMode,
}

#[derive(Arbitrary, Debug)]
enum TagTestMode {
    /// Parse the 9-byte file header.
    FileHeader,
    /// Parse a single 11-byte tag header.
    TagHeader,
    /// Run the full tag reader until error or end of stream.
    ReadTags,
}

fuzz_target!(|input: TagInput| {
    if input.data.len() > 1 << 20 {
        return;
    }

    match input.test_mode {
        TagTestMode::FileHeader => {
            let _ = FlvHeader::parse(&mut Cursor::new(&input.data));
        }
        TagTestMode::TagHeader => {
            let _ = TagHeader::parse(&mut Cursor::new(&input.data));
        }
        TagTestMode::ReadTags => {
            if let Ok(mut reader) = TagReader::new(Cursor::new(input.data)) {
                // Bounded: each iteration either consumes bytes or errors.
                for _ in 0..256 {
                    match reader.read_tag() {
                        Ok(Some(_)) => {}
                        _ => break,
                    }
                }
            }
        }
    }
});
