#![no_main]

//! Fuzz target for the whole demuxer: open, enumerate streams, pull
//! packets, seek, pull again. Must never panic or loop forever.

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

use demuxio_containers::Demuxer;
use demuxio_flv::FlvDemuxer;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1 << 20 {
        return;
    }

    let Ok(mut demuxer) = FlvDemuxer::new(Cursor::new(data.to_vec())) else {
        return;
    };

    for i in 0..demuxer.num_streams() {
        let _ = demuxer.stream_info(i);
    }
    let _ = demuxer.container_info();
    let _ = demuxer.flags();

    for _ in 0..64 {
        match demuxer.read_packet() {
            Ok(Some(_)) => {}
            _ => break,
        }
    }

    let _ = demuxer.seek_ms(5_000);
    for _ in 0..16 {
        match demuxer.read_packet() {
            Ok(Some(_)) => {}
            _ => break,
        }
    }
});
