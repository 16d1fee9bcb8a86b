#![no_main]

use irqlat::trace_reader::parse_perf_line;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        // must never panic, whatever the line looks like
        let _ = parse_perf_line(line);
    }
});
