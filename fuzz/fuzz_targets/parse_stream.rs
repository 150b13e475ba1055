#![no_main]

use libfuzzer_sys::fuzz_target;
use manifest_dedup::{filter_stream, FilterConfig, Stream};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if text.len() > 1_000_000 {
            return;
        }

        // The tree holds every byte of the input, valid or not.
        let parse = Stream::parse(text);
        assert_eq!(parse.tree().to_string(), text);
    }

    // Malformed input is an error, never a panic.
    let mut output = Vec::new();
    if filter_stream(data, &mut output, &FilterConfig::preserving()).is_ok() {
        let _ = filter_stream(&output[..], &mut Vec::new(), &FilterConfig::default());
    }
});
