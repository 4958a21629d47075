#![no_main]

use deriva::normalize::{encode_json, to_datum, NanPolicy};
use deriva::ResultsBundle;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing must never panic; anything it accepts must re-encode as JSON
        if let Ok(bundle) = ResultsBundle::from_json_str(input) {
            let datum = to_datum(&bundle).expect("bundles always lower to a tree");
            let text = encode_json(&datum, NanPolicy::NullOnEncode, false).expect("encodes");
            assert!(serde_json::from_str::<serde_json::Value>(&text).is_ok());
        }
    }
});
