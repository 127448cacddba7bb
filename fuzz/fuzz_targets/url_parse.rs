#![no_main]

use libfuzzer_sys::fuzz_target;
use pillow::Url;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(url) = Url::parse_str(s) {
            let _ = url.join("../x?y#z");
        }
    }
});
