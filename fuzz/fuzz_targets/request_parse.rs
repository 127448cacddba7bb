#![no_main]

use libfuzzer_sys::fuzz_target;
use pillow::parser::RequestParser;

fuzz_target!(|data: &[u8]| {
    let mut parser = RequestParser::new();
    let mut consumed = 0;

    // Feed in growing prefixes, as a connection would.
    for end in [data.len() / 2, data.len()] {
        consumed = parser.execute(&data[..end], consumed);
        if parser.has_error() || parser.is_finished() {
            break;
        }
    }
});
