use std::io::Write;

use flate2::write::GzDecoder;

/// Streaming gzip decoding of response content.
///
/// If the stream turns out not to be gzip, the rest passes through as is.
pub(crate) struct Gunzip {
    inner: GzDecoder<Vec<u8>>,
    failed: bool,
}

impl Gunzip {
    pub fn new() -> Self {
        Gunzip {
            inner: GzDecoder::new(Vec::new()),
            failed: false,
        }
    }

    pub fn decode(&mut self, data: &[u8], out: &mut Vec<u8>) {
        if self.failed {
            out.extend_from_slice(data);
            return;
        }

        let result = self.inner.write_all(data);
        out.append(self.inner.get_mut());

        if let Err(e) = result {
            warn!("gzip decoding failed, passing content through: {}", e);
            self.failed = true;
            out.extend_from_slice(data);
        }
    }

    pub fn finish(&mut self, out: &mut Vec<u8>) {
        if self.failed {
            return;
        }
        if let Err(e) = self.inner.try_finish() {
            warn!("gzip stream ended early: {}", e);
        }
        out.append(self.inner.get_mut());
    }
}
