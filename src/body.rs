use crate::chunk::Dechunker;
use crate::header::HeaderCollection;
use crate::util::contains_token;
use crate::{Error, HttpVersion};

/// How the end of a response body is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyReader {
    /// No body is expected either due to the status or method.
    NoBody,
    /// Delimited by content-length.
    /// The value is what's left to receive.
    LengthDelimited(u64),
    /// Chunked transfer encoding
    Chunked(Dechunker),
    /// Expect remote to close at end of body.
    CloseDelimited,
}

impl BodyReader {
    pub fn for_response(
        version: HttpVersion,
        is_head: bool,
        status_code: u16,
        headers: &HeaderCollection<'_>,
    ) -> Result<Self, Error> {
        let is_informational = (100..=199).contains(&status_code);

        // HEAD responses, 1xx, 204 and 304 never carry a body, regardless
        // of what the headers say.
        let has_no_body = is_head || is_informational || matches!(status_code, 204 | 304);

        if has_no_body {
            return Ok(Self::NoBody);
        }

        let chunked = headers
            .get_all("transfer-encoding")
            .any(|v| contains_token(v, b"chunked"));

        // Transfer-Encoding wins over Content-Length.
        if chunked && version == HttpVersion::Http11 {
            return Ok(Self::Chunked(Dechunker::new()));
        }

        let mut lengths = headers.get_all("content-length");

        if let Some(value) = lengths.next() {
            if lengths.next().is_some() {
                return Err(Error::TooManyContentLengthHeaders);
            }
            let v = std::str::from_utf8(value)
                .ok()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .ok_or(Error::BadContentLengthHeader)?;
            return Ok(Self::LengthDelimited(v));
        }

        Ok(Self::CloseDelimited)
    }

    /// Move body bytes from `src` to `dst`. Returns how much of `src` was used.
    pub fn read(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<usize, Error> {
        let used = match self {
            BodyReader::NoBody => 0,
            BodyReader::LengthDelimited(left) => {
                let left_usize = (*left).min(usize::MAX as u64) as usize;
                let to_read = src.len().min(left_usize);
                dst.extend_from_slice(&src[..to_read]);
                *left -= to_read as u64;
                to_read
            }
            BodyReader::Chunked(dechunker) => {
                let used = dechunker.parse_input(src, dst)?;
                trace!("Read chunked: {}", used);
                used
            }
            BodyReader::CloseDelimited => {
                dst.extend_from_slice(src);
                src.len()
            }
        };

        Ok(used)
    }

    pub fn is_ended(&self) -> bool {
        match self {
            BodyReader::NoBody => true,
            BodyReader::LengthDelimited(v) => *v == 0,
            BodyReader::Chunked(v) => v.is_ended(),
            BodyReader::CloseDelimited => false,
        }
    }

    pub fn is_close_delimited(&self) -> bool {
        matches!(self, BodyReader::CloseDelimited)
    }
}
