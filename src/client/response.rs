use crate::body::BodyReader;
use crate::header::{Header, HeaderCollection};
use crate::{Error, HttpVersion};

use super::MAX_RESPONSE_HEADERS;

#[derive(Debug)]
enum Phase {
    Head,
    Body(BodyReader),
    Done,
}

/// Progress made by [`ResponseParser::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    NeedMore,
    Headers,
    Content,
    Complete,
}

/// Incremental response parser. Owns the unconsumed input.
#[derive(Debug)]
pub(crate) struct ResponseParser {
    buf: Vec<u8>,
    phase: Phase,
    is_head: bool,
    version: HttpVersion,
    status: u16,
    reason: String,
    headers: HeaderCollection<'static>,
}

impl ResponseParser {
    pub fn new() -> Self {
        ResponseParser {
            buf: Vec::new(),
            phase: Phase::Head,
            is_head: false,
            version: HttpVersion::Http11,
            status: 0,
            reason: String::new(),
            headers: HeaderCollection::new(),
        }
    }

    /// Re-arm for a new response.
    pub fn reset(&mut self, is_head: bool) {
        self.buf.clear();
        self.phase = Phase::Head;
        self.is_head = is_head;
        self.version = HttpVersion::Http11;
        self.status = 0;
        self.reason.clear();
        self.headers.clear();
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Parse what is buffered. Decoded body bytes are appended to `out`.
    pub fn advance(&mut self, out: &mut Vec<u8>) -> Result<Step, Error> {
        match &mut self.phase {
            Phase::Head => self.parse_head(),
            Phase::Body(reader) => {
                if !reader.is_ended() {
                    let used = reader.read(&self.buf, out)?;
                    self.buf.drain(..used);

                    if !reader.is_ended() {
                        return Ok(if used == 0 { Step::NeedMore } else { Step::Content });
                    }
                }
                trace!("Response body complete");
                self.phase = Phase::Done;
                Ok(Step::Complete)
            }
            Phase::Done => Ok(Step::Complete),
        }
    }

    fn parse_head(&mut self) -> Result<Step, Error> {
        loop {
            let mut headers = [httparse::EMPTY_HEADER; MAX_RESPONSE_HEADERS];
            let mut res = httparse::Response::new(&mut headers);

            let n = match res.parse(&self.buf)? {
                httparse::Status::Complete(n) => n,
                httparse::Status::Partial => return Ok(Step::NeedMore),
            };

            let status = res.code.ok_or(Error::ResponseInvalidStatus)?;
            let version = match res.version {
                Some(0) => HttpVersion::Http10,
                Some(1) => HttpVersion::Http11,
                _ => return Err(Error::UnsupportedVersion),
            };

            if status == 100 {
                trace!("Skipping 100 Continue");
                self.buf.drain(..n);
                continue;
            }

            self.reason = res.reason.unwrap_or("").to_string();
            self.headers = res
                .headers
                .iter()
                .map(|h| Header::new(h.name.as_bytes().to_vec(), h.value.to_vec()))
                .collect();

            self.buf.drain(..n);
            self.status = status;
            self.version = version;

            let reader = BodyReader::for_response(version, self.is_head, status, &self.headers)?;
            trace!("Response {} body {:?}", status, reader);
            self.phase = Phase::Body(reader);

            return Ok(Step::Headers);
        }
    }

    /// The peer closed. True if that legitimately ends the response.
    pub fn finish_eof(&mut self) -> bool {
        match &self.phase {
            Phase::Body(r) if r.is_close_delimited() => {
                self.phase = Phase::Done;
                true
            }
            Phase::Done => true,
            _ => false,
        }
    }

    pub fn is_close_delimited(&self) -> bool {
        matches!(&self.phase, Phase::Body(r) if r.is_close_delimited())
    }

    pub fn has_headers(&self) -> bool {
        !matches!(self.phase, Phase::Head)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    pub fn headers(&self) -> &HeaderCollection<'static> {
        &self.headers
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn run(p: &mut ResponseParser, input: &[u8]) -> (Vec<Step>, Vec<u8>) {
        p.push(input);
        let mut steps = vec![];
        let mut out = vec![];
        loop {
            let s = p.advance(&mut out).unwrap();
            steps.push(s);
            if matches!(s, Step::NeedMore | Step::Complete) {
                break;
            }
        }
        (steps, out)
    }

    #[test]
    fn length_delimited() {
        let mut p = ResponseParser::new();
        let (steps, out) = run(
            &mut p,
            b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nX-A: b\r\n\r\nhello",
        );
        assert_eq!(steps, vec![Step::Headers, Step::Content, Step::Complete]);
        assert_eq!(out, b"hello");
        assert_eq!(p.status(), 200);
        assert_eq!(p.reason(), "OK");
        assert_eq!(p.headers().get_str("x-a"), Some("b"));
    }

    #[test]
    fn skips_100_continue() {
        let mut p = ResponseParser::new();
        let (steps, _) = run(
            &mut p,
            b"HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 204 No Content\r\n\r\n",
        );
        assert_eq!(steps, vec![Step::Headers, Step::Complete]);
        assert_eq!(p.status(), 204);
    }

    #[test]
    fn chunked_in_pieces() {
        let mut p = ResponseParser::new();
        let (steps, out) = run(&mut p, b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWi");
        assert_eq!(steps.last(), Some(&Step::NeedMore));
        assert_eq!(out, b"Wi");

        let (steps, out) = run(&mut p, b"ki\r\n0\r\n\r\n");
        assert_eq!(steps.last(), Some(&Step::Complete));
        assert_eq!(out, b"ki");
    }

    #[test]
    fn head_has_no_body() {
        let mut p = ResponseParser::new();
        p.reset(true);
        let (steps, out) = run(&mut p, b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n");
        assert_eq!(steps, vec![Step::Headers, Step::Complete]);
        assert!(out.is_empty());
    }

    #[test]
    fn close_delimited_ends_on_eof() {
        let mut p = ResponseParser::new();
        let (steps, out) = run(&mut p, b"HTTP/1.0 200 OK\r\n\r\nsome");
        assert_eq!(steps, vec![Step::Headers, Step::Content, Step::NeedMore]);
        assert_eq!(out, b"some");
        assert!(p.is_close_delimited());
        assert!(p.finish_eof());
    }

    #[test]
    fn eof_in_head_is_not_a_response() {
        let mut p = ResponseParser::new();
        p.push(b"HTTP/1.1 200");
        assert_eq!(p.advance(&mut vec![]).unwrap(), Step::NeedMore);
        assert!(!p.finish_eof());
    }

    #[test]
    fn garbage_fails() {
        let mut p = ResponseParser::new();
        p.push(b"NOT HTTP AT ALL\r\n\r\n");
        assert!(p.advance(&mut vec![]).is_err());
    }
}
