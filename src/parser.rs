//! Incremental request line and header parser.
//!
//! The parser never copies the bytes it is fed. Everything it finds is
//! recorded as a [`Span`] into the caller's buffer, and parsing stops
//! exactly at the end of the header block so the caller can treat whatever
//! follows as content (or the next pipelined request).

use crate::span::Span;
use crate::HttpVersion;

/// Max number of headers accepted in a request.
pub const MAX_REQUEST_HEADERS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Status {
    #[default]
    Parsing,
    Finished,
    Failed,
}

#[derive(Debug, Default)]
pub struct RequestParser {
    status: Status,
    error: Option<String>,
    method: Span,
    uri: Span,
    path: Span,
    query: Span,
    fragment: Span,
    version: Option<HttpVersion>,
    headers: Vec<(Span, Span)>,
    header_end: usize,
}

impl RequestParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a new request. Keeps the header allocation.
    pub fn init(&mut self) {
        self.status = Status::Parsing;
        self.error = None;
        self.method = Span::default();
        self.uri = Span::default();
        self.path = Span::default();
        self.query = Span::default();
        self.fragment = Span::default();
        self.version = None;
        self.headers.clear();
        self.header_end = 0;
    }

    /// Feed the whole buffer received so far.
    ///
    /// `consumed` is what the previous call returned (0 on first call). The
    /// return value is the new consumed total. Once finished, it is the exact
    /// length of the request line plus header block.
    pub fn execute(&mut self, buf: &[u8], consumed: usize) -> usize {
        self.execute_with(buf, consumed, |_, _| {})
    }

    /// Like [`RequestParser::execute`], calling `on_field` once per header
    /// when the header block is complete.
    pub fn execute_with<F>(&mut self, buf: &[u8], consumed: usize, mut on_field: F) -> usize
    where
        F: FnMut(&[u8], &[u8]),
    {
        match self.status {
            Status::Finished => return self.header_end,
            Status::Failed => return consumed,
            Status::Parsing => {}
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_REQUEST_HEADERS];
        let mut req = httparse::Request::new(&mut headers);

        let n = match req.parse(buf) {
            Ok(httparse::Status::Complete(n)) => n,
            Ok(httparse::Status::Partial) => return buf.len(),
            Err(e) => {
                self.fail(e.to_string());
                return consumed;
            }
        };

        let (Some(method), Some(uri), Some(version)) = (req.method, req.path, req.version) else {
            self.fail("incomplete request line".into());
            return consumed;
        };

        self.version = Some(match version {
            0 => HttpVersion::Http10,
            1 => HttpVersion::Http11,
            _ => {
                self.fail("unsupported http version".into());
                return consumed;
            }
        });

        self.method = Span::within(buf, method.as_bytes());
        self.uri = Span::within(buf, uri.as_bytes());

        let (path, query, fragment) = split_uri(uri.as_bytes());
        self.path = self.uri.sub(path.0, path.1);
        self.query = self.uri.sub(query.0, query.1);
        self.fragment = self.uri.sub(fragment.0, fragment.1);

        for h in req.headers.iter() {
            let field = Span::within(buf, h.name.as_bytes());
            let value = Span::within(buf, h.value);
            on_field(h.name.as_bytes(), h.value);
            self.headers.push((field, value));
        }

        trace!("Parsed request head: {} bytes, {} headers", n, self.headers.len());

        self.header_end = n;
        self.status = Status::Finished;

        n
    }

    fn fail(&mut self, reason: String) {
        debug!("Request parse failed: {}", reason);
        self.error = Some(reason);
        self.status = Status::Failed;
    }

    pub fn has_error(&self) -> bool {
        self.status == Status::Failed
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.status == Status::Finished
    }

    pub fn method(&self) -> Span {
        self.method
    }

    pub fn uri(&self) -> Span {
        self.uri
    }

    pub fn path(&self) -> Span {
        self.path
    }

    pub fn query(&self) -> Span {
        self.query
    }

    pub fn fragment(&self) -> Span {
        self.fragment
    }

    pub fn version(&self) -> Option<HttpVersion> {
        self.version
    }

    pub fn headers(&self) -> &[(Span, Span)] {
        &self.headers
    }

    /// Length of the request line and headers, including the blank line.
    pub fn header_end(&self) -> usize {
        self.header_end
    }
}

/// Split a request target into (offset, len) of path, query and fragment.
///
/// Absolute-form targets (`http://host/path`) have the authority skipped.
fn split_uri(uri: &[u8]) -> ((usize, usize), (usize, usize), (usize, usize)) {
    let hash = uri.iter().position(|c| *c == b'#');
    let before_hash = hash.unwrap_or(uri.len());
    let q = uri[..before_hash].iter().position(|c| *c == b'?');
    let path_end = q.unwrap_or(before_hash);

    let mut path_start = 0;
    if uri.first() != Some(&b'/') {
        if let Some(p) = uri[..path_end].windows(3).position(|w| w == b"://") {
            let authority = p + 3;
            path_start = uri[authority..path_end]
                .iter()
                .position(|c| *c == b'/')
                .map(|n| n + authority)
                .unwrap_or(path_end);
        }
    }

    let path = (path_start, path_end - path_start);
    let query = match q {
        Some(q) => (q + 1, before_hash - q - 1),
        None => (before_hash, 0),
    };
    let fragment = match hash {
        Some(h) => (h + 1, uri.len() - h - 1),
        None => (uri.len(), 0),
    };

    (path, query, fragment)
}

#[cfg(test)]
mod test {
    use super::*;

    const REQUEST: &[u8] = b"\
        POST /doload?url=x&a=%20b#frag HTTP/1.1\r\n\
        Host: localhost:8000\r\n\
        Content-Length: 5\r\n\
        X-Multi: 1\r\n\
        X-Multi: 2\r\n\
        \r\n\
        hello";

    fn head_len() -> usize {
        REQUEST.len() - 5
    }

    #[test]
    fn parse_complete_request() {
        let mut p = RequestParser::new();
        let n = p.execute(REQUEST, 0);

        assert!(p.is_finished());
        assert!(!p.has_error());
        assert_eq!(n, head_len());
        assert_eq!(p.method().slice(REQUEST), b"POST");
        assert_eq!(p.uri().slice(REQUEST), b"/doload?url=x&a=%20b#frag");
        assert_eq!(p.path().slice(REQUEST), b"/doload");
        assert_eq!(p.query().slice(REQUEST), b"url=x&a=%20b");
        assert_eq!(p.fragment().slice(REQUEST), b"frag");
        assert_eq!(p.version(), Some(HttpVersion::Http11));
        assert_eq!(p.headers().len(), 4);

        let (f, v) = p.headers()[1];
        assert_eq!(f.slice(REQUEST), b"Content-Length");
        assert_eq!(v.slice(REQUEST), b"5");
    }

    #[test]
    fn streaming_equals_oneshot() {
        let mut oneshot = RequestParser::new();
        oneshot.execute(REQUEST, 0);

        // Every split point, fed as two reads.
        for i in 0..head_len() {
            let mut p = RequestParser::new();
            let consumed = p.execute(&REQUEST[..i], 0);
            assert!(!p.is_finished(), "finished early at {}", i);
            assert!(!p.has_error());

            let n = p.execute(REQUEST, consumed);
            assert!(p.is_finished());
            assert_eq!(n, head_len());
            assert_eq!(p.method(), oneshot.method());
            assert_eq!(p.uri(), oneshot.uri());
            assert_eq!(p.query(), oneshot.query());
            assert_eq!(p.headers(), oneshot.headers());
        }
    }

    #[test]
    fn byte_by_byte() {
        let mut p = RequestParser::new();
        let mut consumed = 0;
        for i in 1..=REQUEST.len() {
            consumed = p.execute(&REQUEST[..i], consumed);
            if p.is_finished() {
                break;
            }
        }
        assert!(p.is_finished());
        assert_eq!(consumed, head_len());
    }

    #[test]
    fn field_callback_sees_every_header() {
        let mut p = RequestParser::new();
        let mut fields = vec![];
        p.execute_with(REQUEST, 0, |f, v| fields.push((f.to_vec(), v.to_vec())));
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[2], (b"X-Multi".to_vec(), b"1".to_vec()));
    }

    #[test]
    fn garbage_is_an_error() {
        let mut p = RequestParser::new();
        p.execute(b"GET / HTTP/1.1\r\nBad Header\r\n\r\n", 0);
        assert!(p.has_error());
        assert!(p.error().is_some());
        assert!(!p.is_finished());
    }

    #[test]
    fn bad_token_fails_before_blank_line() {
        let mut p = RequestParser::new();
        p.execute(b"G@T / HTTP/1.1\r\n", 0);
        assert!(p.has_error());

        let mut p = RequestParser::new();
        p.execute(b"\x16\x03\x01\x02\x00\x01\x00\x01\xfc\x03\x03", 0);
        assert!(p.has_error());
    }

    #[test]
    fn init_resets() {
        let mut p = RequestParser::new();
        p.execute(b"\x01\x02\r\n\r\n", 0);
        assert!(p.has_error());
        p.init();
        assert!(!p.has_error());
        p.execute(b"GET / HTTP/1.0\r\n\r\n", 0);
        assert!(p.is_finished());
        assert_eq!(p.version(), Some(HttpVersion::Http10));
        assert!(p.query().is_empty());
    }

    #[test]
    fn lf_only_terminator() {
        let mut p = RequestParser::new();
        let n = p.execute(b"GET /x HTTP/1.1\nHost: a\n\nrest", 0);
        assert!(p.is_finished());
        assert_eq!(n, 25);
    }

    #[test]
    fn absolute_form_target() {
        let buf = b"GET http://example.test:8080/a/b?c=d HTTP/1.1\r\n\r\n";
        let mut p = RequestParser::new();
        p.execute(buf, 0);
        assert_eq!(p.path().slice(buf), b"/a/b");
        assert_eq!(p.query().slice(buf), b"c=d");
    }

    #[test]
    fn split_uri_forms() {
        assert_eq!(split_uri(b"/"), ((0, 1), (1, 0), (1, 0)));
        assert_eq!(split_uri(b"/a?"), ((0, 2), (3, 0), (3, 0)));
        assert_eq!(split_uri(b"/a#x?y"), ((0, 2), (2, 0), (3, 3)));
        assert_eq!(split_uri(b"http://h"), ((8, 0), (8, 0), (8, 0)));
    }
}
