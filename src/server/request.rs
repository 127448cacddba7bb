use std::str;

use crate::parser::RequestParser;
use crate::span::Span;
use crate::util::{ascii_eq_ignore_case, percent_decode_str};
use crate::HttpVersion;

/// Borrowed view of the request currently held by a connection.
///
/// All slices point into the connection's receive buffer.
#[derive(Clone, Copy)]
pub struct Request<'a> {
    buf: &'a [u8],
    parser: &'a RequestParser,
    content: Span,
}

impl<'a> Request<'a> {
    pub(crate) fn new(buf: &'a [u8], parser: &'a RequestParser, content: Span) -> Self {
        Request {
            buf,
            parser,
            content,
        }
    }

    pub fn method(&self) -> &'a [u8] {
        self.parser.method().slice(self.buf)
    }

    pub fn method_str(&self) -> &'a str {
        str::from_utf8(self.method()).unwrap_or("")
    }

    pub fn is_method(&self, method: &str) -> bool {
        ascii_eq_ignore_case(self.method(), method.as_bytes())
    }

    pub fn uri(&self) -> &'a [u8] {
        self.parser.uri().slice(self.buf)
    }

    pub fn path(&self) -> &'a [u8] {
        self.parser.path().slice(self.buf)
    }

    pub fn query(&self) -> &'a [u8] {
        self.parser.query().slice(self.buf)
    }

    pub fn fragment(&self) -> &'a [u8] {
        self.parser.fragment().slice(self.buf)
    }

    pub fn uri_decoded(&self) -> String {
        percent_decode_str(self.uri(), false)
    }

    pub fn path_decoded(&self) -> String {
        percent_decode_str(self.path(), false)
    }

    pub fn query_decoded(&self) -> String {
        percent_decode_str(self.query(), false)
    }

    pub fn fragment_decoded(&self) -> String {
        percent_decode_str(self.fragment(), false)
    }

    pub fn version(&self) -> HttpVersion {
        self.parser.version().unwrap_or_default()
    }

    pub fn content(&self) -> &'a [u8] {
        self.content.slice(self.buf)
    }

    pub fn headers(&self) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        let buf = self.buf;
        let parser: &'a RequestParser = self.parser;
        parser
            .headers()
            .iter()
            .map(move |(f, v)| (f.slice(buf), v.slice(buf)))
    }

    /// First value of header `field`.
    pub fn header(&self, field: &str) -> Option<&'a [u8]> {
        self.headers()
            .find(|(f, _)| ascii_eq_ignore_case(f, field.as_bytes()))
            .map(|(_, v)| v)
    }

    pub fn header_str(&self, field: &str) -> Option<&'a str> {
        self.header(field).and_then(|v| str::from_utf8(v).ok())
    }
}

/// Parse `key=value&key2=value2` pairs, appending to `into`.
///
/// Keys and values are percent decoded, with `+` as space. A pair without
/// `=` gets an empty value. Empty pairs are skipped.
pub(crate) fn parse_params(input: &[u8], into: &mut Vec<(String, String)>) {
    for pair in input.split(|c| *c == b'&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.iter().position(|c| *c == b'=') {
            Some(n) => (&pair[..n], &pair[n + 1..]),
            None => (pair, &b""[..]),
        };
        into.push((percent_decode_str(key, true), percent_decode_str(value, true)));
    }
}
