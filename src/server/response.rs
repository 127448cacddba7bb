use crate::header::HeaderCollection;
use crate::status::reason_phrase;
use crate::util::{append_number, ascii_eq_ignore_case, contains_token, trim_ascii, LengthChecker};
use crate::HttpVersion;

/// Negotiated state of the response being sent.
#[derive(Debug)]
pub(crate) struct ResponseState {
    pub status: u16,
    /// `None` when the length is unknown.
    pub content_length: Option<u64>,
    pub sent: Option<LengthChecker>,
    pub unbounded_sent: u64,
    pub keep_alive: bool,
    pub chunked: bool,
}

impl Default for ResponseState {
    fn default() -> Self {
        ResponseState {
            status: 0,
            content_length: None,
            sent: None,
            unbounded_sent: 0,
            keep_alive: false,
            chunked: false,
        }
    }
}

impl ResponseState {
    pub fn content_bytes_sent(&self) -> u64 {
        match &self.sent {
            Some(c) => c.handled(),
            None => self.unbounded_sent,
        }
    }
}

/// Whether the client asked for the connection to be kept.
///
/// HTTP/1.1 keeps alive unless told `close`, HTTP/1.0 only with an explicit
/// `keep-alive`.
pub(crate) fn client_wants_keep_alive(version: HttpVersion, connection: Option<&[u8]>) -> bool {
    match version {
        HttpVersion::Http11 => !connection.map_or(false, |v| contains_token(v, b"close")),
        HttpVersion::Http10 => connection.map_or(false, |v| contains_token(v, b"keep-alive")),
    }
}

/// Write status line and headers for a response.
///
/// `Content-Length`, `Content-Type`, `Connection` and `Transfer-Encoding` in
/// `headers` are not copied verbatim. They feed the negotiation and are
/// written back by this function. `body_len` overrides any
/// `Content-Length` the caller gave.
pub(crate) fn write_head(
    out: &mut Vec<u8>,
    version: HttpVersion,
    client_keep_alive: bool,
    status: u16,
    headers: &HeaderCollection<'_>,
    body_len: Option<u64>,
) -> ResponseState {
    let (status, reason) = match reason_phrase(status) {
        Some(r) => (status, r),
        None => {
            warn!("Unknown status code {}, sending 500", status);
            (500, "Internal Server Error")
        }
    };

    let mut content_length = body_len;
    let mut content_type: Option<&[u8]> = None;
    let mut handler_close = false;
    let mut want_chunked = false;

    out.extend_from_slice(version.as_str().as_bytes());
    out.push(b' ');
    append_number(out, status);
    out.push(b' ');
    out.extend_from_slice(reason.as_bytes());
    out.extend_from_slice(b"\r\n");

    for h in headers.iter() {
        if h.is("content-length") {
            if body_len.is_none() {
                content_length = parse_length(h.value());
                if content_length.is_none() {
                    warn!(
                        "Invalid Content-Length header: {:?}",
                        String::from_utf8_lossy(h.value())
                    );
                }
            }
        } else if h.is("content-type") {
            content_type = Some(h.value());
        } else if h.is("connection") {
            if ascii_eq_ignore_case(trim_ascii(h.value()), b"close") {
                handler_close = true;
            }
        } else if h.is("transfer-encoding") {
            if contains_token(h.value(), b"chunked") {
                want_chunked = true;
            }
        } else {
            out.extend_from_slice(h.field());
            out.extend_from_slice(b": ");
            out.extend_from_slice(h.value());
            out.extend_from_slice(b"\r\n");
        }
    }

    let chunked = want_chunked && version == HttpVersion::Http11 && content_length.is_none();

    let keep_alive =
        client_keep_alive && (content_length.is_some() || chunked) && !handler_close;

    if let Some(len) = content_length {
        out.extend_from_slice(b"Content-Length: ");
        append_number(out, len);
        out.extend_from_slice(b"\r\n");
    }

    match content_type {
        Some(v) => {
            out.extend_from_slice(b"Content-Type: ");
            out.extend_from_slice(v);
            out.extend_from_slice(b"\r\n");
        }
        None if content_length != Some(0) => {
            out.extend_from_slice(b"Content-Type: text/plain\r\n");
        }
        None => {}
    }

    if version == HttpVersion::Http10 || !keep_alive {
        if keep_alive {
            out.extend_from_slice(b"Connection: keep-alive\r\n");
        } else {
            out.extend_from_slice(b"Connection: close\r\n");
        }
    }

    if chunked {
        out.extend_from_slice(b"Transfer-Encoding: chunked\r\n");
    }

    out.extend_from_slice(b"\r\n");

    ResponseState {
        status,
        content_length,
        sent: content_length.map(LengthChecker::new),
        unbounded_sent: 0,
        keep_alive,
        chunked,
    }
}

/// The head of a protocol error response. The connection closes after it.
pub(crate) fn write_error_head(out: &mut Vec<u8>, status: u16) {
    let reason = reason_phrase(status).unwrap_or("Internal Server Error");
    out.extend_from_slice(b"HTTP/1.0 ");
    append_number(out, status);
    out.push(b' ');
    out.extend_from_slice(reason.as_bytes());
    out.extend_from_slice(b"\r\nConnection: close\r\n\r\n");
}

fn parse_length(v: &[u8]) -> Option<u64> {
    std::str::from_utf8(trim_ascii(v)).ok()?.parse().ok()
}
