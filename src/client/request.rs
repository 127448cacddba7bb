use crate::header::{HeaderBytes, HeaderCollection};
use crate::url::Url;
use crate::util::append_number;

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRequest {
    pub method: String,
    pub url: String,
    pub headers: HeaderCollection<'static>,
    pub body: Vec<u8>,
}

impl ClientRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        ClientRequest {
            method: method.into(),
            url: url.into(),
            headers: HeaderCollection::new(),
            body: vec![],
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new("HEAD", url)
    }

    pub fn post(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::new("POST", url).with_body(body)
    }

    pub fn put(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::new("PUT", url).with_body(body)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new("DELETE", url)
    }

    pub fn header<F, V>(mut self, field: F, value: V) -> Self
    where
        F: Into<HeaderBytes<'static>>,
        V: Into<HeaderBytes<'static>>,
    {
        self.headers.push(field, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_head(&self) -> bool {
        self.method.eq_ignore_ascii_case("HEAD")
    }
}

/// Serialize `request` for the wire.
///
/// With `absolute_form` the request target is the full URL, as HTTP proxies
/// expect.
pub(crate) fn write_request(out: &mut Vec<u8>, request: &ClientRequest, url: &Url<'_>, absolute_form: bool) {
    out.extend_from_slice(request.method.as_bytes());
    out.push(b' ');
    if absolute_form {
        out.extend_from_slice(url.as_str().split('#').next().unwrap_or("").as_bytes());
    } else {
        out.extend_from_slice(url.request_target().as_bytes());
    }
    out.extend_from_slice(b" HTTP/1.1\r\nHost: ");
    out.extend_from_slice(url.hostname().as_bytes());
    let port = url.port_or_default();
    if port != 80 {
        out.push(b':');
        append_number(out, port);
    }
    out.extend_from_slice(b"\r\n");

    for h in request.headers.iter() {
        if h.is("host") || h.is("content-length") {
            continue;
        }
        out.extend_from_slice(h.field());
        out.extend_from_slice(b": ");
        out.extend_from_slice(h.value());
        out.extend_from_slice(b"\r\n");
    }

    if !request.body.is_empty() {
        out.extend_from_slice(b"Content-Length: ");
        append_number(out, request.body.len());
        out.extend_from_slice(b"\r\n");
    }

    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&request.body);
}
