//! HTTP/1.x connection core.
//!
//! pillow is built around two state machines that do not own any I/O loop:
//!
//! * [`server::Connection`] takes bytes received from a peer, parses requests
//!   out of them without copying and writes responses through a
//!   [`server::Transport`], managing keep-alive, chunked output and
//!   pipelining.
//! * [`client::HttpClient`] writes requests to a [`client::Socket`] and
//!   parses responses fed back to it, handling connection reuse,
//!   `100 Continue`, chunked bodies and gzip.
//!
//! Both report lifecycle changes as events that the embedding loop drains.
//! A simple thread-per-connection listener ([`server::Server`]) and a
//! blocking [`client::fetch`] driver are included.

#[macro_use]
extern crate log;

mod error;
pub use error::Error;

mod chunk;
mod span;
mod util;

pub use span::Span;
pub use util::{ascii_eq_ignore_case, form_urlencode, percent_decode, percent_decode_str};

mod header;
pub use header::{Header, HeaderBytes, HeaderCollection};

mod status;
pub use status::reason_phrase;

pub mod parser;

mod body;

mod url;
pub use url::{Url, UrlError};

pub mod client;
pub mod server;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpVersion {
    Http10,
    #[default]
    Http11,
}

impl HttpVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::Http10 => "HTTP/1.0",
            HttpVersion::Http11 => "HTTP/1.1",
        }
    }
}
