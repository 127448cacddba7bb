//! HTTP/1.1 client.
//!
//! [`HttpClient`] runs one request at a time over a [`Socket`], keeping the
//! connection for the next request when the server allows it.
//!
//! ```text
//!            request()
//!   Idle ─────────────▶ Sending ─▶ AwaitingHeaders ─▶ ReadingContent
//!    ▲                                  │                  │
//!    │      Finished (error set)        │                  │ body done
//!    ├──────────────────────────────────┴──────────────────┤
//!    │                                                     ▼
//!    └──────────── keep connection if reusable ◀──────  Finished
//! ```
//!
//! The client is driven from outside: bytes read from the socket go into
//! [`HttpClient::receive`] and progress is reported as [`ClientEvent`]s.
//! [`fetch`] is a blocking driver for the common case.
//!
//! ```
//! use pillow::client::{fetch, ClientConfig, ClientRequest, HttpClient, MemorySocket};
//!
//! let mut socket = MemorySocket::new();
//! socket.push_incoming(&b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi"[..]);
//!
//! let mut client = HttpClient::new(socket, ClientConfig::default());
//! let res = fetch(&mut client, ClientRequest::get("http://example.test/"), 5).unwrap();
//!
//! assert_eq!(res.status, 200);
//! assert_eq!(res.body, b"hi");
//! ```

use std::time::Duration;

mod decode;
mod fetch;
mod http_client;
mod request;
mod response;
mod socket;

pub use fetch::{fetch, FetchedResponse};
pub use http_client::{ClientError, ClientEvent, HttpClient};
pub use request::ClientRequest;
pub use socket::{MemorySocket, Socket, TcpSocket};

#[cfg(test)]
mod test;

pub(crate) const MAX_RESPONSE_HEADERS: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// How long an idle kept-alive connection may be reused. `None` means
    /// no limit.
    pub keep_alive_timeout: Option<Duration>,

    /// Pause reading while this much unconsumed content is buffered.
    pub read_buffer_size: Option<usize>,

    /// Socket read and write timeout for [`HttpClient::tcp`].
    pub io_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            keep_alive_timeout: None,
            read_buffer_size: None,
            io_timeout: Some(Duration::from_secs(30)),
        }
    }
}
