//! HTTP/1.x server
//!
//! A [`Connection`] is a state machine over one transport. It is fed bytes
//! with [`Connection::receive`] and reports what happened through
//! [`Event`]s, which the embedding loop drains with
//! [`Connection::poll_event`].
//!
//! The states are:
//!
//! * **ReceivingHeaders** - Parse request line and headers. Malformed or
//!   oversized requests get a `400` and the connection closes.
//! * **ReceivingContent** - Collect `Content-Length` bytes of content. A
//!   length over the limit gets a `413` without waiting for the content.
//! * **SendingHeaders** - Waiting for a handler to call `write_headers` or
//!   `write_response`.
//! * **SendingContent** - Stream content with `write_content` and, for
//!   unknown lengths, `end_content`.
//! * **Completed** - Either back to receiving (keep-alive) or on to closing.
//! * **Flushing** - Waiting for the transport to write everything.
//! * **Closed** - Terminal until the connection is initialized again.
//!
//! ```text
//!        ┌──────────────────┐
//!  ┌────▶│ ReceivingHeaders │─────────────────┐
//!  │     └──────────────────┘                 │
//!  │               │                          │
//!  │               ▼                          │
//!  │     ┌──────────────────┐                 │
//!  │     │ ReceivingContent │─────────────────┤
//!  │     └──────────────────┘                 │
//!  │               │                          │
//!  │               ▼                          │
//!  │     ┌──────────────────┐                 │
//!  │     │  SendingHeaders  │                 │
//!  │     └──────────────────┘                 │
//!  │               │                          │ 400/413
//!  │               ▼                          │
//!  │     ┌──────────────────┐                 │
//!  │     │  SendingContent  │                 │
//!  │     └──────────────────┘                 │
//!  │               │                          │
//!  │               ▼                          ▼
//!  │     ┌──────────────────┐       ┌──────────────────┐
//!  └─────│    Completed     │──────▶│     Flushing     │
//! keep-  └──────────────────┘       └──────────────────┘
//! alive                                       │
//!                                             ▼
//!                                   ┌──────────────────┐
//!                                   │      Closed      │
//!                                   └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use pillow::server::{Connection, Event, MemoryTransport, ServerConfig, State};
//! use pillow::HeaderCollection;
//!
//! let mut conn: Connection<MemoryTransport> = Connection::new(ServerConfig::default());
//! conn.initialize(MemoryTransport::new());
//!
//! conn.receive(b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n");
//! assert_eq!(conn.poll_event(), Some(Event::RequestReady));
//! assert_eq!(conn.request().path(), b"/hello");
//!
//! conn.write_response(200, &HeaderCollection::new(), b"hi");
//!
//! // keep-alive, ready for the next request
//! assert_eq!(conn.state(), State::ReceivingHeaders);
//!
//! let output = conn.transport().unwrap().output();
//! assert_eq!(
//!     output,
//!     b"HTTP/1.1 200 OK\r\n\
//!       Content-Length: 2\r\n\
//!       Content-Type: text/plain\r\n\
//!       \r\n\
//!       hi"
//! );
//! ```

mod connection;
pub use connection::{Connection, Event, RequestSummary, State};

mod request;
pub use request::Request;

mod response;

mod transport;
pub use transport::{MemoryTransport, TcpTransport, Transport};

mod handler;
pub use handler::{
    FixedHandler, FunctionHandler, Handler, HandlerChain, HandlerError, LogHandler,
    NotFoundHandler,
};

mod pool;
pub use pool::ConnectionPool;

mod listener;
pub use listener::{serve_connection, Acceptor, Server, TcpAcceptor};

#[cfg(test)]
mod test;

/// Limits and sizes for server connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Max size of request line plus headers. Larger requests get a 400.
    pub max_header_length: usize,
    /// Max request content length. Larger requests get a 413.
    pub max_content_length: u64,
    /// Number of idle connections kept for reuse.
    pub pool_size: usize,
    /// Size of each socket read.
    pub read_chunk_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            max_header_length: 32 * 1024,
            max_content_length: 128 * 1024 * 1024,
            pool_size: 25,
            read_chunk_size: 16 * 1024,
        }
    }
}
