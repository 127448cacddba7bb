use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::header::HeaderCollection;

use super::connection::{Connection, RequestSummary, State};
use super::transport::{TcpTransport, Transport};

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Message(String),

    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Answers requests on a [`Connection`].
///
/// `handle` returns `Ok(true)` when the request was taken care of, and
/// `Ok(false)` to let the next handler in the chain try.
pub trait Handler<T: Transport = TcpTransport>: Send + Sync {
    fn handle(&self, connection: &mut Connection<T>) -> Result<bool, HandlerError>;

    /// Called for every completed request on connections served by the chain.
    fn request_completed(&self, _summary: &RequestSummary) {}
}

/// Ordered list of handlers, tried in turn until one takes the request.
///
/// Errors and panics from a handler stop here: the peer gets a 500 if no
/// response was started, otherwise the connection is closed.
pub struct HandlerChain<T: Transport = TcpTransport> {
    handlers: Vec<Box<dyn Handler<T>>>,
}

impl<T: Transport> HandlerChain<T> {
    pub fn new() -> Self {
        HandlerChain { handlers: vec![] }
    }

    pub fn with(mut self, handler: impl Handler<T> + 'static) -> Self {
        self.push(handler);
        self
    }

    pub fn push(&mut self, handler: impl Handler<T> + 'static) {
        self.handlers.push(Box::new(handler));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the request through the chain. Returns false if no handler took it.
    pub fn handle(&self, connection: &mut Connection<T>) -> bool {
        for handler in &self.handlers {
            let result = catch_unwind(AssertUnwindSafe(|| handler.handle(connection)));

            match result {
                Ok(Ok(true)) => return true,
                Ok(Ok(false)) => continue,
                Ok(Err(e)) => {
                    warn!("Handler failed: {}", e);
                }
                Err(panic) => {
                    let msg = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown".into());
                    warn!("Handler panicked: {}", msg);
                }
            }

            match connection.state() {
                State::SendingHeaders => {
                    connection.write_response(500, &HeaderCollection::new(), b"");
                }
                State::SendingContent => connection.close(),
                // The response was already completed.
                _ => {}
            }
            return true;
        }

        false
    }

    pub fn request_completed(&self, summary: &RequestSummary) {
        for handler in &self.handlers {
            handler.request_completed(summary);
        }
    }
}

impl<T: Transport> Default for HandlerChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Answers every request with 404.
#[derive(Debug, Default)]
pub struct NotFoundHandler;

impl<T: Transport> Handler<T> for NotFoundHandler {
    fn handle(&self, connection: &mut Connection<T>) -> Result<bool, HandlerError> {
        let body = format!(
            "The requested resource '{}' does not exist on this server",
            connection.request().path_decoded()
        );
        connection.write_response_string(404, &HeaderCollection::new(), &body);
        Ok(true)
    }
}

/// Answers every request with the same response.
#[derive(Debug, Clone)]
pub struct FixedHandler {
    status: u16,
    headers: HeaderCollection<'static>,
    content: Vec<u8>,
}

impl FixedHandler {
    pub fn new(status: u16, headers: HeaderCollection<'static>, content: impl Into<Vec<u8>>) -> Self {
        FixedHandler {
            status,
            headers,
            content: content.into(),
        }
    }
}

impl<T: Transport> Handler<T> for FixedHandler {
    fn handle(&self, connection: &mut Connection<T>) -> Result<bool, HandlerError> {
        connection.write_response(self.status, &self.headers, &self.content);
        Ok(true)
    }
}

/// Wraps a closure as a handler.
pub struct FunctionHandler<F>(pub F);

impl<T, F> Handler<T> for FunctionHandler<F>
where
    T: Transport,
    F: Fn(&mut Connection<T>) -> Result<bool, HandlerError> + Send + Sync,
{
    fn handle(&self, connection: &mut Connection<T>) -> Result<bool, HandlerError> {
        (self.0)(connection)
    }
}

/// Logs completed requests in common log format. Never takes a request.
#[derive(Debug, Default)]
pub struct LogHandler;

impl LogHandler {
    pub fn format(summary: &RequestSummary, now: DateTime<Local>) -> String {
        let remote = summary
            .remote
            .map(|a| a.ip().to_string())
            .unwrap_or_else(|| "-".into());

        format!(
            "{} - - [{}] \"{} {} {}\" {} {} {}ms",
            remote,
            now.format("%d/%b/%Y:%H:%M:%S %z"),
            summary.method,
            summary.uri,
            summary.version.as_str(),
            summary.status,
            summary.content_bytes,
            summary.elapsed.as_millis()
        )
    }
}

impl<T: Transport> Handler<T> for LogHandler {
    fn handle(&self, _connection: &mut Connection<T>) -> Result<bool, HandlerError> {
        Ok(false)
    }

    fn request_completed(&self, summary: &RequestSummary) {
        info!("{}", Self::format(summary, Local::now()));
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;
    use crate::server::{Event, MemoryTransport, ServerConfig};
    use crate::HttpVersion;

    fn ready(input: &[u8]) -> Connection<MemoryTransport> {
        let mut conn = Connection::new(ServerConfig::default());
        conn.initialize(MemoryTransport::new());
        conn.receive(input);
        assert_eq!(conn.poll_event(), Some(Event::RequestReady));
        conn
    }

    fn output(conn: &Connection<MemoryTransport>) -> String {
        String::from_utf8_lossy(conn.transport().unwrap().output()).into_owned()
    }

    #[test]
    fn chain_falls_through_to_not_found() {
        let chain: HandlerChain<MemoryTransport> = HandlerChain::new()
            .with(LogHandler)
            .with(FunctionHandler(
                |c: &mut Connection<MemoryTransport>| -> Result<bool, HandlerError> {
                    Ok(c.request().path() == b"/mine")
                },
            ))
            .with(NotFoundHandler);

        let mut conn = ready(b"GET /other HTTP/1.1\r\n\r\n");
        assert!(chain.handle(&mut conn));
        let out = output(&conn);
        assert!(out.starts_with("HTTP/1.1 404 Not Found\r\n"), "{}", out);
        assert!(out.ends_with("The requested resource '/other' does not exist on this server"));
    }

    #[test]
    fn empty_chain_does_not_handle() {
        let chain: HandlerChain<MemoryTransport> = HandlerChain::new();
        let mut conn = ready(b"GET / HTTP/1.1\r\n\r\n");
        assert!(!chain.handle(&mut conn));
        assert_eq!(conn.state(), State::SendingHeaders);
    }

    #[test]
    fn fixed_response() {
        let chain: HandlerChain<MemoryTransport> = HandlerChain::new().with(FixedHandler::new(
            201,
            HeaderCollection::new().with("X-Fixed", "1"),
            "made",
        ));
        let mut conn = ready(b"POST / HTTP/1.1\r\nContent-Length: 0\r\n\r\n");
        assert!(chain.handle(&mut conn));
        assert_eq!(
            output(&conn),
            "HTTP/1.1 201 Created\r\nX-Fixed: 1\r\nContent-Length: 4\r\nContent-Type: text/plain\r\n\r\nmade"
        );
    }

    #[test]
    fn error_becomes_500() {
        let chain: HandlerChain<MemoryTransport> =
            HandlerChain::new().with(FunctionHandler(
                |_: &mut Connection<MemoryTransport>| -> Result<bool, HandlerError> {
                    Err(HandlerError::Message("boom".into()))
                },
            ));
        let mut conn = ready(b"GET / HTTP/1.1\r\n\r\n");
        assert!(chain.handle(&mut conn));
        assert!(output(&conn).starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[test]
    fn panic_becomes_500() {
        let chain: HandlerChain<MemoryTransport> =
            HandlerChain::new().with(FunctionHandler(
                |_: &mut Connection<MemoryTransport>| -> Result<bool, HandlerError> {
                    panic!("handler bug");
                },
            ));
        let mut conn = ready(b"GET / HTTP/1.1\r\n\r\n");
        assert!(chain.handle(&mut conn));
        assert!(output(&conn).starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[test]
    fn failure_after_headers_closes() {
        let chain: HandlerChain<MemoryTransport> =
            HandlerChain::new().with(FunctionHandler(
                |c: &mut Connection<MemoryTransport>| -> Result<bool, HandlerError> {
                    c.write_headers(200, &HeaderCollection::new().with("Content-Length", "10"));
                    c.write_content(b"half");
                    Err(HandlerError::Message("lost upstream".into()))
                },
            ));
        let mut conn = ready(b"GET / HTTP/1.1\r\n\r\n");
        assert!(chain.handle(&mut conn));
        assert_eq!(conn.state(), State::Closed);
        assert!(conn.transport().unwrap().is_closed());
    }

    #[test]
    fn failure_after_complete_response_keeps_connection() {
        let chain: HandlerChain<MemoryTransport> =
            HandlerChain::new().with(FunctionHandler(
                |c: &mut Connection<MemoryTransport>| -> Result<bool, HandlerError> {
                    c.write_response(200, &HeaderCollection::new(), b"done");
                    Err(HandlerError::Message("cleanup failed".into()))
                },
            ));
        let mut conn = ready(b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n");
        assert!(chain.handle(&mut conn));

        assert_eq!(conn.state(), State::SendingHeaders);
        assert!(!conn.transport().unwrap().is_closed());
        assert_eq!(conn.request().path(), b"/b");
    }

    #[test]
    fn log_line_format() {
        let summary = RequestSummary {
            remote: Some("10.0.0.1:5555".parse().unwrap()),
            method: "POST".into(),
            uri: "/doload".into(),
            version: HttpVersion::Http11,
            status: 200,
            content_bytes: 1234,
            elapsed: Duration::from_millis(42),
        };
        let now = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let line = LogHandler::format(&summary, now);
        assert!(line.starts_with("10.0.0.1 - - [05/Mar/2024:14:07:09 "), "{}", line);
        assert!(line.ends_with("] \"POST /doload HTTP/1.1\" 200 1234 42ms"), "{}", line);
    }
}
