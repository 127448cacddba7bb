use std::collections::VecDeque;
use std::io;
use std::mem;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::header::HeaderCollection;
use crate::url::Url;
use crate::util::contains_token;
use crate::HttpVersion;

use super::decode::Gunzip;
use super::request::{write_request, ClientRequest};
use super::response::{ResponseParser, Step};
use super::socket::{Socket, TcpSocket};
use super::ClientConfig;

/// Notifications from [`HttpClient`], drained with [`HttpClient::poll_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// Status line and headers are parsed.
    HeadersCompleted,
    /// More content is available through [`HttpClient::consume_content`].
    ContentReadyRead,
    /// The request is over, successfully or with [`HttpClient::error`] set.
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    ResponseInvalid(String),

    #[error("remote host closed the connection")]
    RemoteHostClosed,

    #[error("request aborted")]
    Aborted,

    #[error("bad url: {0}")]
    BadUrl(String),
}

/// HTTP/1.1 client for one request at a time, reusing the connection when
/// the server allows it.
///
/// The client never reads by itself. Whoever owns the socket feeds bytes
/// with [`receive`](Self::receive), and reports the end of the stream or
/// errors with [`end_of_stream`](Self::end_of_stream) and
/// [`socket_error`](Self::socket_error). [`fetch`](super::fetch) is a
/// blocking driver doing exactly that.
pub struct HttpClient<S: Socket = TcpSocket> {
    socket: S,
    config: ClientConfig,
    proxy: Option<(String, u16)>,

    connected_to: Option<(String, u16)>,
    reusable: bool,
    last_response_at: Option<Instant>,

    request: Option<ClientRequest>,
    request_buf: Vec<u8>,
    pending: bool,

    parser: ResponseParser,
    gunzip: Option<Gunzip>,
    scratch: Vec<u8>,
    content: Vec<u8>,

    error: Option<ClientError>,
    events: VecDeque<ClientEvent>,
}

impl HttpClient<TcpSocket> {
    pub fn tcp(config: ClientConfig) -> Self {
        HttpClient::new(TcpSocket::with_timeout(config.io_timeout), config)
    }
}

impl<S: Socket> HttpClient<S> {
    pub fn new(socket: S, config: ClientConfig) -> Self {
        HttpClient {
            socket,
            config,
            proxy: None,
            connected_to: None,
            reusable: false,
            last_response_at: None,
            request: None,
            request_buf: Vec::new(),
            pending: false,
            parser: ResponseParser::new(),
            gunzip: None,
            scratch: Vec::new(),
            content: Vec::new(),
            error: None,
            events: VecDeque::new(),
        }
    }

    /// Route requests through an HTTP proxy.
    pub fn set_proxy(&mut self, proxy: Option<(String, u16)>) {
        if self.proxy != proxy {
            self.socket.disconnect();
            self.connected_to = None;
        }
        self.proxy = proxy;
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    pub fn socket_mut(&mut self) -> &mut S {
        &mut self.socket
    }

    pub fn get(&mut self, url: &str) {
        self.request(ClientRequest::get(url));
    }

    pub fn head(&mut self, url: &str) {
        self.request(ClientRequest::head(url));
    }

    pub fn post(&mut self, url: &str, body: impl Into<Vec<u8>>) {
        self.request(ClientRequest::post(url, body));
    }

    pub fn put(&mut self, url: &str, body: impl Into<Vec<u8>>) {
        self.request(ClientRequest::put(url, body));
    }

    pub fn delete(&mut self, url: &str) {
        self.request(ClientRequest::delete(url));
    }

    /// Send a request. Only one can be outstanding.
    pub fn request(&mut self, request: ClientRequest) {
        if self.pending {
            warn!("request() while a response is pending, ignored");
            return;
        }

        self.error = None;
        self.content.clear();
        self.gunzip = None;
        self.parser.reset(false);

        let url = match Url::parse_str(&request.url) {
            Ok(v) => v,
            Err(e) => return self.fail_immediately(request, ClientError::BadUrl(e.to_string())),
        };

        if url.scheme() != "http" {
            let reason = format!("unsupported scheme: {}", url.scheme());
            return self.fail_immediately(request, ClientError::BadUrl(reason));
        }

        let target = match &self.proxy {
            Some(proxy) => proxy.clone(),
            None => (url.hostname().to_string(), url.port_or_default()),
        };

        self.request_buf.clear();
        write_request(&mut self.request_buf, &request, &url, self.proxy.is_some());
        self.parser.reset(request.is_head());

        debug!("{} {}", request.method, request.url);
        self.request = Some(request);
        self.pending = true;

        let reuse = self.can_reuse(&target);

        if reuse {
            trace!("Reusing connection");
        } else if let Err(e) = self.connect(target.clone()) {
            return self.socket_error(e);
        }

        let buf = mem::take(&mut self.request_buf);
        let mut result = self.socket.write(&buf);

        if result.is_err() && reuse {
            // A kept-alive connection may have been dropped by the server while idle.
            debug!("Write on reused connection failed, reconnecting");
            result = self.connect(target).and_then(|_| self.socket.write(&buf));
        }

        self.request_buf = buf;

        if let Err(e) = result {
            self.socket_error(e);
        }
    }

    fn can_reuse(&self, target: &(String, u16)) -> bool {
        if !self.reusable || !self.socket.is_connected() {
            return false;
        }
        if self.connected_to.as_ref() != Some(target) {
            return false;
        }
        match self.config.keep_alive_timeout {
            None => true,
            Some(timeout) => self
                .last_response_at
                .map(|at| at.elapsed() < timeout)
                .unwrap_or(false),
        }
    }

    fn connect(&mut self, target: (String, u16)) -> io::Result<()> {
        self.socket.disconnect();
        self.connected_to = None;
        self.reusable = false;
        self.socket.connect(&target.0, target.1)?;
        self.connected_to = Some(target);
        Ok(())
    }

    fn fail_immediately(&mut self, request: ClientRequest, error: ClientError) {
        warn!("Request to {} failed: {}", request.url, error);
        self.request = Some(request);
        self.pending = true;
        self.fail(error);
    }

    /// Feed bytes read from the socket.
    pub fn receive(&mut self, data: &[u8]) {
        if !self.pending {
            debug!("Ignoring {} bytes with no request pending", data.len());
            return;
        }

        self.parser.push(data);
        let mut ready = false;

        loop {
            self.scratch.clear();
            let step = self.parser.advance(&mut self.scratch);

            if !self.scratch.is_empty() {
                match self.gunzip.as_mut() {
                    Some(g) => g.decode(&self.scratch, &mut self.content),
                    None => self.content.extend_from_slice(&self.scratch),
                }
                ready = true;
            }

            match step {
                Ok(Step::NeedMore) => break,
                Ok(Step::Content) => continue,
                Ok(Step::Headers) => {
                    if self.is_gzip() {
                        trace!("Content is gzip encoded");
                        self.gunzip = Some(Gunzip::new());
                    }
                    self.events.push_back(ClientEvent::HeadersCompleted);
                }
                Ok(Step::Complete) => {
                    self.complete(ready);
                    return;
                }
                Err(e) => {
                    if ready {
                        self.events.push_back(ClientEvent::ContentReadyRead);
                    }
                    self.fail(ClientError::ResponseInvalid(e.to_string()));
                    return;
                }
            }
        }

        if ready {
            self.events.push_back(ClientEvent::ContentReadyRead);
        }
    }

    /// The socket reached end of stream.
    pub fn end_of_stream(&mut self) {
        if !self.pending {
            trace!("Idle connection closed by peer");
            self.socket.disconnect();
            self.connected_to = None;
            return;
        }

        if self.parser.finish_eof() {
            self.complete(false);
        } else {
            self.fail(ClientError::RemoteHostClosed);
        }
    }

    pub fn socket_error(&mut self, error: io::Error) {
        if !self.pending {
            debug!("Socket error with no request pending: {}", error);
            self.socket.disconnect();
            self.connected_to = None;
            return;
        }

        let error = match error.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => ClientError::RemoteHostClosed,
            _ => ClientError::Network(error.to_string()),
        };

        self.fail(error);
    }

    /// Cancel the outstanding request.
    pub fn abort(&mut self) {
        self.socket.disconnect();
        self.connected_to = None;
        self.reusable = false;

        if self.pending {
            self.error = Some(ClientError::Aborted);
            self.pending = false;
            self.events.push_back(ClientEvent::Finished);
        }
    }

    fn complete(&mut self, ready: bool) {
        let mut ready = ready;
        if let Some(g) = self.gunzip.as_mut() {
            let before = self.content.len();
            g.finish(&mut self.content);
            ready |= self.content.len() > before;
        }
        if ready {
            self.events.push_back(ClientEvent::ContentReadyRead);
        }

        self.pending = false;
        self.last_response_at = Some(Instant::now());
        self.reusable = self.response_keep_alive()
            && !self.parser.is_close_delimited()
            && self.config.keep_alive_timeout != Some(Duration::ZERO);

        if !self.reusable {
            trace!("Connection not reusable, disconnecting");
            self.socket.disconnect();
            self.connected_to = None;
        }

        debug!("Finished {} {}", self.parser.status(), self.parser.reason());
        self.events.push_back(ClientEvent::Finished);
    }

    fn fail(&mut self, error: ClientError) {
        debug!("Request failed: {}", error);
        self.socket.disconnect();
        self.connected_to = None;
        self.reusable = false;
        self.error = Some(error);
        self.pending = false;
        self.events.push_back(ClientEvent::Finished);
    }

    fn response_keep_alive(&self) -> bool {
        let connection = self.parser.headers().get("connection");
        match self.parser.version() {
            HttpVersion::Http11 => !connection.map(|v| contains_token(v, b"close")).unwrap_or(false),
            HttpVersion::Http10 => connection.map(|v| contains_token(v, b"keep-alive")).unwrap_or(false),
        }
    }

    fn is_gzip(&self) -> bool {
        self.parser
            .headers()
            .get("content-encoding")
            .map(|v| contains_token(v, b"gzip"))
            .unwrap_or(false)
    }

    /// Whether the driver should keep reading from the socket.
    ///
    /// With a read buffer limit configured, reading pauses while that much
    /// unconsumed content is buffered.
    pub fn wants_read(&self) -> bool {
        self.pending
            && self
                .config
                .read_buffer_size
                .map(|max| self.content.len() < max)
                .unwrap_or(true)
    }

    pub fn poll_event(&mut self) -> Option<ClientEvent> {
        self.events.pop_front()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn error(&self) -> Option<&ClientError> {
        self.error.as_ref()
    }

    /// The request most recently sent.
    pub fn current_request(&self) -> Option<&ClientRequest> {
        self.request.as_ref()
    }

    /// Status code, 0 before the headers arrive.
    pub fn status_code(&self) -> u16 {
        self.parser.status()
    }

    pub fn reason(&self) -> &str {
        self.parser.reason()
    }

    pub fn version(&self) -> HttpVersion {
        self.parser.version()
    }

    pub fn headers(&self) -> &HeaderCollection<'static> {
        self.parser.headers()
    }

    pub fn has_headers(&self) -> bool {
        self.parser.has_headers()
    }

    /// Content received and not yet consumed.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn consume_content(&mut self) -> Vec<u8> {
        mem::take(&mut self.content)
    }

    pub fn redirected(&self) -> bool {
        self.error.is_none() && matches!(self.parser.status(), 300 | 301 | 302 | 303 | 307 | 308)
    }

    pub fn redirection_location(&self) -> Option<&str> {
        if !self.redirected() {
            return None;
        }
        self.parser.headers().get_str("location")
    }

    /// Reissue the last request against the redirect location.
    ///
    /// A 303 turns the request into a bodyless GET. Returns false if there
    /// is nothing to follow.
    pub fn follow_redirection(&mut self) -> bool {
        if self.pending {
            warn!("follow_redirection() while a response is pending, ignored");
            return false;
        }

        let location = match self.redirection_location() {
            Some(v) => v.to_string(),
            None => {
                warn!("No redirection to follow");
                return false;
            }
        };

        let mut next = match self.request.clone() {
            Some(v) => v,
            None => return false,
        };

        next.url = match Url::parse_str(&next.url) {
            Ok(base) => base.join(&location),
            Err(_) => location,
        };

        if self.parser.status() == 303 && !next.is_head() {
            next.method = "GET".into();
            next.body.clear();
        }

        debug!("Redirect to {}", next.url);
        self.request(next);
        true
    }
}
