use std::collections::VecDeque;
use std::mem;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::chunk::{write_chunk, LAST_CHUNK};
use crate::header::HeaderCollection;
use crate::parser::RequestParser;
use crate::span::Span;
use crate::util::{ascii_eq_ignore_case, contains_token, trim_ascii};
use crate::HttpVersion;

use super::request::{parse_params, Request};
use super::response::{client_wants_keep_alive, write_error_head, write_head, ResponseState};
use super::transport::{TcpTransport, Transport};
use super::ServerConfig;

const MAX_RETAINED_HEAD_BUFFER: usize = 4096;
const MAX_RETAINED_PARAMS: usize = 16;
const CONTINUE_100: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// Lifecycle of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    ReceivingHeaders,
    ReceivingContent,
    SendingHeaders,
    SendingContent,
    Completed,
    Flushing,
    Closed,
}

/// Things the embedding loop must react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A full request is available. Hand the connection to a handler.
    RequestReady,
    /// A response has been fully written.
    RequestCompleted(RequestSummary),
    /// The connection closed. The transport stays attached until taken.
    Closed,
}

/// Taken when a request completes, before its buffers are recycled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSummary {
    pub remote: Option<SocketAddr>,
    pub method: String,
    pub uri: String,
    pub version: HttpVersion,
    pub status: u16,
    pub content_bytes: u64,
    pub elapsed: Duration,
}

/// One HTTP/1.x server connection.
///
/// Bytes from the peer go in through [`Connection::receive`]. When a request
/// is complete, [`Event::RequestReady`] is queued and the connection waits in
/// `SendingHeaders` for a handler to answer through the `write_*` methods.
/// Methods called in the wrong state log a warning and do nothing.
pub struct Connection<T = TcpTransport> {
    config: ServerConfig,
    transport: Option<T>,
    remote: Option<SocketAddr>,
    state: State,

    buf: Vec<u8>,
    parser: RequestParser,
    consumed: usize,
    content: Span,
    head_request: bool,
    started: Option<Instant>,

    params: Vec<(String, String)>,
    params_parsed: bool,

    response: ResponseState,
    head_buf: Vec<u8>,

    events: VecDeque<Event>,
}

impl<T: Transport> Connection<T> {
    pub fn new(config: ServerConfig) -> Self {
        Connection {
            config,
            transport: None,
            remote: None,
            state: State::Uninitialized,
            buf: Vec::new(),
            parser: RequestParser::new(),
            consumed: 0,
            content: Span::default(),
            head_request: false,
            started: None,
            params: Vec::new(),
            params_parsed: false,
            response: ResponseState::default(),
            head_buf: Vec::with_capacity(512),
            events: VecDeque::new(),
        }
    }

    /// Attach a transport and start receiving.
    pub fn initialize(&mut self, transport: T) {
        if !matches!(self.state, State::Uninitialized | State::Closed) {
            warn!("initialize() called in state {:?}", self.state);
            return;
        }

        self.recycle_request();
        self.buf.clear();
        self.events.clear();
        self.remote = transport.peer_addr();
        self.transport = Some(transport);
        self.state = State::ReceivingHeaders;

        trace!("Connection initialized: {:?}", self.remote);
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn poll_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn remote_address(&self) -> Option<SocketAddr> {
        self.remote
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }

    /// Remove the transport, typically after [`Event::Closed`].
    pub fn take_transport(&mut self) -> Option<T> {
        self.transport.take()
    }

    // //////////////////////////////////////////////////////////////////////////////////////////// RECEIVE

    /// Bytes arrived from the peer.
    ///
    /// Bytes arriving while a response is in progress are kept and parsed
    /// once it completes (pipelining).
    pub fn receive(&mut self, data: &[u8]) {
        if matches!(
            self.state,
            State::Uninitialized | State::Flushing | State::Closed
        ) {
            debug!(
                "Ignoring {} bytes received in state {:?}",
                data.len(),
                self.state
            );
            return;
        }

        self.buf.extend_from_slice(data);
        self.process_input();
    }

    fn process_input(&mut self) {
        loop {
            let progressed = match self.state {
                State::ReceivingHeaders => self.receive_headers(),
                State::ReceivingContent => self.receive_content(),
                _ => false,
            };
            if !progressed {
                break;
            }
        }
    }

    fn receive_headers(&mut self) -> bool {
        if self.buf.is_empty() {
            return false;
        }

        if self.started.is_none() {
            self.started = Some(Instant::now());
        }

        let buf = &self.buf;
        let mut content_length: Option<Span> = None;

        self.consumed = self.parser.execute_with(buf, self.consumed, |field, value| {
            // Cheap length test first, the compare runs for every header.
            if field.len() == 14 && ascii_eq_ignore_case(field, b"content-length") {
                content_length = Some(Span::within(buf, value));
            }
        });

        let max_header = self.config.max_header_length;

        if self.parser.has_error() {
            self.fail(400);
            return false;
        }

        if !self.parser.is_finished() {
            if self.buf.len() > max_header {
                debug!("Request header exceeds {} bytes", max_header);
                self.fail(400);
            }
            return false;
        }

        if self.consumed > max_header {
            debug!("Request header exceeds {} bytes", max_header);
            self.fail(400);
            return false;
        }

        let length = match content_length {
            None => 0,
            Some(span) => {
                let raw = trim_ascii(span.slice(&self.buf));
                let parsed = std::str::from_utf8(raw)
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok());

                match parsed {
                    None => {
                        debug!("Unparsable Content-Length");
                        self.fail(413);
                        return false;
                    }
                    Some(n) if n < 0 => {
                        debug!("Negative Content-Length: {}", n);
                        self.fail(400);
                        return false;
                    }
                    Some(n) if n as u64 > self.config.max_content_length => {
                        debug!("Content-Length {} exceeds max", n);
                        self.fail(413);
                        return false;
                    }
                    Some(n) => n as u64,
                }
            }
        };

        let request = self.request();
        let expect_continue = length > 0
            && request
                .header("expect")
                .map_or(false, |v| contains_token(v, b"100-continue"));
        let is_head = request.is_method("HEAD");
        self.head_request = is_head;

        if expect_continue {
            trace!("Sending 100 Continue");
            if !self.send(CONTINUE_100) || !self.flush_transport() {
                return false;
            }
        }

        self.content = Span::new(self.consumed, length as usize);
        self.state = State::ReceivingContent;

        trace!("Headers received, expecting {} bytes content", length);

        true
    }

    fn receive_content(&mut self) -> bool {
        if self.buf.len() >= self.content.end() {
            self.state = State::SendingHeaders;
            self.events.push_back(Event::RequestReady);
            trace!("Request ready");
        }
        // Either way, nothing more to parse until the response is done.
        false
    }

    /// Answer a broken request and close.
    fn fail(&mut self, status: u16) {
        debug!("Responding {} to bad request", status);
        self.response.status = status;
        self.head_buf.clear();
        write_error_head(&mut self.head_buf, status);
        if self.send_head() {
            self.state = State::Flushing;
            self.flush();
        }
    }

    // //////////////////////////////////////////////////////////////////////////////////////////// REQUEST

    /// View of the current request.
    ///
    /// Only meaningful from [`Event::RequestReady`] until the request
    /// completes.
    pub fn request(&self) -> Request<'_> {
        Request::new(&self.buf, &self.parser, self.content)
    }

    /// Query string params merged with form encoded content for non-GET.
    ///
    /// Parsed on first use and kept until the request completes.
    pub fn request_params(&mut self) -> &[(String, String)] {
        self.ensure_params();
        &self.params
    }

    /// Value of the first param named `name` (case insensitive).
    pub fn request_param_value(&mut self, name: &str) -> Option<&str> {
        self.ensure_params();
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace the value of param `name`, or add it.
    pub fn set_request_param(&mut self, name: &str, value: &str) {
        self.ensure_params();
        match self
            .params
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value.to_string(),
            None => self.params.push((name.to_string(), value.to_string())),
        }
    }

    fn ensure_params(&mut self) {
        if self.params_parsed {
            return;
        }
        self.params_parsed = true;
        self.params.clear();

        let request = Request::new(&self.buf, &self.parser, self.content);

        parse_params(request.query(), &mut self.params);

        let is_form = request.header("content-type").map_or(true, |v| {
            trim_ascii(v)
                .to_ascii_lowercase()
                .starts_with(b"application/x-www-form-urlencoded")
        });

        if !request.is_method("GET") && !request.is_method("HEAD") && is_form {
            parse_params(request.content(), &mut self.params);
        }
    }

    // //////////////////////////////////////////////////////////////////////////////////////////// RESPONSE

    pub fn response_status_code(&self) -> u16 {
        self.response.status
    }

    /// Declared length of the response content, `None` if unknown.
    pub fn response_content_length(&self) -> Option<u64> {
        self.response.content_length
    }

    /// Send status line and headers. Content follows with
    /// [`Connection::write_content`].
    pub fn write_headers(&mut self, status: u16, headers: &HeaderCollection<'_>) {
        if self.state != State::SendingHeaders {
            warn!("write_headers() called in state {:?}", self.state);
            return;
        }
        self.start_response(status, headers, None);
    }

    /// Send a complete response. `Content-Length` is taken from `body`.
    pub fn write_response(&mut self, status: u16, headers: &HeaderCollection<'_>, body: &[u8]) {
        if self.state != State::SendingHeaders {
            warn!("write_response() called in state {:?}", self.state);
            return;
        }
        self.start_response(status, headers, Some(body.len() as u64));
        if self.state == State::SendingContent {
            self.write_content(body);
        }
    }

    pub fn write_response_string(&mut self, status: u16, headers: &HeaderCollection<'_>, body: &str) {
        self.write_response(status, headers, body.as_bytes());
    }

    fn start_response(&mut self, status: u16, headers: &HeaderCollection<'_>, body_len: Option<u64>) {
        let request = self.request();
        let version = request.version();
        let keep_alive = client_wants_keep_alive(version, request.header("connection"));

        self.head_buf.clear();
        self.response = write_head(
            &mut self.head_buf,
            version,
            keep_alive,
            status,
            headers,
            body_len,
        );

        trace!(
            "Response {} length {:?} chunked {} keep-alive {}",
            self.response.status,
            self.response.content_length,
            self.response.chunked,
            self.response.keep_alive
        );

        if !self.send_head() {
            return;
        }

        self.state = State::SendingContent;

        if self.response.content_length == Some(0) || self.head_request {
            self.transition_completed();
        }
    }

    /// Send response content.
    ///
    /// With a declared length, writing past it is refused. Without one, the
    /// content is chunked if negotiated and sent raw otherwise. The transport
    /// is flushed whenever `read_chunk_size` bytes are pending.
    pub fn write_content(&mut self, data: &[u8]) {
        if self.state != State::SendingContent {
            warn!("write_content() called in state {:?}", self.state);
            return;
        }
        if data.is_empty() {
            return;
        }

        let accepted = self.response.sent.as_mut().map(|c| c.append(data.len()));

        match accepted {
            Some(false) => {
                warn!(
                    "Refusing to write {} bytes past Content-Length {:?}",
                    data.len(),
                    self.response.content_length
                );
            }
            Some(true) => {
                if !self.send(data) {
                    return;
                }
                let complete = self.response.sent.as_ref().map_or(false, |c| c.complete());
                if complete {
                    self.transition_completed();
                } else {
                    self.flush_when_full();
                }
            }
            None => {
                let ok = if self.response.chunked {
                    self.head_buf.clear();
                    write_chunk(&mut self.head_buf, data);
                    self.send_head()
                } else {
                    self.send(data)
                };
                if ok {
                    self.response.unbounded_sent += data.len() as u64;
                    self.flush_when_full();
                }
            }
        }
    }

    /// End content of unknown length.
    ///
    /// Chunked responses get their last chunk. Otherwise the connection
    /// closes to mark the end.
    pub fn end_content(&mut self) {
        if self.state != State::SendingContent {
            warn!("end_content() called in state {:?}", self.state);
            return;
        }
        if self.response.content_length.is_some() {
            warn!("end_content() called for response with known Content-Length");
            return;
        }

        if self.response.chunked {
            if !self.send(LAST_CHUNK) {
                return;
            }
        } else {
            self.response.keep_alive = false;
        }

        self.transition_completed();
    }

    // //////////////////////////////////////////////////////////////////////////////////////////// TRANSITIONS

    fn transition_completed(&mut self) {
        self.state = State::Completed;

        let summary = self.summary();
        trace!("Request completed: {:?}", summary);
        self.events.push_back(Event::RequestCompleted(summary));

        if self.response.keep_alive {
            self.recycle_request();

            if !self.flush_transport() {
                return;
            }

            self.state = State::ReceivingHeaders;

            // Pipelined requests may already be buffered.
            self.process_input();
        } else {
            self.state = State::Flushing;
            self.flush();
        }
    }

    fn summary(&self) -> RequestSummary {
        let request = self.request();
        RequestSummary {
            remote: self.remote,
            method: request.method_str().to_string(),
            uri: String::from_utf8_lossy(request.uri()).into_owned(),
            version: request.version(),
            status: self.response.status,
            content_bytes: self.response.content_bytes_sent(),
            elapsed: self.started.map(|s| s.elapsed()).unwrap_or_default(),
        }
    }

    /// Drop the finished request, keeping any bytes after it.
    fn recycle_request(&mut self) {
        let end = self.content.end().min(self.buf.len());
        self.buf.drain(..end);

        let max_header = self.config.max_header_length;
        if self.buf.capacity() > max_header {
            self.buf.shrink_to(max_header.max(self.buf.len()));
        }
        if self.head_buf.capacity() > MAX_RETAINED_HEAD_BUFFER {
            self.head_buf.clear();
            self.head_buf.shrink_to(MAX_RETAINED_HEAD_BUFFER);
        }

        self.params.clear();
        self.params.shrink_to(MAX_RETAINED_PARAMS);
        self.params_parsed = false;

        self.parser.init();
        self.consumed = 0;
        self.content = Span::default();
        self.head_request = false;
        self.started = None;
        self.response = ResponseState::default();
    }

    fn transition_closed(&mut self) {
        if let Some(t) = self.transport.as_mut() {
            t.close();
        }
        self.state = State::Closed;
        self.events.push_back(Event::Closed);
        trace!("Connection closed: {:?}", self.remote);
    }

    // //////////////////////////////////////////////////////////////////////////////////////////// TRANSPORT

    /// Push buffered output to the transport. Completes a pending close once
    /// everything is written.
    pub fn flush(&mut self) {
        if matches!(self.state, State::Uninitialized | State::Closed) {
            return;
        }
        if !self.flush_transport() {
            return;
        }
        self.drain();
    }

    /// The transport reports written bytes.
    pub fn drain(&mut self) {
        if self.state != State::Flushing {
            return;
        }
        let pending = self.transport.as_ref().map_or(0, |t| t.bytes_to_write());
        if pending == 0 {
            self.transition_closed();
        } else {
            trace!("Flushing, {} bytes left", pending);
        }
    }

    /// Close right away, whatever the state.
    pub fn close(&mut self) {
        if matches!(self.state, State::Uninitialized | State::Closed) {
            return;
        }
        self.transition_closed();
    }

    fn send(&mut self, data: &[u8]) -> bool {
        let Some(t) = self.transport.as_mut() else {
            return false;
        };
        if let Err(e) = t.write(data) {
            debug!("Write failed: {}", e);
            self.transition_closed();
            return false;
        }
        true
    }

    fn send_head(&mut self) -> bool {
        let head = mem::take(&mut self.head_buf);
        let ok = self.send(&head);
        self.head_buf = head;
        ok
    }

    /// Push streamed content out once a read chunk worth is pending.
    fn flush_when_full(&mut self) {
        let pending = self.transport.as_ref().map_or(0, |t| t.bytes_to_write());
        if pending >= self.config.read_chunk_size {
            trace!("Flushing {} bytes of streamed content", pending);
            self.flush_transport();
        }
    }

    fn flush_transport(&mut self) -> bool {
        let Some(t) = self.transport.as_mut() else {
            return false;
        };
        if let Err(e) = t.flush() {
            debug!("Flush failed: {}", e);
            self.transition_closed();
            return false;
        }
        true
    }
}
