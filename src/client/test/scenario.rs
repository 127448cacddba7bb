use std::io::Write;

use crate::client::{ClientConfig, ClientEvent, ClientRequest, HttpClient, MemorySocket, Socket};

pub struct Scenario {
    request: ClientRequest,
    responses: Vec<Vec<u8>>,
    config: ClientConfig,
}

impl Scenario {
    pub fn builder() -> ScenarioBuilder {
        super::init_log();
        ScenarioBuilder::new()
    }

    pub fn request(&self) -> ClientRequest {
        self.request.clone()
    }

    /// A client with the scripted responses queued on its socket.
    pub fn to_idle(&self) -> HttpClient<MemorySocket> {
        let mut socket = MemorySocket::new();
        for r in &self.responses {
            socket.push_incoming(r.clone());
        }
        HttpClient::new(socket, self.config)
    }

    /// The request is written, nothing received yet.
    pub fn to_sent(&self) -> HttpClient<MemorySocket> {
        let mut client = self.to_idle();
        client.request(self.request.clone());
        assert!(client.is_pending(), "Incorrect scenario not leading to_sent()");
        client
    }

    /// Feed the socket to the client until the request finishes.
    pub fn to_finished(&self) -> HttpClient<MemorySocket> {
        let mut client = self.to_sent();
        pump(&mut client);
        client
    }
}

/// Read the socket into the client until it is done. Returns the events.
pub fn pump(client: &mut HttpClient<MemorySocket>) -> Vec<ClientEvent> {
    let mut buf = vec![0; 1024];
    let mut events = vec![];

    while client.is_pending() {
        match client.socket_mut().read(&mut buf) {
            Ok(0) => client.end_of_stream(),
            Ok(n) => client.receive(&buf[..n]),
            Err(e) => client.socket_error(e),
        }
        while let Some(e) = client.poll_event() {
            events.push(e);
        }
    }

    events
}

pub struct ScenarioBuilder {
    request: ClientRequest,
    responses: Vec<Vec<u8>>,
    config: ClientConfig,
}

impl ScenarioBuilder {
    fn new() -> Self {
        ScenarioBuilder {
            request: ClientRequest::get("http://q.test/"),
            responses: vec![],
            config: ClientConfig::default(),
        }
    }

    pub fn get(mut self, url: &str) -> Self {
        self.request = ClientRequest::get(url);
        self
    }

    pub fn head(mut self, url: &str) -> Self {
        self.request = ClientRequest::head(url);
        self
    }

    pub fn post(mut self, url: &str, body: &str) -> Self {
        self.request = ClientRequest::post(url, body);
        self
    }

    pub fn header(mut self, field: &'static str, value: &'static str) -> Self {
        self.request = self.request.header(field, value);
        self
    }

    /// A response with `headers` and a body. Content-Length is not added.
    pub fn response(mut self, status: u16, headers: &[(&str, &str)], body: &[u8]) -> Self {
        self.responses.push(write_response(status, headers, body));
        self
    }

    /// Raw bytes to arrive from the server.
    pub fn raw(mut self, input: &[u8]) -> Self {
        self.responses.push(input.to_vec());
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Scenario {
        Scenario {
            request: self.request,
            responses: self.responses,
            config: self.config,
        }
    }
}

pub fn write_response(status: u16, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut input = Vec::<u8>::new();

    write!(
        &mut input,
        "HTTP/1.1 {} {}\r\n",
        status,
        crate::reason_phrase(status).unwrap_or("Unknown")
    )
    .unwrap();

    for (k, v) in headers {
        write!(&mut input, "{}: {}\r\n", k, v).unwrap();
    }

    write!(&mut input, "\r\n").unwrap();
    input.extend_from_slice(body);

    input
}
