use std::io::{self, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crate::header::HeaderCollection;

use super::connection::{Connection, Event, State};
use super::handler::HandlerChain;
use super::pool::ConnectionPool;
use super::transport::{TcpTransport, Transport};
use super::ServerConfig;

/// Source of new peer connections.
pub trait Acceptor {
    type Reader: Read + Send + 'static;
    type Transport: Transport + Send + 'static;

    fn accept(&mut self) -> io::Result<(Self::Reader, Self::Transport)>;
}

pub struct TcpAcceptor(pub TcpListener);

impl TcpAcceptor {
    pub fn bind(addr: impl std::net::ToSocketAddrs) -> io::Result<Self> {
        Ok(TcpAcceptor(TcpListener::bind(addr)?))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.0.local_addr()
    }
}

impl Acceptor for TcpAcceptor {
    type Reader = TcpStream;
    type Transport = TcpTransport;

    fn accept(&mut self) -> io::Result<(Self::Reader, Self::Transport)> {
        let (stream, _) = self.0.accept()?;
        if let Err(e) = stream.set_nodelay(true) {
            trace!("set_nodelay failed: {}", e);
        }
        let reader = stream.try_clone()?;
        Ok((reader, TcpTransport::new(stream)))
    }
}

/// Accept loop running one thread per connection.
pub struct Server<A: Acceptor> {
    acceptor: A,
    chain: Arc<HandlerChain<A::Transport>>,
    pool: Arc<Mutex<ConnectionPool<A::Transport>>>,
    config: ServerConfig,
}

impl<A> Server<A>
where
    A: Acceptor,
    A::Transport: Transport + Send + 'static,
{
    pub fn new(acceptor: A, chain: HandlerChain<A::Transport>, config: ServerConfig) -> Self {
        Server {
            acceptor,
            chain: Arc::new(chain),
            pool: Arc::new(Mutex::new(ConnectionPool::new(config))),
            config,
        }
    }

    pub fn acceptor(&self) -> &A {
        &self.acceptor
    }

    /// Accept and serve until accepting fails.
    pub fn run(mut self) -> io::Result<()> {
        loop {
            self.accept_one()?;
        }
    }

    /// Accept one connection and serve it on a new thread.
    pub fn accept_one(&mut self) -> io::Result<thread::JoinHandle<()>> {
        let (reader, transport) = self.acceptor.accept()?;

        let chain = Arc::clone(&self.chain);
        let pool = Arc::clone(&self.pool);
        let read_chunk_size = self.config.read_chunk_size;

        let mut connection = pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        thread::Builder::new()
            .name("pillow-connection".into())
            .spawn(move || {
                connection.initialize(transport);

                if let Err(e) = serve_connection(reader, &mut connection, &chain, read_chunk_size) {
                    debug!("Connection ended with error: {}", e);
                }

                pool.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .put(connection);
            })
    }
}

/// Drive an initialized connection from `reader` until it closes.
pub fn serve_connection<R, T>(
    mut reader: R,
    connection: &mut Connection<T>,
    chain: &HandlerChain<T>,
    read_chunk_size: usize,
) -> io::Result<()>
where
    R: Read,
    T: Transport,
{
    let mut buf = vec![0; read_chunk_size.max(1)];

    loop {
        if dispatch_events(connection, chain) {
            return Ok(());
        }

        let n = match reader.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                connection.close();
                dispatch_events(connection, chain);
                return Err(e);
            }
        };

        if n == 0 {
            trace!("Peer closed");
            connection.close();
            dispatch_events(connection, chain);
            return Ok(());
        }

        connection.receive(&buf[..n]);
    }
}

/// Returns true once the connection is closed.
fn dispatch_events<T: Transport>(connection: &mut Connection<T>, chain: &HandlerChain<T>) -> bool {
    let mut closed = false;

    while let Some(event) = connection.poll_event() {
        match event {
            Event::RequestReady => {
                if !chain.handle(connection) {
                    warn!("No handler took the request");
                    connection.write_response(404, &HeaderCollection::new(), b"");
                }
                if connection.state() == State::SendingHeaders {
                    warn!("Handler returned without responding");
                    connection.close();
                }
            }
            Event::RequestCompleted(summary) => chain.request_completed(&summary),
            Event::Closed => closed = true,
        }
    }

    closed || connection.state() == State::Closed
}
