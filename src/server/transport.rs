use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

/// The write half of a server connection.
///
/// Writes are buffered by the transport and pushed to the peer on
/// [`Transport::flush`]. `bytes_to_write` reports what is still pending so
/// the connection knows when it is safe to close.
pub trait Transport {
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    fn bytes_to_write(&self) -> usize;

    fn flush(&mut self) -> io::Result<()>;

    /// Close both directions. Must be idempotent.
    fn close(&mut self);

    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}

/// Transport over a [`TcpStream`].
pub struct TcpTransport {
    stream: TcpStream,
    pending: Vec<u8>,
    peer: Option<SocketAddr>,
    closed: bool,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        let peer = stream.peer_addr().ok();
        TcpTransport {
            stream,
            pending: Vec::with_capacity(4096),
            peer,
            closed: false,
        }
    }
}

impl Transport for TcpTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if self.closed {
            return Err(io::ErrorKind::NotConnected.into());
        }
        self.pending.extend_from_slice(data);
        Ok(())
    }

    fn bytes_to_write(&self) -> usize {
        self.pending.len()
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.pending.is_empty() || self.closed {
            return Ok(());
        }
        self.stream.write_all(&self.pending)?;
        self.stream.flush()?;
        self.pending.clear();
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.pending.clear();
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            trace!("Shutdown failed: {}", e);
        }
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// In-memory transport. Everything flushed ends up in `output`.
///
/// A stalled transport accepts writes but keeps them pending until it is
/// unstalled, which models a slow peer.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    pending: Vec<u8>,
    output: Vec<u8>,
    stalled: bool,
    closed: bool,
    fail_writes: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn set_stalled(&mut self, stalled: bool) {
        self.stalled = stalled;
    }

    /// Make every following write fail.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl Transport for MemoryTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if self.fail_writes || self.closed {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        self.pending.extend_from_slice(data);
        Ok(())
    }

    fn bytes_to_write(&self) -> usize {
        self.pending.len()
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.stalled {
            self.output.append(&mut self.pending);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
