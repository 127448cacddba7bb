use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

/// Byte stream to a remote host, as seen by [`HttpClient`](super::HttpClient).
pub trait Socket {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()>;

    fn is_connected(&self) -> bool;

    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Blocking read. `Ok(0)` means the peer closed.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn disconnect(&mut self);
}

#[derive(Debug, Default)]
pub struct TcpSocket {
    stream: Option<TcpStream>,
    timeout: Option<Duration>,
}

impl TcpSocket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and write timeout applied to every new connection.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        TcpSocket {
            stream: None,
            timeout,
        }
    }

    fn stream(&mut self) -> io::Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "socket not connected"))
    }
}

impl Socket for TcpSocket {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        self.disconnect();
        debug!("Connect {}:{}", host, port);
        let stream = TcpStream::connect((host, port))?;
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;
        stream.set_nodelay(true)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let stream = self.stream()?;
        stream.write_all(data)?;
        stream.flush()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream()?.read(buf)
    }

    fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            trace!("Disconnect");
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

/// Scripted in-memory socket.
///
/// Reads hand out the queued input in order. Once the script runs out the
/// peer appears closed.
#[derive(Debug, Default)]
pub struct MemorySocket {
    connects: Vec<(String, u16)>,
    written: Vec<u8>,
    incoming: VecDeque<io::Result<Vec<u8>>>,
    connected: bool,
    refuse: bool,
}

impl MemorySocket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_incoming(&mut self, data: impl Into<Vec<u8>>) {
        self.incoming.push_back(Ok(data.into()));
    }

    /// Queue a peer close.
    pub fn push_eof(&mut self) {
        self.incoming.push_back(Ok(vec![]));
    }

    pub fn push_error(&mut self, kind: io::ErrorKind) {
        self.incoming.push_back(Err(io::Error::new(kind, "scripted error")));
    }

    /// Make further connects fail.
    pub fn refuse_connections(&mut self, refuse: bool) {
        self.refuse = refuse;
    }

    /// Every host and port connected to, in order.
    pub fn connects(&self) -> &[(String, u16)] {
        &self.connects
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.written)
    }
}

impl Socket for MemorySocket {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        if self.refuse {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        }
        self.connects.push((host.to_string(), port));
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if !self.connected {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "not connected"));
        }
        self.written.extend_from_slice(data);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.connected {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "not connected"));
        }

        match self.incoming.pop_front() {
            None => Ok(0),
            Some(Err(e)) => Err(e),
            Some(Ok(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    self.incoming.push_front(Ok(data.split_off(n)));
                }
                Ok(n)
            }
        }
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }
}
