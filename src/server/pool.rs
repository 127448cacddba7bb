use super::connection::Connection;
use super::transport::Transport;
use super::ServerConfig;

/// Bounded reserve of idle connections, so their buffers can be reused.
pub struct ConnectionPool<T: Transport> {
    free: Vec<Connection<T>>,
    max: usize,
    config: ServerConfig,
}

impl<T: Transport> ConnectionPool<T> {
    /// Preallocates `config.pool_size` connections.
    pub fn new(config: ServerConfig) -> Self {
        let max = config.pool_size;
        let free = (0..max).map(|_| Connection::new(config)).collect();
        ConnectionPool { free, max, config }
    }

    /// An idle connection, or a new one if the pool is empty.
    pub fn take(&mut self) -> Connection<T> {
        self.free
            .pop()
            .unwrap_or_else(|| Connection::new(self.config))
    }

    /// Give back a connection. It is closed and its transport dropped.
    pub fn put(&mut self, mut connection: Connection<T>) {
        connection.close();
        drop(connection.take_transport());

        // Drain events so nothing stale shows up after the next initialize.
        while connection.poll_event().is_some() {}

        if self.free.len() < self.max {
            self.free.push(connection);
        }
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }
}
