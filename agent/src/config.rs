use std::time::Duration;

use clap::Parser;
use pillow::server::ServerConfig;

/// Command line of the agent.
#[derive(Debug, Clone, Parser)]
#[command(name = "seimiagent")]
#[command(version)]
#[command(about = "A headless, standalone browser server which makes grabbing dynamic web pages easier.", long_about = None)]
pub struct AgentConfig {
    /// The port to listen on.
    #[arg(short, long, default_value_t = 8000)]
    pub port: u16,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Largest accepted request line plus headers, in bytes.
    #[arg(long, default_value_t = 32 * 1024)]
    pub max_header_length: usize,

    /// Largest accepted request content, in bytes.
    #[arg(long, default_value_t = 128 * 1024 * 1024)]
    pub max_content_length: u64,

    /// Idle connections kept for reuse.
    #[arg(long, default_value_t = 25)]
    pub pool_size: usize,

    /// Socket timeout for page fetches, unless the request sets `resourceTimeout`.
    #[arg(long, default_value_t = 30_000)]
    pub fetch_timeout_ms: u64,

    /// Redirects followed when loading a page.
    #[arg(long, default_value_t = 5)]
    pub max_redirects: usize,
}

impl AgentConfig {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            max_header_length: self.max_header_length,
            max_content_length: self.max_content_length,
            pool_size: self.pool_size,
            ..Default::default()
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn listen_addr(&self) -> (&str, u16) {
        (&self.bind, self.port)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig::parse_from(["seimiagent"])
    }
}
