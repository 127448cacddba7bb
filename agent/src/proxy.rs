use pillow::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    Http,
    Https,
    Socks5,
}

/// Proxy a page loads through, from `scheme://[user:pass@]host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    pub kind: ProxyKind,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl Proxy {
    /// `http`, `https` and `socket` (SOCKS5) schemes are understood. The
    /// port defaults to 80 whatever the scheme.
    pub fn parse(s: &str) -> Option<Proxy> {
        let url = match Url::parse_str(s.trim()) {
            Ok(v) => v,
            Err(e) => {
                warn!("Proxy pattern error, proxy = {} ({})", s, e);
                return None;
            }
        };

        let kind = match url.scheme() {
            "http" => ProxyKind::Http,
            "https" => ProxyKind::Https,
            "socket" => ProxyKind::Socks5,
            other => {
                warn!("Proxy pattern error, unknown scheme {} in {}", other, s);
                return None;
            }
        };

        let port = match url.port() {
            Some(0) | None => 80,
            Some(p) => p,
        };

        Some(Proxy {
            kind,
            host: url.hostname().to_string(),
            port,
            user: url.username().to_string(),
            password: url.password().to_string(),
        })
    }
}
