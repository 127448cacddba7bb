//! Minimal absolute URL parsing for outgoing requests and proxy settings.

use std::fmt;
use std::ops::Deref;

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum UrlError {
    #[error("too short")]
    TooShort,
    #[error("missing scheme")]
    MissingScheme,
    #[error("too short user/password")]
    TooShortUserPass,
    #[error("bad password")]
    BadPassword,
    #[error("too short hostname")]
    TooShortHost,
    #[error("port is not a number")]
    PortNotANumber,
    #[error("path after query or fragment")]
    PathAfterQueryOrFragment,
    #[error("fragment before query")]
    FragmentBeforeQuery,
}

/// An absolute URL, borrowed from the string it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url<'a> {
    buffer: &'a str,

    scheme_end: usize,           // Before ':'
    username_end: Option<usize>, // Before ':' (if a password is given) or '@' (if not)
    host_start: usize,
    host_end: usize,
    port: Option<u16>,
    path_start: usize,             // Before initial '/', if any
    query_start: Option<usize>,    // Before '?'
    fragment_start: Option<usize>, // Before '#'
}

impl<'a> Url<'a> {
    pub fn parse_str(s: &'a str) -> Result<Self, UrlError> {
        // x://a
        if s.len() < 5 {
            return Err(UrlError::TooShort);
        }

        let scheme_end = s.find("://").ok_or(UrlError::MissingScheme)?;
        if scheme_end == 0 {
            return Err(UrlError::MissingScheme);
        }
        let offset = scheme_end + 3;

        // All indexes are relative to after "://" until the end.
        let x = &s[offset..];

        let (query_start, fragment_start) = (x.find('?'), x.find('#'));

        let query_or_fragment = match (query_start, fragment_start) {
            (None, None) => None,
            (None, Some(m)) => Some(m),
            (Some(n), None) => Some(n),
            (Some(n), Some(m)) => {
                if m < n {
                    // '?' inside a fragment is just part of the fragment.
                    Some(m)
                } else {
                    Some(n)
                }
            }
        };
        let query_start = query_start.filter(|q| fragment_start.map_or(true, |f| *q < f));

        let maybe_slash = x.find('/');
        let path_start = match (maybe_slash, query_or_fragment) {
            (Some(s), Some(qf)) if qf < s => qf,
            (Some(s), _) => s,
            (None, Some(qf)) => qf,
            (None, None) => x.len(),
        };

        // Between '://' and the start of the path.
        let authority = &x[..path_start];

        let maybe_upass = authority.rfind('@');
        let username_end = maybe_upass
            .map(|n| split_username(&authority[..n]))
            .transpose()?;

        let host_start = maybe_upass.map(|n| n + 1).unwrap_or(0);
        let port_start = authority[host_start..].rfind(':').map(|n| n + host_start);
        let host_end = port_start.unwrap_or(path_start);

        if host_start == host_end {
            return Err(UrlError::TooShortHost);
        }

        let mut port = None;

        if let Some(port_start) = port_start {
            let port_str = &authority[(port_start + 1)..];
            let p: u16 = port_str.parse().map_err(|_| UrlError::PortNotANumber)?;
            port = Some(p);
        }

        Ok(Url {
            buffer: s,
            scheme_end,
            username_end: username_end.map(|n| n + offset),
            host_start: host_start + offset,
            host_end: host_end + offset,
            port,
            path_start: path_start + offset,
            query_start: query_start.map(|n| n + offset),
            fragment_start: fragment_start.map(|n| n + offset),
        })
    }

    pub fn as_str(&self) -> &'a str {
        self.buffer
    }

    pub fn scheme(&self) -> &'a str {
        &self.buffer[..self.scheme_end]
    }

    pub fn username(&self) -> &'a str {
        self.username_end
            .map(|u| &self.buffer[(self.scheme_end + 3)..u])
            .unwrap_or("")
    }

    pub fn password(&self) -> &'a str {
        self.username_end
            .filter(|u| *u + 1 < self.host_start)
            .map(|u| &self.buffer[(u + 1)..self.host_start - 1])
            .unwrap_or("")
    }

    /// Hostname and port, as written.
    pub fn host(&self) -> &'a str {
        &self.buffer[self.host_start..self.path_start]
    }

    pub fn hostname(&self) -> &'a str {
        &self.buffer[self.host_start..self.host_end]
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Explicit port, or the default for the scheme.
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(match self.scheme() {
            "https" => 443,
            _ => 80,
        })
    }

    pub fn pathname(&self) -> &'a str {
        let end = self
            .query_start
            .or(self.fragment_start)
            .unwrap_or(self.buffer.len());

        &self.buffer[self.path_start..end]
    }

    /// Query without the leading '?'.
    pub fn query(&self) -> Option<&'a str> {
        let start = self.query_start?;
        let end = self.fragment_start.unwrap_or(self.buffer.len());
        Some(&self.buffer[start + 1..end])
    }

    /// Fragment without the leading '#'.
    pub fn fragment(&self) -> Option<&'a str> {
        self.fragment_start.map(|s| &self.buffer[s + 1..])
    }

    /// Path and query as sent on a request line. Never empty.
    pub fn request_target(&self) -> &'a str {
        let end = self.fragment_start.unwrap_or(self.buffer.len());
        let target = &self.buffer[self.path_start..end];
        if target.is_empty() {
            "/"
        } else {
            target
        }
    }

    /// scheme://host:port, without path.
    pub fn base(&self) -> &'a str {
        &self.buffer[..self.path_start]
    }

    /// Resolve a `Location`-style reference against this URL.
    pub fn join(&self, reference: &str) -> String {
        if reference.contains("://") {
            return reference.to_string();
        }
        if let Some(rest) = reference.strip_prefix("//") {
            return format!("{}://{}", self.scheme(), rest);
        }
        if reference.starts_with('/') {
            return format!("{}{}", self.base(), reference);
        }
        if reference.starts_with('?') {
            let path = match self.pathname() {
                "" => "/",
                p => p,
            };
            return format!("{}{}{}", self.base(), path, reference);
        }
        let path = self.pathname();
        let dir = match path.rfind('/') {
            Some(n) => &path[..=n],
            None => "/",
        };
        format!("{}{}{}", self.base(), dir, reference)
    }
}

fn split_username(x: &str) -> Result<usize, UrlError> {
    // Need at least one char: http://a@foo.bar
    if x.is_empty() {
        return Err(UrlError::TooShortUserPass);
    }

    let n = if let Some((username, password)) = x.split_once(':') {
        if username.is_empty() {
            return Err(UrlError::TooShortUserPass);
        }
        if password.contains(':') {
            return Err(UrlError::BadPassword);
        }
        username.len()
    } else {
        x.len()
    };

    Ok(n)
}

impl<'a> TryFrom<&'a str> for Url<'a> {
    type Error = UrlError;

    fn try_from(value: &'a str) -> Result<Self, Self::Error> {
        Self::parse_str(value)
    }
}

impl fmt::Display for Url<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.buffer)
    }
}

impl Deref for Url<'_> {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.buffer
    }
}
