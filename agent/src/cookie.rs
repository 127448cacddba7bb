use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Lowercase, without a leading dot.
    pub domain: String,
    pub path: String,
}

/// In-memory cookie store shared by pages loaded with `useCookie=1`.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Mutex<Vec<Cookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one `Set-Cookie` value received from `host`.
    pub fn store(&self, host: &str, set_cookie: &str) {
        let mut parts = set_cookie.split(';');

        let Some((name, value)) = parts.next().and_then(|p| p.split_once('=')) else {
            debug!("Ignoring malformed Set-Cookie: {}", set_cookie);
            return;
        };

        let name = name.trim();
        if name.is_empty() {
            return;
        }

        let mut cookie = Cookie {
            name: name.to_string(),
            value: value.trim().to_string(),
            domain: host.to_ascii_lowercase(),
            path: "/".to_string(),
        };
        let mut expired = false;

        for attr in parts {
            let (k, v) = attr.split_once('=').unwrap_or((attr, ""));
            let (k, v) = (k.trim(), v.trim());

            if k.eq_ignore_ascii_case("domain") && !v.is_empty() {
                cookie.domain = v.trim_start_matches('.').to_ascii_lowercase();
            } else if k.eq_ignore_ascii_case("path") && v.starts_with('/') {
                cookie.path = v.to_string();
            } else if k.eq_ignore_ascii_case("max-age") {
                expired = v.parse::<i64>().map_or(false, |n| n <= 0);
            }
        }

        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies.retain(|c| !(c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path));

        if expired {
            trace!("Cookie {} expired", cookie.name);
        } else {
            trace!("Store cookie {} for {}", cookie.name, cookie.domain);
            cookies.push(cookie);
        }
    }

    /// `Cookie` header value for a request to `host` and `path`.
    pub fn cookie_header(&self, host: &str, path: &str) -> Option<String> {
        let host = host.to_ascii_lowercase();
        let cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);

        let pairs: Vec<String> = cookies
            .iter()
            .filter(|c| domain_matches(&host, &c.domain) && path.starts_with(&c.path))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    pub fn len(&self) -> usize {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .map_or(false, |rest| rest.ends_with('.'))
}
