use std::time::Duration;

use pillow::client::{fetch, ClientConfig, ClientRequest, HttpClient, TcpSocket};
use pillow::Url;

use crate::error::RenderError;
use crate::page::{Page, PageFactory, PageSettings};
use crate::proxy::ProxyKind;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; seimiagent)";

/// A [`Page`] that fetches the document over HTTP without rendering it.
///
/// Scripts, images and PDFs need a browser engine and are reported as
/// unsupported.
pub struct FetchPage {
    settings: PageSettings,
    client: HttpClient<TcpSocket>,
    max_redirects: usize,
    html: Option<String>,
}

impl FetchPage {
    pub fn new(settings: PageSettings, fetch_timeout: Duration, max_redirects: usize) -> Self {
        let config = ClientConfig {
            io_timeout: Some(settings.resource_timeout.unwrap_or(fetch_timeout)),
            ..Default::default()
        };

        let mut client = HttpClient::tcp(config);

        if let Some(proxy) = &settings.proxy {
            if proxy.kind == ProxyKind::Http {
                if !proxy.user.is_empty() {
                    warn!("Proxy credentials are not sent");
                }
                client.set_proxy(Some((proxy.host.clone(), proxy.port)));
            }
        }

        FetchPage {
            settings,
            client,
            max_redirects,
            html: None,
        }
    }
}

impl Page for FetchPage {
    fn load(&mut self, url: &str, post_data: Option<&[u8]>) -> Result<(), RenderError> {
        if let Some(proxy) = &self.settings.proxy {
            if proxy.kind != ProxyKind::Http {
                return Err(RenderError::Unsupported("https and socks proxies"));
            }
        }

        let mut request = match post_data {
            Some(body) => ClientRequest::post(url, body.to_vec())
                .header("Content-Type", "application/x-www-form-urlencoded"),
            None => ClientRequest::get(url),
        };

        let ua = self
            .settings
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        request = request
            .header("User-Agent", ua)
            .header("Accept", "text/html,application/xhtml+xml,*/*;q=0.8")
            .header("Accept-Encoding", "gzip");

        if let Some(jar) = &self.settings.cookies {
            if let Ok(u) = Url::parse_str(url) {
                if let Some(cookie) = jar.cookie_header(u.hostname(), u.pathname()) {
                    request = request.header("Cookie", cookie);
                }
            }
        }

        let res = fetch(&mut self.client, request, self.max_redirects)?;

        info!("Loaded {} status {} ({} bytes)", res.url, res.status, res.body.len());

        if let Some(jar) = &self.settings.cookies {
            if let Ok(u) = Url::parse_str(&res.url) {
                for v in res.headers.get_all("set-cookie") {
                    jar.store(u.hostname(), &String::from_utf8_lossy(v));
                }
            }
        }

        self.html = Some(String::from_utf8_lossy(&res.body).into_owned());

        Ok(())
    }

    fn evaluate_script(&mut self, _script: &str) -> Result<String, RenderError> {
        Err(RenderError::Unsupported("script evaluation"))
    }

    fn render_to_image(&mut self, _size: Option<(u32, u32)>) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::Unsupported("image rendering"))
    }

    fn render_to_pdf(&mut self) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::Unsupported("pdf rendering"))
    }

    fn content_as_html(&mut self) -> Result<String, RenderError> {
        self.html
            .clone()
            .ok_or_else(|| RenderError::Load("page not loaded".into()))
    }
}

/// Creates [`FetchPage`]s.
#[derive(Debug, Clone)]
pub struct FetchPageFactory {
    fetch_timeout: Duration,
    max_redirects: usize,
}

impl FetchPageFactory {
    pub fn new(fetch_timeout: Duration, max_redirects: usize) -> Self {
        FetchPageFactory {
            fetch_timeout,
            max_redirects,
        }
    }
}

impl PageFactory for FetchPageFactory {
    fn create(&self, settings: PageSettings) -> Box<dyn Page> {
        Box::new(FetchPage::new(settings, self.fetch_timeout, self.max_redirects))
    }
}

#[cfg(test)]
mod test {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::cookie::CookieJar;

    /// Serve `responses` one connection each, sending back what was received.
    fn serve(responses: Vec<&'static str>) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for response in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut got = vec![];
                let mut buf = [0; 1024];
                while !request_complete(&got) {
                    let n = stream.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    got.extend_from_slice(&buf[..n]);
                }
                tx.send(String::from_utf8_lossy(&got).into_owned()).unwrap();
                stream.write_all(response.as_bytes()).unwrap();
            }
        });

        (base, rx)
    }

    fn request_complete(got: &[u8]) -> bool {
        let Some(end) = got.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let head = String::from_utf8_lossy(&got[..end]).to_ascii_lowercase();
        let length = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        got.len() >= end + 4 + length
    }

    #[test]
    fn load_html_and_keep_cookies() {
        let (base, rx) = serve(vec![
            "HTTP/1.1 200 OK\r\nSet-Cookie: sid=abc\r\nContent-Length: 14\r\nConnection: close\r\n\r\n<html>1</html>",
            "HTTP/1.1 200 OK\r\nContent-Length: 14\r\nConnection: close\r\n\r\n<html>2</html>",
        ]);

        let jar = Arc::new(CookieJar::new());
        let settings = PageSettings {
            user_agent: Some("test-agent".into()),
            cookies: Some(jar.clone()),
            ..Default::default()
        };

        let mut page = FetchPage::new(settings.clone(), Duration::from_secs(5), 5);
        page.load(&format!("{}/first", base), None).unwrap();
        assert_eq!(page.content_as_html().unwrap(), "<html>1</html>");

        let first = rx.recv().unwrap();
        assert!(first.starts_with("GET /first HTTP/1.1\r\n"), "{}", first);
        assert!(first.contains("User-Agent: test-agent\r\n"), "{}", first);
        assert_eq!(jar.len(), 1);

        let mut page = FetchPage::new(settings, Duration::from_secs(5), 5);
        page.load(&format!("{}/second", base), Some(b"a=1")).unwrap();
        assert_eq!(page.content_as_html().unwrap(), "<html>2</html>");

        let second = rx.recv().unwrap();
        assert!(second.starts_with("POST /second HTTP/1.1\r\n"), "{}", second);
        assert!(second.contains("Cookie: sid=abc\r\n"), "{}", second);
    }

    #[test]
    fn rendering_unsupported() {
        let mut page = FetchPage::new(PageSettings::default(), Duration::from_secs(1), 0);
        assert!(matches!(page.render_to_image(None), Err(RenderError::Unsupported(_))));
        assert!(matches!(page.render_to_pdf(), Err(RenderError::Unsupported(_))));
        assert!(matches!(page.evaluate_script("1"), Err(RenderError::Unsupported(_))));
        assert!(matches!(page.content_as_html(), Err(RenderError::Load(_))));
    }
}
