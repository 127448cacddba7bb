use std::io;

use crate::header::HeaderCollection;
use crate::HttpVersion;

use super::http_client::{ClientError, HttpClient};
use super::request::ClientRequest;
use super::socket::Socket;

/// A complete response, as returned by [`fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    /// Url of the final request, after redirects.
    pub url: String,
    pub status: u16,
    pub reason: String,
    pub version: HttpVersion,
    pub headers: HeaderCollection<'static>,
    pub body: Vec<u8>,
}

/// Run `request` to completion, blocking on the client's socket.
///
/// Up to `max_redirects` redirects are followed.
pub fn fetch<S: Socket>(
    client: &mut HttpClient<S>,
    request: ClientRequest,
    max_redirects: usize,
) -> Result<FetchedResponse, ClientError> {
    let mut buf = vec![0; 16 * 1024];
    let mut body = Vec::new();
    let mut redirects = 0;

    client.request(request);

    loop {
        while client.is_pending() {
            match client.socket_mut().read(&mut buf) {
                Ok(0) => client.end_of_stream(),
                Ok(n) => client.receive(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => client.socket_error(e),
            }
            body.append(&mut client.consume_content());
        }

        while client.poll_event().is_some() {}
        body.append(&mut client.consume_content());

        if let Some(e) = client.error() {
            return Err(e.clone());
        }

        if client.redirected() && client.redirection_location().is_some() {
            if redirects < max_redirects {
                redirects += 1;
                body.clear();
                client.follow_redirection();
                continue;
            }
            debug!("Not following more than {} redirects", max_redirects);
        }

        let url = client
            .current_request()
            .map(|r| r.url.clone())
            .unwrap_or_default();

        return Ok(FetchedResponse {
            url,
            status: client.status_code(),
            reason: client.reason().to_string(),
            version: client.version(),
            headers: client.headers().clone(),
            body,
        });
    }
}
