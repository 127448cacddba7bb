use std::sync::Arc;
use std::thread;

use md5::{Digest, Md5};
use pillow::server::{Connection, Handler, HandlerError, Transport};
use pillow::HeaderCollection;

use crate::context::AgentContext;
use crate::error::RenderError;
use crate::page::PageSettings;
use crate::params::{ContentKind, LoadParams};

pub const LOAD_PATH: &[u8] = b"/doload";

const METHOD_NOT_ALLOWED: &str = "Method 'GET' is not supported, please use 'POST'";
const NULL_HTML: &str = "<html>null</html>";
const SERVER_ERROR_HTML: &str = "<html>server error,please try again.</html>";
const HTML_TYPE: &str = "text/html;charset=utf-8";

/// Loads a page on `POST /doload` and answers with its html, image or pdf.
///
/// `GET` on any path is answered with 405.
pub struct DoLoadHandler {
    ctx: Arc<AgentContext>,
}

struct Rendered {
    body: Vec<u8>,
    etag: Option<String>,
}

impl DoLoadHandler {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        DoLoadHandler { ctx }
    }

    fn render(&self, params: &LoadParams) -> Result<Rendered, RenderError> {
        let settings = PageSettings {
            user_agent: params.user_agent.clone(),
            proxy: params.proxy.clone(),
            resource_timeout: params.resource_timeout,
            cookies: params.use_cookie.then(|| Arc::clone(&self.ctx.cookies)),
        };

        let mut page = self.ctx.pages.create(settings);

        page.load(&params.url, params.post_data.as_deref())?;
        info!("All load finished: {}", params.url);

        if !params.render_time.is_zero() {
            thread::sleep(params.render_time);
        }

        if let Some(script) = &params.script {
            match page.evaluate_script(script) {
                Ok(result) => info!("Script evaluated, result={}", result),
                Err(e) => warn!("Script not evaluated: {}", e),
            }
        }

        let rendered = match params.content_kind {
            ContentKind::Html => {
                let html = page.content_as_html()?;
                let body = if html.is_empty() { NULL_HTML.into() } else { html };
                Rendered {
                    body: body.into_bytes(),
                    etag: None,
                }
            }
            ContentKind::Image => with_etag(page.render_to_image(params.image_size)?),
            ContentKind::Pdf => with_etag(page.render_to_pdf()?),
        };

        Ok(rendered)
    }
}

fn with_etag(body: Vec<u8>) -> Rendered {
    let etag = hex::encode(Md5::digest(&body));
    Rendered {
        body,
        etag: Some(etag),
    }
}

fn no_cache_headers() -> HeaderCollection<'static> {
    HeaderCollection::new()
        .with("Pragma", "no-cache")
        .with("Expires", "-1")
        .with("Cache-Control", "no-cache")
}

impl<T: Transport> Handler<T> for DoLoadHandler {
    fn handle(&self, c: &mut Connection<T>) -> Result<bool, HandlerError> {
        if c.request().is_method("GET") {
            c.write_response_string(405, &HeaderCollection::new(), METHOD_NOT_ALLOWED);
            return Ok(true);
        }

        if c.request().path() != LOAD_PATH {
            return Ok(false);
        }

        let params = match LoadParams::from_params(c.request_params()) {
            Ok(v) => v,
            Err(e) => {
                debug!("Bad load request: {}", e);
                c.write_response_string(400, &HeaderCollection::new(), &e.to_string());
                return Ok(true);
            }
        };

        info!(
            "TargetUrl: {}, RenderTime(ms): {}",
            params.url,
            params.render_time.as_millis()
        );

        let mut headers = no_cache_headers();

        match self.render(&params) {
            Ok(rendered) => {
                headers.push("Content-Type", params.content_kind.mime_type());
                if let Some(etag) = rendered.etag {
                    headers.push("ETag", etag);
                }
                c.write_response(200, &headers, &rendered.body);
            }
            Err(e) => {
                warn!("Page error, url: {}, error: {}", params.url, e);
                headers.push("Content-Type", HTML_TYPE);
                c.write_response_string(500, &headers, SERVER_ERROR_HTML);
            }
        }

        Ok(true)
    }
}
