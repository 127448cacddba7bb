use std::sync::Arc;
use std::time::Duration;

use crate::cookie::CookieJar;
use crate::error::RenderError;
use crate::proxy::Proxy;

/// How a page is to load.
#[derive(Debug, Clone, Default)]
pub struct PageSettings {
    pub user_agent: Option<String>,
    pub proxy: Option<Proxy>,
    /// Per resource load timeout.
    pub resource_timeout: Option<Duration>,
    /// Shared jar when cookies are kept between requests.
    pub cookies: Option<Arc<CookieJar>>,
}

/// A browser page.
///
/// `load` blocks until the page has finished loading. The other methods
/// operate on the loaded page.
pub trait Page {
    fn load(&mut self, url: &str, post_data: Option<&[u8]>) -> Result<(), RenderError>;

    /// Evaluate `script` in the page, returning the result as text.
    fn evaluate_script(&mut self, script: &str) -> Result<String, RenderError>;

    /// PNG of the page, scaled to `size` (width, height) if given.
    fn render_to_image(&mut self, size: Option<(u32, u32)>) -> Result<Vec<u8>, RenderError>;

    fn render_to_pdf(&mut self) -> Result<Vec<u8>, RenderError>;

    fn content_as_html(&mut self) -> Result<String, RenderError>;
}

/// Makes a fresh [`Page`] per request.
pub trait PageFactory: Send + Sync {
    fn create(&self, settings: PageSettings) -> Box<dyn Page>;
}
