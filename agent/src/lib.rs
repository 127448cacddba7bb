//! Headless browser as a service.
//!
//! `POST /doload` loads a page through a [`Page`] and answers with its
//! html, a screenshot or a pdf. The HTTP side runs on [`pillow`].

#[macro_use]
extern crate log;

mod config;
pub use config::AgentConfig;

mod error;
pub use error::{AgentError, ParamError, RenderError};

mod proxy;
pub use proxy::{Proxy, ProxyKind};

mod params;
pub use params::{parse_image_size, post_param_to_form, ContentKind, LoadParams};

mod cookie;
pub use cookie::{Cookie, CookieJar};

mod page;
pub use page::{Page, PageFactory, PageSettings};

mod fetch_page;
pub use fetch_page::{FetchPage, FetchPageFactory};

mod context;
pub use context::AgentContext;

mod handler;
pub use handler::{DoLoadHandler, LOAD_PATH};
