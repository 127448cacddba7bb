use std::sync::Arc;

use crate::config::AgentConfig;
use crate::cookie::CookieJar;
use crate::page::PageFactory;

/// State shared by all connections, built once at startup.
pub struct AgentContext {
    pub config: AgentConfig,
    pub pages: Box<dyn PageFactory>,
    pub cookies: Arc<CookieJar>,
}

impl AgentContext {
    pub fn new(config: AgentConfig, pages: Box<dyn PageFactory>) -> Self {
        AgentContext {
            config,
            pages,
            cookies: Arc::new(CookieJar::new()),
        }
    }
}
