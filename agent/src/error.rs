use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("render: {0}")]
    Render(#[from] RenderError),
}

/// Failures of a [`Page`](crate::page::Page).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("{0} is not supported by this page")]
    Unsupported(&'static str),

    #[error("load failed: {0}")]
    Load(String),

    #[error("script failed: {0}")]
    Script(String),
}

impl From<pillow::client::ClientError> for RenderError {
    fn from(e: pillow::client::ClientError) -> Self {
        RenderError::Load(e.to_string())
    }
}

/// Request parameters that cannot be served.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("missing parameter 'url'")]
    MissingUrl,
}
