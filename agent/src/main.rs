#[macro_use]
extern crate log;

use std::sync::Arc;

use clap::Parser;
use pillow::server::{HandlerChain, LogHandler, NotFoundHandler, Server, TcpAcceptor};
use seimi_agent::{AgentConfig, AgentContext, AgentError, DoLoadHandler, FetchPageFactory};

fn main() -> Result<(), AgentError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AgentConfig::parse();

    let pages = FetchPageFactory::new(config.fetch_timeout(), config.max_redirects);
    let ctx = Arc::new(AgentContext::new(config.clone(), Box::new(pages)));

    let chain = HandlerChain::new()
        .with(LogHandler)
        .with(DoLoadHandler::new(ctx))
        .with(NotFoundHandler);

    let acceptor = TcpAcceptor::bind(config.listen_addr())?;
    info!("SeimiAgent started, listening on {}", acceptor.local_addr()?);

    Server::new(acceptor, chain, config.server_config()).run()?;

    Ok(())
}
