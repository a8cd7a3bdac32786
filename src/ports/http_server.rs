use anyhow::Result;
use std::future::Future;

/// HttpServer defines the port (interface) for the listening side.
pub trait HttpServer: Send + Sync + 'static {
    /// Run the server until shutdown. Binding the configured address is part
    /// of `run` and fails fast; the routing layer's correctness depends on
    /// the advertised port, so silently picking another one is not an option.
    fn run(&self) -> impl Future<Output = Result<()>> + Send;
}
