use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::body::Body;
use axum::extract::Request;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::adapters::file_system::TowerFileSystem;
use crate::adapters::http_client::HyperHttpClient;
use crate::adapters::http_handler::ProxyHandler;
use crate::config::ServerConfig;
use crate::core::allowlist::HostAllowlist;
use crate::core::rules::RouteTable;
use crate::ports::http_server::HttpServer;

/// The listening front: one axum server whose fallback route hands every
/// request, whatever its path, to the [`ProxyHandler`].
pub struct ProxyServer {
    listen_addr: String,
    handler: ProxyHandler,
}

impl ProxyServer {
    pub fn new(
        config: Arc<ServerConfig>,
        table: Arc<RouteTable>,
        allowlist: Arc<HostAllowlist>,
    ) -> Self {
        let handler = ProxyHandler::new(
            table,
            allowlist,
            Arc::new(HyperHttpClient::new()),
            Arc::new(TowerFileSystem::new()),
        );
        Self {
            listen_addr: config.listen_addr.clone(),
            handler,
        }
    }

    fn router(&self) -> Router {
        let handler = self.handler.clone();
        Router::new()
            .fallback(move |req: Request<Body>| {
                let handler = handler.clone();
                async move { handler.handle_request(req).await }
            })
            .layer(TraceLayer::new_for_http())
    }

    /// Serve on an already-bound listener until shutdown. Also used by tests
    /// that bind to an ephemeral port before starting the server.
    pub async fn serve_on(&self, listener: TcpListener) -> anyhow::Result<()> {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("proxy server failed")
    }
}

impl HttpServer for ProxyServer {
    fn run(&self) -> impl Future<Output = anyhow::Result<()>> + Send {
        async move {
            // Bind failures (port taken, bad address) are fatal at startup.
            let listener = TcpListener::bind(&self.listen_addr)
                .await
                .with_context(|| format!("failed to bind {}", self.listen_addr))?;
            tracing::info!(addr = %self.listen_addr, "proxy listening");
            self.serve_on(listener).await
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to install ctrl-c handler");
    }
    tracing::info!("shutdown signal received");
}
