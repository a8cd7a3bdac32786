use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address the dev server listens on, e.g. "127.0.0.1:8080". Binding is
    /// strict: if the port is taken, startup fails instead of picking another.
    pub listen_addr: String,
    /// Host header values accepted in addition to the loopback aliases.
    /// Extended at runtime by the DEVPROXY_ALLOWED_HOSTS environment variable.
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
    /// Route table keyed by path prefix. Matching is longest-prefix, so the
    /// declaration order of entries carries no meaning.
    pub routes: HashMap<String, RouteConfig>,
}

impl ServerConfig {
    /// Create a new server configuration builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig so tests can assemble alternate route tables
/// without going through a config file.
#[derive(Default)]
pub struct ServerConfigBuilder {
    listen_addr: Option<String>,
    allowed_hosts: Vec<String>,
    routes: HashMap<String, RouteConfig>,
}

impl ServerConfigBuilder {
    /// Set the listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = Some(addr.into());
        self
    }

    /// Add a route with the given path prefix and configuration
    pub fn route(mut self, path_prefix: impl Into<String>, config: RouteConfig) -> Self {
        self.routes.insert(path_prefix.into(), config);
        self
    }

    /// Accept an additional Host header value
    pub fn allowed_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.push(host.into());
        self
    }

    /// Build the final ServerConfig
    pub fn build(self) -> Result<ServerConfig, String> {
        let listen_addr = self
            .listen_addr
            .ok_or_else(|| "listen_addr is required".to_string())?;

        if self.routes.is_empty() {
            return Err("At least one route must be configured".to_string());
        }

        Ok(ServerConfig {
            listen_addr,
            allowed_hosts: self.allowed_hosts,
            routes: self.routes,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RouteConfig {
    /// Serve files from a local directory. Used as the catch-all for the UI
    /// bundle when mounted at "/".
    #[serde(rename = "static")]
    Static { root: String },
    /// Forward plain HTTP requests to a backend origin.
    #[serde(rename = "proxy")]
    Proxy {
        target: String,
        /// Replacement prefix prepended to the path after the matched prefix
        /// is stripped. None (or "/") strips the prefix and nothing more.
        #[serde(default)]
        rewrite: Option<String>,
        /// Keep the client's Host header instead of rewriting it to the
        /// target authority.
        #[serde(default)]
        preserve_host: bool,
        /// Accept invalid upstream TLS certificates (self-signed dev certs).
        #[serde(default)]
        insecure: bool,
    },
    /// Forward WebSocket upgrades to a backend origin, relaying frames
    /// bidirectionally. Non-upgrade requests on the same prefix (e.g.
    /// socket.io long-polling) are proxied as plain HTTP.
    #[serde(rename = "websocket")]
    Websocket {
        target: String,
        #[serde(default)]
        rewrite: Option<String>,
        #[serde(default)]
        preserve_host: bool,
        #[serde(default)]
        insecure: bool,
    },
}

impl RouteConfig {
    /// Create a static file serving route
    pub fn static_files(root: impl Into<String>) -> Self {
        RouteConfig::Static { root: root.into() }
    }

    /// Create an HTTP proxy route to a single backend origin
    pub fn proxy(target: impl Into<String>) -> Self {
        RouteConfig::Proxy {
            target: target.into(),
            rewrite: None,
            preserve_host: false,
            insecure: false,
        }
    }

    /// Create a WebSocket relay route to a single backend origin
    pub fn websocket(target: impl Into<String>) -> Self {
        RouteConfig::Websocket {
            target: target.into(),
            rewrite: None,
            preserve_host: false,
            insecure: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_listen_addr() {
        let err = ServerConfig::builder()
            .route("/api", RouteConfig::proxy("http://backend:5001/api/"))
            .build()
            .unwrap_err();
        assert!(err.contains("listen_addr"));
    }

    #[test]
    fn builder_requires_at_least_one_route() {
        let err = ServerConfig::builder()
            .listen_addr("127.0.0.1:8080")
            .build()
            .unwrap_err();
        assert!(err.contains("route"));
    }

    #[test]
    fn builder_assembles_config() {
        let config = ServerConfig::builder()
            .listen_addr("127.0.0.1:8080")
            .allowed_host("webserver")
            .route("/api", RouteConfig::proxy("http://backend:5001/api/"))
            .route(
                "/socket.io",
                RouteConfig::websocket("ws://backend:5001/socket.io"),
            )
            .build()
            .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.allowed_hosts, vec!["webserver".to_string()]);
        assert_eq!(config.routes.len(), 2);
    }

    #[test]
    fn route_config_deserializes_tagged_yaml() {
        let yaml = r#"
listen_addr: "127.0.0.1:8080"
allowed_hosts:
  - webserver
routes:
  "/api/assistants":
    type: proxy
    target: "http://assistants:6001/"
  "/api":
    type: proxy
    target: "http://webserver:5001/api/"
  "/socket.io":
    type: websocket
    target: "http://webserver:5001/socket.io"
    preserve_host: true
"#;
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.routes.len(), 3);
        match &config.routes["/socket.io"] {
            RouteConfig::Websocket { preserve_host, .. } => assert!(preserve_host),
            other => panic!("unexpected route config: {other:?}"),
        }
        match &config.routes["/api"] {
            RouteConfig::Proxy {
                preserve_host,
                insecure,
                rewrite,
                ..
            } => {
                assert!(!preserve_host);
                assert!(!insecure);
                assert!(rewrite.is_none());
            }
            other => panic!("unexpected route config: {other:?}"),
        }
    }
}
