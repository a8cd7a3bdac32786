pub mod adapters;
pub mod config;
pub mod core;
pub mod ports;
pub mod tracing_setup;

pub use adapters::{HyperHttpClient, ProxyHandler, ProxyServer, TowerFileSystem};
pub use config::{ConfigError, ConfigValidator, RouteConfig, ServerConfig, load_config};
pub use crate::core::{HostAllowlist, Protocol, ProxyError, RouteAction, RouteRule, RouteTable};
