pub mod file_system;
pub mod http;
pub mod http_client;
pub mod http_handler;

pub use file_system::TowerFileSystem;
pub use http::server::ProxyServer;
pub use http_client::HyperHttpClient;
pub use http_handler::ProxyHandler;
