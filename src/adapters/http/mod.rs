pub mod server;

pub use server::ProxyServer;
