pub mod allowlist;
pub mod error;
pub mod rules;

pub use allowlist::HostAllowlist;
pub use error::ProxyError;
pub use rules::{Protocol, RouteAction, RouteRule, RouteTable};
