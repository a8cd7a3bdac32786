pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{ConfigError, load_config};
pub use models::{RouteConfig, ServerConfig, ServerConfigBuilder};
pub use validation::{ConfigValidator, ValidationError};
