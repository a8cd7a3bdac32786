use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::models::{RouteConfig, ServerConfig};

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Configuration validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid URL in field '{field}': {url} - {reason}")]
    InvalidUrl {
        field: String,
        url: String,
        reason: String,
    },

    #[error("Invalid listen address: {address} - {reason}")]
    InvalidListenAddress { address: String, reason: String },
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validator with detailed error reporting. Runs once at
/// startup; any failure here is fatal, since a partially valid route table
/// would route traffic incorrectly.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a complete server configuration, collecting every problem
    /// before failing so a broken config can be fixed in one pass.
    pub fn validate(config: &ServerConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if config.routes.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "routes".to_string(),
            });
        } else {
            for (prefix, route_config) in &config.routes {
                Self::validate_single_route(prefix, route_config, &mut errors);
            }
        }

        for host in &config.allowed_hosts {
            if host.trim().is_empty() {
                errors.push(ValidationError::InvalidField {
                    field: "allowed_hosts".to_string(),
                    message: "entries must be non-empty hostnames".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:8080' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Validate a single route configuration
    fn validate_single_route(
        prefix: &str,
        config: &RouteConfig,
        errors: &mut Vec<ValidationError>,
    ) {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::InvalidField {
                field: format!("route prefix: {prefix}"),
                message: "Route prefixes must start with '/'".to_string(),
            });
        }
        if prefix.len() > 1 && prefix.ends_with('/') {
            errors.push(ValidationError::InvalidField {
                field: format!("route prefix: {prefix}"),
                message: "Route prefixes must not end with '/' (matching is segment-based)"
                    .to_string(),
            });
        }

        match config {
            RouteConfig::Static { root } => {
                if root.is_empty() {
                    errors.push(ValidationError::MissingField {
                        field: format!("root for static route '{prefix}'"),
                    });
                }
            }
            RouteConfig::Proxy {
                target, rewrite, ..
            }
            | RouteConfig::Websocket {
                target, rewrite, ..
            } => {
                if let Err(e) = Self::validate_target_origin(prefix, target) {
                    errors.push(e);
                }
                if let Some(rewrite) = rewrite {
                    if !rewrite.starts_with('/') {
                        errors.push(ValidationError::InvalidField {
                            field: format!("rewrite for route '{prefix}'"),
                            message: "Rewrite prefixes must start with '/'".to_string(),
                        });
                    }
                }
            }
        }
    }

    /// Validate that a target origin is an absolute http(s)/ws(s) URL with a
    /// host. The host may be a service name (e.g. "webserver") resolved by
    /// the dev environment; no address literal is required.
    fn validate_target_origin(prefix: &str, target: &str) -> ValidationResult<()> {
        let field = format!("target for route '{prefix}'");
        let url = Url::parse(target).map_err(|e| ValidationError::InvalidUrl {
            field: field.clone(),
            url: target.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" | "ws" | "wss" => {}
            other => {
                return Err(ValidationError::InvalidUrl {
                    field,
                    url: target.to_string(),
                    reason: format!("unsupported scheme '{other}'"),
                });
            }
        }

        if url.host_str().is_none() {
            return Err(ValidationError::InvalidUrl {
                field,
                url: target.to_string(),
                reason: "target origin has no host".to_string(),
            });
        }

        Ok(())
    }

    /// Format multiple validation errors into a single message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        errors
            .iter()
            .enumerate()
            .map(|(i, e)| format!("  {}. {}", i + 1, e))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
