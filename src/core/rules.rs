use thiserror::Error;
use url::Url;

use crate::config::models::{RouteConfig, ServerConfig};

/// Wire protocol a forwarding rule speaks to its upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Transient request/response exchanges.
    Http,
    /// Long-lived bidirectional streams established by an HTTP upgrade.
    /// Plain requests on the same prefix (socket.io long-polling) are still
    /// forwarded as HTTP.
    Websocket,
}

/// What to do with a request once its prefix matched.
#[derive(Debug, Clone)]
pub enum RouteAction {
    Forward {
        /// Upstream origin, possibly carrying a base path that the rewritten
        /// remainder is appended to. ws/wss schemes are normalized to
        /// http/https at construction; the upgrade happens over HTTP anyway.
        target: Url,
        protocol: Protocol,
        /// Replacement prefix prepended to the remainder after the matched
        /// prefix is stripped. None or "/" means strip only.
        rewrite: Option<String>,
        /// Keep the caller's Host header instead of the target authority.
        preserve_host: bool,
        /// Skip upstream certificate verification (self-signed dev certs).
        insecure: bool,
    },
    ServeDir { root: String },
}

impl std::fmt::Display for RouteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteAction::Forward {
                target,
                protocol: Protocol::Http,
                ..
            } => write!(f, "proxy {target}"),
            RouteAction::Forward {
                target,
                protocol: Protocol::Websocket,
                ..
            } => write!(f, "websocket {target}"),
            RouteAction::ServeDir { root } => write!(f, "static {root}"),
        }
    }
}

/// One compiled route. Built once at startup, immutable afterwards.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pub prefix: String,
    pub action: RouteAction,
}

impl RouteRule {
    /// Segment-boundary prefix test: the path must equal the prefix or
    /// continue with '/' right after it, so "/apix" never matches "/api".
    pub fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || self.prefix.ends_with('/'),
            None => false,
        }
    }

    /// Compute the outbound path for a path this rule matched: strip the
    /// prefix, prepend the replacement prefix if one is configured. Pure;
    /// the query string is not part of the path and is carried separately.
    pub fn rewrite_path(&self, path: &str) -> String {
        let stripped = path.strip_prefix(self.prefix.as_str()).unwrap_or(path);
        match &self.action {
            RouteAction::Forward { rewrite, .. } => {
                let replacement = match rewrite.as_deref() {
                    // "/" means "strip the prefix, add nothing", same as None.
                    Some("/") | None => "",
                    Some(other) => other.trim_end_matches('/'),
                };
                let out = format!("{replacement}{stripped}");
                if out.is_empty() || out.starts_with('/') {
                    out
                } else {
                    format!("/{out}")
                }
            }
            RouteAction::ServeDir { .. } => stripped.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum RouteTableError {
    #[error("invalid target origin {target:?} for route {prefix:?}: {reason}")]
    InvalidTarget {
        prefix: String,
        target: String,
        reason: String,
    },
}

/// The route table: rules sorted by descending prefix length at construction,
/// matched first-match over that order. The sort makes the more specific of
/// two nested prefixes (e.g. "/api/assistants" vs "/api") win no matter how
/// the configuration declared them.
#[derive(Debug)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn from_config(config: &ServerConfig) -> Result<Self, RouteTableError> {
        let mut rules = Vec::with_capacity(config.routes.len());
        for (prefix, route_config) in &config.routes {
            rules.push(Self::compile_rule(prefix, route_config)?);
        }

        // Longest prefix first; tie-break on the literal for a deterministic
        // table (config routes come out of a map in arbitrary order).
        rules.sort_by(|a, b| {
            b.prefix
                .len()
                .cmp(&a.prefix.len())
                .then_with(|| a.prefix.cmp(&b.prefix))
        });

        Ok(Self { rules })
    }

    fn compile_rule(prefix: &str, config: &RouteConfig) -> Result<RouteRule, RouteTableError> {
        let action = match config {
            RouteConfig::Static { root } => RouteAction::ServeDir { root: root.clone() },
            RouteConfig::Proxy {
                target,
                rewrite,
                preserve_host,
                insecure,
            } => RouteAction::Forward {
                target: Self::parse_target(prefix, target)?,
                protocol: Protocol::Http,
                rewrite: rewrite.clone(),
                preserve_host: *preserve_host,
                insecure: *insecure,
            },
            RouteConfig::Websocket {
                target,
                rewrite,
                preserve_host,
                insecure,
            } => RouteAction::Forward {
                target: Self::parse_target(prefix, target)?,
                protocol: Protocol::Websocket,
                rewrite: rewrite.clone(),
                preserve_host: *preserve_host,
                insecure: *insecure,
            },
        };

        Ok(RouteRule {
            prefix: prefix.to_string(),
            action,
        })
    }

    fn parse_target(prefix: &str, target: &str) -> Result<Url, RouteTableError> {
        let invalid = |reason: String| RouteTableError::InvalidTarget {
            prefix: prefix.to_string(),
            target: target.to_string(),
            reason,
        };

        let mut url = Url::parse(target).map_err(|e| invalid(e.to_string()))?;
        if url.host_str().is_none() {
            return Err(invalid("target origin has no host".to_string()));
        }

        match url.scheme() {
            "http" | "https" => {}
            "ws" => url
                .set_scheme("http")
                .map_err(|_| invalid("cannot normalize ws scheme".to_string()))?,
            "wss" => url
                .set_scheme("https")
                .map_err(|_| invalid("cannot normalize wss scheme".to_string()))?,
            other => return Err(invalid(format!("unsupported scheme '{other}'"))),
        }

        Ok(url)
    }

    /// First rule in sorted order whose prefix matches the path.
    pub fn match_path(&self, path: &str) -> Option<&RouteRule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }

    /// Compiled rules in matching order, for startup logging.
    pub fn rules(&self) -> impl Iterator<Item = &RouteRule> {
        self.rules.iter()
    }
}
