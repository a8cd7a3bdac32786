use hyper::StatusCode;
use thiserror::Error;

/// Per-connection failures of the routing layer. None of these are fatal to
/// the server process; each is answered on the connection it occurred on.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// The Host header was not in the allowlist. Rejected before any routing
    /// attempt; no upstream is contacted.
    #[error("host {host:?} is not in the allowed hosts list")]
    HostRejected { host: String },

    /// No route prefix matched the request path.
    #[error("no route matches path {path:?}")]
    NoRouteMatched { path: String },

    /// The connection to the target origin failed. Not retried: the router
    /// does not know whether the underlying method is idempotent.
    #[error("upstream {target} unreachable: {reason}")]
    UpstreamUnreachable { target: String, reason: String },

    /// The upstream closed the connection before completing the response.
    #[error("upstream {target} reset the connection: {reason}")]
    UpstreamReset { target: String, reason: String },

    /// The upstream declined a WebSocket handshake; its response is relayed
    /// verbatim to the caller.
    #[error("upstream rejected the websocket upgrade with status {status}")]
    UpgradeRejected { status: StatusCode },
}

impl ProxyError {
    /// Status code used when this error has to be answered by the proxy
    /// itself (i.e. before any upstream bytes reached the caller).
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::HostRejected { .. } => StatusCode::FORBIDDEN,
            ProxyError::NoRouteMatched { .. } => StatusCode::NOT_FOUND,
            ProxyError::UpstreamUnreachable { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamReset { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::UpgradeRejected { status } => *status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_maps_to_forbidden() {
        let err = ProxyError::HostRejected {
            host: "evil.example".to_string(),
        };
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn upstream_failures_map_to_bad_gateway() {
        let unreachable = ProxyError::UpstreamUnreachable {
            target: "http://ia:6001/".to_string(),
            reason: "connection refused".to_string(),
        };
        let reset = ProxyError::UpstreamReset {
            target: "http://webserver:5001/api/".to_string(),
            reason: "connection reset by peer".to_string(),
        };
        assert_eq!(unreachable.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(reset.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn upgrade_rejection_keeps_the_upstream_status() {
        let err = ProxyError::UpgradeRejected {
            status: StatusCode::UNAUTHORIZED,
        };
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
