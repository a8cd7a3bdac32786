use axum::body::Body;
use hyper::body::Incoming;
use hyper::{Request, Response};
use std::future::Future;
use thiserror::Error;

/// Whether the upstream's TLS certificate must verify. Plain-HTTP targets
/// ignore this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsPolicy {
    VerifyUpstream,
    AcceptInvalidCerts,
}

/// Custom error type for HTTP client operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpClientError {
    /// The connection to the backend could not be established.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The backend accepted the connection but closed it before completing
    /// the exchange.
    #[error("Upstream reset: {0}")]
    UpstreamReset(String),

    /// The request could not be sent as constructed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for HTTP client operations
pub type HttpClientResult<T> = Result<T, HttpClientError>;

/// HttpClient defines the port (interface) for making HTTP requests to
/// backend origins. The response body is handed back as the raw incoming
/// stream so the caller can relay it without buffering.
pub trait HttpClient: Send + Sync + 'static {
    fn send_request(
        &self,
        req: Request<Body>,
        tls: TlsPolicy,
    ) -> impl Future<Output = HttpClientResult<Response<Incoming>>> + Send;
}
