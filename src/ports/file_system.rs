use axum::body::Body;
use hyper::{Request, Response};
use std::future::Future;
use thiserror::Error;

/// Error type for file system operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FileSystemError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Result type for file system operations
pub type FileSystemResult<T> = Result<T, FileSystemError>;

/// FileSystem defines the port (interface) for the static fallback handler
/// that serves the UI bundle for paths no proxy rule claims.
pub trait FileSystem: Send + Sync + 'static {
    /// Serve a file from `root` at the path relative to the matched prefix.
    fn serve_file(
        &self,
        root: &str,
        path: &str,
        req: Request<Body>,
    ) -> impl Future<Output = FileSystemResult<Response<Body>>> + Send;
}
