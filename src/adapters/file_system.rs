use axum::body::Body;
use http_body_util::BodyExt;
use hyper::{Request, Response};
use std::convert::TryFrom;
use std::future::Future;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::ports::file_system::{FileSystem, FileSystemError, FileSystemResult};

/// Static fallback handler backed by tower-http's ServeDir. Serves the built
/// UI bundle for everything the route table leaves to the catch-all rule.
#[derive(Debug, Default, Clone)]
pub struct TowerFileSystem;

impl TowerFileSystem {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileSystem for TowerFileSystem {
    fn serve_file(
        &self,
        root: &str,
        path: &str,
        req: Request<Body>,
    ) -> impl Future<Output = FileSystemResult<Response<Body>>> + Send {
        let root = root.to_string();
        let path = path.to_string();

        async move {
            // ServeDir resolves relative to its root, so the request path is
            // replaced by the remainder after the matched prefix.
            let uri_string = format!("/{}", path.trim_start_matches('/'));
            let uri = hyper::Uri::try_from(uri_string)
                .map_err(|e| FileSystemError::InvalidPath(e.to_string()))?;

            let (mut parts, body) = req.into_parts();
            parts.uri = uri;
            let new_req = Request::from_parts(parts, body);

            let serve_dir = ServeDir::new(&root);
            let response = serve_dir.oneshot(new_req).await.map_err(|e| {
                FileSystemError::IoError(std::io::Error::other(format!("ServeDir error: {e}")))
            })?;

            let (parts, tower_body) = response.into_parts();
            let body = Body::new(tower_body.map_err(|e| {
                tracing::error!("Error reading static file body: {}", e);
                axum::Error::new(e)
            }));

            Ok(Response::from_parts(parts, body))
        }
    }
}
