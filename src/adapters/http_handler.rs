use std::sync::Arc;

use axum::body::Body;
use futures_util::future;
use hyper::header::{CONNECTION, CONTENT_TYPE, HOST, UPGRADE};
use hyper::{HeaderMap, Request, Response, StatusCode, Uri, Version, header::HeaderValue};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncWriteExt, copy_bidirectional};
use url::Url;

use crate::adapters::file_system::TowerFileSystem;
use crate::adapters::http_client::HyperHttpClient;
use crate::core::allowlist::HostAllowlist;
use crate::core::error::ProxyError;
use crate::core::rules::{Protocol, RouteAction, RouteRule, RouteTable};
use crate::ports::file_system::FileSystem;
use crate::ports::http_client::{HttpClient, HttpClientError, TlsPolicy};

/// Hop-by-hop headers (RFC 7230 §6.1) that must not travel past the proxy.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "proxy-connection",
];

/// The request-routing layer: one instance, shared by every connection.
/// Owns no mutable state; the route table and allowlist are read-only and
/// everything per-request lives on the task handling that request.
///
/// Each request walks Host gate -> matcher -> rewriter -> dispatch. The
/// dispatch leg is dual-protocol: plain requests are streamed to the target
/// origin and back, WebSocket upgrades are spliced into a bidirectional
/// byte relay after the upstream confirms the handshake.
#[derive(Clone)]
pub struct ProxyHandler {
    table: Arc<RouteTable>,
    allowlist: Arc<HostAllowlist>,
    http_client: Arc<HyperHttpClient>,
    file_system: Arc<TowerFileSystem>,
}

impl ProxyHandler {
    pub fn new(
        table: Arc<RouteTable>,
        allowlist: Arc<HostAllowlist>,
        http_client: Arc<HyperHttpClient>,
        file_system: Arc<TowerFileSystem>,
    ) -> Self {
        Self {
            table,
            allowlist,
            http_client,
            file_system,
        }
    }

    pub async fn handle_request(&self, req: Request<Body>) -> Response<Body> {
        // Host gate first: a rejected request must never reach an upstream.
        let host = requested_host(&req);
        if !self.allowlist.is_allowed(&host) {
            let err = ProxyError::HostRejected { host };
            tracing::warn!(%err, path = %req.uri().path(), "request blocked");
            return error_response(&err);
        }

        let path = req.uri().path().to_string();
        let Some(rule) = self.table.match_path(&path) else {
            let err = ProxyError::NoRouteMatched { path };
            tracing::debug!(%err, "falling through to 404");
            return error_response(&err);
        };
        tracing::debug!(prefix = %rule.prefix, %path, "route matched");

        match &rule.action {
            RouteAction::ServeDir { root } => self.serve_static(root, rule, req).await,
            RouteAction::Forward {
                target,
                protocol,
                preserve_host,
                insecure,
                ..
            } => {
                let tls = if *insecure {
                    TlsPolicy::AcceptInvalidCerts
                } else {
                    TlsPolicy::VerifyUpstream
                };
                match protocol {
                    Protocol::Websocket if is_upgrade_request(&req) => {
                        self.relay_upgrade(rule, target, *preserve_host, tls, req)
                            .await
                    }
                    // Non-upgrade traffic on a websocket prefix (socket.io
                    // long-polling) and all plain HTTP rules take the same
                    // request/response path.
                    _ => {
                        self.forward_http(rule, target, *preserve_host, tls, req)
                            .await
                    }
                }
            }
        }
    }

    async fn serve_static(&self, root: &str, rule: &RouteRule, req: Request<Body>) -> Response<Body> {
        let rel_path = rule.rewrite_path(req.uri().path());
        match self.file_system.serve_file(root, &rel_path, req).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(%err, root, "static file error");
                plain_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }

    /// HTTP variant: stream the request body up, stream the response back
    /// verbatim. A connect failure yields a clean 502 with no partial body;
    /// an upstream reset mid-response propagates as a stream error and the
    /// client connection is closed abruptly.
    async fn forward_http(
        &self,
        rule: &RouteRule,
        target: &Url,
        preserve_host: bool,
        tls: TlsPolicy,
        req: Request<Body>,
    ) -> Response<Body> {
        let (mut parts, body) = req.into_parts();

        let outbound_path = rule.rewrite_path(parts.uri.path());
        parts.uri = match upstream_uri(target, &outbound_path, parts.uri.query()) {
            Ok(uri) => uri,
            Err(err) => return error_response(&err),
        };
        parts.version = Version::HTTP_11;

        strip_hop_by_hop_headers(&mut parts.headers);
        if !preserve_host {
            if let Some(authority) = target_host_value(target) {
                parts.headers.insert(HOST, authority);
            }
        }
        // Origin and Referer deliberately pass through untouched.

        match self
            .http_client
            .send_request(Request::from_parts(parts, body), tls)
            .await
        {
            Ok(upstream_resp) => {
                let (mut parts, incoming) = upstream_resp.into_parts();
                strip_hop_by_hop_headers(&mut parts.headers);
                Response::from_parts(parts, Body::new(incoming))
            }
            Err(err) => {
                let err = client_error_to_proxy_error(err, target);
                tracing::warn!(%err, prefix = %rule.prefix, "http forward failed");
                error_response(&err)
            }
        }
    }

    /// WebSocket variant: forward the handshake with the same path rewrite,
    /// and on a 101 from the upstream splice both upgraded connections into
    /// an unbuffered byte relay. Frames are opaque here; either end closing
    /// tears down the other side.
    async fn relay_upgrade(
        &self,
        rule: &RouteRule,
        target: &Url,
        preserve_host: bool,
        tls: TlsPolicy,
        mut req: Request<Body>,
    ) -> Response<Body> {
        let outbound_path = rule.rewrite_path(req.uri().path());
        let uri = match upstream_uri(target, &outbound_path, req.uri().query()) {
            Ok(uri) => uri,
            Err(err) => return error_response(&err),
        };

        // The handshake request keeps Connection/Upgrade and the
        // Sec-WebSocket-* headers; the upstream needs them to complete the
        // upgrade. Only connection-management noise is dropped.
        let mut outbound = Request::new(Body::empty());
        *outbound.method_mut() = req.method().clone();
        *outbound.uri_mut() = uri;
        *outbound.version_mut() = Version::HTTP_11;
        for (name, value) in req.headers() {
            outbound.headers_mut().append(name, value.clone());
        }
        for name in ["proxy-connection", "keep-alive", "te", "transfer-encoding", "trailers"] {
            outbound.headers_mut().remove(name);
        }
        if !preserve_host {
            if let Some(authority) = target_host_value(target) {
                outbound.headers_mut().insert(HOST, authority);
            }
        }

        let upstream_resp = match self.http_client.send_request(outbound, tls).await {
            Ok(resp) => resp,
            Err(err) => {
                let err = client_error_to_proxy_error(err, target);
                tracing::warn!(%err, prefix = %rule.prefix, "websocket handshake failed");
                return error_response(&err);
            }
        };

        if upstream_resp.status() != StatusCode::SWITCHING_PROTOCOLS {
            // The upstream declined; relay its answer verbatim and never
            // enter the relay.
            let err = ProxyError::UpgradeRejected {
                status: upstream_resp.status(),
            };
            tracing::warn!(%err, prefix = %rule.prefix, "websocket upgrade rejected");
            let (mut parts, incoming) = upstream_resp.into_parts();
            strip_hop_by_hop_headers(&mut parts.headers);
            return Response::from_parts(parts, Body::new(incoming));
        }

        // Grab the caller's pending upgrade before answering, and mirror the
        // upstream's handshake headers back on the 101.
        let client_upgrade = hyper::upgrade::on(&mut req);
        let handshake_headers = upstream_resp.headers().clone();

        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
        for (name, value) in handshake_headers.iter() {
            response.headers_mut().append(name, value.clone());
        }
        response
            .headers_mut()
            .insert(CONNECTION, HeaderValue::from_static("upgrade"));

        let prefix = rule.prefix.clone();
        tokio::spawn(async move {
            match future::try_join(client_upgrade, hyper::upgrade::on(upstream_resp)).await {
                Ok((client_upgraded, upstream_upgraded)) => {
                    let mut client_io = TokioIo::new(client_upgraded);
                    let mut upstream_io = TokioIo::new(upstream_upgraded);
                    match copy_bidirectional(&mut client_io, &mut upstream_io).await {
                        Ok((sent, received)) => {
                            tracing::debug!(%prefix, sent, received, "websocket relay closed");
                        }
                        Err(err) => {
                            tracing::warn!(%prefix, %err, "websocket relay error");
                        }
                    }
                    // Whichever side is still open gets shut down so no
                    // upstream socket outlives its client.
                    let _ = client_io.shutdown().await;
                    let _ = upstream_io.shutdown().await;
                }
                Err(err) => {
                    tracing::warn!(%prefix, %err, "websocket upgrade did not complete");
                }
            }
        });

        response
    }
}

/// Host value the client asked for: the Host header for HTTP/1.1, the URI
/// authority for HTTP/2 requests (where Host is carried as `:authority`).
fn requested_host(req: &Request<Body>) -> String {
    req.headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default()
}

fn is_upgrade_request(req: &Request<Body>) -> bool {
    let has_connection_upgrade = req
        .headers()
        .get(CONNECTION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("upgrade"))
        .unwrap_or(false);
    has_connection_upgrade && req.headers().contains_key(UPGRADE)
}

fn strip_hop_by_hop_headers(headers: &mut HeaderMap) {
    // Headers named in Connection are hop-by-hop too.
    if let Some(connection) = headers
        .get(CONNECTION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
    {
        for token in connection.split(',') {
            let name = token.trim().to_ascii_lowercase();
            if !name.is_empty() {
                headers.remove(name.as_str());
            }
        }
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

/// Join the target origin (which may carry a base path), the rewritten path
/// remainder, and the untouched query string.
fn upstream_uri(target: &Url, outbound_path: &str, query: Option<&str>) -> Result<Uri, ProxyError> {
    let base = target.as_str().trim_end_matches('/');
    let uri = match query {
        Some(query) => format!("{base}{outbound_path}?{query}"),
        None => format!("{base}{outbound_path}"),
    };
    uri.parse::<Uri>().map_err(|e| ProxyError::UpstreamUnreachable {
        target: target.to_string(),
        reason: format!("invalid upstream uri {uri:?}: {e}"),
    })
}

/// Authority to put in the outbound Host header when the rule rewrites it.
fn target_host_value(target: &Url) -> Option<HeaderValue> {
    let host = target.host_str()?;
    let authority = match target.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    HeaderValue::from_str(&authority).ok()
}

fn client_error_to_proxy_error(err: HttpClientError, target: &Url) -> ProxyError {
    match err {
        HttpClientError::ConnectionError(reason) => ProxyError::UpstreamUnreachable {
            target: target.to_string(),
            reason,
        },
        HttpClientError::UpstreamReset(reason) => ProxyError::UpstreamReset {
            target: target.to_string(),
            reason,
        },
        HttpClientError::InvalidRequest(reason) => ProxyError::UpstreamUnreachable {
            target: target.to_string(),
            reason,
        },
    }
}

fn error_response(err: &ProxyError) -> Response<Body> {
    plain_response(err.status(), err.to_string())
}

fn plain_response(status: StatusCode, message: impl Into<String>) -> Response<Body> {
    let mut response = Response::new(Body::from(message.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
