use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use hyper::body::Incoming;
use hyper::{Request, Response};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};

use crate::ports::http_client::{HttpClient, HttpClientError, HttpClientResult, TlsPolicy};

const UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 5;

type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Hyper-based upstream client. Two connection pools share one TCP
/// connector: the default pool verifies upstream certificates against the
/// webpki root store, the other accepts anything and backs routes marked
/// `insecure` (self-signed dev certificates). Plain-HTTP targets never touch
/// TLS at all.
pub struct HyperHttpClient {
    verifying: UpstreamClient,
    trusting: UpstreamClient,
}

impl HyperHttpClient {
    pub fn new() -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(UPSTREAM_CONNECT_TIMEOUT_SECS)));
        connector.enforce_http(false);

        let verifying_tls = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(connector.clone());

        let trusting_config = rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerification::new()))
            .with_no_client_auth();
        let trusting_tls = HttpsConnectorBuilder::new()
            .with_tls_config(trusting_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(connector);

        Self {
            verifying: Client::builder(TokioExecutor::new()).build(verifying_tls),
            trusting: Client::builder(TokioExecutor::new()).build(trusting_tls),
        }
    }

    fn pool(&self, tls: TlsPolicy) -> &UpstreamClient {
        match tls {
            TlsPolicy::VerifyUpstream => &self.verifying,
            TlsPolicy::AcceptInvalidCerts => &self.trusting,
        }
    }
}

impl Default for HyperHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for HyperHttpClient {
    fn send_request(
        &self,
        req: Request<Body>,
        tls: TlsPolicy,
    ) -> impl Future<Output = HttpClientResult<Response<Incoming>>> + Send {
        let client = self.pool(tls).clone();
        async move {
            let method = req.method().clone();
            let uri = req.uri().clone();
            tracing::debug!(%method, %uri, "forwarding to upstream");

            client.request(req).await.map_err(|err| {
                tracing::warn!(%method, %uri, error = %err, "upstream request failed");
                classify_client_error(err)
            })
        }
    }
}

/// A connect-phase failure means the upstream was never reached; anything
/// after that is the upstream dropping a connection it had accepted.
fn classify_client_error(err: hyper_util::client::legacy::Error) -> HttpClientError {
    let mut message = err.to_string();
    if let Some(source) = std::error::Error::source(&err) {
        message = format!("{message}: {source}");
    }
    if err.is_connect() {
        HttpClientError::ConnectionError(message)
    } else {
        HttpClientError::UpstreamReset(message)
    }
}

/// Certificate verifier that accepts any chain while still checking the
/// handshake signatures. Only reachable through routes that opted in with
/// `insecure: true`.
#[derive(Debug)]
struct NoVerification(CryptoProvider);

impl NoVerification {
    fn new() -> Self {
        Self(rustls::crypto::aws_lc_rs::default_provider())
    }
}

impl ServerCertVerifier for NoVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
