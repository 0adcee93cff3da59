use std::sync::Arc;
use std::time::Duration;

use hyper::body::{Bytes, to_bytes};
use hyper::client::HttpConnector;
use hyper::header::RETRY_AFTER;
use hyper::{Body, Client, Request, StatusCode};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use serde::de::DeserializeOwned;
use tokio::time::timeout;
use tracing::debug;
use webpki_roots::TLS_SERVER_ROOTS;

use crate::traits::{AdapterError, AdapterResult};

pub(crate) type HyperClient = Client<HttpsConnector<HttpConnector>, Body>;

#[allow(clippy::unnecessary_wraps)]
pub(crate) fn build_https_client() -> AdapterResult<HyperClient> {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|anchor| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    // Plain http is allowed so local proxies and gateways work.
    let mut http = HttpConnector::new();
    http.enforce_http(false);

    let connector = HttpsConnector::from((http, Arc::new(config)));

    Ok(Client::builder().build::<_, Body>(connector))
}

/// Status, body and rate-limit hint of a completed provider call.
pub(crate) struct RawResponse {
    status: StatusCode,
    retry_after: Option<Duration>,
    body: Bytes,
}

/// Sends `request`, bounding the whole exchange (headers and body) by `limit`.
pub(crate) async fn send(
    client: &HyperClient,
    request: Request<Body>,
    limit: Duration,
    provider: &str,
) -> AdapterResult<RawResponse> {
    let exchange = async {
        let response = client
            .request(request)
            .await
            .map_err(|err| AdapterError::transport(format!("{provider} request failed: {err}")))?;

        let status = response.status();
        debug!(provider, %status, "provider responded");
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = to_bytes(response.into_body()).await.map_err(|err| {
            AdapterError::transport(format!("failed to read {provider} response: {err}"))
        })?;

        Ok::<_, AdapterError>(RawResponse {
            status,
            retry_after,
            body,
        })
    };

    timeout(limit, exchange)
        .await
        .map_err(|_| AdapterError::transport(format!("{provider} request timed out")))?
}

impl RawResponse {
    /// Decodes a successful JSON body, mapping error statuses to adapter errors.
    pub(crate) fn decode<T: DeserializeOwned>(&self, provider: &str) -> AdapterResult<T> {
        if self.status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AdapterError::RateLimited {
                retry_after: self.retry_after,
            });
        }

        if !self.status.is_success() {
            let reason = String::from_utf8_lossy(&self.body);
            return Err(AdapterError::Response {
                reason: format!("{provider} returned {}: {reason}", self.status),
            });
        }

        serde_json::from_slice(&self.body).map_err(|err| AdapterError::Response {
            reason: format!("failed to decode {provider} response: {err}"),
        })
    }
}
