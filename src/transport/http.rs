use super::pool::ConnectionPool;
use super::{HttpRequest, HttpResponse, Requester};
use crate::config::ClientConfig;
use crate::error::{SearchflowError, SearchflowResult, TransportError};
use crate::host::Endpoint;
use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::Request;
use hyper::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::time::Duration;
use tracing::{debug, warn};

/// Keepalive for pooled connections
const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

/// Idle connections kept per host
const MAX_IDLE_CONNECTIONS: usize = 10;

pub const APPLICATION_ID_HEADER: &str = "x-searchflow-application-id";
pub const API_KEY_HEADER: &str = "x-searchflow-api-key";

/// HTTP requester over a pooled hyper client
pub struct HyperRequester {
    pool: ConnectionPool,
    default_headers: HeaderMap,
}

impl HyperRequester {
    pub fn new(config: &ClientConfig) -> SearchflowResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("searchflow/", env!("CARGO_PKG_VERSION"))),
        );
        default_headers.insert(
            APPLICATION_ID_HEADER,
            HeaderValue::from_str(&config.application_id)
                .map_err(|e| SearchflowError::Config(format!("Invalid application id: {}", e)))?,
        );
        if !config.api_key.is_empty() {
            let mut api_key = HeaderValue::from_str(&config.api_key)
                .map_err(|e| SearchflowError::Config(format!("Invalid API key: {}", e)))?;
            api_key.set_sensitive(true);
            default_headers.insert(API_KEY_HEADER, api_key);
        }

        Ok(Self {
            pool: ConnectionPool::with_config(
                KEEPALIVE_TIMEOUT,
                config.timeouts.connect(),
                MAX_IDLE_CONNECTIONS,
            ),
            default_headers,
        })
    }

    fn build_request(
        &self,
        endpoint: &Endpoint,
        request: &HttpRequest,
    ) -> Result<Request<Full<bytes::Bytes>>, TransportError> {
        let uri = format!("{}{}", endpoint.base_url(), request.path_and_query());
        let mut req = Request::builder()
            .method(request.method.clone())
            .uri(&uri)
            .body(Full::new(request.body.clone().unwrap_or_default()))
            .map_err(|e| TransportError::InvalidRequest {
                reason: format!("Failed to build request {} {}: {}", request.method, uri, e),
            })?;

        let headers = req.headers_mut();
        for (key, value) in &self.default_headers {
            headers.insert(key, value.clone());
        }
        if request.body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        for (key, value) in &request.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                TransportError::InvalidRequest {
                    reason: format!("Invalid header name {}: {}", key, e),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| TransportError::InvalidRequest {
                reason: format!("Invalid header value for {}: {}", key, e),
            })?;
            headers.insert(name, value);
        }

        Ok(req)
    }
}

#[async_trait]
impl Requester for HyperRequester {
    async fn send(
        &self,
        endpoint: &Endpoint,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let client = self.pool.get_client(&endpoint.address);
        let req = self.build_request(endpoint, request)?;

        debug!(
            "Sending {} {} to {}",
            request.method, request.path, endpoint.address
        );

        // The timeout covers the whole attempt, body included
        let attempt = async {
            let resp = client
                .request(req)
                .await
                .map_err(|e| TransportError::ConnectionFailed {
                    host: endpoint.address.clone(),
                    reason: e.to_string(),
                })?;
            let status = resp.status().as_u16();
            let body = resp
                .into_body()
                .collect()
                .await
                .map_err(|e| TransportError::ConnectionFailed {
                    host: endpoint.address.clone(),
                    reason: format!("Failed to read response body: {}", e),
                })?
                .to_bytes();
            Ok::<_, TransportError>(HttpResponse { status, body })
        };

        match tokio::time::timeout(timeout, attempt).await {
            Ok(result) => {
                if let Ok(resp) = &result {
                    debug!(
                        "Received {} from {} ({} bytes)",
                        resp.status,
                        endpoint.address,
                        resp.body.len()
                    );
                }
                result
            }
            Err(_) => {
                warn!(
                    "Request timeout: {} {} (host: {}, timeout: {:?})",
                    request.method, request.path, endpoint.address, timeout
                );
                Err(TransportError::Timeout {
                    host: endpoint.address.clone(),
                    timeout,
                })
            }
        }
    }
}
