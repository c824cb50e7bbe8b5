//! Multi-host failover.
//!
//! A dispatch walks the capability-matching hosts in registry order. A
//! retryable failure marks the host down and moves on to the next one; a
//! non-retryable failure stops the walk immediately. This changes *which*
//! host is tried, never *when*: re-polling lives in [`crate::retry`].

use crate::config::TimeoutConfig;
use crate::error::{SearchflowError, SearchflowResult, TransportError};
use crate::host::{Capability, HostRegistry};
use crate::metrics::{Metrics, Timer};
use crate::transport::{HttpRequest, HttpResponse, Requester};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-dispatch overrides
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Replaces the capability's base timeout for each attempt
    pub timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Sends requests to the first healthy host able to serve them
pub struct Dispatcher {
    registry: HostRegistry,
    requester: Arc<dyn Requester>,
    timeouts: TimeoutConfig,
    metrics: Metrics,
}

impl Dispatcher {
    pub fn new(
        registry: HostRegistry,
        requester: Arc<dyn Requester>,
        timeouts: TimeoutConfig,
        metrics: Metrics,
    ) -> Self {
        Self {
            registry,
            requester,
            timeouts,
            metrics,
        }
    }

    pub fn registry(&self) -> &HostRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Send `request` to the hosts accepting `capability` until one answers.
    ///
    /// Returns the first 2xx response. Fails with the host's error on a
    /// non-retryable failure, or with
    /// [`SearchflowError::AllHostsUnreachable`] once every candidate failed.
    pub async fn dispatch(
        &self,
        capability: Capability,
        request: HttpRequest,
        options: &RequestOptions,
    ) -> SearchflowResult<HttpResponse> {
        let mut request = request;
        request.headers.extend(options.headers.iter().cloned());
        request.query.extend(options.query.iter().cloned());

        let candidates = self.registry.candidates(capability)?;
        let base_timeout = options
            .timeout
            .unwrap_or_else(|| self.timeouts.for_capability(capability));
        let timer = Timer::start();
        let mut failures = Vec::new();

        for endpoint in candidates {
            let timeout =
                base_timeout.saturating_mul(self.registry.timeout_multiplier(&endpoint.address));
            debug!(
                "Dispatching {} {} to {} (timeout: {:?})",
                request.method, request.path, endpoint.address, timeout
            );

            let outcome = match self.requester.send(&endpoint, &request, timeout).await {
                Ok(resp) if resp.is_success() => Ok(resp),
                Ok(resp) => Err(TransportError::ErrorStatus {
                    host: endpoint.address.clone(),
                    status: resp.status,
                    message: resp.error_message(),
                }),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(resp) => {
                    self.registry.mark_up(&endpoint.address);
                    self.metrics.record_dispatch(true, timer.elapsed());
                    return Ok(resp);
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        "Host {} failed, trying next host: {}",
                        endpoint.address, e
                    );
                    self.registry.mark_down(&endpoint.address, e.is_timeout());
                    self.metrics.record_failover();
                    failures.push(e);
                }
                Err(e) => {
                    // A client error reaches the same verdict on every host
                    self.metrics.record_non_retryable();
                    self.metrics.record_dispatch(false, timer.elapsed());
                    return Err(SearchflowError::Transport(e));
                }
            }
        }

        warn!(
            "All {} hosts unreachable for {} {}",
            capability, request.method, request.path
        );
        self.metrics.record_dispatch(false, timer.elapsed());
        Err(SearchflowError::AllHostsUnreachable {
            capability,
            failures,
        })
    }

    /// Dispatch and decode a JSON response body
    pub async fn dispatch_json<T: DeserializeOwned>(
        &self,
        capability: Capability,
        request: HttpRequest,
        options: &RequestOptions,
    ) -> SearchflowResult<T> {
        let resp = self.dispatch(capability, request, options).await?;
        Ok(resp.json()?)
    }
}
