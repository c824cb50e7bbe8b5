use crate::config::ClientConfig;
use crate::dispatcher::{Dispatcher, RequestOptions};
use crate::error::{SearchflowError, SearchflowResult};
use crate::host::{Capability, HostRegistry};
use crate::metrics::Metrics;
use crate::models::{
    BatchAction, BatchRequest, BatchResponse, BatchWriteParams, BrowseParams, BrowseResponse,
    GetApiKeyResponse, GetTaskResponse, OperationIndexParams, OperationType, ScopeType,
    SearchPageParams, SearchPageResponse, TaskHandle, TaskStatus, UpdatedAtResponse,
};
use crate::retry::RetryOptions;
use crate::transport::{HttpRequest, HyperRequester, Requester, encode_segment};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Client for one search application.
///
/// Cloning is cheap; clones share the dispatcher, so host health learned by
/// one clone benefits the others.
#[derive(Clone)]
pub struct SearchClient {
    config: Arc<ClientConfig>,
    dispatcher: Arc<Dispatcher>,
}

impl SearchClient {
    /// Build a client that talks HTTP(S) to the configured hosts
    pub fn new(config: ClientConfig) -> SearchflowResult<Self> {
        let requester = HyperRequester::new(&config)?;
        Self::with_requester(config, Arc::new(requester))
    }

    /// Build a client over a custom requester
    pub fn with_requester(
        config: ClientConfig,
        requester: Arc<dyn Requester>,
    ) -> SearchflowResult<Self> {
        config
            .validate()
            .map_err(|e| SearchflowError::Config(e.to_string()))?;

        let registry = HostRegistry::new(
            config.effective_hosts(),
            config.shuffle_hosts,
            config.host_down_ttl(),
        )?;
        info!(
            "Search client ready for {} with {} hosts",
            config.application_id,
            registry.endpoints().len()
        );

        let dispatcher = Dispatcher::new(
            registry,
            requester,
            config.timeouts.clone(),
            Metrics::new(),
        );

        Ok(Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn registry(&self) -> &HostRegistry {
        self.dispatcher.registry()
    }

    pub fn metrics(&self) -> &Metrics {
        self.dispatcher.metrics()
    }

    /// Poll budget from configuration
    pub fn retry_options(&self) -> RetryOptions {
        RetryOptions::from_config(&self.config.retry)
    }

    /// Submit one batch of records; the service applies it asynchronously
    pub async fn batch<T: Serialize>(
        &self,
        index_name: &str,
        records: &[T],
        action: BatchAction,
        options: &RequestOptions,
    ) -> SearchflowResult<(TaskHandle, BatchResponse)> {
        let params = BatchWriteParams {
            requests: records
                .iter()
                .map(|body| BatchRequest { action, body })
                .collect(),
        };
        let request = HttpRequest::post(format!("/1/indexes/{}/batch", encode_segment(index_name)))
            .with_json(&params)?;

        let resp: BatchResponse = self
            .dispatcher
            .dispatch_json(Capability::Write, request, options)
            .await?;
        self.metrics().record_batch();
        debug!(
            "Submitted batch of {} records to {} (task {})",
            records.len(),
            index_name,
            resp.task_id
        );

        Ok((TaskHandle::new(resp.task_id, index_name), resp))
    }

    /// Current status of an asynchronous task
    pub async fn get_task(
        &self,
        handle: &TaskHandle,
        options: &RequestOptions,
    ) -> SearchflowResult<TaskStatus> {
        let path = match &handle.index_name {
            Some(index_name) => format!(
                "/1/indexes/{}/task/{}",
                encode_segment(index_name),
                handle.task_id
            ),
            None => format!("/1/task/{}", handle.task_id),
        };

        self.metrics().record_poll();
        let resp: GetTaskResponse = self
            .dispatcher
            .dispatch_json(Capability::Read, HttpRequest::get(path), options)
            .await?;
        Ok(resp.status)
    }

    /// Fetch an API key; a missing key surfaces as a 404 transport error
    pub async fn get_api_key(
        &self,
        key: &str,
        options: &RequestOptions,
    ) -> SearchflowResult<GetApiKeyResponse> {
        let request = HttpRequest::get(format!("/1/keys/{}", encode_segment(key)));
        self.dispatcher
            .dispatch_json(Capability::Read, request, options)
            .await
    }

    /// Copy or move an index
    pub async fn operation_index(
        &self,
        index_name: &str,
        params: &OperationIndexParams,
        options: &RequestOptions,
    ) -> SearchflowResult<TaskHandle> {
        let request = HttpRequest::post(format!(
            "/1/indexes/{}/operation",
            encode_segment(index_name)
        ))
        .with_json(params)?;

        let resp: UpdatedAtResponse = self
            .dispatcher
            .dispatch_json(Capability::Write, request, options)
            .await?;
        info!(
            "{:?} {} -> {} accepted (task {})",
            params.operation, index_name, params.destination, resp.task_id
        );

        // The task belongs to the source index
        Ok(TaskHandle::new(resp.task_id, index_name))
    }

    /// Copy an index, optionally restricted to some of its parts
    pub async fn copy_index(
        &self,
        source: &str,
        destination: &str,
        scope: Option<Vec<ScopeType>>,
    ) -> SearchflowResult<TaskHandle> {
        let params = OperationIndexParams {
            operation: OperationType::Copy,
            destination: destination.to_string(),
            scope,
        };
        self.operation_index(source, &params, &RequestOptions::default())
            .await
    }

    /// Move an index onto another name, replacing it
    pub async fn move_index(&self, source: &str, destination: &str) -> SearchflowResult<TaskHandle> {
        let params = OperationIndexParams {
            operation: OperationType::Move,
            destination: destination.to_string(),
            scope: None,
        };
        self.operation_index(source, &params, &RequestOptions::default())
            .await
    }

    /// One page of a cursor browse
    pub async fn browse_page(
        &self,
        index_name: &str,
        params: &BrowseParams,
        options: &RequestOptions,
    ) -> SearchflowResult<BrowseResponse> {
        let request = HttpRequest::post(format!(
            "/1/indexes/{}/browse",
            encode_segment(index_name)
        ))
        .with_json(params)?;
        self.dispatcher
            .dispatch_json(Capability::Read, request, options)
            .await
    }

    /// One page of rules
    pub async fn search_rules_page(
        &self,
        index_name: &str,
        params: &SearchPageParams,
        options: &RequestOptions,
    ) -> SearchflowResult<SearchPageResponse> {
        self.search_page(index_name, "rules", params, options).await
    }

    /// One page of synonyms
    pub async fn search_synonyms_page(
        &self,
        index_name: &str,
        params: &SearchPageParams,
        options: &RequestOptions,
    ) -> SearchflowResult<SearchPageResponse> {
        self.search_page(index_name, "synonyms", params, options)
            .await
    }

    pub(crate) async fn search_page(
        &self,
        index_name: &str,
        kind: &str,
        params: &SearchPageParams,
        options: &RequestOptions,
    ) -> SearchflowResult<SearchPageResponse> {
        let request = HttpRequest::post(format!(
            "/1/indexes/{}/{}/search",
            encode_segment(index_name),
            kind
        ))
        .with_json(params)?;
        self.dispatcher
            .dispatch_json(Capability::Read, request, options)
            .await
    }
}
