//! Synchronous entry points.
//!
//! Each method drives the same future as its async counterpart on a runtime
//! owned by the client. Calling these from inside another tokio runtime
//! panics, as with any nested `block_on`.

use crate::batch::{BatchOutcome, ChunkedWriteOptions};
use crate::client::SearchClient;
use crate::config::ClientConfig;
use crate::error::SearchflowResult;
use crate::models::{
    ApiKey, ApiKeyOperation, BatchAction, BrowseParams, GetApiKeyResponse, ScopeType, TaskHandle,
    TaskStatus,
};
use crate::retry::RetryOptions;
use crate::workflow::ReplaceAllObjectsResponse;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;

pub struct BlockingClient {
    inner: SearchClient,
    runtime: Runtime,
}

impl BlockingClient {
    pub fn new(config: ClientConfig) -> SearchflowResult<Self> {
        Self::from_client(SearchClient::new(config)?)
    }

    /// Wrap an existing async client
    pub fn from_client(inner: SearchClient) -> SearchflowResult<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { inner, runtime })
    }

    /// The async client behind this facade
    pub fn client(&self) -> &SearchClient {
        &self.inner
    }

    pub fn wait_for_task(&self, handle: &TaskHandle) -> SearchflowResult<TaskStatus> {
        self.runtime.block_on(self.inner.wait_for_task(handle))
    }

    pub fn wait_for_task_with(
        &self,
        handle: &TaskHandle,
        retry: &RetryOptions,
        cancel: &CancellationToken,
    ) -> SearchflowResult<TaskStatus> {
        self.runtime
            .block_on(self.inner.wait_for_task_with(handle, retry, cancel))
    }

    /// Wait for every handle in order, without cancellation
    pub fn wait_for_tasks(&self, handles: &[TaskHandle], retry: &RetryOptions) -> SearchflowResult<()> {
        self.runtime.block_on(self.inner.wait_for_tasks(
            handles,
            retry,
            &CancellationToken::new(),
        ))
    }

    pub fn wait_for_api_key(
        &self,
        key: &str,
        operation: ApiKeyOperation,
        expected: Option<&ApiKey>,
        retry: &RetryOptions,
    ) -> SearchflowResult<Option<GetApiKeyResponse>> {
        self.runtime.block_on(self.inner.wait_for_api_key(
            key,
            operation,
            expected,
            retry,
            &CancellationToken::new(),
        ))
    }

    pub fn chunked_write<T: Serialize>(
        &self,
        index_name: &str,
        items: &[T],
        action: BatchAction,
        options: &ChunkedWriteOptions,
    ) -> SearchflowResult<Vec<BatchOutcome>> {
        self.runtime.block_on(self.inner.chunked_write(
            index_name,
            items,
            action,
            options,
            &CancellationToken::new(),
        ))
    }

    pub fn save_objects<T: Serialize>(
        &self,
        index_name: &str,
        objects: &[T],
        wait_for_completion: bool,
    ) -> SearchflowResult<Vec<BatchOutcome>> {
        self.runtime
            .block_on(self.inner.save_objects(index_name, objects, wait_for_completion))
    }

    pub fn delete_objects(
        &self,
        index_name: &str,
        object_ids: &[String],
        wait_for_completion: bool,
    ) -> SearchflowResult<Vec<BatchOutcome>> {
        self.runtime
            .block_on(self.inner.delete_objects(index_name, object_ids, wait_for_completion))
    }

    pub fn partial_update_objects<T: Serialize>(
        &self,
        index_name: &str,
        objects: &[T],
        create_if_not_exists: bool,
        wait_for_completion: bool,
    ) -> SearchflowResult<Vec<BatchOutcome>> {
        self.runtime.block_on(self.inner.partial_update_objects(
            index_name,
            objects,
            create_if_not_exists,
            wait_for_completion,
        ))
    }

    pub fn copy_index(
        &self,
        source: &str,
        destination: &str,
        scope: Option<Vec<ScopeType>>,
    ) -> SearchflowResult<TaskHandle> {
        self.runtime
            .block_on(self.inner.copy_index(source, destination, scope))
    }

    pub fn move_index(&self, source: &str, destination: &str) -> SearchflowResult<TaskHandle> {
        self.runtime.block_on(self.inner.move_index(source, destination))
    }

    pub fn browse_objects_all(
        &self,
        index_name: &str,
        params: BrowseParams,
    ) -> SearchflowResult<Vec<Value>> {
        self.runtime
            .block_on(self.inner.browse_objects_all(index_name, params))
    }

    pub fn browse_rules_all(&self, index_name: &str, hits_per_page: u32) -> SearchflowResult<Vec<Value>> {
        self.runtime
            .block_on(self.inner.browse_rules_all(index_name, hits_per_page))
    }

    pub fn browse_synonyms_all(
        &self,
        index_name: &str,
        hits_per_page: u32,
    ) -> SearchflowResult<Vec<Value>> {
        self.runtime
            .block_on(self.inner.browse_synonyms_all(index_name, hits_per_page))
    }

    pub fn replace_all_objects<T: Serialize>(
        &self,
        index_name: &str,
        objects: &[T],
    ) -> SearchflowResult<ReplaceAllObjectsResponse> {
        self.runtime
            .block_on(self.inner.replace_all_objects(index_name, objects))
    }
}
