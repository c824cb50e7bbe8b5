//! Polling asynchronous operations until they settle.
//!
//! Every wait is a [`retry_until`] over a read dispatch. Waits share no state
//! except host health, so any number of them may run concurrently.

use crate::client::SearchClient;
use crate::dispatcher::RequestOptions;
use crate::error::{SearchflowError, SearchflowResult};
use crate::models::{ApiKey, ApiKeyOperation, GetApiKeyResponse, TaskHandle, TaskStatus};
use crate::retry::{RetryOptions, retry_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

impl SearchClient {
    /// Wait for a task with the configured poll budget
    pub async fn wait_for_task(&self, handle: &TaskHandle) -> SearchflowResult<TaskStatus> {
        self.wait_for_task_with(handle, &self.retry_options(), &CancellationToken::new())
            .await
    }

    /// Poll `handle` until the service reports it published.
    ///
    /// A poll that found no reachable host counts as "not yet" and is
    /// retried within the budget; any other error ends the wait.
    pub async fn wait_for_task_with(
        &self,
        handle: &TaskHandle,
        retry: &RetryOptions,
        cancel: &CancellationToken,
    ) -> SearchflowResult<TaskStatus> {
        let options = &RequestOptions::default();
        let status = retry_until(
            move || self.get_task(handle, options),
            |result| match result {
                Ok(status) => status.is_terminal(),
                Err(e) => !is_unreachable(e),
            },
            retry,
            cancel,
        )
        .await??;

        debug!(
            "Task {} settled after {:?}",
            handle.task_id,
            handle.submitted_at.elapsed()
        );
        Ok(status)
    }

    /// Wait for every handle, one after another, in the given order
    pub async fn wait_for_tasks(
        &self,
        handles: &[TaskHandle],
        retry: &RetryOptions,
        cancel: &CancellationToken,
    ) -> SearchflowResult<()> {
        for handle in handles {
            self.wait_for_task_with(handle, retry, cancel).await?;
        }
        Ok(())
    }

    /// Poll an API key until a provisioning operation is visible.
    ///
    /// * `Add` settles once the key is readable.
    /// * `Delete` settles once reading the key fails with "not found".
    /// * `Update` settles once the key matches `expected` field for field;
    ///   without `expected` it fails immediately.
    ///
    /// Unreachable hosts count as "not yet". Any other error ends the wait
    /// and is returned as is.
    ///
    /// Returns the observed key, or `None` after a delete.
    pub async fn wait_for_api_key(
        &self,
        key: &str,
        operation: ApiKeyOperation,
        expected: Option<&ApiKey>,
        retry: &RetryOptions,
        cancel: &CancellationToken,
    ) -> SearchflowResult<Option<GetApiKeyResponse>> {
        let options = &RequestOptions::default();
        let fetch = move || async move {
            self.metrics().record_poll();
            self.get_api_key(key, options).await
        };

        match operation {
            ApiKeyOperation::Add => {
                let resp = retry_until(
                    fetch,
                    |result| match result {
                        Ok(_) => true,
                        Err(e) => !e.is_not_found() && !is_unreachable(e),
                    },
                    retry,
                    cancel,
                )
                .await??;
                info!("API key {} is available", key);
                Ok(Some(resp))
            }
            ApiKeyOperation::Delete => {
                let last = retry_until(
                    fetch,
                    |result| matches!(result, Err(e) if !is_unreachable(e)),
                    retry,
                    cancel,
                )
                .await?;
                if let Err(e) = last
                    && !e.is_not_found()
                {
                    return Err(e);
                }
                info!("API key {} is gone", key);
                Ok(None)
            }
            ApiKeyOperation::Update => {
                let expected = expected.ok_or_else(|| {
                    SearchflowError::InvalidInput(
                        "Waiting for a key update requires the expected key".to_string(),
                    )
                })?;
                let resp = retry_until(
                    fetch,
                    |result| match result {
                        Ok(resp) => resp.key == *expected,
                        Err(e) => !is_unreachable(e),
                    },
                    retry,
                    cancel,
                )
                .await??;
                info!("API key {} update is visible", key);
                Ok(Some(resp))
            }
        }
    }
}

fn is_unreachable(error: &SearchflowError) -> bool {
    matches!(error, SearchflowError::AllHostsUnreachable { .. })
}
