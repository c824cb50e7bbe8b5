//! Bounded batch writes.
//!
//! Records are split into contiguous slices and submitted one slice at a
//! time, in input order. At most one batch is in flight; with grouped
//! waiting, at most one group of accepted batches is left unconfirmed.

use crate::client::SearchClient;
use crate::config::{BatchConfig, RetryConfig};
use crate::dispatcher::RequestOptions;
use crate::error::{SearchflowError, SearchflowResult};
use crate::models::{BatchAction, TaskHandle};
use crate::retry::RetryOptions;
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default number of records per batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Deterministic split of a record slice into batches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan<'a, T> {
    pub total_items: usize,
    pub batch_size: usize,
    pub batches: Vec<&'a [T]>,
}

impl<'a, T> BatchPlan<'a, T> {
    pub fn new(items: &'a [T], batch_size: usize) -> SearchflowResult<Self> {
        if batch_size == 0 {
            return Err(SearchflowError::InvalidInput(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            total_items: items.len(),
            batch_size,
            batches: items.chunks(batch_size).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// When a chunked write confirms its batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Submit every batch, then wait for each in submission order
    #[default]
    AfterSubmission,
    /// Wait for every `max(batch_size / 10, 1)` accepted batches before
    /// submitting more
    Grouped,
}

#[derive(Debug, Clone)]
pub struct ChunkedWriteOptions {
    pub batch_size: usize,
    pub wait_for_completion: bool,
    pub wait_strategy: WaitStrategy,
    pub retry: RetryOptions,
    pub request: RequestOptions,
}

impl Default for ChunkedWriteOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            wait_for_completion: false,
            wait_strategy: WaitStrategy::AfterSubmission,
            retry: RetryOptions::default(),
            request: RequestOptions::default(),
        }
    }
}

impl ChunkedWriteOptions {
    pub fn from_config(batch: &BatchConfig, retry: &RetryConfig) -> Self {
        Self {
            batch_size: batch.batch_size,
            wait_for_completion: batch.wait_for_completion,
            wait_strategy: if batch.grouped_wait {
                WaitStrategy::Grouped
            } else {
                WaitStrategy::AfterSubmission
            },
            retry: RetryOptions::from_config(retry),
            request: RequestOptions::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_wait(mut self, wait_for_completion: bool) -> Self {
        self.wait_for_completion = wait_for_completion;
        self
    }

    pub fn with_wait_strategy(mut self, wait_strategy: WaitStrategy) -> Self {
        self.wait_strategy = wait_strategy;
        self
    }

    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    /// Accepted batches allowed to stay unconfirmed before waiting
    fn wait_group(&self) -> Option<usize> {
        match (self.wait_for_completion, self.wait_strategy) {
            (true, WaitStrategy::Grouped) => Some((self.batch_size / 10).max(1)),
            _ => None,
        }
    }
}

/// One batch the service accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Position of the batch in the plan
    pub batch_index: usize,
    pub item_count: usize,
    pub handle: TaskHandle,
    pub object_ids: Vec<String>,
}

impl SearchClient {
    /// Write `items` in batches of at most `options.batch_size`.
    ///
    /// Batches are submitted sequentially in input order. A batch that fails
    /// (after host failover) aborts the write with
    /// [`SearchflowError::PartialBatchFailure`] carrying every batch accepted
    /// so far. With `wait_for_completion`, every accepted batch has been
    /// observed published before this returns.
    pub async fn chunked_write<T: Serialize>(
        &self,
        index_name: &str,
        items: &[T],
        action: BatchAction,
        options: &ChunkedWriteOptions,
        cancel: &CancellationToken,
    ) -> SearchflowResult<Vec<BatchOutcome>> {
        let plan = BatchPlan::new(items, options.batch_size)?;
        info!(
            "Writing {} records to {} in {} batches of up to {}",
            plan.total_items,
            index_name,
            plan.len(),
            plan.batch_size
        );

        let group = options.wait_group();
        let mut outcomes: Vec<BatchOutcome> = Vec::with_capacity(plan.len());
        // Outcomes before this index have been confirmed
        let mut confirmed = 0;

        for (batch_index, batch) in plan.batches.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(partial_failure(outcomes, SearchflowError::Cancelled));
            }

            match self
                .batch(index_name, batch, action, &options.request)
                .await
            {
                Ok((handle, resp)) => outcomes.push(BatchOutcome {
                    batch_index,
                    item_count: batch.len(),
                    handle,
                    object_ids: resp.object_ids,
                }),
                Err(e) => {
                    warn!(
                        "Batch {}/{} to {} failed: {}",
                        batch_index + 1,
                        plan.len(),
                        index_name,
                        e
                    );
                    return Err(partial_failure(outcomes, e));
                }
            }

            if let Some(group) = group
                && outcomes.len() - confirmed >= group
            {
                debug!("Confirming {} batches", outcomes.len() - confirmed);
                if let Err(e) = self
                    .confirm(&outcomes[confirmed..], &options.retry, cancel)
                    .await
                {
                    return Err(partial_failure(outcomes, e));
                }
                confirmed = outcomes.len();
            }
        }

        if options.wait_for_completion
            && let Err(e) = self
                .confirm(&outcomes[confirmed..], &options.retry, cancel)
                .await
        {
            return Err(partial_failure(outcomes, e));
        }

        Ok(outcomes)
    }

    async fn confirm(
        &self,
        outcomes: &[BatchOutcome],
        retry: &RetryOptions,
        cancel: &CancellationToken,
    ) -> SearchflowResult<()> {
        for outcome in outcomes {
            self.wait_for_task_with(&outcome.handle, retry, cancel)
                .await?;
        }
        Ok(())
    }

    /// Add or replace records
    pub async fn save_objects<T: Serialize>(
        &self,
        index_name: &str,
        objects: &[T],
        wait_for_completion: bool,
    ) -> SearchflowResult<Vec<BatchOutcome>> {
        let options = self.chunked_write_options().with_wait(wait_for_completion);
        self.chunked_write(
            index_name,
            objects,
            BatchAction::AddObject,
            &options,
            &CancellationToken::new(),
        )
        .await
    }

    /// Delete records by object id
    pub async fn delete_objects(
        &self,
        index_name: &str,
        object_ids: &[String],
        wait_for_completion: bool,
    ) -> SearchflowResult<Vec<BatchOutcome>> {
        let bodies: Vec<serde_json::Value> = object_ids
            .iter()
            .map(|id| json!({ "objectID": id }))
            .collect();
        let options = self.chunked_write_options().with_wait(wait_for_completion);
        self.chunked_write(
            index_name,
            &bodies,
            BatchAction::DeleteObject,
            &options,
            &CancellationToken::new(),
        )
        .await
    }

    /// Update some attributes of records, optionally creating missing ones
    pub async fn partial_update_objects<T: Serialize>(
        &self,
        index_name: &str,
        objects: &[T],
        create_if_not_exists: bool,
        wait_for_completion: bool,
    ) -> SearchflowResult<Vec<BatchOutcome>> {
        let action = if create_if_not_exists {
            BatchAction::PartialUpdateObject
        } else {
            BatchAction::PartialUpdateObjectNoCreate
        };
        let options = self.chunked_write_options().with_wait(wait_for_completion);
        self.chunked_write(
            index_name,
            objects,
            action,
            &options,
            &CancellationToken::new(),
        )
        .await
    }

    /// Batch options from configuration
    pub fn chunked_write_options(&self) -> ChunkedWriteOptions {
        ChunkedWriteOptions::from_config(&self.config().batch, &self.config().retry)
    }
}

fn partial_failure(completed: Vec<BatchOutcome>, source: SearchflowError) -> SearchflowError {
    SearchflowError::PartialBatchFailure {
        completed,
        source: Box::new(source),
    }
}
