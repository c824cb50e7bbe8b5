//! Multi-step workflows built from writes and waits.
//!
//! `replace_all_objects` swaps the contents of an index in three steps:
//! copy the configuration into a scratch index, write every record into the
//! scratch index, then move the scratch index onto the destination. Each
//! step is confirmed before the next one starts. Completed steps are never
//! rolled back; a failure is reported with everything done so far.

use crate::batch::{BatchOutcome, ChunkedWriteOptions};
use crate::client::SearchClient;
use crate::error::{SearchflowError, SearchflowResult};
use crate::models::{BatchAction, ScopeType, TaskHandle};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    CopyingConfig,
    WritingData,
    Swapping,
    Done,
    /// A step failed and was not recovered
    Failed,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Done | WorkflowState::Failed)
    }
}

/// Outcome of one completed workflow step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowStepResult {
    pub step: WorkflowState,
    pub handles: Vec<TaskHandle>,
    pub succeeded: bool,
}

#[derive(Debug, Clone)]
pub struct ReplaceAllObjectsResponse {
    pub scratch_index: String,
    pub steps: Vec<WorkflowStepResult>,
    pub batches: Vec<BatchOutcome>,
}

/// Steps completed so far by one workflow run
struct WorkflowRun {
    state: WorkflowState,
    steps: Vec<WorkflowStepResult>,
}

impl WorkflowRun {
    fn new() -> Self {
        Self {
            state: WorkflowState::CopyingConfig,
            steps: Vec::new(),
        }
    }

    fn complete(&mut self, handles: Vec<TaskHandle>, next: WorkflowState) {
        self.steps.push(WorkflowStepResult {
            step: self.state,
            handles,
            succeeded: true,
        });
        info!("Workflow step {:?} done, next {:?}", self.state, next);
        self.state = next;
    }

    fn fail(
        &mut self,
        partial_batches: Vec<BatchOutcome>,
        source: SearchflowError,
    ) -> SearchflowError {
        let failed_step = self.state;
        warn!(
            "Workflow failed during {:?} after {} steps: {}",
            failed_step,
            self.steps.len(),
            source
        );
        self.state = WorkflowState::Failed;
        SearchflowError::WorkflowIncomplete {
            completed_steps: std::mem::take(&mut self.steps),
            failed_step,
            partial_batches,
            source: Box::new(source),
        }
    }
}

impl SearchClient {
    /// Replace every record of `index_name` using configured batch settings
    pub async fn replace_all_objects<T: Serialize>(
        &self,
        index_name: &str,
        objects: &[T],
    ) -> SearchflowResult<ReplaceAllObjectsResponse> {
        self.replace_all_objects_with(
            index_name,
            objects,
            &self.chunked_write_options(),
            &CancellationToken::new(),
        )
        .await
    }

    /// Replace every record of `index_name` through a scratch index.
    ///
    /// Records are written with `options` but always waited for, whatever
    /// `options.wait_for_completion` says. Fails with
    /// [`SearchflowError::WorkflowIncomplete`]; after a failed swap the
    /// scratch index stays populated and the destination is untouched.
    pub async fn replace_all_objects_with<T: Serialize>(
        &self,
        index_name: &str,
        objects: &[T],
        options: &ChunkedWriteOptions,
        cancel: &CancellationToken,
    ) -> SearchflowResult<ReplaceAllObjectsResponse> {
        let scratch_index = format!("{}_tmp_{}", index_name, rand::random::<u32>());
        let write_options = options.clone().with_wait(true);
        let mut run = WorkflowRun::new();
        let mut batches = Vec::new();

        info!(
            "Replacing all objects of {} via {} ({} records)",
            index_name,
            scratch_index,
            objects.len()
        );

        loop {
            match run.state {
                WorkflowState::CopyingConfig => {
                    let scope = vec![ScopeType::Settings, ScopeType::Rules, ScopeType::Synonyms];
                    let handle = match self
                        .copy_index(index_name, &scratch_index, Some(scope))
                        .await
                    {
                        Ok(handle) => handle,
                        Err(e) => return Err(run.fail(Vec::new(), e)),
                    };
                    if let Err(e) = self
                        .wait_for_task_with(&handle, &options.retry, cancel)
                        .await
                    {
                        return Err(run.fail(Vec::new(), e));
                    }
                    run.complete(vec![handle], WorkflowState::WritingData);
                }
                WorkflowState::WritingData => {
                    match self
                        .chunked_write(
                            &scratch_index,
                            objects,
                            BatchAction::AddObject,
                            &write_options,
                            cancel,
                        )
                        .await
                    {
                        Ok(outcomes) => {
                            let handles = outcomes.iter().map(|o| o.handle.clone()).collect();
                            batches = outcomes;
                            run.complete(handles, WorkflowState::Swapping);
                        }
                        Err(SearchflowError::PartialBatchFailure { completed, source }) => {
                            return Err(run.fail(completed, *source));
                        }
                        Err(e) => return Err(run.fail(Vec::new(), e)),
                    }
                }
                WorkflowState::Swapping => {
                    let handle = match self.move_index(&scratch_index, index_name).await {
                        Ok(handle) => handle,
                        Err(e) => return Err(run.fail(Vec::new(), e)),
                    };
                    if let Err(e) = self
                        .wait_for_task_with(&handle, &options.retry, cancel)
                        .await
                    {
                        return Err(run.fail(Vec::new(), e));
                    }
                    run.complete(vec![handle], WorkflowState::Done);
                }
                WorkflowState::Done | WorkflowState::Failed => break,
            }
        }

        Ok(ReplaceAllObjectsResponse {
            scratch_index,
            steps: run.steps,
            batches,
        })
    }
}
