/// Error types for searchflow
use crate::batch::BatchOutcome;
use crate::host::Capability;
use crate::workflow::{WorkflowState, WorkflowStepResult};
use std::time::Duration;
use thiserror::Error;

/// Main error type for searchflow operations
#[derive(Error, Debug)]
pub enum SearchflowError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-retryable transport errors, surfaced without failover
    #[error("Request rejected: {0}")]
    Transport(#[from] TransportError),

    /// Every host able to serve the capability failed with a retryable error
    #[error("All {capability} hosts unreachable ({} attempts)", failures.len())]
    AllHostsUnreachable {
        capability: Capability,
        failures: Vec<TransportError>,
    },

    /// The retry-until budget ran out before an acceptable result was observed
    #[error("Retry budget exhausted after {attempts} attempts")]
    RetryExhausted { attempts: u32 },

    /// The caller's cancellation token fired while waiting
    #[error("Operation cancelled")]
    Cancelled,

    /// A chunked write aborted part-way through
    #[error("Batch write aborted after {} batches: {source}", completed.len())]
    PartialBatchFailure {
        completed: Vec<BatchOutcome>,
        #[source]
        source: Box<SearchflowError>,
    },

    /// A multi-step workflow stopped after some steps completed
    #[error("Workflow failed during {failed_step:?} after {} completed steps: {source}", completed_steps.len())]
    WorkflowIncomplete {
        completed_steps: Vec<WorkflowStepResult>,
        failed_step: WorkflowState,
        partial_batches: Vec<BatchOutcome>,
        #[source]
        source: Box<SearchflowError>,
    },

    /// JSON encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Local I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from a single attempt against a single host
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection failed
    #[error("Failed to connect to host {host}: {reason}")]
    ConnectionFailed { host: String, reason: String },

    /// Timeout
    #[error("Request to host {host} timed out after {timeout:?}")]
    Timeout { host: String, timeout: Duration },

    /// Host returned an error status
    #[error("Host {host} returned status {status}: {message}")]
    ErrorStatus {
        host: String,
        status: u16,
        message: String,
    },

    /// The request could not be built
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },
}

impl TransportError {
    /// Whether another host may succeed where this one failed.
    ///
    /// Connection failures, timeouts, 5xx responses and rate limiting are
    /// retryable. Any other 4xx is a client error that no host will accept.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::ConnectionFailed { .. } | TransportError::Timeout { .. } => true,
            TransportError::ErrorStatus { status, .. } => *status == 429 || *status >= 500,
            TransportError::InvalidRequest { .. } => false,
        }
    }

    /// Whether this error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::ErrorStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl SearchflowError {
    /// Whether this error means the requested resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, SearchflowError::Transport(e) if e.status() == Some(404))
    }
}

/// Result type alias for convenience
pub type SearchflowResult<T> = Result<T, SearchflowError>;
