pub mod batch;
pub mod blocking;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod paginate;
pub mod retry;
pub mod transport;
pub mod wait;
pub mod workflow;

// Re-export commonly used types for convenience
pub use batch::{BatchOutcome, BatchPlan, ChunkedWriteOptions, WaitStrategy};
pub use blocking::BlockingClient;
pub use client::SearchClient;
pub use config::ClientConfig;
pub use error::{SearchflowError, SearchflowResult, TransportError};
pub use host::{Accept, Capability, HostConfig};
pub use retry::{RetryOptions, retry_until};
pub use workflow::{WorkflowState, WorkflowStepResult};
