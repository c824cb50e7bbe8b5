use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::host::{Accept, Capability, HostConfig};

/// Domain the default host list is derived from
pub const DEFAULT_HOST_DOMAIN: &str = "searchnet.io";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub application_id: String,
    #[serde(default)]
    pub api_key: String,
    /// Candidate hosts in preference order. Empty means the default list
    /// derived from `application_id`.
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
    /// Shuffle hosts of equal capability once at registry construction
    #[serde(default = "default_true")]
    pub shuffle_hosts: bool,
    /// How long a host stays marked down before it is tried again
    #[serde(default = "default_host_down_ttl_ms")]
    pub host_down_ttl_ms: u64,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub connect_ms: u64,
    pub read_ms: u64,
    pub write_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Poll budget for completion waits
    pub max_attempts: u32,
    /// Linear backoff increment per attempt
    pub backoff_step_ms: u64,
    /// Upper bound for a single backoff sleep
    pub backoff_cap_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub wait_for_completion: bool,
    /// Wait in groups of `max(batch_size / 10, 1)` batches instead of once
    /// after every batch has been submitted
    #[serde(default)]
    pub grouped_wait: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    #[serde(default)]
    pub json: bool,
    #[serde(default)]
    pub rotation: bool,
}

fn default_true() -> bool {
    true
}

fn default_host_down_ttl_ms() -> u64 {
    5 * 60 * 1000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 2_000,
            read_ms: 5_000,
            write_ms: 30_000,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            backoff_step_ms: 200,
            backoff_cap_ms: 5_000,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            wait_for_completion: false,
            grouped_wait: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            json: false,
            rotation: false,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    /// Per-attempt timeout for a request of the given capability
    pub fn for_capability(&self, capability: Capability) -> Duration {
        match capability {
            Capability::Read => Duration::from_millis(self.read_ms),
            Capability::Write => Duration::from_millis(self.write_ms),
        }
    }
}

impl ClientConfig {
    /// Configuration with the default host list for an application
    pub fn new(application_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            api_key: api_key.into(),
            hosts: Vec::new(),
            shuffle_hosts: true,
            host_down_ttl_ms: default_host_down_ttl_ms(),
            timeouts: TimeoutConfig::default(),
            retry: RetryConfig::default(),
            batch: BatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: ClientConfig =
            toml::from_str(&content).with_context(|| "Failed to parse config file")?;
        Ok(config)
    }

    /// Load configuration from file or fall back to the default host list
    /// for `application_id`
    pub fn load_or_default<P: AsRef<Path>>(path: P, application_id: &str) -> Self {
        Self::from_file(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config file, using defaults: {}", e);
            Self::new(application_id, "")
        })
    }

    /// Hosts to register: the configured list, or the default list derived
    /// from the application id.
    ///
    /// The default list is one read-only host, one write-only host, then
    /// three regionally sharded read/write hosts.
    pub fn effective_hosts(&self) -> Vec<HostConfig> {
        if !self.hosts.is_empty() {
            return self.hosts.clone();
        }

        let app = self.application_id.to_lowercase();
        let mut hosts = vec![
            HostConfig::new(format!("{}-dsn.{}", app, DEFAULT_HOST_DOMAIN), Accept::Read),
            HostConfig::new(format!("{}.{}", app, DEFAULT_HOST_DOMAIN), Accept::Write),
        ];
        hosts.extend((1..=3).map(|shard| {
            HostConfig::new(
                format!("{}-{}.{}", app, shard, DEFAULT_HOST_DOMAIN),
                Accept::ReadWrite,
            )
        }));
        hosts
    }

    pub fn host_down_ttl(&self) -> Duration {
        Duration::from_millis(self.host_down_ttl_ms)
    }

    /// Validate configuration before building a client
    pub fn validate(&self) -> Result<()> {
        if self.application_id.trim().is_empty() {
            anyhow::bail!("application_id must not be empty");
        }

        let hosts = self.effective_hosts();
        for capability in [Capability::Read, Capability::Write] {
            if !hosts.iter().any(|h| h.accept.allows(capability)) {
                anyhow::bail!("No host configured with {} capability", capability);
            }
        }
        for host in &hosts {
            if host.address.trim().is_empty() {
                anyhow::bail!("Host address must not be empty");
            }
        }

        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be greater than 0");
        }
        if self.batch.batch_size == 0 {
            anyhow::bail!("batch.batch_size must be greater than 0");
        }
        if self.timeouts.connect_ms == 0 || self.timeouts.read_ms == 0 || self.timeouts.write_ms == 0
        {
            anyhow::bail!("timeouts must be greater than 0");
        }

        Ok(())
    }
}
