//! Candidate hosts and their health bookkeeping.
//!
//! Host identity (address, scheme, capabilities) is fixed at construction.
//! Health lives in a `DashMap` so concurrent dispatches can update it without
//! a registry-wide lock; updates are last-writer-wins.

use crate::error::{SearchflowError, SearchflowResult};
use dashmap::DashMap;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// What a request needs from the host that serves it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Read,
    Write,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Read => write!(f, "read"),
            Capability::Write => write!(f, "write"),
        }
    }
}

/// Capabilities a host accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accept {
    Read,
    Write,
    ReadWrite,
}

impl Accept {
    pub fn allows(&self, capability: Capability) -> bool {
        matches!(
            (self, capability),
            (Accept::ReadWrite, _)
                | (Accept::Read, Capability::Read)
                | (Accept::Write, Capability::Write)
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    #[default]
    Https,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => write!(f, "http"),
            Scheme::Https => write!(f, "https"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Host name with optional port (e.g., "app-1.searchnet.io")
    pub address: String,
    #[serde(default)]
    pub scheme: Scheme,
    pub accept: Accept,
}

impl HostConfig {
    pub fn new(address: impl Into<String>, accept: Accept) -> Self {
        Self {
            address: address.into(),
            scheme: Scheme::Https,
            accept,
        }
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }
}

/// A registered host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub address: String,
    pub scheme: Scheme,
    pub accept: Accept,
}

impl Endpoint {
    /// Base URL without a trailing slash
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.address)
    }
}

impl From<HostConfig> for Endpoint {
    fn from(config: HostConfig) -> Self {
        Self {
            address: config.address,
            scheme: config.scheme,
            accept: config.accept,
        }
    }
}

/// Mutable health of one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostHealth {
    pub is_up: bool,
    pub last_failure: Option<Instant>,
    /// Consecutive timeouts, used to stretch the next attempt's timeout
    pub timeout_retries: u32,
}

impl Default for HostHealth {
    fn default() -> Self {
        Self {
            is_up: true,
            last_failure: None,
            timeout_retries: 0,
        }
    }
}

/// Ordered set of candidate hosts
#[derive(Debug)]
pub struct HostRegistry {
    endpoints: Vec<Endpoint>,
    health: DashMap<String, HostHealth>,
    down_ttl: Duration,
}

impl HostRegistry {
    /// Build a registry from configured hosts.
    ///
    /// With `shuffle`, each run of consecutive hosts accepting the same
    /// capabilities is shuffled once; relative order between runs is kept.
    pub fn new(hosts: Vec<HostConfig>, shuffle: bool, down_ttl: Duration) -> SearchflowResult<Self> {
        if hosts.is_empty() {
            return Err(SearchflowError::Config("No hosts configured".to_string()));
        }

        let mut endpoints: Vec<Endpoint> = hosts.into_iter().map(Endpoint::from).collect();
        if shuffle {
            let mut rng = rand::rng();
            let mut start = 0;
            while start < endpoints.len() {
                let accept = endpoints[start].accept;
                let end = endpoints[start..]
                    .iter()
                    .position(|e| e.accept != accept)
                    .map_or(endpoints.len(), |offset| start + offset);
                endpoints[start..end].shuffle(&mut rng);
                start = end;
            }
        }

        let health = DashMap::new();
        for endpoint in &endpoints {
            health.insert(endpoint.address.clone(), HostHealth::default());
        }

        Ok(Self {
            endpoints,
            health,
            down_ttl,
        })
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Hosts to try for `capability`, in registry order.
    ///
    /// Down hosts whose failure is older than the TTL count as up again.
    /// When every matching host is down, all of them are reset and returned.
    pub fn candidates(&self, capability: Capability) -> SearchflowResult<Vec<Endpoint>> {
        let matching: Vec<&Endpoint> = self
            .endpoints
            .iter()
            .filter(|e| e.accept.allows(capability))
            .collect();

        if matching.is_empty() {
            return Err(SearchflowError::Config(format!(
                "No host configured with {} capability",
                capability
            )));
        }

        let now = Instant::now();
        let mut up = Vec::with_capacity(matching.len());
        for endpoint in &matching {
            let mut health = self.health.entry(endpoint.address.clone()).or_default();
            if !health.is_up
                && health
                    .last_failure
                    .is_some_and(|at| now.duration_since(at) >= self.down_ttl)
            {
                debug!("Host {} down mark expired, trying it again", endpoint.address);
                health.is_up = true;
            }
            if health.is_up {
                up.push((*endpoint).clone());
            }
        }

        if up.is_empty() {
            debug!("All {} hosts are down, resetting them", capability);
            for endpoint in &matching {
                self.mark_up(&endpoint.address);
            }
            return Ok(matching.into_iter().cloned().collect());
        }

        Ok(up)
    }

    /// Record a successful call
    pub fn mark_up(&self, address: &str) {
        let mut health = self.health.entry(address.to_string()).or_default();
        health.is_up = true;
        health.timeout_retries = 0;
    }

    /// Record a retryable failure
    pub fn mark_down(&self, address: &str, timed_out: bool) {
        let mut health = self.health.entry(address.to_string()).or_default();
        health.is_up = false;
        health.last_failure = Some(Instant::now());
        if timed_out {
            health.timeout_retries = health.timeout_retries.saturating_add(1);
        }
    }

    /// Current health of a host
    pub fn health(&self, address: &str) -> Option<HostHealth> {
        self.health.get(address).map(|h| h.value().clone())
    }

    /// Scale factor applied to the base timeout for the next attempt
    pub fn timeout_multiplier(&self, address: &str) -> u32 {
        self.health
            .get(address)
            .map_or(1, |h| h.timeout_retries.saturating_add(1))
    }
}
