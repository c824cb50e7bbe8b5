use std::sync::Arc;
/// Dispatch and polling counters
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use prometheus::{Encoder, Gauge, IntGauge, Registry, TextEncoder};

/// Metrics collector shared by a client and its dispatcher
#[derive(Clone, Debug)]
pub struct Metrics {
    /// Logical dispatches (one per request, however many hosts were tried)
    pub total_dispatches: Arc<AtomicU64>,
    pub successful_dispatches: Arc<AtomicU64>,
    pub failed_dispatches: Arc<AtomicU64>,
    /// Retryable per-host failures that moved a dispatch to the next host
    pub host_failovers: Arc<AtomicU64>,
    pub non_retryable_errors: Arc<AtomicU64>,
    /// Completion polls issued by waiters
    pub poll_attempts: Arc<AtomicU64>,
    pub batches_submitted: Arc<AtomicU64>,
    /// Total dispatch time in microseconds
    pub total_dispatch_time_us: Arc<AtomicU64>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_dispatches: Arc::new(AtomicU64::new(0)),
            successful_dispatches: Arc::new(AtomicU64::new(0)),
            failed_dispatches: Arc::new(AtomicU64::new(0)),
            host_failovers: Arc::new(AtomicU64::new(0)),
            non_retryable_errors: Arc::new(AtomicU64::new(0)),
            poll_attempts: Arc::new(AtomicU64::new(0)),
            batches_submitted: Arc::new(AtomicU64::new(0)),
            total_dispatch_time_us: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record a finished logical dispatch
    pub fn record_dispatch(&self, success: bool, duration: Duration) {
        self.total_dispatches.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_dispatches.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_dispatches.fetch_add(1, Ordering::Relaxed);
        }
        self.total_dispatch_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_failover(&self) {
        self.host_failovers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_non_retryable(&self) {
        self.non_retryable_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll(&self) {
        self.poll_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch(&self) {
        self.batches_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total_dispatches.load(Ordering::Relaxed);
        let successful = self.successful_dispatches.load(Ordering::Relaxed);
        let total_time_us = self.total_dispatch_time_us.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_dispatches: total,
            successful_dispatches: successful,
            failed_dispatches: self.failed_dispatches.load(Ordering::Relaxed),
            host_failovers: self.host_failovers.load(Ordering::Relaxed),
            non_retryable_errors: self.non_retryable_errors.load(Ordering::Relaxed),
            poll_attempts: self.poll_attempts.load(Ordering::Relaxed),
            batches_submitted: self.batches_submitted.load(Ordering::Relaxed),
            average_dispatch_time_ms: if total > 0 {
                (total_time_us as f64 / total as f64) / 1000.0
            } else {
                0.0
            },
            success_rate: if total > 0 {
                (successful as f64 / total as f64) * 100.0
            } else {
                0.0
            },
        }
    }

    /// Render the current snapshot in Prometheus text exposition format
    pub fn render_prometheus(&self) -> prometheus::Result<String> {
        let snapshot = self.snapshot();
        let registry = Registry::new_custom(Some("searchflow".to_string()), None)?;

        let counters = [
            ("dispatches_total", "Logical dispatches", snapshot.total_dispatches),
            (
                "dispatches_successful",
                "Dispatches answered by a host",
                snapshot.successful_dispatches,
            ),
            (
                "dispatches_failed",
                "Dispatches that surfaced an error",
                snapshot.failed_dispatches,
            ),
            (
                "host_failovers",
                "Retryable host failures",
                snapshot.host_failovers,
            ),
            (
                "non_retryable_errors",
                "Client errors surfaced without failover",
                snapshot.non_retryable_errors,
            ),
            ("poll_attempts", "Completion polls", snapshot.poll_attempts),
            (
                "batches_submitted",
                "Write batches submitted",
                snapshot.batches_submitted,
            ),
        ];
        for (name, help, value) in counters {
            let gauge = IntGauge::new(name, help)?;
            gauge.set(value as i64);
            registry.register(Box::new(gauge))?;
        }

        let latency = Gauge::new("dispatch_time_avg_ms", "Average dispatch time in milliseconds")?;
        latency.set(snapshot.average_dispatch_time_ms);
        registry.register(Box::new(latency))?;

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub total_dispatches: u64,
    pub successful_dispatches: u64,
    pub failed_dispatches: u64,
    pub host_failovers: u64,
    pub non_retryable_errors: u64,
    pub poll_attempts: u64,
    pub batches_submitted: u64,
    pub average_dispatch_time_ms: f64,
    pub success_rate: f64,
}

/// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
