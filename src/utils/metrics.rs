//! Observability and Metrics
//!
//! Counters for codec traffic and capability resolution.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Global metrics collector for codec and resolver operations
#[derive(Debug)]
pub struct Metrics {
    /// Packets successfully encoded
    pub packets_encoded: AtomicU64,
    /// Packets whose primary fields decoded
    pub packets_decoded: AtomicU64,
    /// Encode attempts that failed
    pub encode_errors: AtomicU64,
    /// Decode attempts that failed
    pub decode_errors: AtomicU64,
    /// Decodes that kept primary fields but lost the structured payload
    pub payload_failures: AtomicU64,
    /// Total bytes produced by encode
    pub bytes_encoded: AtomicU64,
    /// Total bytes consumed by decode
    pub bytes_decoded: AtomicU64,
    /// Candidate probes executed
    pub probes_run: AtomicU64,
    /// Capabilities bound to a candidate
    pub capabilities_bound: AtomicU64,
    /// Capabilities for which every candidate declined
    pub capabilities_unsupported: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            packets_encoded: AtomicU64::new(0),
            packets_decoded: AtomicU64::new(0),
            encode_errors: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            payload_failures: AtomicU64::new(0),
            bytes_encoded: AtomicU64::new(0),
            bytes_decoded: AtomicU64::new(0),
            probes_run: AtomicU64::new(0),
            capabilities_bound: AtomicU64::new(0),
            capabilities_unsupported: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record an encoded packet
    pub fn packet_encoded(&self, byte_count: u64) {
        self.packets_encoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_encoded.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a decoded packet
    pub fn packet_decoded(&self, byte_count: u64) {
        self.packets_decoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_decoded.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn encode_error(&self) {
        self.encode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn payload_failure(&self) {
        self.payload_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one candidate probe
    pub fn probe_run(&self) {
        self.probes_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn capability_bound(&self) {
        self.capabilities_bound.fetch_add(1, Ordering::Relaxed);
    }

    pub fn capability_unsupported(&self) {
        self.capabilities_unsupported.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_encoded: self.packets_encoded.load(Ordering::Relaxed),
            packets_decoded: self.packets_decoded.load(Ordering::Relaxed),
            encode_errors: self.encode_errors.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            payload_failures: self.payload_failures.load(Ordering::Relaxed),
            bytes_encoded: self.bytes_encoded.load(Ordering::Relaxed),
            bytes_decoded: self.bytes_decoded.load(Ordering::Relaxed),
            probes_run: self.probes_run.load(Ordering::Relaxed),
            capabilities_bound: self.capabilities_bound.load(Ordering::Relaxed),
            capabilities_unsupported: self.capabilities_unsupported.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            packets_encoded = snapshot.packets_encoded,
            packets_decoded = snapshot.packets_decoded,
            encode_errors = snapshot.encode_errors,
            decode_errors = snapshot.decode_errors,
            payload_failures = snapshot.payload_failures,
            bytes_encoded = snapshot.bytes_encoded,
            bytes_decoded = snapshot.bytes_decoded,
            probes_run = snapshot.probes_run,
            capabilities_bound = snapshot.capabilities_bound,
            capabilities_unsupported = snapshot.capabilities_unsupported,
            uptime_seconds = snapshot.uptime_seconds,
            "Codec metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub packets_encoded: u64,
    pub packets_decoded: u64,
    pub encode_errors: u64,
    pub decode_errors: u64,
    pub payload_failures: u64,
    pub bytes_encoded: u64,
    pub bytes_decoded: u64,
    pub probes_run: u64,
    pub capabilities_bound: u64,
    pub capabilities_unsupported: u64,
    pub uptime_seconds: u64,
}

static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
}

/// Force the global collector into existence so uptime starts counting.
/// Called by [`crate::utils::logging::init`].
pub fn init_metrics() {
    let _ = global_metrics();
    info!("Metrics collection initialized");
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_us = duration.as_micros(),
            "Operation completed"
        );
    }
}
