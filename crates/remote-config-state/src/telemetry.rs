//! Observer hooks for repository updates.
//!
//! [`RepositoryTelemetry`] is notified after every `update` call. The counting
//! implementation lets embedders export the numbers through whatever metric
//! backend they already use.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::RepositoryError;

/// Callbacks invoked by [`crate::Repository`]. Every method defaults to a no-op.
pub trait RepositoryTelemetry: Send + Sync {
    /// Called after an update is committed with the number of changed configs.
    fn on_update_applied(&self, _changed: usize) {}
    /// Called when an update is rejected and the previous state is kept.
    fn on_update_rejected(&self, _error: &RepositoryError) {}
    /// Called once per accepted root, with its version.
    fn on_root_rotated(&self, _version: u64) {}
}

/// Telemetry implementation that ignores every event.
#[derive(Debug, Default)]
pub(crate) struct NoopTelemetry;

impl RepositoryTelemetry for NoopTelemetry {}

/// Aggregated telemetry counters (all values use relaxed atomics).
#[derive(Debug, Default)]
pub struct TelemetryCounters {
    updates_applied: AtomicU64,
    updates_rejected: AtomicU64,
    configs_changed: AtomicU64,
    root_rotations: AtomicU64,
    root_version: AtomicU64,
}

impl TelemetryCounters {
    /// Captures a point-in-time snapshot of the counters.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            updates_applied: self.updates_applied.load(Ordering::Relaxed),
            updates_rejected: self.updates_rejected.load(Ordering::Relaxed),
            configs_changed: self.configs_changed.load(Ordering::Relaxed),
            root_rotations: self.root_rotations.load(Ordering::Relaxed),
            root_version: self.root_version.load(Ordering::Relaxed),
        }
    }
}

/// Plain data representation of [`TelemetryCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub updates_applied: u64,
    pub updates_rejected: u64,
    /// Sum of changed config counts over all applied updates.
    pub configs_changed: u64,
    pub root_rotations: u64,
    /// Version of the most recently rotated root, 0 if none.
    pub root_version: u64,
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "updates_applied={}, updates_rejected={}, configs_changed={}, root_rotations={}, root_version={}",
            self.updates_applied,
            self.updates_rejected,
            self.configs_changed,
            self.root_rotations,
            self.root_version
        )
    }
}

/// Telemetry implementation that maintains atomic counters for every signal.
#[derive(Debug, Clone)]
pub struct CountingTelemetry {
    counters: Arc<TelemetryCounters>,
}

impl CountingTelemetry {
    /// Creates a new telemetry instance backed by the provided counter set.
    pub fn new(counters: Arc<TelemetryCounters>) -> Self {
        Self { counters }
    }

    /// Returns the underlying counter set.
    pub fn counters(&self) -> Arc<TelemetryCounters> {
        self.counters.clone()
    }
}

impl Default for CountingTelemetry {
    fn default() -> Self {
        Self::new(Arc::new(TelemetryCounters::default()))
    }
}

impl RepositoryTelemetry for CountingTelemetry {
    fn on_update_applied(&self, changed: usize) {
        self.counters
            .updates_applied
            .fetch_add(1, Ordering::Relaxed);
        self.counters
            .configs_changed
            .fetch_add(changed as u64, Ordering::Relaxed);
    }

    fn on_update_rejected(&self, _error: &RepositoryError) {
        self.counters
            .updates_rejected
            .fetch_add(1, Ordering::Relaxed);
    }

    fn on_root_rotated(&self, version: u64) {
        self.counters.root_rotations.fetch_add(1, Ordering::Relaxed);
        self.counters.root_version.store(version, Ordering::Relaxed);
    }
}
