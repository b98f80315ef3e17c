//! Coordinator counters for observability

use std::sync::Arc;
use tokio::sync::RwLock;

/// Counters for role mutations and the policy calls they caused
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorMetrics {
    /// Update requests that found their role
    pub role_updates: u64,

    /// Update requests for a role that does not exist
    pub role_updates_missing: u64,

    /// Delete requests
    pub role_deletes: u64,

    /// Rename cascades committed
    pub cascades_committed: u64,

    /// Rename cascades rolled back
    pub cascades_failed: u64,

    /// Policy backend add calls
    pub tuple_adds: u64,

    /// Policy backend remove calls
    pub tuple_removes: u64,

    /// Calls replayed to undo removals after a failed cascade
    pub compensations: u64,

    /// Fatal errors propagated to callers
    pub error_count: u64,
}

impl CoordinatorMetrics {
    /// Share of cascades that failed
    pub fn cascade_failure_rate(&self) -> f64 {
        let total = self.cascades_committed + self.cascades_failed;
        if total == 0 {
            0.0
        } else {
            self.cascades_failed as f64 / total as f64
        }
    }
}

/// Thread-safe metrics collector
#[derive(Clone, Default)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<CoordinatorMetrics>>,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_update(&self, found: bool) {
        let mut metrics = self.metrics.write().await;
        if found {
            metrics.role_updates += 1;
        } else {
            metrics.role_updates_missing += 1;
        }
    }

    pub async fn record_delete(&self) {
        self.metrics.write().await.role_deletes += 1;
    }

    pub async fn record_cascade(&self, committed: bool) {
        let mut metrics = self.metrics.write().await;
        if committed {
            metrics.cascades_committed += 1;
        } else {
            metrics.cascades_failed += 1;
        }
    }

    pub async fn record_policy_call(&self, removal: bool) {
        let mut metrics = self.metrics.write().await;
        if removal {
            metrics.tuple_removes += 1;
        } else {
            metrics.tuple_adds += 1;
        }
    }

    pub async fn record_compensation(&self) {
        self.metrics.write().await.compensations += 1;
    }

    pub async fn record_error(&self) {
        self.metrics.write().await.error_count += 1;
    }

    /// Snapshot of the current counters
    pub async fn get_metrics(&self) -> CoordinatorMetrics {
        self.metrics.read().await.clone()
    }

    /// Reset all counters
    pub async fn reset(&self) {
        *self.metrics.write().await = CoordinatorMetrics::default();
    }
}
