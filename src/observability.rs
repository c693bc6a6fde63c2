use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Counters for the project workflows.
///
/// Owned by the application state and shared through an `Arc`.
#[derive(Debug, Default)]
pub struct WorkflowMetrics {
    pub projects_created: AtomicU64,
    pub creation_failures: AtomicU64,
    pub stage_init_failures: AtomicU64,
    pub membership_failures: AtomicU64,
    pub validation_rejections: AtomicU64,
    pub auth_rejections: AtomicU64,
    pub list_requests: AtomicU64,
}

impl WorkflowMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_project_created(&self) {
        self.projects_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_creation_failure(&self) {
        self.creation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stage_init_failure(&self) {
        self.stage_init_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_membership_failure(&self) {
        self.membership_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_rejection(&self) {
        self.validation_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auth_rejection(&self) {
        self.auth_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_list_request(&self) {
        self.list_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> WorkflowStats {
        WorkflowStats {
            projects_created: self.projects_created.load(Ordering::Relaxed),
            creation_failures: self.creation_failures.load(Ordering::Relaxed),
            stage_init_failures: self.stage_init_failures.load(Ordering::Relaxed),
            membership_failures: self.membership_failures.load(Ordering::Relaxed),
            validation_rejections: self.validation_rejections.load(Ordering::Relaxed),
            auth_rejections: self.auth_rejections.load(Ordering::Relaxed),
            list_requests: self.list_requests.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Workflow metrics: created={}, creation_failures={}, stage_init_failures={}, membership_failures={}, validation_rejections={}, auth_rejections={}, list_requests={}",
            stats.projects_created,
            stats.creation_failures,
            stats.stage_init_failures,
            stats.membership_failures,
            stats.validation_rejections,
            stats.auth_rejections,
            stats.list_requests
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkflowStats {
    pub projects_created: u64,
    pub creation_failures: u64,
    pub stage_init_failures: u64,
    pub membership_failures: u64,
    pub validation_rejections: u64,
    pub auth_rejections: u64,
    pub list_requests: u64,
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish(self) -> Duration {
        let duration = self.elapsed();
        debug!(
            operation = %self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
        duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_independent() {
        let metrics = WorkflowMetrics::new();
        metrics.record_project_created();
        metrics.record_project_created();
        metrics.record_stage_init_failure();
        metrics.record_auth_rejection();

        let stats = metrics.get_stats();
        assert_eq!(stats.projects_created, 2);
        assert_eq!(stats.stage_init_failures, 1);
        assert_eq!(stats.auth_rejections, 1);
        assert_eq!(stats.membership_failures, 0);
        assert_eq!(stats.creation_failures, 0);
    }
}
