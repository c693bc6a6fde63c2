use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::database::SqliteStore;
use crate::observability::WorkflowMetrics;

/// Graceful shutdown coordinator for the tracker service
pub struct ShutdownCoordinator {
    store: SqliteStore,
    metrics: Arc<WorkflowMetrics>,
    close_timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(store: SqliteStore, metrics: Arc<WorkflowMetrics>) -> Self {
        Self {
            store,
            metrics,
            close_timeout: Duration::from_secs(5),
        }
    }

    /// Perform graceful shutdown operations once the server stopped accepting requests
    pub async fn shutdown_all_services(&self) -> Result<()> {
        info!("Initiating graceful shutdown of all services...");

        // Log final workflow statistics
        self.metrics.log_stats();

        if let Err(e) = self.close_database().await {
            warn!("Error closing database connections: {}", e);
        }

        info!("Graceful shutdown completed successfully");
        Ok(())
    }

    async fn close_database(&self) -> Result<()> {
        timeout(self.close_timeout, self.store.shutdown())
            .await
            .map_err(|_| anyhow::anyhow!("Timeout waiting for database connections to close"))
    }
}

/// Resolve once SIGINT (or SIGTERM on unix) arrives
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
