use std::sync::Arc;
use tracing::{debug, error};

use crate::error::AppError;
use crate::model::{ProjectSummary, UserId};
use crate::observability::WorkflowMetrics;
use crate::store::ProjectStore;

/// Lists the projects a user created or belongs to, newest first
#[derive(Clone)]
pub struct ProjectListing {
    store: Arc<dyn ProjectStore>,
    metrics: Arc<WorkflowMetrics>,
}

impl ProjectListing {
    pub fn new(store: Arc<dyn ProjectStore>, metrics: Arc<WorkflowMetrics>) -> Self {
        Self { store, metrics }
    }

    pub async fn list(&self, caller: &UserId) -> Result<Vec<ProjectSummary>, AppError> {
        self.metrics.record_list_request();

        let projects = self
            .store
            .list_projects_for_user(caller)
            .await
            .map_err(|e| {
                error!(user.id = %caller, error = %e, "Error fetching projects");
                AppError::from(e)
            })?;

        debug!(user.id = %caller, count = projects.len(), "Projects listed");
        Ok(projects)
    }
}
