//! HTTP surface: `GET|POST /projects` (also under `/api`) and `GET /health`

pub mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

use crate::identity::IdentityProvider;
use crate::observability::WorkflowMetrics;
use crate::store::ProjectStore;
use crate::workflows::{ProjectCreationWorkflow, ProjectListing};

/// Everything a handler needs, built once at startup and cloned per request
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub creation: ProjectCreationWorkflow,
    pub listing: ProjectListing,
    pub metrics: Arc<WorkflowMetrics>,
    pub metrics_enabled: bool,
    pub max_body_bytes: usize,
}

/// Body limit used unless configuration says otherwise
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

impl AppState {
    pub fn new(store: Arc<dyn ProjectStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        let metrics = Arc::new(WorkflowMetrics::new());
        Self {
            identity,
            creation: ProjectCreationWorkflow::new(store.clone(), metrics.clone()),
            listing: ProjectListing::new(store, metrics.clone()),
            metrics,
            metrics_enabled: true,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_metrics_enabled(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    let projects = get(handlers::list_projects).post(handlers::create_project);
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/projects", projects.clone())
        .route("/api/projects", projects)
        .fallback(handlers::not_found)
        .layer(body_limit)
        .with_state(state)
}
