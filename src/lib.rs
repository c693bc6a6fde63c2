// PBL Tracker Library - project-based learning tracker service
// This exposes the core components for the binary and integration tests

pub mod config;
pub mod database;
pub mod error;
pub mod http;
pub mod identity;
pub mod model;
pub mod observability;
pub mod shutdown;
pub mod store;
pub mod telemetry;
pub mod workflows;

// Re-export key types for easy access
pub use config::{EnvironmentReport, PblConfig};
pub use database::SqliteStore;
pub use error::{AppError, ErrorBody};
pub use http::{build_router, AppState};
pub use identity::{
    build_identity_provider, HttpIdentityProvider, IdentityError, IdentityProvider,
    StaticTokenIdentity,
};
pub use observability::{OperationTimer, WorkflowMetrics, WorkflowStats};
pub use shutdown::{wait_for_shutdown_signal, ShutdownCoordinator};
pub use store::{ProjectStore, StoreError};
pub use telemetry::{generate_correlation_id, init_telemetry, shutdown_telemetry};
pub use workflows::{CreationReport, PostAction, ProjectCreationWorkflow, ProjectListing};
