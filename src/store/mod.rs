//! Persistence seam for projects, memberships and learning stages
//!
//! The workflows only ever talk to [`ProjectStore`]; the SQLite implementation
//! lives in [`crate::database`]. Mock implementations are generated for tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Project, ProjectId, ProjectMember, ProjectSummary, UserId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("metadata serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt {table} row: {reason}")]
    CorruptRow { table: &'static str, reason: String },
}

impl StoreError {
    pub(crate) fn corrupt(table: &'static str, reason: impl ToString) -> Self {
        StoreError::CorruptRow {
            table,
            reason: reason.to_string(),
        }
    }
}

/// Relational store operations used by the project workflows
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Insert a project row and return it as stored
    async fn insert_project(&self, project: &Project) -> Result<Project, StoreError>;

    /// Seed the six learning stages of a project. Runs as a single unit:
    /// either every stage is written or none is.
    async fn initialize_stages(&self, project_id: ProjectId) -> Result<(), StoreError>;

    /// Insert a membership row and return it as stored
    async fn insert_member(&self, member: &ProjectMember) -> Result<ProjectMember, StoreError>;

    /// Projects the user created or is a member of, newest first
    async fn list_projects_for_user(&self, user: &UserId)
        -> Result<Vec<ProjectSummary>, StoreError>;
}
