//! Project creation pipeline
//!
//! One fatal step followed by ordered best-effort post-actions:
//!
//! 1. validate the payload (no writes on failure)
//! 2. insert the project row; failure aborts and is returned to the caller
//! 3. seed the learning stages
//! 4. register the creator as owner
//!
//! Failures of 3 and 4 are logged and recorded in the [`CreationReport`], but
//! the caller still gets the project back. Nothing compensates or retries, so
//! a project can exist without stages or without an owner row.

use chrono::{SubsecRound, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::model::{CreateProjectRequest, Project, ProjectMember, UserId};
use crate::observability::{OperationTimer, WorkflowMetrics};
use crate::store::{ProjectStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostAction {
    InitializeStages,
    RegisterOwner,
}

impl PostAction {
    /// Execution order after the project row exists
    pub const ALL: [PostAction; 2] = [PostAction::InitializeStages, PostAction::RegisterOwner];

    pub fn name(&self) -> &'static str {
        match self {
            PostAction::InitializeStages => "initialize_stages",
            PostAction::RegisterOwner => "register_owner",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostActionOutcome {
    Completed,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostActionRecord {
    pub action: PostAction,
    pub outcome: PostActionOutcome,
}

/// What happened during one creation. Only `project` reaches the client.
#[derive(Debug, Clone)]
pub struct CreationReport {
    pub project: Project,
    pub post_actions: Vec<PostActionRecord>,
}

impl CreationReport {
    pub fn failed_actions(&self) -> Vec<PostAction> {
        self.post_actions
            .iter()
            .filter(|record| matches!(record.outcome, PostActionOutcome::Failed { .. }))
            .map(|record| record.action)
            .collect()
    }

    pub fn is_fully_initialized(&self) -> bool {
        self.failed_actions().is_empty()
    }
}

#[derive(Clone)]
pub struct ProjectCreationWorkflow {
    store: Arc<dyn ProjectStore>,
    metrics: Arc<WorkflowMetrics>,
}

impl ProjectCreationWorkflow {
    pub fn new(store: Arc<dyn ProjectStore>, metrics: Arc<WorkflowMetrics>) -> Self {
        Self { store, metrics }
    }

    pub async fn create(
        &self,
        caller: &UserId,
        request: CreateProjectRequest,
    ) -> Result<CreationReport, AppError> {
        let timer = OperationTimer::new("create_project");

        let new_project = request.validate().map_err(|e| {
            self.metrics.record_validation_rejection();
            AppError::from(e)
        })?;

        // Stored timestamps carry microseconds; match them so the row reads back identically.
        let now = Utc::now().trunc_subsecs(6);
        let draft = Project::create(new_project, caller.clone(), now);

        let project = self.store.insert_project(&draft).await.map_err(|e| {
            error!(user.id = %caller, error = %e, "Error creating project");
            self.metrics.record_creation_failure();
            AppError::from(e)
        })?;
        info!(project.id = %project.id, user.id = %caller, "Project created");

        let mut post_actions = Vec::with_capacity(PostAction::ALL.len());
        for action in PostAction::ALL {
            let outcome = self.run_post_action(action, &project, caller).await;
            post_actions.push(PostActionRecord { action, outcome });
        }

        self.metrics.record_project_created();
        timer.finish();

        Ok(CreationReport {
            project,
            post_actions,
        })
    }

    async fn run_post_action(
        &self,
        action: PostAction,
        project: &Project,
        caller: &UserId,
    ) -> PostActionOutcome {
        let result: Result<(), StoreError> = match action {
            PostAction::InitializeStages => self.store.initialize_stages(project.id).await,
            PostAction::RegisterOwner => {
                let owner = ProjectMember::owner(project.id, caller.clone(), project.created_at);
                self.store.insert_member(&owner).await.map(|_| ())
            }
        };

        match result {
            Ok(()) => PostActionOutcome::Completed,
            Err(e) => {
                warn!(
                    project.id = %project.id,
                    step = action.name(),
                    error = %e,
                    "Best-effort step failed; project left partially initialized"
                );
                match action {
                    PostAction::InitializeStages => self.metrics.record_stage_init_failure(),
                    PostAction::RegisterOwner => self.metrics.record_membership_failure(),
                }
                PostActionOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
